use std::cmp::Ordering;
use std::collections::HashMap;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{Direction, Filter, Page, Row, Store, StoreError, TableQuery};

/// In-process store with the same filter semantics as PostgREST.
///
/// Embedded resources in the select string (`plan:subscription_plans(...)`)
/// are not resolved; rows come back with their own columns only.
#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<HashMap<String, Vec<Row>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts rows as-is, filling `id` and `created_at` when missing.
    pub async fn seed(&self, table: &str, rows: Vec<Row>) {
        let mut tables = self.tables.write().await;
        let entries = tables.entry(table.to_string()).or_default();
        entries.extend(rows.into_iter().map(with_defaults));
    }

    #[cfg(test)]
    pub async fn rows(&self, table: &str) -> Vec<Row> {
        self.tables
            .read()
            .await
            .get(table)
            .cloned()
            .unwrap_or_default()
    }
}

fn with_defaults(mut row: Row) -> Row {
    if !row.contains_key("id") {
        row.insert("id".into(), Value::String(Uuid::new_v4().to_string()));
    }
    if !row.contains_key("created_at") {
        row.insert(
            "created_at".into(),
            Value::String(chrono::Utc::now().to_rfc3339()),
        );
    }
    row
}

fn as_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn value_matches(value: Option<&Value>, expected: &str) -> bool {
    match value {
        Some(Value::Number(n)) => match (n.as_f64(), expected.parse::<f64>()) {
            (Some(a), Ok(b)) => a == b,
            _ => false,
        },
        Some(other) => as_text(other).is_some_and(|text| text == expected),
        None => false,
    }
}

fn compare_to(value: Option<&Value>, bound: &str) -> Option<Ordering> {
    match value? {
        Value::Number(n) => n.as_f64()?.partial_cmp(&bound.parse::<f64>().ok()?),
        Value::String(s) => Some(s.as_str().cmp(bound)),
        _ => None,
    }
}

fn matches(row: &Row, filter: &Filter) -> bool {
    match filter {
        Filter::Eq(column, value) => value_matches(row.get(column), value),
        Filter::Neq(column, value) => !value_matches(row.get(column), value),
        Filter::Gte(column, bound) => {
            matches!(compare_to(row.get(column), bound), Some(Ordering::Greater | Ordering::Equal))
        }
        Filter::Lte(column, bound) => {
            matches!(compare_to(row.get(column), bound), Some(Ordering::Less | Ordering::Equal))
        }
        Filter::In(column, values) => values.iter().any(|v| value_matches(row.get(column), v)),
        Filter::IsNull(column) => matches!(row.get(column), None | Some(Value::Null)),
        Filter::Search { columns, term } => {
            let needle = super::sanitize_term(term).to_lowercase();
            columns.iter().any(|column| {
                row.get(column)
                    .and_then(as_text)
                    .is_some_and(|text| text.to_lowercase().contains(&needle))
            })
        }
    }
}

fn matches_all(row: &Row, filters: &[Filter]) -> bool {
    filters.iter().all(|filter| matches(row, filter))
}

fn compare_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    match (a, b) {
        (None | Some(Value::Null), None | Some(Value::Null)) => Ordering::Equal,
        // nulls last, as PostgREST does for ascending order
        (None | Some(Value::Null), _) => Ordering::Greater,
        (_, None | Some(Value::Null)) => Ordering::Less,
        (Some(Value::Number(x)), Some(Value::Number(y))) => x
            .as_f64()
            .partial_cmp(&y.as_f64())
            .unwrap_or(Ordering::Equal),
        (Some(Value::Bool(x)), Some(Value::Bool(y))) => x.cmp(y),
        (Some(x), Some(y)) => as_text(x).cmp(&as_text(y)),
    }
}

fn conflict_key(row: &Row, columns: &[&str]) -> Vec<Option<String>> {
    columns
        .iter()
        .map(|column| row.get(*column).and_then(as_text))
        .collect()
}

#[async_trait]
impl Store for MemoryStore {
    async fn select(&self, table: &str, query: &TableQuery) -> Result<Page, StoreError> {
        let tables = self.tables.read().await;
        let mut rows: Vec<Row> = tables
            .get(table)
            .map(|rows| {
                rows.iter()
                    .filter(|row| matches_all(row, &query.filters))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();

        if let Some(order) = &query.order {
            rows.sort_by(|a, b| {
                let ordering = compare_values(a.get(&order.column), b.get(&order.column));
                match order.direction {
                    Direction::Asc => ordering,
                    Direction::Desc => ordering.reverse(),
                }
            });
        }

        let total = rows.len();
        let rows = rows
            .into_iter()
            .skip(query.offset)
            .take(query.limit.unwrap_or(usize::MAX))
            .collect();

        Ok(Page {
            rows,
            total: query.count.then_some(total),
        })
    }

    async fn insert(&self, table: &str, row: Row) -> Result<Row, StoreError> {
        let row = with_defaults(row);
        let mut tables = self.tables.write().await;
        let entries = tables.entry(table.to_string()).or_default();

        if let Some(id) = row.get("id").and_then(as_text) {
            if entries
                .iter()
                .any(|existing| existing.get("id").and_then(as_text).as_deref() == Some(id.as_str()))
            {
                return Err(StoreError::Conflict(format!(
                    "duplicate key value violates unique constraint \"{}_pkey\"",
                    table
                )));
            }
        }

        entries.push(row.clone());
        Ok(row)
    }

    async fn upsert(&self, table: &str, row: Row, on_conflict: &str) -> Result<Row, StoreError> {
        let columns: Vec<&str> = on_conflict.split(',').map(str::trim).collect();
        let key = conflict_key(&row, &columns);

        let mut tables = self.tables.write().await;
        let entries = tables.entry(table.to_string()).or_default();

        if let Some(existing) = entries
            .iter_mut()
            .find(|existing| conflict_key(existing, &columns) == key)
        {
            for (column, value) in row {
                existing.insert(column, value);
            }
            return Ok(existing.clone());
        }

        let row = with_defaults(row);
        entries.push(row.clone());
        Ok(row)
    }

    async fn update(
        &self,
        table: &str,
        filters: &[Filter],
        patch: Row,
    ) -> Result<Vec<Row>, StoreError> {
        let mut tables = self.tables.write().await;
        let Some(entries) = tables.get_mut(table) else {
            return Ok(Vec::new());
        };

        let mut updated = Vec::new();
        for row in entries.iter_mut().filter(|row| matches_all(row, filters)) {
            for (column, value) in &patch {
                row.insert(column.clone(), value.clone());
            }
            updated.push(row.clone());
        }
        Ok(updated)
    }

    async fn delete(&self, table: &str, filters: &[Filter]) -> Result<Vec<Row>, StoreError> {
        let mut tables = self.tables.write().await;
        let Some(entries) = tables.get_mut(table) else {
            return Ok(Vec::new());
        };

        let (removed, kept): (Vec<Row>, Vec<Row>) = entries
            .drain(..)
            .partition(|row| matches_all(row, filters));
        *entries = kept;
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn row(value: Value) -> Row {
        match value {
            Value::Object(map) => map,
            _ => panic!("row must be an object"),
        }
    }

    async fn seeded() -> MemoryStore {
        let store = MemoryStore::new();
        store
            .seed(
                "properties",
                vec![
                    row(json!({"id": "p1", "title": "Sea view flat", "city": "Mumbai", "price": 9500000, "status": "active"})),
                    row(json!({"id": "p2", "title": "Garden villa", "city": "Pune", "price": 21000000, "status": "pending"})),
                    row(json!({"id": "p3", "title": "Studio near metro", "city": "Mumbai", "price": 4200000, "status": "active"})),
                ],
            )
            .await;
        store
    }

    #[tokio::test]
    async fn filters_orders_and_counts() {
        let store = seeded().await;
        let query = TableQuery::new()
            .eq("city", "Mumbai")
            .order("price.asc")
            .range(0, 1)
            .with_count();

        let page = store.select("properties", &query).await.unwrap();
        assert_eq!(page.total, Some(2));
        assert_eq!(page.rows.len(), 1);
        assert_eq!(page.rows[0]["id"], "p3");
    }

    #[tokio::test]
    async fn searches_case_insensitively_across_columns() {
        let store = seeded().await;
        let query = TableQuery::new().filter(Filter::Search {
            columns: vec!["title".into(), "city".into()],
            term: "PUNE".into(),
        });

        let page = store.select("properties", &query).await.unwrap();
        assert_eq!(page.rows.len(), 1);
        assert_eq!(page.rows[0]["id"], "p2");
    }

    #[tokio::test]
    async fn numeric_ranges_compare_as_numbers() {
        let store = seeded().await;
        let query = TableQuery::new()
            .filter(Filter::Gte("price".into(), "5000000".into()))
            .filter(Filter::Lte("price".into(), "10000000".into()));

        let page = store.select("properties", &query).await.unwrap();
        assert_eq!(page.rows.len(), 1);
        assert_eq!(page.rows[0]["id"], "p1");
    }

    #[tokio::test]
    async fn upsert_merges_on_conflict_columns() {
        let store = MemoryStore::new();
        store
            .upsert("remote_config", row(json!({"key": "max_photos", "value": 10})), "key")
            .await
            .unwrap();
        let merged = store
            .upsert("remote_config", row(json!({"key": "max_photos", "value": 20})), "key")
            .await
            .unwrap();

        assert_eq!(merged["value"], 20);
        assert_eq!(store.rows("remote_config").await.len(), 1);
    }

    #[tokio::test]
    async fn update_and_delete_return_affected_rows() {
        let store = seeded().await;
        let updated = store
            .update(
                "properties",
                &[Filter::eq("id", "p2")],
                row(json!({"status": "active"})),
            )
            .await
            .unwrap();
        assert_eq!(updated.len(), 1);
        assert_eq!(updated[0]["status"], "active");

        let removed = store
            .delete("properties", &[Filter::eq("status", "active")])
            .await
            .unwrap();
        assert_eq!(removed.len(), 3);
        assert!(store.rows("properties").await.is_empty());
    }

    #[tokio::test]
    async fn insert_assigns_id_and_rejects_duplicates() {
        let store = MemoryStore::new();
        let inserted = store
            .insert("faqs", row(json!({"question": "Q?"})))
            .await
            .unwrap();
        assert!(inserted["id"].is_string());
        assert!(inserted["created_at"].is_string());

        let duplicate = store
            .insert("faqs", row(json!({"id": inserted["id"].clone(), "question": "Again"})))
            .await;
        assert!(matches!(duplicate, Err(StoreError::Conflict(_))));
    }
}
