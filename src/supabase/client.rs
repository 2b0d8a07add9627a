use async_trait::async_trait;
use postgrest::{Builder, Postgrest};
use serde::Deserialize;
use serde_json::Value;

use super::{sanitize_term, Filter, Page, Row, Store, StoreError, TableQuery};

pub fn get_supabase_client(url: &str, api_key: &str) -> Postgrest {
    let rest_url = if url.trim_end_matches('/').ends_with("/rest/v1") {
        url.trim_end_matches('/').to_string()
    } else {
        format!("{}/rest/v1", url.trim_end_matches('/'))
    };

    Postgrest::new(rest_url)
        .insert_header("apikey", api_key)
        .insert_header("Authorization", format!("Bearer {}", api_key))
}

/// PostgREST-backed store talking to the hosted Supabase project.
pub struct SupabaseStore {
    client: Postgrest,
}

impl SupabaseStore {
    pub fn new(url: &str, api_key: &str) -> Self {
        Self {
            client: get_supabase_client(url, api_key),
        }
    }
}

#[derive(Debug, Deserialize)]
struct PostgrestError {
    code: Option<String>,
    message: Option<String>,
    details: Option<String>,
}

fn apply_filter(builder: Builder, filter: &Filter) -> Builder {
    match filter {
        Filter::Eq(column, value) => builder.eq(column, value),
        Filter::Neq(column, value) => builder.neq(column, value),
        Filter::Gte(column, value) => builder.gte(column, value),
        Filter::Lte(column, value) => builder.lte(column, value),
        Filter::In(column, values) => builder.in_(column, values),
        Filter::IsNull(column) => builder.is(column, "null"),
        Filter::Search { columns, term } => {
            let term = sanitize_term(term);
            match columns.as_slice() {
                [] => builder,
                [column] => builder.ilike(column, format!("*{}*", term)),
                many => {
                    let clauses = many
                        .iter()
                        .map(|column| format!("{}.ilike.*{}*", column, term))
                        .collect::<Vec<_>>()
                        .join(",");
                    builder.or(clauses)
                }
            }
        }
    }
}

fn apply_filters(builder: Builder, filters: &[Filter]) -> Builder {
    filters.iter().fold(builder, apply_filter)
}

fn map_error(status: u16, body: &str) -> StoreError {
    let parsed: Option<PostgrestError> = serde_json::from_str(body).ok();
    let (code, message) = match parsed {
        Some(err) => (
            err.code.unwrap_or_default(),
            match (err.message, err.details) {
                (Some(message), Some(details)) => format!("{} ({})", message, details),
                (Some(message), None) => message,
                (None, Some(details)) => details,
                (None, None) => body.to_string(),
            },
        ),
        None => (String::new(), body.to_string()),
    };

    match code.as_str() {
        "PGRST116" => StoreError::NotFound,
        "23505" => StoreError::Conflict(message),
        _ if status == 404 => StoreError::NotFound,
        _ if status == 409 => StoreError::Conflict(message),
        _ => StoreError::Database(message),
    }
}

struct RawResponse {
    status: u16,
    total: Option<usize>,
    body: String,
}

async fn execute(builder: Builder) -> Result<RawResponse, StoreError> {
    let response = builder
        .execute()
        .await
        .map_err(|e| StoreError::Transport(e.to_string()))?;

    let status = response.status().as_u16();
    let total = response
        .headers()
        .get("content-range")
        .and_then(|value| value.to_str().ok())
        .and_then(crate::utils::parse_content_range_total);

    let body = response
        .text()
        .await
        .map_err(|e| StoreError::Transport(e.to_string()))?;

    Ok(RawResponse {
        status,
        total,
        body,
    })
}

fn read_rows(raw: RawResponse) -> Result<(Vec<Row>, Option<usize>), StoreError> {
    if !(200..300).contains(&raw.status) {
        return Err(map_error(raw.status, &raw.body));
    }

    if raw.body.trim().is_empty() {
        return Ok((Vec::new(), raw.total));
    }

    let json: Value =
        serde_json::from_str(&raw.body).map_err(|e| StoreError::Decode(e.to_string()))?;
    let rows = match json {
        Value::Array(items) => items
            .into_iter()
            .filter_map(|item| match item {
                Value::Object(row) => Some(row),
                _ => None,
            })
            .collect(),
        Value::Object(row) => vec![row],
        other => return Err(StoreError::Decode(format!("expected rows, got {}", other))),
    };
    Ok((rows, raw.total))
}

/// Like `read_rows`, but a range past the last row (416, `PGRST103`) is an
/// empty page rather than an error.
fn read_page(raw: RawResponse) -> Result<(Vec<Row>, Option<usize>), StoreError> {
    if raw.status == 416 {
        return Ok((Vec::new(), raw.total));
    }
    read_rows(raw)
}

fn first_row(rows: Vec<Row>) -> Result<Row, StoreError> {
    rows.into_iter()
        .next()
        .ok_or_else(|| StoreError::Decode("no row returned".to_string()))
}

#[async_trait]
impl Store for SupabaseStore {
    #[tracing::instrument(skip(self, query), fields(filters = query.filters.len()))]
    async fn select(&self, table: &str, query: &TableQuery) -> Result<Page, StoreError> {
        let mut builder = self.client.from(table).select(&query.columns);
        builder = apply_filters(builder, &query.filters);

        if let Some(order) = &query.order {
            builder = builder.order(format!("{}.{}", order.column, order.direction.as_str()));
        }
        if let Some(limit) = query.limit {
            let high = query.offset.saturating_add(limit.max(1) - 1);
            builder = builder.range(query.offset, high);
        }
        if query.count {
            builder = builder.exact_count();
        }

        let (rows, total) = read_page(execute(builder).await?)?;
        Ok(Page {
            rows,
            total: if query.count { total } else { None },
        })
    }

    #[tracing::instrument(skip(self, row))]
    async fn insert(&self, table: &str, row: Row) -> Result<Row, StoreError> {
        let payload = Value::Array(vec![Value::Object(row)]);

        let builder = self.client.from(table).insert(payload.to_string());

        let (rows, _) = read_rows(execute(builder).await?)?;
        first_row(rows)
    }

    #[tracing::instrument(skip(self, row))]
    async fn upsert(&self, table: &str, row: Row, on_conflict: &str) -> Result<Row, StoreError> {
        let payload = Value::Array(vec![Value::Object(row)]);

        let builder = self
            .client
            .from(table)
            .upsert(payload.to_string())
            .on_conflict(on_conflict);

        let (rows, _) = read_rows(execute(builder).await?)?;
        first_row(rows)
    }

    #[tracing::instrument(skip(self, filters, patch))]
    async fn update(
        &self,
        table: &str,
        filters: &[Filter],
        patch: Row,
    ) -> Result<Vec<Row>, StoreError> {
        let builder = self
            .client
            .from(table)
            .update(Value::Object(patch).to_string());

        let (rows, _) = read_rows(execute(apply_filters(builder, filters)).await?)?;
        Ok(rows)
    }

    #[tracing::instrument(skip(self, filters))]
    async fn delete(&self, table: &str, filters: &[Filter]) -> Result<Vec<Row>, StoreError> {
        let builder = self.client.from(table).delete();

        let (rows, _) = read_rows(execute(apply_filters(builder, filters)).await?)?;
        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn query_pairs(builder: Builder) -> Vec<(String, String)> {
        let request = builder.build().build().unwrap();
        request
            .url()
            .query_pairs()
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect()
    }

    fn table() -> Builder {
        get_supabase_client("http://localhost:54321", "service-key").from("properties")
    }

    fn pair(key: &str, value: &str) -> (String, String) {
        (key.to_string(), value.to_string())
    }

    #[test]
    fn search_becomes_ilike_clauses() {
        let many = Filter::Search {
            columns: vec!["title".into(), "city".into()],
            term: "Bandra West".into(),
        };
        assert_eq!(
            query_pairs(apply_filter(table(), &many)),
            vec![pair("or", "(title.ilike.*Bandra West*,city.ilike.*Bandra West*)")]
        );

        let one = Filter::Search {
            columns: vec!["name".into()],
            term: "(x),y".into(),
        };
        assert_eq!(
            query_pairs(apply_filter(table(), &one)),
            vec![pair("name", "ilike.*xy*")]
        );
    }

    #[test]
    fn filters_map_to_postgrest_operators() {
        let filters = vec![
            Filter::IsNull("owner_id".into()),
            Filter::eq("status", "active"),
            Filter::Gte("price".into(), "5000000".into()),
            Filter::In("slot_id".into(), vec!["a".into(), "b".into()]),
        ];
        assert_eq!(
            query_pairs(apply_filters(table(), &filters)),
            vec![
                pair("owner_id", "is.null"),
                pair("status", "eq.active"),
                pair("price", "gte.5000000"),
                pair("slot_id", "in.(a,b)"),
            ]
        );
    }

    #[test]
    fn range_past_the_end_is_an_empty_page() {
        let raw = RawResponse {
            status: 416,
            total: Some(12),
            body: r#"{"code":"PGRST103","message":"Requested range not satisfiable","details":"An offset of 80 was requested, but there are only 12 rows.","hint":null}"#.to_string(),
        };
        let (rows, total) = read_page(raw).unwrap();
        assert!(rows.is_empty());
        assert_eq!(total, Some(12));

        let raw = RawResponse {
            status: 500,
            total: None,
            body: "upstream exploded".to_string(),
        };
        assert!(matches!(read_page(raw), Err(StoreError::Database(_))));
    }

    #[test]
    fn maps_postgrest_error_codes() {
        let body = r#"{"code":"PGRST116","message":"JSON object requested, multiple (or no) rows returned","details":null,"hint":null}"#;
        assert!(matches!(map_error(406, body), StoreError::NotFound));

        let body = r#"{"code":"23505","message":"duplicate key value violates unique constraint","details":"Key (key)=(dark_mode) already exists."}"#;
        match map_error(409, body) {
            StoreError::Conflict(message) => assert!(message.contains("dark_mode")),
            other => panic!("unexpected error: {:?}", other),
        }

        assert!(matches!(
            map_error(500, "upstream exploded"),
            StoreError::Database(message) if message == "upstream exploded"
        ));
    }
}
