pub mod client;
pub mod memory;

use async_trait::async_trait;
use serde_json::{Map, Value};
use thiserror::Error;

pub use client::SupabaseStore;
pub use memory::MemoryStore;

/// A single database row as returned by PostgREST.
pub type Row = Map<String, Value>;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Record not found")]
    NotFound,
    #[error("{0}")]
    Conflict(String),
    #[error("Database error: {0}")]
    Database(String),
    #[error("Request to database failed: {0}")]
    Transport(String),
    #[error("Unexpected database response: {0}")]
    Decode(String),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    Eq(String, String),
    Neq(String, String),
    Gte(String, String),
    Lte(String, String),
    In(String, Vec<String>),
    IsNull(String),
    /// Case-insensitive substring match on any of the columns.
    Search { columns: Vec<String>, term: String },
}

impl Filter {
    pub fn eq(column: &str, value: impl Into<String>) -> Self {
        Filter::Eq(column.to_string(), value.into())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Asc,
    Desc,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Asc => "asc",
            Direction::Desc => "desc",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Order {
    pub column: String,
    pub direction: Direction,
}

impl Order {
    /// Parses PostgREST shorthand such as `created_at.desc`.
    pub fn parse(spec: &str) -> Self {
        match spec.rsplit_once('.') {
            Some((column, "asc")) => Order {
                column: column.to_string(),
                direction: Direction::Asc,
            },
            Some((column, "desc")) => Order {
                column: column.to_string(),
                direction: Direction::Desc,
            },
            _ => Order {
                column: spec.to_string(),
                direction: Direction::Asc,
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TableQuery {
    pub columns: String,
    pub filters: Vec<Filter>,
    pub order: Option<Order>,
    pub offset: usize,
    pub limit: Option<usize>,
    pub count: bool,
}

impl Default for TableQuery {
    fn default() -> Self {
        Self {
            columns: "*".to_string(),
            filters: Vec::new(),
            order: None,
            offset: 0,
            limit: None,
            count: false,
        }
    }
}

impl TableQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn select(mut self, columns: &str) -> Self {
        self.columns = columns.to_string();
        self
    }

    pub fn filter(mut self, filter: Filter) -> Self {
        self.filters.push(filter);
        self
    }

    pub fn eq(self, column: &str, value: impl Into<String>) -> Self {
        self.filter(Filter::eq(column, value))
    }

    pub fn order(mut self, spec: &str) -> Self {
        self.order = Some(Order::parse(spec));
        self
    }

    pub fn range(mut self, offset: usize, limit: usize) -> Self {
        self.offset = offset;
        self.limit = Some(limit);
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn with_count(mut self) -> Self {
        self.count = true;
        self
    }
}

#[derive(Debug, Clone, Default)]
pub struct Page {
    pub rows: Vec<Row>,
    /// Exact number of matching rows, present when the query asked for a count.
    pub total: Option<usize>,
}

#[async_trait]
pub trait Store: Send + Sync {
    async fn select(&self, table: &str, query: &TableQuery) -> Result<Page, StoreError>;

    async fn insert(&self, table: &str, row: Row) -> Result<Row, StoreError>;

    async fn upsert(&self, table: &str, row: Row, on_conflict: &str) -> Result<Row, StoreError>;

    async fn update(&self, table: &str, filters: &[Filter], patch: Row)
        -> Result<Vec<Row>, StoreError>;

    async fn delete(&self, table: &str, filters: &[Filter]) -> Result<Vec<Row>, StoreError>;

    async fn find_one(&self, table: &str, query: TableQuery) -> Result<Option<Row>, StoreError> {
        let page = self.select(table, &query.limit(1)).await?;
        Ok(page.rows.into_iter().next())
    }

    async fn count(&self, table: &str, filters: Vec<Filter>) -> Result<usize, StoreError> {
        let query = TableQuery {
            columns: "id".to_string(),
            filters,
            limit: Some(1),
            count: true,
            ..TableQuery::default()
        };
        let page = self.select(table, &query).await?;
        page.total
            .ok_or_else(|| StoreError::Decode("count missing from response".to_string()))
    }
}

/// Removes characters that carry meaning in PostgREST filter syntax.
pub fn sanitize_term(term: &str) -> String {
    term.chars()
        .filter(|c| !matches!(c, ',' | '(' | ')' | '*' | '%'))
        .collect::<String>()
        .trim()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_order_shorthand() {
        assert_eq!(
            Order::parse("created_at.desc"),
            Order {
                column: "created_at".to_string(),
                direction: Direction::Desc
            }
        );
        assert_eq!(Order::parse("position").direction, Direction::Asc);
        assert_eq!(Order::parse("price.asc").column, "price");
    }

    #[test]
    fn sanitizes_search_terms() {
        assert_eq!(sanitize_term(" a,b(c)*d% "), "abcd");
        assert_eq!(sanitize_term("Bandra West"), "Bandra West");
    }
}
