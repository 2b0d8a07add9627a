//! CRUD handlers shared by every admin-managed table.
//!
//! Each handler is generic over a [`Resource`]; `resource_routes::<R>()`
//! mounts the set of routes that resource declares.

use std::collections::HashMap;

use axum::extract::{Path, Query, State};
use axum::http::header::{CONTENT_DISPOSITION, CONTENT_TYPE};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, patch};
use axum::Router;
use chrono::Utc;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::app_state::SharedState;
use crate::error::ApiError;
use crate::export::rows_to_csv;
use crate::models::{one_of, Payload, Resource};
use crate::response::{ApiJson, ApiResponse, Pagination};
use crate::supabase::{sanitize_term, Direction, Filter, Order, Row, Store, TableQuery};
use crate::utils::now_rfc3339;

pub const DEFAULT_LIMIT: usize = 20;
pub const MAX_LIMIT: usize = 100;
pub const EXPORT_LIMIT: usize = 10_000;
pub const MAX_PAGE: usize = 1_000_000;

/// Parsed list query string: paging, filters and ordering.
#[derive(Debug, Clone, PartialEq)]
pub struct ListParams {
    pub page: usize,
    pub limit: usize,
    pub filters: Vec<Filter>,
    pub order: Order,
}

impl ListParams {
    /// Only `page` and `limit`, ordered by `default_order`.
    pub fn paging(params: &HashMap<String, String>, default_order: &str) -> Self {
        let page = params
            .get("page")
            .and_then(|v| v.trim().parse::<usize>().ok())
            .unwrap_or(1)
            .clamp(1, MAX_PAGE);
        let limit = params
            .get("limit")
            .and_then(|v| v.trim().parse::<usize>().ok())
            .unwrap_or(DEFAULT_LIMIT)
            .clamp(1, MAX_LIMIT);

        Self {
            page,
            limit,
            filters: Vec::new(),
            order: Order::parse(default_order),
        }
    }

    pub fn parse<R: Resource>(params: &HashMap<String, String>) -> Result<Self, ApiError> {
        let mut list = Self::paging(params, R::DEFAULT_ORDER);

        if let Some(term) = params.get("search").map(|s| sanitize_term(s)) {
            if !term.is_empty() && !R::SEARCH_COLUMNS.is_empty() {
                list.filters.push(Filter::Search {
                    columns: R::SEARCH_COLUMNS.iter().map(|c| c.to_string()).collect(),
                    term,
                });
            }
        }

        for column in R::FILTER_COLUMNS {
            let Some(value) = params.get(*column).map(|v| v.trim()) else {
                continue;
            };
            if value.is_empty() || value.eq_ignore_ascii_case("all") {
                continue;
            }
            if value.eq_ignore_ascii_case("null") {
                list.filters.push(Filter::IsNull(column.to_string()));
                continue;
            }
            let value = if *column == "status" && !R::STATUSES.is_empty() {
                one_of("status", value, R::STATUSES)?
            } else {
                value.to_string()
            };
            list.filters.push(Filter::eq(column, value));
        }

        for column in R::RANGE_COLUMNS {
            let bounds: [(&str, fn(String, String) -> Filter); 2] =
                [("min", Filter::Gte), ("max", Filter::Lte)];
            for (prefix, bound) in bounds {
                let key = format!("{}_{}", prefix, column);
                let Some(raw) = params.get(&key).map(|v| v.trim()).filter(|v| !v.is_empty())
                else {
                    continue;
                };
                let number: f64 = raw
                    .parse()
                    .map_err(|_| ApiError::BadRequest(format!("{} must be a number", key)))?;
                list.filters.push(bound(column.to_string(), number.to_string()));
            }
        }

        let sortable = |column: &str| {
            column == "created_at"
                || R::FILTER_COLUMNS.contains(&column)
                || R::RANGE_COLUMNS.contains(&column)
        };
        if let Some(sort) = params.get("sort").map(|s| s.trim()).filter(|s| sortable(s)) {
            list.order.column = sort.to_string();
        }
        match params.get("order").map(|d| d.trim().to_lowercase()).as_deref() {
            Some("asc") => list.order.direction = Direction::Asc,
            Some("desc") => list.order.direction = Direction::Desc,
            _ => {}
        }

        Ok(list)
    }

    pub fn query(&self, select: &str) -> TableQuery {
        TableQuery {
            columns: select.to_string(),
            filters: self.filters.clone(),
            order: Some(self.order.clone()),
            ..TableQuery::default()
        }
        .range((self.page - 1).saturating_mul(self.limit), self.limit)
        .with_count()
    }
}

/// Runs a paginated list query and wraps it in the envelope.
pub async fn fetch_page(
    store: &dyn Store,
    table: &str,
    select: &str,
    list: &ListParams,
) -> Result<ApiResponse<Vec<Row>>, ApiError> {
    let page = store.select(table, &list.query(select)).await?;
    let total = page.total.unwrap_or(page.rows.len());
    Ok(ApiResponse::ok(page.rows).paginated(Pagination::new(list.page, list.limit, total)))
}

fn by_id(id: &str) -> Vec<Filter> {
    vec![Filter::eq("id", id)]
}

async fn stored_row<R: Resource>(store: &dyn Store, id: &str) -> Result<Row, ApiError> {
    store
        .find_one(R::TABLE, TableQuery::new().eq("id", id))
        .await?
        .ok_or_else(|| ApiError::not_found(R::NAME))
}

async fn list<R: Resource>(
    State(state): State<SharedState>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<ApiResponse<Vec<Row>>, ApiError> {
    let list = ListParams::parse::<R>(&params)?;
    fetch_page(state.store.as_ref(), R::TABLE, R::SELECT, &list).await
}

async fn get_one<R: Resource>(
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> Result<ApiResponse<Row>, ApiError> {
    let query = TableQuery::new().select(R::SELECT).eq("id", id);
    let row = state
        .store
        .find_one(R::TABLE, query)
        .await?
        .ok_or_else(|| ApiError::not_found(R::NAME))?;
    Ok(ApiResponse::ok(row))
}

/// Rejects values already used by another row in a unique column.
async fn ensure_unique<R: Resource>(
    store: &dyn Store,
    row: &Row,
    except_id: Option<&str>,
) -> Result<(), ApiError> {
    for column in R::UNIQUE_COLUMNS {
        let Some(value) = row.get(*column).and_then(Value::as_str) else {
            continue;
        };
        let mut filters = vec![Filter::eq(column, value)];
        if let Some(id) = except_id {
            filters.push(Filter::Neq("id".into(), id.to_string()));
        }
        if store.count(R::TABLE, filters).await? > 0 {
            return Err(ApiError::BadRequest(format!(
                "A {} with this {} already exists",
                R::NAME.to_lowercase(),
                column
            )));
        }
    }
    Ok(())
}

async fn create<R: Resource>(
    State(state): State<SharedState>,
    ApiJson(payload): ApiJson<R::Create>,
) -> Result<ApiResponse<Row>, ApiError> {
    let row = payload.into_row()?;
    ensure_unique::<R>(state.store.as_ref(), &row, None).await?;

    let created = match R::UPSERT_ON {
        Some(on_conflict) => state.store.upsert(R::TABLE, row, on_conflict).await?,
        None => state.store.insert(R::TABLE, row).await?,
    };
    tracing::info!(table = R::TABLE, id = ?created.get("id"), "row created");

    Ok(ApiResponse::created(created).message(format!("{} created successfully", R::NAME)))
}

async fn update<R: Resource>(
    State(state): State<SharedState>,
    Path(id): Path<String>,
    ApiJson(payload): ApiJson<R::Update>,
) -> Result<ApiResponse<Row>, ApiError> {
    let mut patch = payload.into_row()?;
    ensure_unique::<R>(state.store.as_ref(), &patch, Some(&id)).await?;

    if let Some(status) = patch.get("status").and_then(Value::as_str).map(str::to_owned) {
        let current = stored_row::<R>(state.store.as_ref(), &id).await?;
        R::on_status_change(&status, &current, &mut patch);
    }
    patch.insert("updated_at".into(), json!(now_rfc3339()));

    let row = state
        .store
        .update(R::TABLE, &by_id(&id), patch)
        .await?
        .into_iter()
        .next()
        .ok_or_else(|| ApiError::not_found(R::NAME))?;
    tracing::info!(table = R::TABLE, %id, "row updated");

    Ok(ApiResponse::ok(row).message(format!("{} updated successfully", R::NAME)))
}

async fn remove<R: Resource>(
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> Result<ApiResponse<()>, ApiError> {
    let removed = state.store.delete(R::TABLE, &by_id(&id)).await?;
    if removed.is_empty() {
        return Err(ApiError::not_found(R::NAME));
    }
    tracing::info!(table = R::TABLE, %id, "row deleted");

    Ok(ApiResponse::done(format!("{} deleted successfully", R::NAME)))
}

#[derive(Debug, Deserialize)]
struct StatusChange {
    #[serde(default)]
    status: String,
}

async fn set_status<R: Resource>(
    State(state): State<SharedState>,
    Path(id): Path<String>,
    ApiJson(body): ApiJson<StatusChange>,
) -> Result<ApiResponse<Row>, ApiError> {
    let status = one_of("status", &body.status, R::STATUSES)?;

    let current = stored_row::<R>(state.store.as_ref(), &id).await?;
    let mut patch = Row::new();
    patch.insert("status".into(), json!(status));
    R::on_status_change(&status, &current, &mut patch);
    patch.insert("updated_at".into(), json!(now_rfc3339()));

    let row = state
        .store
        .update(R::TABLE, &by_id(&id), patch)
        .await?
        .into_iter()
        .next()
        .ok_or_else(|| ApiError::not_found(R::NAME))?;
    tracing::info!(table = R::TABLE, %id, %status, "status changed");

    Ok(ApiResponse::ok(row).message(format!("{} status updated to {}", R::NAME, status)))
}

async fn toggle<R: Resource>(
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> Result<ApiResponse<Row>, ApiError> {
    let column = R::TOGGLE_COLUMN.ok_or_else(|| ApiError::not_found("Route"))?;

    let query = TableQuery::new()
        .select(&format!("id,{}", column))
        .eq("id", id.clone());
    let current = state
        .store
        .find_one(R::TABLE, query)
        .await?
        .ok_or_else(|| ApiError::not_found(R::NAME))?
        .get(column)
        .and_then(Value::as_bool)
        .unwrap_or(false);

    let mut patch = Row::new();
    patch.insert(column.into(), json!(!current));
    patch.insert("updated_at".into(), json!(now_rfc3339()));

    let row = state
        .store
        .update(R::TABLE, &by_id(&id), patch)
        .await?
        .into_iter()
        .next()
        .ok_or_else(|| ApiError::not_found(R::NAME))?;

    Ok(ApiResponse::ok(row).message(format!("{} set to {}", column, !current)))
}

async fn export<R: Resource>(
    State(state): State<SharedState>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<Response, ApiError> {
    let list = ListParams::parse::<R>(&params)?;
    let query = TableQuery {
        columns: R::EXPORT_COLUMNS.join(","),
        filters: list.filters,
        order: Some(list.order),
        ..TableQuery::default()
    }
    .limit(EXPORT_LIMIT);

    let page = state.store.select(R::TABLE, &query).await?;
    tracing::info!(table = R::TABLE, rows = page.rows.len(), "csv export");

    let filename = format!("{}-{}.csv", R::TABLE, Utc::now().format("%Y-%m-%d"));
    let headers = [
        (CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
        (
            CONTENT_DISPOSITION,
            format!("attachment; filename=\"{}\"", filename),
        ),
    ];
    Ok((headers, rows_to_csv(R::EXPORT_COLUMNS, &page.rows)).into_response())
}

pub fn resource_routes<R: Resource>() -> Router<SharedState> {
    let mut collection = get(list::<R>);
    if R::GENERIC_CREATE {
        collection = collection.post(create::<R>);
    }

    let mut router = Router::new().route("/", collection).route(
        "/{id}",
        get(get_one::<R>).put(update::<R>).delete(remove::<R>),
    );
    if !R::EXPORT_COLUMNS.is_empty() {
        router = router.route("/export", get(export::<R>));
    }
    if !R::STATUSES.is_empty() {
        router = router.route("/{id}/status", patch(set_status::<R>));
    }
    if R::TOGGLE_COLUMN.is_some() {
        router = router.route("/{id}/toggle", patch(toggle::<R>));
    }
    router
}
