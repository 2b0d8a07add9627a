//! Unauthenticated endpoints used by the listings site and mobile apps.

use std::collections::HashMap;

use axum::extract::{Path, Query, State};
use axum::routing::{get, post};
use axum::Router;
use chrono::Utc;
use serde::Serialize;
use serde_json::{Map, Value};

use super::resource::{fetch_page, ListParams};
use crate::app_state::SharedState;
use crate::error::ApiError;
use crate::models::ads::{AdBookings, AdSlots};
use crate::models::banner::Banners;
use crate::models::blacklist::is_blocked;
use crate::models::blog::BlogPosts;
use crate::models::enquiry::{Enquiries, NewEnquiry};
use crate::models::faq::Faqs;
use crate::models::feature_flag::FeatureFlags;
use crate::models::plan::Plans;
use crate::models::property::Properties;
use crate::models::remote_config;
use crate::models::support::{NewSupportMessage, SupportMessages};
use crate::models::tenant_requirement::{NewTenantRequirement, TenantRequirements};
use crate::models::{is_live, Payload, Resource};
use crate::response::{ApiJson, ApiResponse};
use crate::supabase::{sanitize_term, Filter, Row, TableQuery};

type Params = Query<HashMap<String, String>>;

fn param<'a>(params: &'a HashMap<String, String>, key: &str) -> Option<&'a str> {
    params
        .get(key)
        .map(|v| v.trim())
        .filter(|v| !v.is_empty() && !v.eq_ignore_ascii_case("all"))
}

async fn list_properties(
    State(state): State<SharedState>,
    Query(mut params): Params,
) -> Result<ApiResponse<Vec<Row>>, ApiError> {
    // the public only ever sees active listings
    params.remove("status");
    let mut list = ListParams::parse::<Properties>(&params)?;
    list.filters.push(Filter::eq("status", "active"));
    fetch_page(state.store.as_ref(), Properties::TABLE, Properties::SELECT, &list).await
}

async fn get_property(
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> Result<ApiResponse<Row>, ApiError> {
    let query = TableQuery::new().eq("id", id).eq("status", "active");
    let row = state
        .store
        .find_one(Properties::TABLE, query)
        .await?
        .ok_or_else(|| ApiError::not_found(Properties::NAME))?;
    Ok(ApiResponse::ok(row))
}

async fn list_blog(
    State(state): State<SharedState>,
    Query(params): Params,
) -> Result<ApiResponse<Vec<Row>>, ApiError> {
    let mut list = ListParams::paging(&params, "published_at.desc");
    list.filters.push(Filter::eq("status", "published"));
    if let Some(term) = param(&params, "search")
        .map(sanitize_term)
        .filter(|t| !t.is_empty())
    {
        list.filters.push(Filter::Search {
            columns: BlogPosts::SEARCH_COLUMNS.iter().map(|c| c.to_string()).collect(),
            term,
        });
    }
    if let Some(author) = param(&params, "author") {
        list.filters.push(Filter::eq("author", author));
    }
    fetch_page(state.store.as_ref(), BlogPosts::TABLE, BlogPosts::SELECT, &list).await
}

async fn get_blog_post(
    State(state): State<SharedState>,
    Path(slug): Path<String>,
) -> Result<ApiResponse<Row>, ApiError> {
    let query = TableQuery::new()
        .eq("slug", slug)
        .eq("status", "published");
    let row = state
        .store
        .find_one(BlogPosts::TABLE, query)
        .await?
        .ok_or_else(|| ApiError::not_found(BlogPosts::NAME))?;
    Ok(ApiResponse::ok(row))
}

async fn list_banners(
    State(state): State<SharedState>,
    Query(params): Params,
) -> Result<ApiResponse<Vec<Row>>, ApiError> {
    let mut query = TableQuery::new()
        .eq("is_active", "true")
        .order(Banners::DEFAULT_ORDER);
    if let Some(placement) = param(&params, "placement") {
        query = query.eq("placement", placement);
    }

    let now = Utc::now();
    let page = state.store.select(Banners::TABLE, &query).await?;
    let live = page.rows.into_iter().filter(|row| is_live(row, now)).collect();
    Ok(ApiResponse::ok(live))
}

async fn list_faqs(
    State(state): State<SharedState>,
    Query(params): Params,
) -> Result<ApiResponse<Vec<Row>>, ApiError> {
    let mut query = TableQuery::new()
        .eq("is_active", "true")
        .order(Faqs::DEFAULT_ORDER);
    if let Some(category) = param(&params, "category") {
        query = query.eq("category", category);
    }
    let page = state.store.select(Faqs::TABLE, &query).await?;
    Ok(ApiResponse::ok(page.rows))
}

async fn list_plans(State(state): State<SharedState>) -> Result<ApiResponse<Vec<Row>>, ApiError> {
    let query = TableQuery::new()
        .eq("is_active", "true")
        .order(Plans::DEFAULT_ORDER);
    let page = state.store.select(Plans::TABLE, &query).await?;
    Ok(ApiResponse::ok(page.rows))
}

/// Approved bookings running now, optionally limited to one slot placement.
async fn list_ads(
    State(state): State<SharedState>,
    Query(params): Params,
) -> Result<ApiResponse<Vec<Row>>, ApiError> {
    let mut query = TableQuery::new()
        .select(AdBookings::SELECT)
        .eq("status", "approved")
        .order("starts_at.asc");

    if let Some(placement) = param(&params, "placement") {
        let slots = TableQuery::new()
            .select("id")
            .eq("placement", placement)
            .eq("is_active", "true");
        let slot_ids: Vec<String> = state
            .store
            .select(AdSlots::TABLE, &slots)
            .await?
            .rows
            .iter()
            .filter_map(|row| row.get("id").and_then(Value::as_str).map(str::to_owned))
            .collect();
        if slot_ids.is_empty() {
            return Ok(ApiResponse::ok(Vec::new()));
        }
        query = query.filter(Filter::In("slot_id".into(), slot_ids));
    }

    let now = Utc::now();
    let page = state.store.select(AdBookings::TABLE, &query).await?;
    let running = page.rows.into_iter().filter(|row| is_live(row, now)).collect();
    Ok(ApiResponse::ok(running))
}

#[derive(Debug, Serialize)]
struct AppConfig {
    flags: Map<String, Value>,
    config: Map<String, Value>,
}

async fn app_config(State(state): State<SharedState>) -> Result<ApiResponse<AppConfig>, ApiError> {
    let flags_query = TableQuery::new().select("key,is_enabled");
    let config_query = TableQuery::new().select("key,value");
    let (flags, config) = futures::try_join!(
        state.store.select(FeatureFlags::TABLE, &flags_query),
        state.store.select(remote_config::TABLE, &config_query),
    )?;

    let keyed = |rows: Vec<Row>, column: &str| -> Map<String, Value> {
        rows.into_iter()
            .filter_map(|mut row| {
                let key = row.get("key").and_then(Value::as_str)?.to_string();
                let value = row.remove(column).unwrap_or(Value::Null);
                Some((key, value))
            })
            .collect()
    };

    let mut flags = keyed(flags.rows, "is_enabled");
    for value in flags.values_mut() {
        *value = Value::Bool(value.as_bool().unwrap_or(false));
    }

    Ok(ApiResponse::ok(AppConfig {
        flags,
        config: keyed(config.rows, "value"),
    }))
}

/// Validates a public form, rejects blacklisted senders and stores it.
async fn submit<R: Resource>(
    state: &SharedState,
    payload: R::Create,
) -> Result<ApiResponse<Row>, ApiError> {
    let row = payload.into_row()?;
    let email = row.get("email").and_then(Value::as_str);
    let phone = row.get("phone").and_then(Value::as_str);

    if is_blocked(state.store.as_ref(), email, phone).await? {
        tracing::warn!(table = R::TABLE, "submission from blacklisted contact rejected");
        return Err(ApiError::Forbidden(
            "Your submission could not be accepted".to_string(),
        ));
    }

    let created = state.store.insert(R::TABLE, row).await?;
    tracing::info!(table = R::TABLE, id = ?created.get("id"), "public submission stored");
    Ok(ApiResponse::created(created).message(format!("{} submitted successfully", R::NAME)))
}

async fn submit_enquiry(
    State(state): State<SharedState>,
    ApiJson(body): ApiJson<NewEnquiry>,
) -> Result<ApiResponse<Row>, ApiError> {
    submit::<Enquiries>(&state, body).await
}

async fn submit_tenant_requirement(
    State(state): State<SharedState>,
    ApiJson(body): ApiJson<NewTenantRequirement>,
) -> Result<ApiResponse<Row>, ApiError> {
    submit::<TenantRequirements>(&state, body).await
}

async fn submit_support_message(
    State(state): State<SharedState>,
    ApiJson(body): ApiJson<NewSupportMessage>,
) -> Result<ApiResponse<Row>, ApiError> {
    submit::<SupportMessages>(&state, body).await
}

pub fn public_routes() -> Router<SharedState> {
    Router::new()
        .route("/properties", get(list_properties))
        .route("/properties/{id}", get(get_property))
        .route("/blog", get(list_blog))
        .route("/blog/{slug}", get(get_blog_post))
        .route("/banners", get(list_banners))
        .route("/faqs", get(list_faqs))
        .route("/plans", get(list_plans))
        .route("/ads", get(list_ads))
        .route("/config", get(app_config))
        .route("/enquiries", post(submit_enquiry))
        .route("/tenant-requirements", post(submit_tenant_requirement))
        .route("/support", post(submit_support_message))
}
