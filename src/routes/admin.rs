use axum::extract::{Path, State};
use axum::routing::{get, post};
use axum::{Extension, Router};
use chrono::Utc;

use super::dashboard::dashboard_stats;
use super::resource::resource_routes;
use super::upload::upload_routes;
use crate::app_state::SharedState;
use crate::auth::AuthUser;
use crate::error::ApiError;
use crate::models::ads::{AdBookings, AdSlots, NewAdBooking};
use crate::models::banner::Banners;
use crate::models::blacklist::Blacklist;
use crate::models::blog::BlogPosts;
use crate::models::enquiry::Enquiries;
use crate::models::faq::Faqs;
use crate::models::feature_flag::FeatureFlags;
use crate::models::plan::{NewSubscription, Plans, Subscriptions};
use crate::models::property::Properties;
use crate::models::remote_config::{self, ConfigValue};
use crate::models::support::{SupportMessages, SupportReply};
use crate::models::tenant_requirement::TenantRequirements;
use crate::models::Resource;
use crate::response::{ApiJson, ApiResponse};
use crate::supabase::{Filter, Row, TableQuery};

async fn me(Extension(user): Extension<AuthUser>) -> ApiResponse<AuthUser> {
    ApiResponse::ok(user)
}

async fn list_remote_config(
    State(state): State<SharedState>,
) -> Result<ApiResponse<Vec<Row>>, ApiError> {
    let page = state
        .store
        .select(remote_config::TABLE, &TableQuery::new().order("key.asc"))
        .await?;
    Ok(ApiResponse::ok(page.rows))
}

async fn get_remote_config(
    State(state): State<SharedState>,
    Path(key): Path<String>,
) -> Result<ApiResponse<Row>, ApiError> {
    let row = state
        .store
        .find_one(remote_config::TABLE, TableQuery::new().eq("key", key))
        .await?
        .ok_or_else(|| ApiError::not_found("Config key"))?;
    Ok(ApiResponse::ok(row))
}

async fn put_remote_config(
    State(state): State<SharedState>,
    Path(key): Path<String>,
    ApiJson(body): ApiJson<ConfigValue>,
) -> Result<ApiResponse<Row>, ApiError> {
    let row = body.into_row(&key)?;
    let saved = state.store.upsert(remote_config::TABLE, row, "key").await?;
    tracing::info!(%key, "remote config saved");
    Ok(ApiResponse::ok(saved).message("Config saved successfully"))
}

async fn delete_remote_config(
    State(state): State<SharedState>,
    Path(key): Path<String>,
) -> Result<ApiResponse<()>, ApiError> {
    let removed = state
        .store
        .delete(remote_config::TABLE, &[Filter::eq("key", key.clone())])
        .await?;
    if removed.is_empty() {
        return Err(ApiError::not_found("Config key"));
    }
    tracing::info!(%key, "remote config deleted");
    Ok(ApiResponse::done("Config deleted successfully"))
}

fn remote_config_routes() -> Router<SharedState> {
    Router::new().route("/", get(list_remote_config)).route(
        "/{key}",
        get(get_remote_config)
            .put(put_remote_config)
            .delete(delete_remote_config),
    )
}

async fn create_subscription(
    State(state): State<SharedState>,
    ApiJson(body): ApiJson<NewSubscription>,
) -> Result<ApiResponse<Row>, ApiError> {
    let query = TableQuery::new().eq("id", body.plan_id.trim());
    let plan = state
        .store
        .find_one(Plans::TABLE, query)
        .await?
        .ok_or_else(|| ApiError::not_found(Plans::NAME))?;

    let row = body.activate(&plan, Utc::now())?;
    let created = state.store.insert(Subscriptions::TABLE, row).await?;
    tracing::info!(id = ?created.get("id"), "subscription activated");

    Ok(ApiResponse::created(created).message("Subscription created successfully"))
}

async fn create_ad_booking(
    State(state): State<SharedState>,
    ApiJson(body): ApiJson<NewAdBooking>,
) -> Result<ApiResponse<Row>, ApiError> {
    let query = TableQuery::new().eq("id", body.slot_id.trim());
    let slot = state
        .store
        .find_one(AdSlots::TABLE, query)
        .await?
        .ok_or_else(|| ApiError::not_found(AdSlots::NAME))?;

    let row = body.price_against(&slot)?;
    let created = state.store.insert(AdBookings::TABLE, row).await?;
    tracing::info!(id = ?created.get("id"), amount = ?created.get("amount"), "ad booking created");

    Ok(ApiResponse::created(created).message("Ad booking created successfully"))
}

async fn reply_to_support(
    State(state): State<SharedState>,
    Extension(admin): Extension<AuthUser>,
    Path(id): Path<String>,
    ApiJson(body): ApiJson<SupportReply>,
) -> Result<ApiResponse<Row>, ApiError> {
    let patch = body.into_patch(&admin.id)?;
    let row = state
        .store
        .update(SupportMessages::TABLE, &[Filter::eq("id", id.clone())], patch)
        .await?
        .into_iter()
        .next()
        .ok_or_else(|| ApiError::not_found(SupportMessages::NAME))?;
    tracing::info!(%id, admin = %admin.id, "support message answered");

    Ok(ApiResponse::ok(row).message("Reply sent successfully"))
}

/// Everything under `/api/admin`. Authentication layers are applied by the caller.
pub fn admin_routes() -> Router<SharedState> {
    Router::new()
        .route("/me", get(me))
        .route("/dashboard/stats", get(dashboard_stats))
        .merge(upload_routes())
        .nest("/properties", resource_routes::<Properties>())
        .nest("/blog", resource_routes::<BlogPosts>())
        .nest("/banners", resource_routes::<Banners>())
        .nest("/faqs", resource_routes::<Faqs>())
        .nest("/feature-flags", resource_routes::<FeatureFlags>())
        .nest("/remote-config", remote_config_routes())
        .nest("/plans", resource_routes::<Plans>())
        .nest(
            "/subscriptions",
            resource_routes::<Subscriptions>().route("/", post(create_subscription)),
        )
        .nest("/enquiries", resource_routes::<Enquiries>())
        .nest(
            "/tenant-requirements",
            resource_routes::<TenantRequirements>(),
        )
        .nest("/blacklist", resource_routes::<Blacklist>())
        .nest(
            "/support",
            resource_routes::<SupportMessages>().route("/{id}/reply", post(reply_to_support)),
        )
        .nest("/ad-slots", resource_routes::<AdSlots>())
        .nest(
            "/ad-bookings",
            resource_routes::<AdBookings>().route("/", post(create_ad_booking)),
        )
}
