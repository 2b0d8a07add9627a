use axum::extract::State;
use futures::future::try_join_all;
use serde_json::{Map, Value};

use crate::app_state::SharedState;
use crate::error::ApiError;
use crate::models::ads::AdBookings;
use crate::models::enquiry::Enquiries;
use crate::models::plan::Subscriptions;
use crate::models::property::Properties;
use crate::models::support::SupportMessages;
use crate::models::tenant_requirement::TenantRequirements;
use crate::models::Resource;
use crate::response::ApiResponse;
use crate::supabase::Filter;

fn counters() -> Vec<(&'static str, &'static str, Vec<Filter>)> {
    vec![
        ("total_properties", Properties::TABLE, vec![]),
        (
            "pending_properties",
            Properties::TABLE,
            vec![Filter::eq("status", "pending")],
        ),
        (
            "active_properties",
            Properties::TABLE,
            vec![Filter::eq("status", "active")],
        ),
        (
            "new_enquiries",
            Enquiries::TABLE,
            vec![Filter::eq("status", "new")],
        ),
        (
            "open_tenant_requirements",
            TenantRequirements::TABLE,
            vec![Filter::eq("status", "open")],
        ),
        (
            "open_support_messages",
            SupportMessages::TABLE,
            vec![Filter::eq("status", "open")],
        ),
        (
            "active_subscriptions",
            Subscriptions::TABLE,
            vec![Filter::eq("status", "active")],
        ),
        (
            "pending_ad_bookings",
            AdBookings::TABLE,
            vec![Filter::eq("status", "pending")],
        ),
    ]
}

pub async fn dashboard_stats(
    State(state): State<SharedState>,
) -> Result<ApiResponse<Map<String, Value>>, ApiError> {
    let counters = counters();
    let counts = try_join_all(
        counters
            .iter()
            .map(|(_, table, filters)| state.store.count(table, filters.clone())),
    )
    .await?;

    let stats = counters
        .iter()
        .zip(counts)
        .map(|((name, _, _), count)| (name.to_string(), Value::from(count)))
        .collect();
    Ok(ApiResponse::ok(stats))
}
