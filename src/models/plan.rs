use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use super::{
    non_negative, one_of, required, timestamp, to_patch, to_row, trimmed, Payload, Resource,
};
use crate::error::ApiError;
use crate::supabase::Row;

/// About a hundred years.
pub const MAX_DURATION_DAYS: i32 = 36_500;

pub const SUBSCRIPTION_STATUSES: &[&str] = &["pending", "active", "cancelled", "expired"];

pub struct Plans;

impl Resource for Plans {
    const TABLE: &'static str = "subscription_plans";
    const NAME: &'static str = "Plan";
    const DEFAULT_ORDER: &'static str = "price.asc";
    const SEARCH_COLUMNS: &'static [&'static str] = &["name"];
    const FILTER_COLUMNS: &'static [&'static str] = &["is_active"];
    const TOGGLE_COLUMN: Option<&'static str> = Some("is_active");

    type Create = NewPlan;
    type Update = PlanUpdate;
}

fn default_currency() -> String {
    "INR".to_string()
}

fn default_true() -> bool {
    true
}

fn check_currency(currency: &str) -> Result<String, ApiError> {
    let currency = currency.trim().to_uppercase();
    if currency.len() != 3 || !currency.chars().all(|c| c.is_ascii_uppercase()) {
        return Err(ApiError::bad_request("currency must be a 3-letter ISO code"));
    }
    Ok(currency)
}

fn check_duration(days: i32) -> Result<(), ApiError> {
    if days <= 0 {
        return Err(ApiError::bad_request("duration_days must be greater than 0"));
    }
    if days > MAX_DURATION_DAYS {
        return Err(ApiError::BadRequest(format!(
            "duration_days cannot exceed {}",
            MAX_DURATION_DAYS
        )));
    }
    Ok(())
}

#[derive(Debug, Deserialize, Serialize)]
pub struct NewPlan {
    pub name: String,
    pub description: Option<String>,
    pub price: f64,
    #[serde(default = "default_currency")]
    pub currency: String,
    pub duration_days: i32,
    #[serde(default)]
    pub features: Vec<String>,
    pub max_listings: Option<i32>,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

impl Payload for NewPlan {
    fn into_row(mut self) -> Result<Row, ApiError> {
        self.name = required("name", &self.name)?;
        self.currency = check_currency(&self.currency)?;
        non_negative("price", self.price)?;
        check_duration(self.duration_days)?;
        if self.max_listings.is_some_and(|n| n < 0) {
            return Err(ApiError::bad_request("max_listings cannot be negative"));
        }
        self.description = trimmed(self.description);
        to_row(&self)
    }
}

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct PlanUpdate {
    pub name: Option<String>,
    pub description: Option<String>,
    pub price: Option<f64>,
    pub currency: Option<String>,
    pub duration_days: Option<i32>,
    pub features: Option<Vec<String>>,
    pub max_listings: Option<i32>,
    pub is_active: Option<bool>,
}

impl Payload for PlanUpdate {
    fn into_row(mut self) -> Result<Row, ApiError> {
        if let Some(name) = &self.name {
            self.name = Some(required("name", name)?);
        }
        if let Some(currency) = &self.currency {
            self.currency = Some(check_currency(currency)?);
        }
        if let Some(price) = self.price {
            non_negative("price", price)?;
        }
        if let Some(days) = self.duration_days {
            check_duration(days)?;
        }
        to_patch(&self)
    }
}

pub struct Subscriptions;

impl Resource for Subscriptions {
    const TABLE: &'static str = "subscriptions";
    const NAME: &'static str = "Subscription";
    const SELECT: &'static str = "*, plan:subscription_plans(name,price,duration_days)";
    const FILTER_COLUMNS: &'static [&'static str] = &["status", "user_id", "plan_id"];
    const STATUSES: &'static [&'static str] = SUBSCRIPTION_STATUSES;
    const EXPORT_COLUMNS: &'static [&'static str] = &[
        "id",
        "user_id",
        "plan_id",
        "status",
        "amount",
        "starts_at",
        "ends_at",
        "created_at",
    ];
    const GENERIC_CREATE: bool = false;

    type Create = NewSubscription;
    type Update = SubscriptionUpdate;
}

/// Admin grant of a plan to a user.
#[derive(Debug, Deserialize, Serialize)]
pub struct NewSubscription {
    pub user_id: String,
    pub plan_id: String,
}

impl Payload for NewSubscription {
    fn into_row(mut self) -> Result<Row, ApiError> {
        self.user_id = required("user_id", &self.user_id)?;
        self.plan_id = required("plan_id", &self.plan_id)?;
        to_row(&self)
    }
}

impl NewSubscription {
    /// Builds the subscription row for `plan`, running from `now` for the
    /// plan's duration.
    pub fn activate(self, plan: &Row, now: DateTime<Utc>) -> Result<Row, ApiError> {
        if plan.get("is_active").and_then(Value::as_bool) == Some(false) {
            return Err(ApiError::bad_request("Plan is not active"));
        }
        let days = plan
            .get("duration_days")
            .and_then(Value::as_i64)
            .filter(|days| *days > 0)
            .ok_or_else(|| ApiError::Internal("plan has no valid duration_days".to_string()))?;
        let ends_at = Duration::try_days(days)
            .and_then(|span| now.checked_add_signed(span))
            .ok_or_else(|| ApiError::bad_request("Plan duration is out of range"))?;
        let amount = plan.get("price").cloned().unwrap_or(json!(0));

        let mut row = self.into_row()?;
        row.insert("status".into(), json!("active"));
        row.insert("amount".into(), amount);
        row.insert("starts_at".into(), json!(now.to_rfc3339()));
        row.insert("ends_at".into(), json!(ends_at.to_rfc3339()));
        Ok(row)
    }
}

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct SubscriptionUpdate {
    pub status: Option<String>,
    pub ends_at: Option<String>,
}

impl Payload for SubscriptionUpdate {
    fn into_row(mut self) -> Result<Row, ApiError> {
        if let Some(status) = &self.status {
            self.status = Some(one_of("status", status, SUBSCRIPTION_STATUSES)?);
        }
        if let Some(ends_at) = &self.ends_at {
            timestamp("ends_at", ends_at)?;
        }
        to_patch(&self)
    }
}
