//! Typed payloads for each table, and the `Resource` descriptions the
//! generic admin handlers are built from.

pub mod ads;
pub mod banner;
pub mod blacklist;
pub mod blog;
pub mod enquiry;
pub mod faq;
pub mod feature_flag;
pub mod plan;
pub mod property;
pub mod remote_config;
pub mod support;
pub mod tenant_requirement;

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::error::ApiError;
use crate::supabase::Row;
use crate::utils::parse_timestamp;

/// A request body that validates itself and becomes a row.
pub trait Payload: DeserializeOwned + Send + 'static {
    fn into_row(self) -> Result<Row, ApiError>;
}

/// Describes one admin-managed table.
pub trait Resource: Send + Sync + 'static {
    const TABLE: &'static str;
    /// Singular label used in messages ("Property not found").
    const NAME: &'static str;
    const SELECT: &'static str = "*";
    const DEFAULT_ORDER: &'static str = "created_at.desc";
    const SEARCH_COLUMNS: &'static [&'static str] = &[];
    /// Columns accepted as exact-match query parameters.
    const FILTER_COLUMNS: &'static [&'static str] = &[];
    /// Numeric columns accepted as `min_<col>` / `max_<col>`.
    const RANGE_COLUMNS: &'static [&'static str] = &[];
    const STATUSES: &'static [&'static str] = &[];
    const TOGGLE_COLUMN: Option<&'static str> = None;
    const EXPORT_COLUMNS: &'static [&'static str] = &[];
    /// Columns that must not repeat across rows; checked before insert.
    const UNIQUE_COLUMNS: &'static [&'static str] = &[];
    /// Conflict target when creation is an upsert.
    const UPSERT_ON: Option<&'static str> = None;
    /// False when the resource mounts its own `POST /`.
    const GENERIC_CREATE: bool = true;

    type Create: Payload;
    type Update: Payload;

    /// Extra columns written together with a status change. `current` is the
    /// stored row, empty on create.
    fn on_status_change(_status: &str, _current: &Row, _patch: &mut Row) {}
}

/// Serializes a payload and drops null fields.
pub fn to_row<T: Serialize>(value: &T) -> Result<Row, ApiError> {
    match serde_json::to_value(value) {
        Ok(Value::Object(map)) => Ok(map.into_iter().filter(|(_, v)| !v.is_null()).collect()),
        Ok(_) => Err(ApiError::Internal("payload is not an object".to_string())),
        Err(e) => Err(ApiError::Internal(e.to_string())),
    }
}

/// Like `to_row`, but an update that sets nothing is rejected.
pub fn to_patch<T: Serialize>(value: &T) -> Result<Row, ApiError> {
    let row = to_row(value)?;
    if row.is_empty() {
        return Err(ApiError::bad_request("No fields to update"));
    }
    Ok(row)
}

pub fn required(field: &str, value: &str) -> Result<String, ApiError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ApiError::BadRequest(format!("{} is required", field)));
    }
    Ok(trimmed.to_string())
}

/// Trims an optional string, turning blanks into `None`.
pub fn trimmed(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

pub fn one_of(field: &str, value: &str, allowed: &[&str]) -> Result<String, ApiError> {
    let normalized = value.trim().to_lowercase();
    if allowed.contains(&normalized.as_str()) {
        Ok(normalized)
    } else {
        Err(ApiError::BadRequest(format!(
            "Invalid {}. Must be one of: {}",
            field,
            allowed.join(", ")
        )))
    }
}

pub fn validate_email(value: &str) -> Result<String, ApiError> {
    let email = value.trim().to_lowercase();
    match email.split_once('@') {
        Some((local, domain)) if !local.is_empty() && domain.contains('.') => Ok(email),
        _ => Err(ApiError::bad_request("Invalid email address")),
    }
}

pub fn non_negative(field: &str, value: f64) -> Result<(), ApiError> {
    if value < 0.0 || value.is_nan() {
        return Err(ApiError::BadRequest(format!("{} cannot be negative", field)));
    }
    Ok(())
}

pub fn timestamp(field: &str, value: &str) -> Result<DateTime<Utc>, ApiError> {
    parse_timestamp(value)
        .ok_or_else(|| ApiError::BadRequest(format!("{} must be a valid date", field)))
}

/// Checks an optional `starts_at` / `ends_at` pair.
pub fn validate_window(starts_at: Option<&str>, ends_at: Option<&str>) -> Result<(), ApiError> {
    let start = starts_at.map(|v| timestamp("starts_at", v)).transpose()?;
    let end = ends_at.map(|v| timestamp("ends_at", v)).transpose()?;
    if let (Some(start), Some(end)) = (start, end) {
        if start > end {
            return Err(ApiError::bad_request("starts_at must be before ends_at"));
        }
    }
    Ok(())
}

/// True when `now` falls inside the row's optional `starts_at` / `ends_at` window.
pub fn is_live(row: &Row, now: DateTime<Utc>) -> bool {
    let bound = |column: &str| {
        row.get(column)
            .and_then(Value::as_str)
            .and_then(parse_timestamp)
    };
    let started = bound("starts_at").map_or(true, |start| start <= now);
    let not_ended = bound("ends_at").map_or(true, |end| end >= now);
    started && not_ended
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn one_of_normalizes_and_lists_choices() {
        assert_eq!(one_of("status", " Active ", &["active", "sold"]).unwrap(), "active");
        let err = one_of("status", "gone", &["active", "sold"]).unwrap_err();
        assert_eq!(err.to_string(), "Invalid status. Must be one of: active, sold");
    }

    #[test]
    fn email_validation() {
        assert_eq!(validate_email(" Priya@Example.COM ").unwrap(), "priya@example.com");
        assert!(validate_email("priya").is_err());
        assert!(validate_email("@example.com").is_err());
        assert!(validate_email("priya@localhost").is_err());
    }

    #[test]
    fn window_validation() {
        assert!(validate_window(Some("2025-01-01"), Some("2025-02-01")).is_ok());
        assert!(validate_window(None, Some("2025-02-01")).is_ok());
        assert!(validate_window(Some("2025-03-01"), Some("2025-02-01")).is_err());
        assert!(validate_window(Some("soon"), None).is_err());
    }

    #[test]
    fn live_window() {
        let now = parse_timestamp("2025-06-15T12:00:00Z").unwrap();
        let row = |v: serde_json::Value| v.as_object().cloned().unwrap();

        assert!(is_live(&row(json!({})), now));
        assert!(is_live(&row(json!({"starts_at": "2025-06-01", "ends_at": null})), now));
        assert!(!is_live(&row(json!({"starts_at": "2025-07-01"})), now));
        assert!(!is_live(&row(json!({"ends_at": "2025-06-14T23:59:59Z"})), now));
    }

    #[test]
    fn patch_must_set_something() {
        #[derive(Serialize)]
        struct Patch {
            title: Option<String>,
        }
        assert!(to_patch(&Patch { title: None }).is_err());
        assert_eq!(
            to_patch(&Patch { title: Some("x".into()) }).unwrap()["title"],
            "x"
        );
    }
}
