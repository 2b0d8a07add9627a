use serde::Deserialize;
use serde_json::Value;

use super::{to_row, trimmed};
use crate::error::ApiError;
use crate::supabase::Row;
use crate::utils::now_rfc3339;

pub const TABLE: &str = "remote_config";

/// Body of `PUT /api/admin/remote-config/{key}`.
#[derive(Debug, Deserialize)]
pub struct ConfigValue {
    #[serde(default)]
    pub value: Value,
    pub description: Option<String>,
}

impl ConfigValue {
    pub fn into_row(self, key: &str) -> Result<Row, ApiError> {
        let key = key.trim();
        if key.is_empty() {
            return Err(ApiError::bad_request("key is required"));
        }
        if self.value.is_null() {
            return Err(ApiError::bad_request("value is required"));
        }

        let mut row = to_row(&serde_json::json!({
            "key": key,
            "value": self.value,
            "description": trimmed(self.description),
        }))?;
        row.insert("updated_at".into(), Value::String(now_rfc3339()));
        Ok(row)
    }
}
