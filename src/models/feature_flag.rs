use serde::{Deserialize, Serialize};

use super::{to_patch, to_row, trimmed, Payload, Resource};
use crate::error::ApiError;
use crate::supabase::Row;

pub struct FeatureFlags;

impl Resource for FeatureFlags {
    const TABLE: &'static str = "feature_flags";
    const NAME: &'static str = "Feature flag";
    const DEFAULT_ORDER: &'static str = "key.asc";
    const SEARCH_COLUMNS: &'static [&'static str] = &["key", "description"];
    const FILTER_COLUMNS: &'static [&'static str] = &["is_enabled"];
    const TOGGLE_COLUMN: Option<&'static str> = Some("is_enabled");
    const UNIQUE_COLUMNS: &'static [&'static str] = &["key"];

    type Create = NewFeatureFlag;
    type Update = FeatureFlagUpdate;
}

/// Flag keys are lowercase snake case: `[a-z][a-z0-9_]*`.
pub fn validate_key(key: &str) -> Result<String, ApiError> {
    let key = key.trim();
    let mut chars = key.chars();
    let valid = chars.next().is_some_and(|c| c.is_ascii_lowercase())
        && chars.all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_');
    if !valid {
        return Err(ApiError::bad_request(
            "key must be lowercase snake_case (letters, digits, underscores)",
        ));
    }
    Ok(key.to_string())
}

#[derive(Debug, Deserialize, Serialize)]
pub struct NewFeatureFlag {
    pub key: String,
    pub description: Option<String>,
    #[serde(default)]
    pub is_enabled: bool,
}

impl Payload for NewFeatureFlag {
    fn into_row(mut self) -> Result<Row, ApiError> {
        self.key = validate_key(&self.key)?;
        self.description = trimmed(self.description);
        to_row(&self)
    }
}

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct FeatureFlagUpdate {
    pub description: Option<String>,
    pub is_enabled: Option<bool>,
}

impl Payload for FeatureFlagUpdate {
    fn into_row(self) -> Result<Row, ApiError> {
        to_patch(&self)
    }
}
