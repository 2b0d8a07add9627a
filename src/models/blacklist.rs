use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{one_of, required, to_patch, to_row, trimmed, Payload, Resource};
use crate::error::ApiError;
use crate::supabase::{Filter, Row, Store, StoreError, TableQuery};

pub const ENTRY_TYPES: &[&str] = &["phone", "email", "ip"];

pub struct Blacklist;

impl Resource for Blacklist {
    const TABLE: &'static str = "blacklist";
    const NAME: &'static str = "Blacklist entry";
    const SEARCH_COLUMNS: &'static [&'static str] = &["value", "reason"];
    const FILTER_COLUMNS: &'static [&'static str] = &["entry_type"];
    const UPSERT_ON: Option<&'static str> = Some("entry_type,value");

    type Create = NewBlacklistEntry;
    type Update = BlacklistUpdate;
}

pub fn normalize_email(value: &str) -> String {
    value.trim().to_lowercase()
}

/// Digits only, keeping a leading `+`.
pub fn normalize_phone(value: &str) -> String {
    let value = value.trim();
    let digits: String = value.chars().filter(char::is_ascii_digit).collect();
    if value.starts_with('+') {
        format!("+{}", digits)
    } else {
        digits
    }
}

pub fn normalize(entry_type: &str, value: &str) -> String {
    match entry_type {
        "email" => normalize_email(value),
        "phone" => normalize_phone(value),
        _ => value.trim().to_string(),
    }
}

#[derive(Debug, Deserialize, Serialize)]
pub struct NewBlacklistEntry {
    pub entry_type: String,
    pub value: String,
    pub reason: Option<String>,
}

impl Payload for NewBlacklistEntry {
    fn into_row(mut self) -> Result<Row, ApiError> {
        self.entry_type = one_of("entry_type", &self.entry_type, ENTRY_TYPES)?;
        self.value = normalize(&self.entry_type, &required("value", &self.value)?);
        if self.value.is_empty() || self.value == "+" {
            return Err(ApiError::bad_request("value is required"));
        }
        self.reason = trimmed(self.reason);
        to_row(&self)
    }
}

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct BlacklistUpdate {
    pub reason: Option<String>,
}

impl Payload for BlacklistUpdate {
    fn into_row(self) -> Result<Row, ApiError> {
        to_patch(&self)
    }
}

/// True when the email or phone of a public submission is blacklisted.
pub async fn is_blocked(
    store: &dyn Store,
    email: Option<&str>,
    phone: Option<&str>,
) -> Result<bool, StoreError> {
    let mut candidates = Vec::new();
    if let Some(email) = email {
        candidates.push(("email", normalize_email(email)));
    }
    if let Some(phone) = phone {
        candidates.push(("phone", normalize_phone(phone)));
    }
    if candidates.is_empty() {
        return Ok(false);
    }

    let values = candidates.iter().map(|(_, value)| value.clone()).collect();
    let query = TableQuery::new()
        .select("entry_type,value")
        .filter(Filter::In("value".into(), values));
    let page = store.select(Blacklist::TABLE, &query).await?;

    Ok(page.rows.iter().any(|row| {
        let entry_type = row.get("entry_type").and_then(Value::as_str);
        let value = row.get("value").and_then(Value::as_str);
        candidates
            .iter()
            .any(|(kind, candidate)| entry_type == Some(*kind) && value == Some(candidate.as_str()))
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::supabase::MemoryStore;
    use serde_json::json;

    #[test]
    fn normalizes_values() {
        assert_eq!(normalize_phone("+91 98200-00000"), "+919820000000");
        assert_eq!(normalize_phone("(022) 2345 6789"), "02223456789");
        assert_eq!(normalize_email("  Spam@Mail.COM "), "spam@mail.com");
    }

    #[test]
    fn entry_is_normalized_on_create() {
        let entry: NewBlacklistEntry = serde_json::from_value(json!({
            "entry_type": "Phone", "value": "+91 99999 11111", "reason": " broker spam "
        }))
        .unwrap();
        let row = entry.into_row().unwrap();
        assert_eq!(row["entry_type"], "phone");
        assert_eq!(row["value"], "+919999911111");
        assert_eq!(row["reason"], "broker spam");
    }

    #[tokio::test]
    async fn matches_on_type_and_value() {
        let store = MemoryStore::new();
        store
            .seed(
                "blacklist",
                vec![
                    json!({"entry_type": "email", "value": "spam@mail.com"}),
                    json!({"entry_type": "ip", "value": "+919999911111"}),
                ]
                .into_iter()
                .filter_map(|v| v.as_object().cloned())
                .collect(),
            )
            .await;

        assert!(is_blocked(&store, Some("SPAM@mail.com"), None).await.unwrap());
        // same value under a different entry type does not count
        assert!(!is_blocked(&store, None, Some("+91 99999 11111")).await.unwrap());
        assert!(!is_blocked(&store, Some("ok@mail.com"), Some("123")).await.unwrap());
        assert!(!is_blocked(&store, None, None).await.unwrap());
    }
}
