use serde::{Deserialize, Serialize};
use serde_json::json;

use super::{one_of, required, to_patch, to_row, trimmed, validate_email, Payload, Resource};
use crate::error::ApiError;
use crate::supabase::Row;
use crate::utils::now_rfc3339;

pub const SUPPORT_STATUSES: &[&str] = &["open", "in_progress", "resolved", "closed"];

pub struct SupportMessages;

impl Resource for SupportMessages {
    const TABLE: &'static str = "support_messages";
    const NAME: &'static str = "Support message";
    const SEARCH_COLUMNS: &'static [&'static str] = &["name", "email", "subject"];
    const FILTER_COLUMNS: &'static [&'static str] = &["status"];
    const STATUSES: &'static [&'static str] = SUPPORT_STATUSES;

    type Create = NewSupportMessage;
    type Update = SupportMessageUpdate;
}

#[derive(Debug, Deserialize, Serialize)]
pub struct NewSupportMessage {
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub subject: String,
    pub message: String,
    #[serde(skip_deserializing)]
    pub status: String,
}

impl Payload for NewSupportMessage {
    fn into_row(mut self) -> Result<Row, ApiError> {
        self.name = required("name", &self.name)?;
        self.email = validate_email(&required("email", &self.email)?)?;
        self.subject = required("subject", &self.subject)?;
        self.message = required("message", &self.message)?;
        self.phone = trimmed(self.phone);
        self.status = "open".to_string();
        to_row(&self)
    }
}

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct SupportMessageUpdate {
    pub status: Option<String>,
}

impl Payload for SupportMessageUpdate {
    fn into_row(mut self) -> Result<Row, ApiError> {
        if let Some(status) = &self.status {
            self.status = Some(one_of("status", status, SUPPORT_STATUSES)?);
        }
        to_patch(&self)
    }
}

/// Body of `POST /api/admin/support/{id}/reply`.
#[derive(Debug, Deserialize)]
pub struct SupportReply {
    pub reply: String,
}

impl SupportReply {
    pub fn into_patch(self, admin_id: &str) -> Result<Row, ApiError> {
        let reply = required("reply", &self.reply)?;
        to_row(&json!({
            "admin_reply": reply,
            "replied_at": now_rfc3339(),
            "replied_by": admin_id,
            "status": "resolved",
            "updated_at": now_rfc3339(),
        }))
    }
}
