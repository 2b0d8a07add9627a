use serde::{Deserialize, Serialize};

use super::{one_of, required, to_patch, to_row, trimmed, validate_email, Payload, Resource};
use crate::error::ApiError;
use crate::supabase::Row;

pub const ENQUIRY_STATUSES: &[&str] = &["new", "contacted", "closed", "spam"];

pub struct Enquiries;

impl Resource for Enquiries {
    const TABLE: &'static str = "enquiries";
    const NAME: &'static str = "Enquiry";
    const SELECT: &'static str = "*, property:properties(title,city)";
    const SEARCH_COLUMNS: &'static [&'static str] = &["name", "email", "phone"];
    const FILTER_COLUMNS: &'static [&'static str] = &["status", "property_id"];
    const STATUSES: &'static [&'static str] = ENQUIRY_STATUSES;
    const EXPORT_COLUMNS: &'static [&'static str] = &[
        "id",
        "name",
        "email",
        "phone",
        "property_id",
        "message",
        "status",
        "created_at",
    ];

    type Create = NewEnquiry;
    type Update = EnquiryUpdate;
}

/// A visitor's enquiry about a listing (or a general one without `property_id`).
#[derive(Debug, Deserialize, Serialize)]
pub struct NewEnquiry {
    pub property_id: Option<String>,
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub message: String,
    #[serde(skip_deserializing)]
    pub status: String,
}

impl Payload for NewEnquiry {
    fn into_row(mut self) -> Result<Row, ApiError> {
        self.name = required("name", &self.name)?;
        self.message = required("message", &self.message)?;
        self.email = trimmed(self.email).map(|e| validate_email(&e)).transpose()?;
        self.phone = trimmed(self.phone);
        if self.email.is_none() && self.phone.is_none() {
            return Err(ApiError::bad_request("email or phone is required"));
        }
        self.property_id = trimmed(self.property_id);
        self.status = "new".to_string();
        to_row(&self)
    }
}

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct EnquiryUpdate {
    pub status: Option<String>,
    pub notes: Option<String>,
}

impl Payload for EnquiryUpdate {
    fn into_row(mut self) -> Result<Row, ApiError> {
        if let Some(status) = &self.status {
            self.status = Some(one_of("status", status, ENQUIRY_STATUSES)?);
        }
        to_patch(&self)
    }
}
