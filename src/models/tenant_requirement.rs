use serde::{Deserialize, Serialize};

use super::property::PROPERTY_TYPES;
use super::{
    non_negative, one_of, required, timestamp, to_patch, to_row, trimmed, validate_email, Payload,
    Resource,
};
use crate::error::ApiError;
use crate::supabase::Row;

pub const REQUIREMENT_STATUSES: &[&str] = &["open", "matched", "closed"];

pub struct TenantRequirements;

impl Resource for TenantRequirements {
    const TABLE: &'static str = "tenant_requirements";
    const NAME: &'static str = "Tenant requirement";
    const SEARCH_COLUMNS: &'static [&'static str] = &["name", "city", "phone"];
    const FILTER_COLUMNS: &'static [&'static str] = &["status", "city", "property_type"];
    const STATUSES: &'static [&'static str] = REQUIREMENT_STATUSES;
    const EXPORT_COLUMNS: &'static [&'static str] = &[
        "id",
        "name",
        "phone",
        "email",
        "city",
        "localities",
        "property_type",
        "budget_min",
        "budget_max",
        "move_in_date",
        "status",
        "created_at",
    ];

    type Create = NewTenantRequirement;
    type Update = TenantRequirementUpdate;
}

fn check_budget(min: Option<f64>, max: Option<f64>) -> Result<(), ApiError> {
    if let Some(min) = min {
        non_negative("budget_min", min)?;
    }
    if let Some(max) = max {
        non_negative("budget_max", max)?;
    }
    if let (Some(min), Some(max)) = (min, max) {
        if min > max {
            return Err(ApiError::bad_request(
                "budget_min cannot be greater than budget_max",
            ));
        }
    }
    Ok(())
}

#[derive(Debug, Deserialize, Serialize)]
pub struct NewTenantRequirement {
    pub name: String,
    pub phone: String,
    pub email: Option<String>,
    pub city: String,
    #[serde(default)]
    pub localities: Vec<String>,
    pub property_type: Option<String>,
    pub budget_min: Option<f64>,
    pub budget_max: Option<f64>,
    pub move_in_date: Option<String>,
    pub notes: Option<String>,
    #[serde(skip_deserializing)]
    pub status: String,
}

impl Payload for NewTenantRequirement {
    fn into_row(mut self) -> Result<Row, ApiError> {
        self.name = required("name", &self.name)?;
        self.phone = required("phone", &self.phone)?;
        self.city = required("city", &self.city)?;
        self.email = trimmed(self.email).map(|e| validate_email(&e)).transpose()?;
        self.property_type = trimmed(self.property_type)
            .map(|t| one_of("property_type", &t, PROPERTY_TYPES))
            .transpose()?;
        if let Some(date) = &self.move_in_date {
            timestamp("move_in_date", date)?;
        }
        check_budget(self.budget_min, self.budget_max)?;
        self.localities = self
            .localities
            .into_iter()
            .map(|l| l.trim().to_string())
            .filter(|l| !l.is_empty())
            .collect();
        self.status = "open".to_string();
        to_row(&self)
    }
}

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct TenantRequirementUpdate {
    pub status: Option<String>,
    pub notes: Option<String>,
    pub budget_min: Option<f64>,
    pub budget_max: Option<f64>,
    pub localities: Option<Vec<String>>,
}

impl Payload for TenantRequirementUpdate {
    fn into_row(mut self) -> Result<Row, ApiError> {
        if let Some(status) = &self.status {
            self.status = Some(one_of("status", status, REQUIREMENT_STATUSES)?);
        }
        check_budget(self.budget_min, self.budget_max)?;
        to_patch(&self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn budget_order_is_checked() {
        let req: NewTenantRequirement = serde_json::from_value(json!({
            "name": "Meera", "phone": "+919811111111", "city": "Pune",
            "budget_min": 40000, "budget_max": 25000
        }))
        .unwrap();
        assert!(req.into_row().is_err());
    }

    #[test]
    fn cleans_localities_and_opens() {
        let req: NewTenantRequirement = serde_json::from_value(json!({
            "name": "Meera", "phone": "+919811111111", "city": "Pune",
            "localities": [" Baner ", "", "Aundh"], "property_type": "Apartment"
        }))
        .unwrap();
        let row = req.into_row().unwrap();
        assert_eq!(row["localities"], json!(["Baner", "Aundh"]));
        assert_eq!(row["property_type"], "apartment");
        assert_eq!(row["status"], "open");
    }
}
