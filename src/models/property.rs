use serde::{Deserialize, Serialize};

use super::{non_negative, one_of, required, to_patch, to_row, trimmed, Payload, Resource};
use crate::error::ApiError;
use crate::supabase::Row;

pub const PROPERTY_TYPES: &[&str] = &["apartment", "house", "villa", "plot", "commercial", "pg"];
pub const LISTING_TYPES: &[&str] = &["sale", "rent"];
pub const PROPERTY_STATUSES: &[&str] =
    &["pending", "active", "rejected", "sold", "rented", "inactive"];

pub struct Properties;

impl Resource for Properties {
    const TABLE: &'static str = "properties";
    const NAME: &'static str = "Property";
    const SEARCH_COLUMNS: &'static [&'static str] = &["title", "city", "locality"];
    const FILTER_COLUMNS: &'static [&'static str] = &[
        "status",
        "city",
        "property_type",
        "listing_type",
        "owner_id",
        "is_featured",
    ];
    const RANGE_COLUMNS: &'static [&'static str] = &["price"];
    const STATUSES: &'static [&'static str] = PROPERTY_STATUSES;
    const TOGGLE_COLUMN: Option<&'static str> = Some("is_featured");
    const EXPORT_COLUMNS: &'static [&'static str] = &[
        "id",
        "title",
        "property_type",
        "listing_type",
        "price",
        "city",
        "locality",
        "bedrooms",
        "bathrooms",
        "area_sqft",
        "status",
        "is_featured",
        "created_at",
    ];

    type Create = NewProperty;
    type Update = PropertyUpdate;
}

fn default_status() -> String {
    "pending".to_string()
}

#[derive(Debug, Deserialize, Serialize)]
pub struct NewProperty {
    pub title: String,
    pub description: Option<String>,
    pub property_type: String,
    pub listing_type: String,
    pub price: f64,
    pub city: String,
    pub locality: Option<String>,
    pub address: Option<String>,
    pub bedrooms: Option<i32>,
    pub bathrooms: Option<i32>,
    pub area_sqft: Option<f64>,
    #[serde(default)]
    pub amenities: Vec<String>,
    #[serde(default)]
    pub images: Vec<String>,
    pub owner_id: Option<String>,
    pub contact_name: Option<String>,
    pub contact_phone: Option<String>,
    #[serde(default = "default_status")]
    pub status: String,
    #[serde(default)]
    pub is_featured: bool,
}

fn check_rooms(bedrooms: Option<i32>, bathrooms: Option<i32>) -> Result<(), ApiError> {
    if bedrooms.is_some_and(|n| n < 0) {
        return Err(ApiError::bad_request("bedrooms cannot be negative"));
    }
    if bathrooms.is_some_and(|n| n < 0) {
        return Err(ApiError::bad_request("bathrooms cannot be negative"));
    }
    Ok(())
}

fn check_price(price: f64) -> Result<(), ApiError> {
    if price.is_nan() || price <= 0.0 {
        return Err(ApiError::bad_request("price must be greater than 0"));
    }
    Ok(())
}

impl Payload for NewProperty {
    fn into_row(mut self) -> Result<Row, ApiError> {
        self.title = required("title", &self.title)?;
        self.city = required("city", &self.city)?;
        self.property_type = one_of("property_type", &self.property_type, PROPERTY_TYPES)?;
        self.listing_type = one_of("listing_type", &self.listing_type, LISTING_TYPES)?;
        self.status = one_of("status", &self.status, PROPERTY_STATUSES)?;
        check_price(self.price)?;
        check_rooms(self.bedrooms, self.bathrooms)?;
        if let Some(area) = self.area_sqft {
            non_negative("area_sqft", area)?;
        }
        self.locality = trimmed(self.locality);
        to_row(&self)
    }
}

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct PropertyUpdate {
    pub title: Option<String>,
    pub description: Option<String>,
    pub property_type: Option<String>,
    pub listing_type: Option<String>,
    pub price: Option<f64>,
    pub city: Option<String>,
    pub locality: Option<String>,
    pub address: Option<String>,
    pub bedrooms: Option<i32>,
    pub bathrooms: Option<i32>,
    pub area_sqft: Option<f64>,
    pub amenities: Option<Vec<String>>,
    pub images: Option<Vec<String>>,
    pub contact_name: Option<String>,
    pub contact_phone: Option<String>,
    pub status: Option<String>,
    pub is_featured: Option<bool>,
}

impl Payload for PropertyUpdate {
    fn into_row(mut self) -> Result<Row, ApiError> {
        if let Some(title) = &self.title {
            self.title = Some(required("title", title)?);
        }
        if let Some(city) = &self.city {
            self.city = Some(required("city", city)?);
        }
        if let Some(kind) = &self.property_type {
            self.property_type = Some(one_of("property_type", kind, PROPERTY_TYPES)?);
        }
        if let Some(kind) = &self.listing_type {
            self.listing_type = Some(one_of("listing_type", kind, LISTING_TYPES)?);
        }
        if let Some(status) = &self.status {
            self.status = Some(one_of("status", status, PROPERTY_STATUSES)?);
        }
        if let Some(price) = self.price {
            check_price(price)?;
        }
        if let Some(area) = self.area_sqft {
            non_negative("area_sqft", area)?;
        }
        check_rooms(self.bedrooms, self.bathrooms)?;
        to_patch(&self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn new_property(body: serde_json::Value) -> Result<Row, ApiError> {
        serde_json::from_value::<NewProperty>(body).unwrap().into_row()
    }

    #[test]
    fn create_defaults_and_normalizes() {
        let row = new_property(json!({
            "title": "  2BHK near Powai lake ",
            "property_type": "Apartment",
            "listing_type": "RENT",
            "price": 55000,
            "city": "Mumbai",
            "locality": "   ",
        }))
        .unwrap();

        assert_eq!(row["title"], "2BHK near Powai lake");
        assert_eq!(row["property_type"], "apartment");
        assert_eq!(row["listing_type"], "rent");
        assert_eq!(row["status"], "pending");
        assert_eq!(row["is_featured"], false);
        assert!(!row.contains_key("locality"));
        assert!(!row.contains_key("description"));
    }

    #[test]
    fn create_rejects_bad_values() {
        let base = json!({
            "title": "Plot", "property_type": "plot", "listing_type": "sale",
            "price": 100, "city": "Nashik"
        });

        let mut zero_price = base.clone();
        zero_price["price"] = json!(0);
        assert_eq!(
            new_property(zero_price).unwrap_err().to_string(),
            "price must be greater than 0"
        );

        let mut castle = base.clone();
        castle["property_type"] = json!("castle");
        assert!(new_property(castle).is_err());

        let mut rooms = base.clone();
        rooms["bedrooms"] = json!(-1);
        assert!(new_property(rooms).is_err());

        let mut blank = base;
        blank["title"] = json!("  ");
        assert_eq!(new_property(blank).unwrap_err().to_string(), "title is required");
    }

    #[test]
    fn update_only_carries_given_fields() {
        let update: PropertyUpdate =
            serde_json::from_value(json!({"price": 61000, "status": "Rented"})).unwrap();
        let row = update.into_row().unwrap();
        assert_eq!(row.len(), 2);
        assert_eq!(row["status"], "rented");

        assert!(PropertyUpdate::default().into_row().is_err());
    }
}
