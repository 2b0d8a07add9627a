use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use super::{
    non_negative, one_of, required, timestamp, to_patch, to_row, validate_email, validate_window,
    Payload, Resource,
};
use crate::error::ApiError;
use crate::supabase::Row;

pub const BOOKING_STATUSES: &[&str] = &["pending", "approved", "rejected", "expired"];

pub struct AdSlots;

impl Resource for AdSlots {
    const TABLE: &'static str = "ad_slots";
    const NAME: &'static str = "Ad slot";
    const DEFAULT_ORDER: &'static str = "name.asc";
    const SEARCH_COLUMNS: &'static [&'static str] = &["name"];
    const FILTER_COLUMNS: &'static [&'static str] = &["placement", "is_active"];
    const TOGGLE_COLUMN: Option<&'static str> = Some("is_active");

    type Create = NewAdSlot;
    type Update = AdSlotUpdate;
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Deserialize, Serialize)]
pub struct NewAdSlot {
    pub name: String,
    pub placement: String,
    pub price_per_day: f64,
    pub width: Option<i32>,
    pub height: Option<i32>,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

impl Payload for NewAdSlot {
    fn into_row(mut self) -> Result<Row, ApiError> {
        self.name = required("name", &self.name)?;
        self.placement = required("placement", &self.placement)?;
        non_negative("price_per_day", self.price_per_day)?;
        to_row(&self)
    }
}

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct AdSlotUpdate {
    pub name: Option<String>,
    pub placement: Option<String>,
    pub price_per_day: Option<f64>,
    pub width: Option<i32>,
    pub height: Option<i32>,
    pub is_active: Option<bool>,
}

impl Payload for AdSlotUpdate {
    fn into_row(mut self) -> Result<Row, ApiError> {
        if let Some(name) = &self.name {
            self.name = Some(required("name", name)?);
        }
        if let Some(price) = self.price_per_day {
            non_negative("price_per_day", price)?;
        }
        to_patch(&self)
    }
}

pub struct AdBookings;

impl Resource for AdBookings {
    const TABLE: &'static str = "ad_bookings";
    const NAME: &'static str = "Ad booking";
    const SELECT: &'static str = "*, slot:ad_slots(name,placement)";
    const SEARCH_COLUMNS: &'static [&'static str] = &["advertiser_name", "advertiser_email"];
    const FILTER_COLUMNS: &'static [&'static str] = &["status", "slot_id"];
    const STATUSES: &'static [&'static str] = BOOKING_STATUSES;
    const EXPORT_COLUMNS: &'static [&'static str] = &[
        "id",
        "slot_id",
        "advertiser_name",
        "advertiser_email",
        "starts_at",
        "ends_at",
        "amount",
        "status",
        "created_at",
    ];
    const GENERIC_CREATE: bool = false;

    type Create = NewAdBooking;
    type Update = AdBookingUpdate;
}

#[derive(Debug, Deserialize, Serialize)]
pub struct NewAdBooking {
    pub slot_id: String,
    pub advertiser_name: String,
    pub advertiser_email: String,
    pub image_url: String,
    pub link_url: Option<String>,
    pub starts_at: String,
    pub ends_at: String,
}

impl Payload for NewAdBooking {
    fn into_row(mut self) -> Result<Row, ApiError> {
        self.slot_id = required("slot_id", &self.slot_id)?;
        self.advertiser_name = required("advertiser_name", &self.advertiser_name)?;
        self.advertiser_email =
            validate_email(&required("advertiser_email", &self.advertiser_email)?)?;
        self.image_url = required("image_url", &self.image_url)?;
        validate_window(Some(&self.starts_at), Some(&self.ends_at))?;
        to_row(&self)
    }
}

impl NewAdBooking {
    /// Number of booked days, counting both the first and the last day.
    pub fn days(&self) -> Result<i64, ApiError> {
        let start = timestamp("starts_at", &self.starts_at)?.date_naive();
        let end = timestamp("ends_at", &self.ends_at)?.date_naive();
        Ok((end - start).num_days() + 1)
    }

    /// Prices the booking against `slot` and marks it pending review.
    pub fn price_against(self, slot: &Row) -> Result<Row, ApiError> {
        if slot.get("is_active").and_then(Value::as_bool) == Some(false) {
            return Err(ApiError::bad_request("Ad slot is not active"));
        }
        let per_day = slot
            .get("price_per_day")
            .and_then(Value::as_f64)
            .unwrap_or(0.0);
        let days = self.days()?;

        let mut row = self.into_row()?;
        row.insert("amount".into(), json!(per_day * days as f64));
        row.insert("status".into(), json!("pending"));
        Ok(row)
    }
}

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct AdBookingUpdate {
    pub image_url: Option<String>,
    pub link_url: Option<String>,
    pub status: Option<String>,
}

impl Payload for AdBookingUpdate {
    fn into_row(mut self) -> Result<Row, ApiError> {
        if let Some(status) = &self.status {
            self.status = Some(one_of("status", status, BOOKING_STATUSES)?);
        }
        to_patch(&self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn booking(starts_at: &str, ends_at: &str) -> NewAdBooking {
        NewAdBooking {
            slot_id: "slot-1".into(),
            advertiser_name: "Skyline Builders".into(),
            advertiser_email: "ads@skyline.example".into(),
            image_url: "https://cdn.estato.in/ads/skyline.webp".into(),
            link_url: None,
            starts_at: starts_at.into(),
            ends_at: ends_at.into(),
        }
    }

    #[test]
    fn amount_counts_inclusive_days() {
        let slot = json!({"id": "slot-1", "price_per_day": 1500.0, "is_active": true});
        let row = booking("2025-04-01", "2025-04-10")
            .price_against(slot.as_object().unwrap())
            .unwrap();
        assert_eq!(row["amount"], 15000.0);
        assert_eq!(row["status"], "pending");

        let same_day = booking("2025-04-01T09:00:00Z", "2025-04-01T18:00:00Z");
        assert_eq!(same_day.days().unwrap(), 1);
    }

    #[test]
    fn rejects_inactive_slot_and_inverted_dates() {
        let inactive = json!({"id": "slot-1", "price_per_day": 10.0, "is_active": false});
        assert!(booking("2025-04-01", "2025-04-02")
            .price_against(inactive.as_object().unwrap())
            .is_err());

        let slot = json!({"id": "slot-1", "price_per_day": 10.0});
        assert!(booking("2025-04-05", "2025-04-02")
            .price_against(slot.as_object().unwrap())
            .is_err());
    }
}
