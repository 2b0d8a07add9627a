use serde::{Deserialize, Serialize};

use super::{required, to_patch, to_row, trimmed, validate_window, Payload, Resource};
use crate::error::ApiError;
use crate::supabase::Row;

pub struct Banners;

impl Resource for Banners {
    const TABLE: &'static str = "banners";
    const NAME: &'static str = "Banner";
    const DEFAULT_ORDER: &'static str = "position.asc";
    const SEARCH_COLUMNS: &'static [&'static str] = &["title"];
    const FILTER_COLUMNS: &'static [&'static str] = &["placement", "is_active"];
    const TOGGLE_COLUMN: Option<&'static str> = Some("is_active");

    type Create = NewBanner;
    type Update = BannerUpdate;
}

fn default_placement() -> String {
    "home_hero".to_string()
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Deserialize, Serialize)]
pub struct NewBanner {
    pub title: Option<String>,
    pub subtitle: Option<String>,
    pub image_url: String,
    pub link_url: Option<String>,
    #[serde(default = "default_placement")]
    pub placement: String,
    #[serde(default)]
    pub position: i32,
    #[serde(default = "default_true")]
    pub is_active: bool,
    pub starts_at: Option<String>,
    pub ends_at: Option<String>,
}

impl Payload for NewBanner {
    fn into_row(mut self) -> Result<Row, ApiError> {
        self.image_url = required("image_url", &self.image_url)?;
        self.placement = required("placement", &self.placement)?;
        self.title = trimmed(self.title);
        validate_window(self.starts_at.as_deref(), self.ends_at.as_deref())?;
        to_row(&self)
    }
}

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct BannerUpdate {
    pub title: Option<String>,
    pub subtitle: Option<String>,
    pub image_url: Option<String>,
    pub link_url: Option<String>,
    pub placement: Option<String>,
    pub position: Option<i32>,
    pub is_active: Option<bool>,
    pub starts_at: Option<String>,
    pub ends_at: Option<String>,
}

impl Payload for BannerUpdate {
    fn into_row(mut self) -> Result<Row, ApiError> {
        if let Some(url) = &self.image_url {
            self.image_url = Some(required("image_url", url)?);
        }
        validate_window(self.starts_at.as_deref(), self.ends_at.as_deref())?;
        to_patch(&self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn defaults_and_window() {
        let banner: NewBanner =
            serde_json::from_value(json!({"image_url": "https://cdn.estato.in/b/1.webp"})).unwrap();
        let row = banner.into_row().unwrap();
        assert_eq!(row["placement"], "home_hero");
        assert_eq!(row["position"], 0);
        assert_eq!(row["is_active"], true);

        let inverted: NewBanner = serde_json::from_value(json!({
            "image_url": "https://cdn.estato.in/b/2.webp",
            "starts_at": "2025-05-10",
            "ends_at": "2025-05-01"
        }))
        .unwrap();
        assert!(inverted.into_row().is_err());
    }
}
