use serde::{Deserialize, Serialize};

use super::{required, to_patch, to_row, Payload, Resource};
use crate::error::ApiError;
use crate::supabase::Row;

pub struct Faqs;

impl Resource for Faqs {
    const TABLE: &'static str = "faqs";
    const NAME: &'static str = "FAQ";
    const DEFAULT_ORDER: &'static str = "position.asc";
    const SEARCH_COLUMNS: &'static [&'static str] = &["question"];
    const FILTER_COLUMNS: &'static [&'static str] = &["category", "is_active"];
    const TOGGLE_COLUMN: Option<&'static str> = Some("is_active");

    type Create = NewFaq;
    type Update = FaqUpdate;
}

fn default_category() -> String {
    "general".to_string()
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Deserialize, Serialize)]
pub struct NewFaq {
    pub question: String,
    pub answer: String,
    #[serde(default = "default_category")]
    pub category: String,
    #[serde(default)]
    pub position: i32,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

impl Payload for NewFaq {
    fn into_row(mut self) -> Result<Row, ApiError> {
        self.question = required("question", &self.question)?;
        self.answer = required("answer", &self.answer)?;
        self.category = self.category.trim().to_lowercase();
        to_row(&self)
    }
}

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct FaqUpdate {
    pub question: Option<String>,
    pub answer: Option<String>,
    pub category: Option<String>,
    pub position: Option<i32>,
    pub is_active: Option<bool>,
}

impl Payload for FaqUpdate {
    fn into_row(mut self) -> Result<Row, ApiError> {
        if let Some(question) = &self.question {
            self.question = Some(required("question", question)?);
        }
        if let Some(answer) = &self.answer {
            self.answer = Some(required("answer", answer)?);
        }
        self.category = self.category.map(|c| c.trim().to_lowercase());
        to_patch(&self)
    }
}
