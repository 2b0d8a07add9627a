use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{one_of, required, timestamp, to_patch, to_row, trimmed, Payload, Resource};
use crate::error::ApiError;
use crate::supabase::Row;
use crate::utils::{now_rfc3339, slugify};

pub const BLOG_STATUSES: &[&str] = &["draft", "published", "archived"];

pub struct BlogPosts;

impl Resource for BlogPosts {
    const TABLE: &'static str = "blog_posts";
    const NAME: &'static str = "Blog post";
    const SEARCH_COLUMNS: &'static [&'static str] = &["title", "excerpt"];
    const FILTER_COLUMNS: &'static [&'static str] = &["status", "author"];
    const STATUSES: &'static [&'static str] = BLOG_STATUSES;
    const UNIQUE_COLUMNS: &'static [&'static str] = &["slug"];

    type Create = NewBlogPost;
    type Update = BlogPostUpdate;

    fn on_status_change(status: &str, current: &Row, patch: &mut Row) {
        let already_published =
            current.get("status").and_then(Value::as_str) == Some("published");
        let has_date = current.get("published_at").is_some_and(|v| !v.is_null());
        if status == "published"
            && !already_published
            && !has_date
            && !patch.contains_key("published_at")
        {
            patch.insert("published_at".into(), Value::String(now_rfc3339()));
        }
    }
}

fn default_status() -> String {
    "draft".to_string()
}

fn slug_from(explicit: Option<&str>, title: &str) -> Result<String, ApiError> {
    let slug = slugify(explicit.filter(|s| !s.trim().is_empty()).unwrap_or(title));
    if slug.is_empty() {
        return Err(ApiError::bad_request(
            "slug must contain at least one letter or digit",
        ));
    }
    Ok(slug)
}

#[derive(Debug, Deserialize, Serialize)]
pub struct NewBlogPost {
    pub title: String,
    pub slug: Option<String>,
    pub excerpt: Option<String>,
    pub content: String,
    pub cover_image: Option<String>,
    pub author: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default = "default_status")]
    pub status: String,
    pub published_at: Option<String>,
}

impl Payload for NewBlogPost {
    fn into_row(mut self) -> Result<Row, ApiError> {
        self.title = required("title", &self.title)?;
        self.content = required("content", &self.content)?;
        self.slug = Some(slug_from(self.slug.as_deref(), &self.title)?);
        self.status = one_of("status", &self.status, BLOG_STATUSES)?;
        self.excerpt = trimmed(self.excerpt);
        if let Some(published_at) = &self.published_at {
            timestamp("published_at", published_at)?;
        }

        let mut row = to_row(&self)?;
        BlogPosts::on_status_change(&self.status, &Row::new(), &mut row);
        Ok(row)
    }
}

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct BlogPostUpdate {
    pub title: Option<String>,
    pub slug: Option<String>,
    pub excerpt: Option<String>,
    pub content: Option<String>,
    pub cover_image: Option<String>,
    pub author: Option<String>,
    pub tags: Option<Vec<String>>,
    pub status: Option<String>,
    pub published_at: Option<String>,
}

impl Payload for BlogPostUpdate {
    fn into_row(mut self) -> Result<Row, ApiError> {
        if let Some(title) = &self.title {
            self.title = Some(required("title", title)?);
        }
        if let Some(content) = &self.content {
            self.content = Some(required("content", content)?);
        }
        // an existing post keeps its slug when only the title changes
        if let Some(slug) = &self.slug {
            self.slug = Some(slug_from(Some(slug), "")?);
        }
        if let Some(status) = &self.status {
            self.status = Some(one_of("status", status, BLOG_STATUSES)?);
        }
        if let Some(published_at) = &self.published_at {
            timestamp("published_at", published_at)?;
        }
        to_patch(&self)
    }
}
