use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use shared_models::error::AppError;

pub const DEFAULT_PAGE_SIZE: u32 = 10;
pub const MAX_PAGE_SIZE: u32 = 50;
pub const MAX_PAGE: u32 = 10_000;
pub const DEFAULT_LATEST_COUNT: u32 = 5;
pub const MAX_LATEST_COUNT: u32 = 20;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum NewsCategory {
    Announcement,
    Update,
    Alert,
    #[default]
    General,
}

impl NewsCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            NewsCategory::Announcement => "announcement",
            NewsCategory::Update => "update",
            NewsCategory::Alert => "alert",
            NewsCategory::General => "general",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct News {
    pub id: Uuid,
    pub title: String,
    pub content: String,
    pub summary: String,
    pub category: NewsCategory,
    #[serde(default)]
    pub is_published: bool,
    pub publish_date: DateTime<Utc>,
    #[serde(default)]
    pub view_count: i64,
    pub created_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// The homepage ticker only needs these.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewsHeadline {
    pub id: Uuid,
    pub title: String,
    pub summary: String,
    pub category: NewsCategory,
    pub publish_date: DateTime<Utc>,
}

#[derive(Debug, Default, Deserialize)]
pub struct NewsQuery {
    pub page: Option<u32>,
    pub limit: Option<u32>,
    pub category: Option<NewsCategory>,
}

impl NewsQuery {
    pub fn page(&self) -> u32 {
        self.page.unwrap_or(1).clamp(1, MAX_PAGE)
    }

    pub fn limit(&self) -> u32 {
        self.limit.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE)
    }
}

/// Unparseable counts fall back to the default.
pub fn latest_count(raw: &str) -> u32 {
    raw.trim()
        .parse::<u32>()
        .ok()
        .filter(|n| *n > 0)
        .unwrap_or(DEFAULT_LATEST_COUNT)
        .min(MAX_LATEST_COUNT)
}

#[derive(Debug, Serialize)]
pub struct Pagination {
    pub page: u32,
    pub limit: u32,
    pub total: usize,
    pub total_pages: usize,
    pub has_next: bool,
    pub has_prev: bool,
}

impl Pagination {
    pub fn new(page: u32, limit: u32, total: usize) -> Self {
        let total_pages = total.div_ceil(limit.max(1) as usize);
        Self {
            page,
            limit,
            total,
            total_pages,
            has_next: (page as usize) < total_pages,
            has_prev: page > 1,
        }
    }
}

fn required(value: Option<String>, field: &str) -> Result<String, NewsError> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .ok_or_else(|| NewsError::ValidationError(format!("{} is required", field)))
}

#[derive(Debug, Deserialize)]
pub struct CreateNewsRequest {
    pub title: Option<String>,
    pub content: Option<String>,
    pub summary: Option<String>,
    pub category: Option<NewsCategory>,
    #[serde(default)]
    pub is_published: bool,
    pub publish_date: Option<DateTime<Utc>>,
}

/// A validated article ready to insert.
#[derive(Debug, Serialize)]
pub struct NewArticle {
    pub title: String,
    pub content: String,
    pub summary: String,
    pub category: NewsCategory,
    pub is_published: bool,
    pub publish_date: DateTime<Utc>,
}

impl CreateNewsRequest {
    pub fn validate(self) -> Result<NewArticle, NewsError> {
        Ok(NewArticle {
            title: required(self.title, "title")?,
            content: required(self.content, "content")?,
            summary: required(self.summary, "summary")?,
            category: self
                .category
                .ok_or_else(|| NewsError::ValidationError("category is required".to_string()))?,
            is_published: self.is_published,
            publish_date: self.publish_date.unwrap_or_else(Utc::now),
        })
    }
}

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct UpdateNewsRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<NewsCategory>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_published: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub publish_date: Option<DateTime<Utc>>,
}

impl UpdateNewsRequest {
    pub fn validate(&self) -> Result<(), NewsError> {
        for (field, value) in [
            ("title", &self.title),
            ("content", &self.content),
            ("summary", &self.summary),
        ] {
            if value.as_deref().is_some_and(|v| v.trim().is_empty()) {
                return Err(NewsError::ValidationError(format!("{} cannot be empty", field)));
            }
        }

        let untouched = self.title.is_none()
            && self.content.is_none()
            && self.summary.is_none()
            && self.category.is_none()
            && self.is_published.is_none()
            && self.publish_date.is_none();
        if untouched {
            return Err(NewsError::ValidationError("Nothing to update".to_string()));
        }
        Ok(())
    }
}

#[derive(Error, Debug)]
pub enum NewsError {
    #[error("News not found")]
    NotFound,

    #[error("{0}")]
    ValidationError(String),

    #[error("Database error: {0}")]
    DatabaseError(String),
}

impl From<anyhow::Error> for NewsError {
    fn from(err: anyhow::Error) -> Self {
        NewsError::DatabaseError(err.to_string())
    }
}

impl From<NewsError> for AppError {
    fn from(err: NewsError) -> Self {
        match err {
            NewsError::NotFound => AppError::NotFound(err.to_string()),
            NewsError::ValidationError(msg) => AppError::ValidationError(msg),
            NewsError::DatabaseError(msg) => AppError::Database(msg),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn latest_count_falls_back_and_caps() {
        assert_eq!(latest_count("3"), 3);
        assert_eq!(latest_count("abc"), DEFAULT_LATEST_COUNT);
        assert_eq!(latest_count("0"), DEFAULT_LATEST_COUNT);
        assert_eq!(latest_count("500"), MAX_LATEST_COUNT);
    }

    #[test]
    fn pagination_knows_its_neighbours() {
        let first = Pagination::new(1, 10, 25);
        assert_eq!(first.total_pages, 3);
        assert!(first.has_next && !first.has_prev);

        let last = Pagination::new(3, 10, 25);
        assert!(!last.has_next && last.has_prev);
    }

    #[test]
    fn article_needs_a_summary_and_category() {
        let request = CreateNewsRequest {
            title: Some("Aadhaar camp".into()),
            content: Some("Special enrolment camp this Saturday".into()),
            summary: Some("  ".into()),
            category: Some(NewsCategory::Announcement),
            is_published: true,
            publish_date: None,
        };
        assert_matches!(request.validate(), Err(NewsError::ValidationError(msg)) if msg == "summary is required");

        let request = CreateNewsRequest {
            title: Some("Aadhaar camp".into()),
            content: Some("Special enrolment camp this Saturday".into()),
            summary: Some("Camp on Saturday".into()),
            category: None,
            is_published: false,
            publish_date: None,
        };
        assert_matches!(request.validate(), Err(NewsError::ValidationError(msg)) if msg == "category is required");
    }

    #[test]
    fn empty_update_is_rejected() {
        assert!(UpdateNewsRequest::default().validate().is_err());
        let publish = UpdateNewsRequest { is_published: Some(true), ..Default::default() };
        assert!(publish.validate().is_ok());
        let blank = UpdateNewsRequest { title: Some(" ".into()), ..Default::default() };
        assert!(blank.validate().is_err());
    }

    #[test]
    fn huge_page_is_capped() {
        let query = NewsQuery { page: Some(u32::MAX), limit: Some(1000), category: None };
        assert_eq!(query.page(), MAX_PAGE);
        assert_eq!(query.limit(), MAX_PAGE_SIZE);
    }
}
