use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use shared_models::error::AppError;
use staff_cell::StaffError;

pub const MAX_REVIEW_LENGTH: usize = 500;
pub const MAX_RESPONSE_LENGTH: usize = 500;
pub const MAX_REPORT_REASON_LENGTH: usize = 300;
pub const DEFAULT_PAGE_SIZE: u32 = 10;
pub const DEFAULT_STAFF_PAGE_SIZE: u32 = 20;
pub const MAX_PAGE_SIZE: u32 = 50;
pub const MAX_PAGE: u32 = 10_000;

// ==============================================================================
// RATINGS
// ==============================================================================

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum RatingStatus {
    #[default]
    Active,
    Hidden,
    Removed,
}

impl RatingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RatingStatus::Active => "active",
            RatingStatus::Hidden => "hidden",
            RatingStatus::Removed => "removed",
        }
    }
}

/// A citizen's complaint about a review.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RatingReport {
    pub user_id: Uuid,
    pub reason: String,
    pub reported_at: DateTime<Utc>,
}

/// The center's public reply to a review.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StaffResponse {
    pub text: String,
    pub responded_by: Uuid,
    pub responded_at: DateTime<Utc>,
}

/// Optional per-aspect scores, each 1 to 5.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct CategoryScores {
    pub service_quality: Option<i64>,
    pub staff_behavior: Option<i64>,
    pub wait_time: Option<i64>,
    pub cleanliness: Option<i64>,
    pub facilities: Option<i64>,
}

impl CategoryScores {
    fn named(&self) -> [(&'static str, Option<i64>); 5] {
        [
            ("service_quality", self.service_quality),
            ("staff_behavior", self.staff_behavior),
            ("wait_time", self.wait_time),
            ("cleanliness", self.cleanliness),
            ("facilities", self.facilities),
        ]
    }

    pub fn validate(&self) -> Result<(), RatingError> {
        for (name, score) in self.named() {
            if let Some(score) = score {
                if !(1..=5).contains(&score) {
                    return Err(RatingError::InvalidCategory(name));
                }
            }
        }
        Ok(())
    }

    /// Scores present in `other` replace ours; absent ones are kept.
    pub fn merge(&mut self, other: CategoryScores) {
        self.service_quality = other.service_quality.or(self.service_quality);
        self.staff_behavior = other.staff_behavior.or(self.staff_behavior);
        self.wait_time = other.wait_time.or(self.wait_time);
        self.cleanliness = other.cleanliness.or(self.cleanliness);
        self.facilities = other.facilities.or(self.facilities);
    }
}

/// Row of the `center_ratings` table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CenterRating {
    pub id: Uuid,
    pub center_id: Uuid,
    pub user_id: Uuid,
    pub appointment_id: Option<Uuid>,
    pub rating: i64,
    #[serde(default)]
    pub review: String,
    #[serde(default)]
    pub categories: CategoryScores,
    #[serde(default)]
    pub is_verified: bool,
    #[serde(default)]
    pub status: RatingStatus,
    /// Users who found the review helpful. Only the count is published.
    #[serde(default, skip_serializing)]
    pub helpful: Vec<Uuid>,
    #[serde(default)]
    pub helpful_count: i64,
    /// Reporter identities stay server-side.
    #[serde(default, skip_serializing)]
    pub reports: Vec<RatingReport>,
    #[serde(default)]
    pub report_count: i64,
    #[serde(default)]
    pub response: Option<StaffResponse>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl CenterRating {
    pub fn reported_by(&self, user_id: Uuid) -> bool {
        self.reports.iter().any(|report| report.user_id == user_id)
    }
}

pub fn validate_score(rating: i64) -> Result<(), RatingError> {
    if (1..=5).contains(&rating) {
        Ok(())
    } else {
        Err(RatingError::InvalidRating)
    }
}

pub fn validate_review(review: &str) -> Result<(), RatingError> {
    if review.chars().count() > MAX_REVIEW_LENGTH {
        return Err(RatingError::ReviewTooLong);
    }
    Ok(())
}

// ==============================================================================
// REQUESTS
// ==============================================================================

#[derive(Debug, Deserialize)]
pub struct SubmitRatingRequest {
    pub center_id: Option<Uuid>,
    pub appointment_id: Option<Uuid>,
    pub rating: Option<i64>,
    pub review: Option<String>,
    pub categories: Option<CategoryScores>,
}

impl SubmitRatingRequest {
    /// Checks field ranges and returns the center and score.
    pub fn validate(&self) -> Result<(Uuid, i64), RatingError> {
        let (Some(center_id), Some(rating)) = (self.center_id, self.rating) else {
            return Err(RatingError::MissingFields);
        };
        validate_score(rating)?;
        if let Some(review) = &self.review {
            validate_review(review)?;
        }
        if let Some(categories) = &self.categories {
            categories.validate()?;
        }
        Ok((center_id, rating))
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateRatingRequest {
    pub rating: Option<i64>,
    pub review: Option<String>,
    pub categories: Option<CategoryScores>,
}

impl UpdateRatingRequest {
    pub fn validate(&self) -> Result<(), RatingError> {
        if let Some(rating) = self.rating {
            validate_score(rating)?;
        }
        if let Some(review) = &self.review {
            validate_review(review)?;
        }
        if let Some(categories) = &self.categories {
            categories.validate()?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum RatingSort {
    #[default]
    Recent,
    Highest,
    Lowest,
}

impl RatingSort {
    pub fn order_clause(&self) -> &'static str {
        match self {
            RatingSort::Recent => "created_at.desc",
            RatingSort::Highest => "rating.desc,created_at.desc",
            RatingSort::Lowest => "rating.asc,created_at.desc",
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct RatingListQuery {
    pub page: Option<u32>,
    pub limit: Option<u32>,
    #[serde(default)]
    pub sort: RatingSort,
}

impl RatingListQuery {
    pub fn page(&self) -> u32 {
        self.page.unwrap_or(1).clamp(1, MAX_PAGE)
    }

    pub fn limit(&self) -> u32 {
        self.limit.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE)
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct MyRatingQuery {
    pub appointment_id: Option<Uuid>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ReportRatingRequest {
    pub reason: Option<String>,
}

impl ReportRatingRequest {
    pub fn reason(&self) -> Result<String, RatingError> {
        let reason = self.reason.as_deref().map(str::trim).unwrap_or_default();
        if reason.is_empty() {
            return Err(RatingError::ReportReasonRequired);
        }
        if reason.chars().count() > MAX_REPORT_REASON_LENGTH {
            return Err(RatingError::ReportReasonTooLong);
        }
        Ok(reason.to_string())
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct RespondRequest {
    pub response_text: Option<String>,
}

impl RespondRequest {
    pub fn text(&self) -> Result<String, RatingError> {
        let text = self.response_text.as_deref().map(str::trim).unwrap_or_default();
        if text.is_empty() {
            return Err(RatingError::ResponseRequired);
        }
        if text.chars().count() > MAX_RESPONSE_LENGTH {
            return Err(RatingError::ResponseTooLong);
        }
        Ok(text.to_string())
    }
}

#[derive(Debug, Deserialize)]
pub struct VisibilityRequest {
    pub status: Option<String>,
}

impl VisibilityRequest {
    /// Staff may show or hide a review; removing one is an admin decision.
    pub fn target(&self, is_admin: bool) -> Result<RatingStatus, RatingError> {
        match self.status.as_deref().map(str::trim) {
            Some("active") => Ok(RatingStatus::Active),
            Some("hidden") => Ok(RatingStatus::Hidden),
            Some("removed") if is_admin => Ok(RatingStatus::Removed),
            Some("removed") => Err(RatingError::RemovalRequiresAdmin),
            other => Err(RatingError::InvalidStatus(other.unwrap_or_default().to_string())),
        }
    }
}

/// Moderation listing for a center; `status` is a rating status or `all`.
#[derive(Debug, Default, Deserialize)]
pub struct StaffRatingQuery {
    pub center_id: Option<Uuid>,
    pub page: Option<u32>,
    pub limit: Option<u32>,
    pub status: Option<String>,
    pub min_rating: Option<i64>,
    pub max_rating: Option<i64>,
}

impl StaffRatingQuery {
    pub fn page(&self) -> u32 {
        self.page.unwrap_or(1).clamp(1, MAX_PAGE)
    }

    pub fn limit(&self) -> u32 {
        self.limit.unwrap_or(DEFAULT_STAFF_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE)
    }

    pub fn status_filter(&self) -> Result<Option<RatingStatus>, RatingError> {
        match self.status.as_deref().map(str::trim) {
            None | Some("") | Some("active") => Ok(Some(RatingStatus::Active)),
            Some("hidden") => Ok(Some(RatingStatus::Hidden)),
            Some("removed") => Ok(Some(RatingStatus::Removed)),
            Some("all") => Ok(None),
            Some(other) => Err(RatingError::InvalidStatus(other.to_string())),
        }
    }

    /// PostgREST filters for the score bounds.
    pub fn score_filters(&self) -> Result<String, RatingError> {
        let mut filters = String::new();
        if let Some(min) = self.min_rating {
            validate_score(min)?;
            filters.push_str(&format!("&rating=gte.{}", min));
        }
        if let Some(max) = self.max_rating {
            validate_score(max)?;
            filters.push_str(&format!("&rating=lte.{}", max));
        }
        if let (Some(min), Some(max)) = (self.min_rating, self.max_rating) {
            if min > max {
                return Err(RatingError::InvalidRange);
            }
        }
        Ok(filters)
    }
}

// ==============================================================================
// RESPONSES
// ==============================================================================

#[derive(Debug, Serialize)]
pub struct Pagination {
    pub page: u32,
    pub limit: u32,
    pub total: usize,
    pub total_pages: usize,
}

impl Pagination {
    pub fn new(page: u32, limit: u32, total: usize) -> Self {
        Self {
            page,
            limit,
            total,
            total_pages: total.div_ceil(limit.max(1) as usize),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ScoreRow {
    pub rating: i64,
    #[serde(default)]
    pub categories: CategoryScores,
}

#[derive(Debug, Default, Serialize, PartialEq)]
pub struct CategoryAverages {
    pub service_quality: Option<f64>,
    pub staff_behavior: Option<f64>,
    pub wait_time: Option<f64>,
    pub cleanliness: Option<f64>,
    pub facilities: Option<f64>,
}

/// Aggregate of a center's active ratings.
#[derive(Debug, Serialize, PartialEq)]
pub struct RatingSummary {
    pub average: f64,
    pub total: usize,
    pub distribution: BTreeMap<u8, usize>,
    pub categories: CategoryAverages,
}

fn mean(values: impl Iterator<Item = i64>) -> Option<f64> {
    let (sum, count) = values.fold((0i64, 0usize), |(sum, count), v| (sum + v, count + 1));
    (count > 0).then(|| round_tenth(sum as f64 / count as f64))
}

fn round_tenth(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

impl RatingSummary {
    pub fn from_rows(rows: &[ScoreRow]) -> Self {
        let mut distribution: BTreeMap<u8, usize> = (1..=5).map(|star| (star, 0)).collect();
        for row in rows {
            if let Some(count) = u8::try_from(row.rating).ok().and_then(|star| distribution.get_mut(&star)) {
                *count += 1;
            }
        }

        let categories = CategoryAverages {
            service_quality: mean(rows.iter().filter_map(|r| r.categories.service_quality)),
            staff_behavior: mean(rows.iter().filter_map(|r| r.categories.staff_behavior)),
            wait_time: mean(rows.iter().filter_map(|r| r.categories.wait_time)),
            cleanliness: mean(rows.iter().filter_map(|r| r.categories.cleanliness)),
            facilities: mean(rows.iter().filter_map(|r| r.categories.facilities)),
        };

        Self {
            average: mean(rows.iter().map(|r| r.rating)).unwrap_or(0.0),
            total: rows.len(),
            distribution,
            categories,
        }
    }
}

// ==============================================================================
// ERRORS
// ==============================================================================

#[derive(Error, Debug)]
pub enum RatingError {
    #[error("Center ID and rating are required")]
    MissingFields,

    #[error("Rating must be between 1 and 5")]
    InvalidRating,

    #[error("Review cannot exceed 500 characters")]
    ReviewTooLong,

    #[error("Category score '{0}' must be between 1 and 5")]
    InvalidCategory(&'static str),

    #[error("Completed appointment not found")]
    AppointmentNotFound,

    #[error("You have already rated this appointment")]
    AlreadyRatedAppointment,

    #[error("You have already rated this center")]
    AlreadyRatedCenter,

    #[error("Rating not found")]
    NotFound,

    #[error("Report reason is required")]
    ReportReasonRequired,

    #[error("Report reason cannot exceed 300 characters")]
    ReportReasonTooLong,

    #[error("You have already reported this rating")]
    AlreadyReported,

    #[error("You cannot mark your own rating as helpful")]
    OwnRating,

    #[error("Response text is required")]
    ResponseRequired,

    #[error("Response cannot exceed 500 characters")]
    ResponseTooLong,

    #[error("Invalid status: {0}")]
    InvalidStatus(String),

    #[error("Minimum rating cannot exceed maximum rating")]
    InvalidRange,

    #[error("Rating was changed by someone else; try again")]
    Contended,

    #[error("Only administrators can remove ratings")]
    RemovalRequiresAdmin,

    #[error(transparent)]
    Staff(#[from] StaffError),

    #[error("Database error: {0}")]
    DatabaseError(String),
}

impl From<anyhow::Error> for RatingError {
    fn from(err: anyhow::Error) -> Self {
        RatingError::DatabaseError(err.to_string())
    }
}

impl From<RatingError> for AppError {
    fn from(err: RatingError) -> Self {
        match err {
            RatingError::AppointmentNotFound | RatingError::NotFound => AppError::NotFound(err.to_string()),
            RatingError::AlreadyReported | RatingError::Contended => AppError::Conflict(err.to_string()),
            RatingError::RemovalRequiresAdmin => AppError::Forbidden(err.to_string()),
            RatingError::Staff(inner) => inner.into(),
            RatingError::DatabaseError(msg) => AppError::Database(msg),
            _ => AppError::BadRequest(err.to_string()),
        }
    }
}
