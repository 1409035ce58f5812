use chrono::Utc;
use serde_json::{json, Value};
use tracing::{debug, info, warn};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::supabase::SupabaseClient;
use staff_cell::models::{Permission, StaffAccess};

use crate::models::{
    CenterRating, Pagination, RatingError, RatingReport, RatingStatus, RatingSummary,
    ReportRatingRequest, RespondRequest, StaffRatingQuery, StaffResponse, VisibilityRequest,
};
use crate::services::ratings::{RatingService, TABLE};

/// Array columns are rewritten whole; a stale count means another writer got in first.
const MAX_ATTEMPTS: usize = 3;

/// Citizen feedback on reviews, and staff replies and visibility control.
pub struct RatingModeration {
    supabase: SupabaseClient,
    ratings: RatingService,
}

impl RatingModeration {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
            ratings: RatingService::new(config),
        }
    }

    async fn active_rating(&self, rating_id: Uuid, auth_token: &str) -> Result<CenterRating, RatingError> {
        let path = format!("/rest/v1/{}?id=eq.{}&status=eq.active", TABLE, rating_id);
        self.supabase
            .select_one(&path, Some(auth_token))
            .await?
            .ok_or(RatingError::NotFound)
    }

    /// Conditional PATCH keyed on a counter; `None` when the counter moved.
    async fn write_if_unchanged(
        &self,
        rating_id: Uuid,
        counter: &str,
        expected: i64,
        patch: Value,
        auth_token: &str,
    ) -> Result<Option<CenterRating>, RatingError> {
        let path = format!("/rest/v1/{}?id=eq.{}&{}=eq.{}", TABLE, rating_id, counter, expected);
        let rows: Vec<CenterRating> = self.supabase.update(&path, Some(auth_token), patch).await?;
        Ok(rows.into_iter().next())
    }

    /// Idempotent per user; returns the new helpful count.
    pub async fn mark_helpful(&self, user_id: Uuid, rating_id: Uuid, auth_token: &str) -> Result<i64, RatingError> {
        for _ in 0..MAX_ATTEMPTS {
            let rating = self.active_rating(rating_id, auth_token).await?;
            if rating.user_id == user_id {
                return Err(RatingError::OwnRating);
            }
            if rating.helpful.contains(&user_id) {
                return Ok(rating.helpful_count);
            }

            let mut helpful = rating.helpful.clone();
            helpful.push(user_id);
            let patch = json!({ "helpful": helpful, "helpful_count": helpful.len() });

            if let Some(updated) = self
                .write_if_unchanged(rating_id, "helpful_count", rating.helpful_count, patch, auth_token)
                .await?
            {
                debug!("User {} found rating {} helpful", user_id, rating_id);
                return Ok(updated.helpful_count);
            }
            debug!("Helpful count of rating {} moved, retrying", rating_id);
        }

        warn!("Gave up marking rating {} helpful after {} attempts", rating_id, MAX_ATTEMPTS);
        Err(RatingError::Contended)
    }

    /// One report per user per rating.
    pub async fn report(
        &self,
        user_id: Uuid,
        rating_id: Uuid,
        request: ReportRatingRequest,
        auth_token: &str,
    ) -> Result<(), RatingError> {
        let reason = request.reason()?;

        for _ in 0..MAX_ATTEMPTS {
            let rating = self.active_rating(rating_id, auth_token).await?;
            if rating.reported_by(user_id) {
                return Err(RatingError::AlreadyReported);
            }

            let mut reports = rating.reports.clone();
            reports.push(RatingReport {
                user_id,
                reason: reason.clone(),
                reported_at: Utc::now(),
            });
            let patch = json!({ "reports": reports, "report_count": reports.len() });

            if self
                .write_if_unchanged(rating_id, "report_count", rating.report_count, patch, auth_token)
                .await?
                .is_some()
            {
                info!("Rating {} reported by {}: {}", rating_id, user_id, reason);
                return Ok(());
            }
            debug!("Report count of rating {} moved, retrying", rating_id);
        }

        warn!("Gave up reporting rating {} after {} attempts", rating_id, MAX_ATTEMPTS);
        Err(RatingError::Contended)
    }

    /// Rating filter for the caller's center; admins reach every center.
    fn scoped_path(access: &StaffAccess, rating_id: Uuid) -> String {
        let mut path = format!("/rest/v1/{}?id=eq.{}", TABLE, rating_id);
        if let Some(filter) = access.center_filter() {
            path.push('&');
            path.push_str(&filter);
        }
        path
    }

    pub async fn respond(
        &self,
        access: &StaffAccess,
        rating_id: Uuid,
        request: RespondRequest,
        auth_token: &str,
    ) -> Result<CenterRating, RatingError> {
        access.require(Permission::ManageRatings)?;
        let text = request.text()?;

        let response = StaffResponse {
            text,
            responded_by: access.user_id,
            responded_at: Utc::now(),
        };
        let patch = json!({
            "response": response,
            "updated_at": Utc::now().to_rfc3339(),
        });

        let path = Self::scoped_path(access, rating_id);
        let rows: Vec<CenterRating> = self.supabase.update(&path, Some(auth_token), patch).await?;
        let rating = rows.into_iter().next().ok_or(RatingError::NotFound)?;

        info!("Staff {} responded to rating {}", access.user_id, rating_id);
        Ok(rating)
    }

    pub async fn center_ratings(
        &self,
        access: &StaffAccess,
        query: &StaffRatingQuery,
        auth_token: &str,
    ) -> Result<(Uuid, Vec<CenterRating>, RatingSummary, Pagination), RatingError> {
        access.require(Permission::ViewRatings)?;
        let center_id = access.target_center(query.center_id)?;

        let mut filter = format!("center_id=eq.{}{}", center_id, query.score_filters()?);
        if let Some(status) = query.status_filter()? {
            filter.push_str(&format!("&status=eq.{}", status.as_str()));
        }

        let count_path = format!("/rest/v1/{}?select=id&{}", TABLE, filter);
        let ids: Vec<Value> = self.supabase.select(&count_path, Some(auth_token)).await?;

        let (page, limit) = (query.page(), query.limit());
        let offset = (page - 1) * limit;
        let path = format!(
            "/rest/v1/{}?{}&order=created_at.desc&limit={}&offset={}",
            TABLE, filter, limit, offset
        );

        debug!("Staff {} listing ratings of center {} page {}", access.user_id, center_id, page);
        let ratings: Vec<CenterRating> = self.supabase.select(&path, Some(auth_token)).await?;
        let summary = self.ratings.summary(center_id, Some(auth_token)).await?;

        Ok((center_id, ratings, summary, Pagination::new(page, limit, ids.len())))
    }

    /// Hide or show a review. Staff cannot touch one an admin removed.
    pub async fn set_visibility(
        &self,
        access: &StaffAccess,
        rating_id: Uuid,
        request: VisibilityRequest,
        auth_token: &str,
    ) -> Result<CenterRating, RatingError> {
        access.require(Permission::ManageRatings)?;
        let status = request.target(access.is_admin())?;

        let mut path = Self::scoped_path(access, rating_id);
        if !access.is_admin() {
            path.push_str(&format!("&status=neq.{}", RatingStatus::Removed.as_str()));
        }

        let patch = json!({
            "status": status,
            "updated_at": Utc::now().to_rfc3339(),
        });
        let rows: Vec<CenterRating> = self.supabase.update(&path, Some(auth_token), patch).await?;
        let rating = rows.into_iter().next().ok_or(RatingError::NotFound)?;

        info!("Rating {} set to {} by {}", rating_id, status.as_str(), access.user_id);
        self.ratings.refresh_center_average(rating.center_id, auth_token).await;
        Ok(rating)
    }
}
