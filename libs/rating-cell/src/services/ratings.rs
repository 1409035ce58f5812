use chrono::Utc;
use serde_json::{json, Value};
use tracing::{debug, info, warn};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::supabase::{is_unique_violation, SupabaseClient};

use crate::models::{
    CenterRating, Pagination, RatingError, RatingListQuery, RatingSummary, ScoreRow,
    SubmitRatingRequest, UpdateRatingRequest,
};

pub(crate) const TABLE: &str = "center_ratings";

/// Citizen ratings of service centers. A rating tied to a completed
/// appointment is verified; each citizen gets one general rating per center.
pub struct RatingService {
    supabase: SupabaseClient,
}

impl RatingService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
        }
    }

    async fn exists(&self, path: &str, auth_token: &str) -> Result<bool, RatingError> {
        let rows: Vec<Value> = self.supabase.select(path, Some(auth_token)).await?;
        Ok(!rows.is_empty())
    }

    pub async fn submit(
        &self,
        user_id: Uuid,
        request: SubmitRatingRequest,
        auth_token: &str,
    ) -> Result<CenterRating, RatingError> {
        let (center_id, score) = request.validate()?;

        let duplicate = match request.appointment_id {
            Some(appointment_id) => {
                let appointment_path = format!(
                    "/rest/v1/appointments?select=id&id=eq.{}&user_id=eq.{}&center_id=eq.{}&status=eq.completed",
                    appointment_id, user_id, center_id
                );
                if !self.exists(&appointment_path, auth_token).await? {
                    warn!("User {} tried to rate appointment {} which is not completed", user_id, appointment_id);
                    return Err(RatingError::AppointmentNotFound);
                }

                let rated_path = format!(
                    "/rest/v1/{}?select=id&appointment_id=eq.{}&user_id=eq.{}",
                    TABLE, appointment_id, user_id
                );
                if self.exists(&rated_path, auth_token).await? {
                    return Err(RatingError::AlreadyRatedAppointment);
                }
                RatingError::AlreadyRatedAppointment
            }
            None => {
                let rated_path = format!(
                    "/rest/v1/{}?select=id&center_id=eq.{}&user_id=eq.{}&appointment_id=is.null",
                    TABLE, center_id, user_id
                );
                if self.exists(&rated_path, auth_token).await? {
                    return Err(RatingError::AlreadyRatedCenter);
                }
                RatingError::AlreadyRatedCenter
            }
        };

        let now = Utc::now().to_rfc3339();
        let body = json!({
            "center_id": center_id,
            "user_id": user_id,
            "appointment_id": request.appointment_id,
            "rating": score,
            "review": request.review.unwrap_or_default(),
            "categories": request.categories.unwrap_or_default(),
            "is_verified": request.appointment_id.is_some(),
            "status": "active",
            "created_at": now,
            "updated_at": now,
        });

        // Unique indexes catch a concurrent duplicate the pre-checks missed
        let rating: CenterRating = self.supabase
            .insert(TABLE, Some(auth_token), body)
            .await
            .map_err(|e| if is_unique_violation(&e) { duplicate } else { RatingError::DatabaseError(e.to_string()) })?;

        info!("User {} rated center {} with {} stars", user_id, center_id, score);
        self.refresh_center_average(center_id, auth_token).await;
        Ok(rating)
    }

    pub async fn list_for_center(
        &self,
        center_id: Uuid,
        query: &RatingListQuery,
    ) -> Result<(Vec<CenterRating>, RatingSummary, Pagination), RatingError> {
        let (page, limit) = (query.page(), query.limit());
        let offset = (page - 1) * limit;
        let path = format!(
            "/rest/v1/{}?center_id=eq.{}&status=eq.active&order={}&limit={}&offset={}",
            TABLE,
            center_id,
            query.sort.order_clause(),
            limit,
            offset
        );

        debug!("Fetching ratings for center {} page {}", center_id, page);
        let ratings: Vec<CenterRating> = self.supabase.select(&path, None).await?;
        let summary = self.summary(center_id, None).await?;
        let pagination = Pagination::new(page, limit, summary.total);

        Ok((ratings, summary, pagination))
    }

    pub async fn summary(&self, center_id: Uuid, auth_token: Option<&str>) -> Result<RatingSummary, RatingError> {
        let path = format!(
            "/rest/v1/{}?select=rating,categories&center_id=eq.{}&status=eq.active",
            TABLE, center_id
        );
        let rows: Vec<ScoreRow> = self.supabase.select(&path, auth_token).await?;
        Ok(RatingSummary::from_rows(&rows))
    }

    pub async fn my_rating(
        &self,
        user_id: Uuid,
        center_id: Uuid,
        appointment_id: Option<Uuid>,
        auth_token: &str,
    ) -> Result<Option<CenterRating>, RatingError> {
        let mut path = format!(
            "/rest/v1/{}?center_id=eq.{}&user_id=eq.{}&order=created_at.desc&limit=1",
            TABLE, center_id, user_id
        );
        if let Some(appointment_id) = appointment_id {
            path.push_str(&format!("&appointment_id=eq.{}", appointment_id));
        }

        Ok(self.supabase.select_one(&path, Some(auth_token)).await?)
    }

    async fn own_rating(&self, user_id: Uuid, rating_id: Uuid, auth_token: &str) -> Result<CenterRating, RatingError> {
        let path = format!("/rest/v1/{}?id=eq.{}&user_id=eq.{}", TABLE, rating_id, user_id);
        self.supabase
            .select_one(&path, Some(auth_token))
            .await?
            .ok_or(RatingError::NotFound)
    }

    pub async fn update(
        &self,
        user_id: Uuid,
        rating_id: Uuid,
        request: UpdateRatingRequest,
        auth_token: &str,
    ) -> Result<CenterRating, RatingError> {
        request.validate()?;
        let existing = self.own_rating(user_id, rating_id, auth_token).await?;

        let mut categories = existing.categories.clone();
        if let Some(changes) = request.categories {
            categories.merge(changes);
        }

        let patch = json!({
            "rating": request.rating.unwrap_or(existing.rating),
            "review": request.review.unwrap_or(existing.review),
            "categories": categories,
            "updated_at": Utc::now().to_rfc3339(),
        });

        let path = format!("/rest/v1/{}?id=eq.{}&user_id=eq.{}", TABLE, rating_id, user_id);
        let rows: Vec<CenterRating> = self.supabase.update(&path, Some(auth_token), patch).await?;
        let updated = rows.into_iter().next().ok_or(RatingError::NotFound)?;

        info!("Rating {} updated by {}", rating_id, user_id);
        self.refresh_center_average(updated.center_id, auth_token).await;
        Ok(updated)
    }

    pub async fn delete(&self, user_id: Uuid, rating_id: Uuid, auth_token: &str) -> Result<(), RatingError> {
        let existing = self.own_rating(user_id, rating_id, auth_token).await?;

        let path = format!("/rest/v1/{}?id=eq.{}&user_id=eq.{}", TABLE, rating_id, user_id);
        self.supabase.delete(&path, Some(auth_token)).await?;

        info!("Rating {} deleted by {}", rating_id, user_id);
        self.refresh_center_average(existing.center_id, auth_token).await;
        Ok(())
    }

    /// Keep the center's denormalized rating in step with its reviews.
    /// Failures are logged; the rating change itself has already succeeded.
    pub(crate) async fn refresh_center_average(&self, center_id: Uuid, auth_token: &str) {
        let summary = match self.summary(center_id, Some(auth_token)).await {
            Ok(summary) => summary,
            Err(e) => {
                warn!("Could not recompute rating for center {}: {}", center_id, e);
                return;
            }
        };

        let path = format!("/rest/v1/centers?id=eq.{}", center_id);
        let result: anyhow::Result<Vec<Value>> = self.supabase
            .update(&path, Some(auth_token), json!({ "rating": summary.average }))
            .await;
        if let Err(e) = result {
            warn!("Could not store rating for center {}: {}", center_id, e);
        }
    }
}
