use std::sync::Arc;

use axum::{
    extract::{Extension, Path, Query, State},
    http::StatusCode,
    Json,
};
use axum_extra::TypedHeader;
use headers::{authorization::Bearer, Authorization};
use serde_json::{json, Value};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_models::auth::User;
use shared_models::error::AppError;
use shared_utils::extractor::user_uuid;

use staff_cell::StaffAccessService;

use crate::models::{
    MyRatingQuery, RatingListQuery, RatingStatus, ReportRatingRequest, RespondRequest, StaffRatingQuery,
    SubmitRatingRequest, UpdateRatingRequest, VisibilityRequest,
};
use crate::services::{RatingModeration, RatingService};

pub async fn submit_rating(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Json(request): Json<SubmitRatingRequest>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    let user_id = user_uuid(&user)?;
    let rating = RatingService::new(&state).submit(user_id, request, auth.token()).await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "success": true,
            "message": "Rating submitted successfully",
            "data": rating
        })),
    ))
}

pub async fn get_center_ratings(
    State(state): State<Arc<AppConfig>>,
    Path(center_id): Path<Uuid>,
    Query(query): Query<RatingListQuery>,
) -> Result<Json<Value>, AppError> {
    let (ratings, summary, pagination) = RatingService::new(&state)
        .list_for_center(center_id, &query)
        .await?;

    Ok(Json(json!({
        "success": true,
        "data": {
            "ratings": ratings,
            "summary": summary,
            "pagination": pagination
        }
    })))
}

pub async fn get_my_rating(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Path(center_id): Path<Uuid>,
    Query(query): Query<MyRatingQuery>,
) -> Result<Json<Value>, AppError> {
    let user_id = user_uuid(&user)?;
    let rating = RatingService::new(&state)
        .my_rating(user_id, center_id, query.appointment_id, auth.token())
        .await?;

    Ok(Json(json!({
        "success": true,
        "data": rating
    })))
}

pub async fn update_rating(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Path(rating_id): Path<Uuid>,
    Json(request): Json<UpdateRatingRequest>,
) -> Result<Json<Value>, AppError> {
    let user_id = user_uuid(&user)?;
    let rating = RatingService::new(&state)
        .update(user_id, rating_id, request, auth.token())
        .await?;

    Ok(Json(json!({
        "success": true,
        "message": "Rating updated successfully",
        "data": rating
    })))
}

pub async fn delete_rating(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Path(rating_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let user_id = user_uuid(&user)?;
    RatingService::new(&state).delete(user_id, rating_id, auth.token()).await?;

    Ok(Json(json!({
        "success": true,
        "message": "Rating deleted successfully"
    })))
}

// ==============================================================================
// FEEDBACK AND MODERATION
// ==============================================================================

pub async fn mark_helpful(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Path(rating_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let user_id = user_uuid(&user)?;
    let helpful_count = RatingModeration::new(&state)
        .mark_helpful(user_id, rating_id, auth.token())
        .await?;

    Ok(Json(json!({
        "success": true,
        "message": "Rating marked as helpful",
        "data": { "helpful_count": helpful_count }
    })))
}

pub async fn report_rating(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Path(rating_id): Path<Uuid>,
    Json(request): Json<ReportRatingRequest>,
) -> Result<Json<Value>, AppError> {
    let user_id = user_uuid(&user)?;
    RatingModeration::new(&state)
        .report(user_id, rating_id, request, auth.token())
        .await?;

    Ok(Json(json!({
        "success": true,
        "message": "Rating reported successfully"
    })))
}

pub async fn respond_to_rating(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Path(rating_id): Path<Uuid>,
    Json(request): Json<RespondRequest>,
) -> Result<Json<Value>, AppError> {
    let access = StaffAccessService::new(&state).resolve(&user, auth.token()).await?;
    let rating = RatingModeration::new(&state)
        .respond(&access, rating_id, request, auth.token())
        .await?;

    Ok(Json(json!({
        "success": true,
        "message": "Response added successfully",
        "data": rating
    })))
}

pub async fn staff_center_ratings(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Query(query): Query<StaffRatingQuery>,
) -> Result<Json<Value>, AppError> {
    let access = StaffAccessService::new(&state).resolve(&user, auth.token()).await?;
    let (center_id, ratings, summary, pagination) = RatingModeration::new(&state)
        .center_ratings(&access, &query, auth.token())
        .await?;

    Ok(Json(json!({
        "success": true,
        "data": {
            "center_id": center_id,
            "ratings": ratings,
            "summary": summary,
            "pagination": pagination
        }
    })))
}

pub async fn set_rating_visibility(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Path(rating_id): Path<Uuid>,
    Json(request): Json<VisibilityRequest>,
) -> Result<Json<Value>, AppError> {
    let access = StaffAccessService::new(&state).resolve(&user, auth.token()).await?;
    let rating = RatingModeration::new(&state)
        .set_visibility(&access, rating_id, request, auth.token())
        .await?;

    let message = match rating.status {
        RatingStatus::Active => "Rating made visible successfully",
        RatingStatus::Hidden => "Rating hidden successfully",
        RatingStatus::Removed => "Rating removed successfully",
    };
    Ok(Json(json!({
        "success": true,
        "message": message,
        "data": rating
    })))
}
