use std::sync::Arc;

use axum::{
    extract::{Extension, Path, Query, State},
    http::StatusCode,
    Json,
};
use axum_extra::TypedHeader;
use chrono::NaiveDate;
use headers::{authorization::Bearer, Authorization};
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_models::auth::User;
use shared_models::error::AppError;
use shared_utils::extractor::user_uuid;

use crate::models::{
    BookAppointmentRequest, RescheduleAppointmentRequest, SlotQuery, UpdateAppointmentRequest,
};
use crate::services::booking::AppointmentBookingService;

#[derive(Debug, Default, Deserialize)]
pub struct CancelAppointmentRequest {
    pub reason: Option<String>,
}

pub async fn list_my_appointments(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let user_id = user_uuid(&user)?;
    let appointments = AppointmentBookingService::new(&state)
        .list_user_appointments(user_id, auth.token())
        .await?;

    Ok(Json(json!({
        "success": true,
        "total": appointments.len(),
        "appointments": appointments
    })))
}

pub async fn book_appointment(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Json(request): Json<BookAppointmentRequest>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    let user_id = user_uuid(&user)?;
    let service = AppointmentBookingService::new(&state);

    let appointment = service.book_appointment(user_id, request, auth.token()).await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "success": true,
            "message": "Appointment booked successfully",
            "appointment": service.view(appointment)
        })),
    ))
}

pub async fn get_appointment(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Path(appointment_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let user_id = user_uuid(&user)?;
    let service = AppointmentBookingService::new(&state);

    let appointment = service
        .get_user_appointment(appointment_id, user_id, auth.token())
        .await?;

    Ok(Json(json!({
        "success": true,
        "appointment": service.view(appointment)
    })))
}

pub async fn update_appointment(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Path(appointment_id): Path<Uuid>,
    Json(request): Json<UpdateAppointmentRequest>,
) -> Result<Json<Value>, AppError> {
    let user_id = user_uuid(&user)?;
    let service = AppointmentBookingService::new(&state);

    let appointment = service
        .update_appointment(appointment_id, user_id, request, auth.token())
        .await?;

    Ok(Json(json!({
        "success": true,
        "message": "Appointment updated successfully",
        "appointment": service.view(appointment)
    })))
}

pub async fn reschedule_appointment(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Path(appointment_id): Path<Uuid>,
    Json(request): Json<RescheduleAppointmentRequest>,
) -> Result<Json<Value>, AppError> {
    let user_id = user_uuid(&user)?;
    let service = AppointmentBookingService::new(&state);

    let appointment = service
        .reschedule_appointment(appointment_id, user_id, request, auth.token())
        .await?;

    Ok(Json(json!({
        "success": true,
        "message": "Appointment rescheduled successfully",
        "appointment": service.view(appointment)
    })))
}

pub async fn cancel_appointment(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Path(appointment_id): Path<Uuid>,
    request: Option<Json<CancelAppointmentRequest>>,
) -> Result<Json<Value>, AppError> {
    let user_id = user_uuid(&user)?;
    let reason = request.and_then(|Json(body)| body.reason);

    let appointment = AppointmentBookingService::new(&state)
        .cancel_appointment(appointment_id, user_id, reason, auth.token())
        .await?;

    Ok(Json(json!({
        "success": true,
        "message": "Appointment cancelled successfully",
        "appointment_id": appointment.id
    })))
}

pub async fn get_available_slots(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Path((_service_id, date)): Path<(Uuid, NaiveDate)>,
    Query(query): Query<SlotQuery>,
) -> Result<Json<Value>, AppError> {
    let availability = AppointmentBookingService::new(&state)
        .available_slots(date, query.center, auth.token())
        .await?;

    Ok(Json(json!({
        "success": true,
        "data": availability
    })))
}
