use std::sync::Arc;

use axum::{
    extract::{Extension, Path, Query, State},
    Json,
};
use axum_extra::TypedHeader;
use headers::{authorization::Bearer, Authorization};
use serde_json::{json, Value};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_models::auth::User;
use shared_models::error::AppError;

use catalog_cell::models::{HideServiceRequest, ServiceSettingsRequest, ToggleServiceRequest};

use crate::models::{CenterQuery, StaffAppointmentQuery, StatsQuery, UpdateStatusRequest};
use crate::services::{CenterServiceManager, StaffAccessService, StaffAppointmentService};

#[axum::debug_handler]
pub async fn list_appointments(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Query(query): Query<StaffAppointmentQuery>,
) -> Result<Json<Value>, AppError> {
    let access = StaffAccessService::new(&state).resolve(&user, auth.token()).await?;

    let (appointments, pagination) = StaffAppointmentService::new(&state)
        .list_appointments(&access, &query, auth.token())
        .await?;

    Ok(Json(json!({
        "success": true,
        "data": {
            "appointments": appointments,
            "pagination": pagination
        }
    })))
}

#[axum::debug_handler]
pub async fn get_appointment(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Path(appointment_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let access = StaffAccessService::new(&state).resolve(&user, auth.token()).await?;

    let appointment = StaffAppointmentService::new(&state)
        .get_appointment(&access, appointment_id, auth.token())
        .await?;

    Ok(Json(json!({
        "success": true,
        "appointment": appointment
    })))
}

#[axum::debug_handler]
pub async fn update_appointment_status(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Path(appointment_id): Path<Uuid>,
    Json(request): Json<UpdateStatusRequest>,
) -> Result<Json<Value>, AppError> {
    let access = StaffAccessService::new(&state).resolve(&user, auth.token()).await?;

    let appointment = StaffAppointmentService::new(&state)
        .update_status(&access, appointment_id, request, auth.token())
        .await?;

    Ok(Json(json!({
        "success": true,
        "message": "Appointment status updated successfully",
        "appointment": appointment
    })))
}

#[axum::debug_handler]
pub async fn get_stats_summary(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Query(query): Query<StatsQuery>,
) -> Result<Json<Value>, AppError> {
    let access = StaffAccessService::new(&state).resolve(&user, auth.token()).await?;

    let stats = StaffAppointmentService::new(&state)
        .stats_summary(&access, query.date, auth.token())
        .await?;

    Ok(Json(json!({
        "success": true,
        "stats": stats
    })))
}

// ==============================================================================
// CENTER SERVICES
// ==============================================================================

#[axum::debug_handler]
pub async fn available_services(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Query(query): Query<CenterQuery>,
) -> Result<Json<Value>, AppError> {
    let access = StaffAccessService::new(&state).resolve(&user, auth.token()).await?;

    let (services, counts) = CenterServiceManager::new(&state)
        .available(&access, query.center_id, auth.token())
        .await?;

    Ok(Json(json!({
        "success": true,
        "data": services,
        "meta": counts
    })))
}

#[axum::debug_handler]
pub async fn center_services(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Query(query): Query<CenterQuery>,
) -> Result<Json<Value>, AppError> {
    let access = StaffAccessService::new(&state).resolve(&user, auth.token()).await?;

    let services = CenterServiceManager::new(&state)
        .offered(&access, query.center_id, auth.token())
        .await?;

    Ok(Json(json!({
        "success": true,
        "data": services
    })))
}

#[axum::debug_handler]
pub async fn hidden_services(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Query(query): Query<CenterQuery>,
) -> Result<Json<Value>, AppError> {
    let access = StaffAccessService::new(&state).resolve(&user, auth.token()).await?;

    let services = CenterServiceManager::new(&state)
        .hidden(&access, query.center_id, auth.token())
        .await?;

    Ok(Json(json!({
        "success": true,
        "data": services
    })))
}

#[axum::debug_handler]
pub async fn toggle_service(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Path(service_id): Path<Uuid>,
    Query(query): Query<CenterQuery>,
    Json(request): Json<ToggleServiceRequest>,
) -> Result<Json<Value>, AppError> {
    let access = StaffAccessService::new(&state).resolve(&user, auth.token()).await?;

    CenterServiceManager::new(&state)
        .set_enabled(&access, query.center_id, service_id, request.enabled, auth.token())
        .await?;

    let action = if request.enabled { "enabled" } else { "disabled" };
    Ok(Json(json!({
        "success": true,
        "message": format!("Service {} successfully", action)
    })))
}

#[axum::debug_handler]
pub async fn hide_service(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Path(service_id): Path<Uuid>,
    Query(query): Query<CenterQuery>,
    Json(request): Json<HideServiceRequest>,
) -> Result<Json<Value>, AppError> {
    let access = StaffAccessService::new(&state).resolve(&user, auth.token()).await?;

    CenterServiceManager::new(&state)
        .set_hidden(&access, query.center_id, service_id, request.hidden, auth.token())
        .await?;

    let action = if request.hidden { "hidden" } else { "unhidden" };
    Ok(Json(json!({
        "success": true,
        "message": format!("Service {} successfully", action)
    })))
}

#[axum::debug_handler]
pub async fn update_service_settings(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Path(service_id): Path<Uuid>,
    Query(query): Query<CenterQuery>,
    Json(request): Json<ServiceSettingsRequest>,
) -> Result<Json<Value>, AppError> {
    let access = StaffAccessService::new(&state).resolve(&user, auth.token()).await?;

    let settings = CenterServiceManager::new(&state)
        .update_settings(&access, query.center_id, service_id, request, auth.token())
        .await?;

    Ok(Json(json!({
        "success": true,
        "message": "Service settings updated successfully",
        "settings": settings
    })))
}
