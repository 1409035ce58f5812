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

use catalog_cell::models::{CreateServiceRequest, UpdateServiceRequest};
use catalog_cell::services::{CenterDirectory, ServiceCatalog};
use news_cell::models::{CreateNewsRequest, UpdateNewsRequest};
use news_cell::NewsService;

use crate::models::{
    group_by_center, AppointmentListQuery, ApproveStaffRequest, CreateHolidayRequest, HolidayQuery,
    PublicSettings, RejectStaffRequest, StaffListQuery, StatsQuery, UserListQuery, UserRoleRequest,
    UserStatusRequest,
};
use crate::services::{
    HolidayService, MonitoringService, SettingsCache, SettingsService, StaffApprovalService,
    UserAdminService,
};

// ==============================================================================
// STAFF APPROVAL
// ==============================================================================

pub async fn list_staff(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Query(query): Query<StaffListQuery>,
) -> Result<Json<Value>, AppError> {
    let status = query.approval_filter()?;
    let applications = StaffApprovalService::new(&state)
        .list_applications(status, auth.token())
        .await?;

    Ok(Json(json!({
        "success": true,
        "total": applications.len(),
        "staff": applications
    })))
}

pub async fn approve_staff(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Path(staff_user_id): Path<Uuid>,
    body: Option<Json<ApproveStaffRequest>>,
) -> Result<Json<Value>, AppError> {
    let admin_id = user_uuid(&user)?;
    let request = body.map(|Json(b)| b).unwrap_or_default();

    let profile = StaffApprovalService::new(&state)
        .approve(admin_id, staff_user_id, request.notes, auth.token())
        .await?;

    Ok(Json(json!({
        "success": true,
        "message": "Staff approved successfully",
        "staff": profile
    })))
}

pub async fn reject_staff(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Path(staff_user_id): Path<Uuid>,
    body: Option<Json<RejectStaffRequest>>,
) -> Result<Json<Value>, AppError> {
    let admin_id = user_uuid(&user)?;
    let request = body.map(|Json(b)| b).unwrap_or_default();

    let profile = StaffApprovalService::new(&state)
        .reject(admin_id, staff_user_id, request.reason, auth.token())
        .await?;

    Ok(Json(json!({
        "success": true,
        "message": "Staff rejected",
        "staff": profile
    })))
}

// ==============================================================================
// HOLIDAYS
// ==============================================================================

pub async fn list_holidays(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Query(query): Query<HolidayQuery>,
) -> Result<Json<Value>, AppError> {
    let holidays = HolidayService::new(&state).list(&query, auth.token()).await?;

    Ok(Json(json!({
        "success": true,
        "data": holidays
    })))
}

pub async fn create_holiday(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Json(request): Json<CreateHolidayRequest>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    let admin_id = user_uuid(&user)?;
    let holiday = HolidayService::new(&state)
        .create(admin_id, request, auth.token())
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "success": true,
            "data": holiday
        })),
    ))
}

pub async fn delete_holiday(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Path(holiday_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    HolidayService::new(&state).delete(holiday_id, auth.token()).await?;

    Ok(Json(json!({
        "success": true,
        "message": "Holiday removed"
    })))
}

// ==============================================================================
// SETTINGS
// ==============================================================================

pub async fn get_settings(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
) -> Result<Json<Value>, AppError> {
    let settings = SettingsService::new(&state).get(Some(auth.token())).await?;

    Ok(Json(json!({
        "success": true,
        "data": settings
    })))
}

pub async fn update_settings(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Extension(cache): Extension<SettingsCache>,
    Json(changes): Json<Value>,
) -> Result<Json<Value>, AppError> {
    let admin_id = user_uuid(&user)?;
    let settings = SettingsService::new(&state)
        .update(admin_id, changes, auth.token())
        .await?;

    // Maintenance changes take effect on the next request
    cache.invalidate().await;

    Ok(Json(json!({
        "success": true,
        "message": "Settings updated successfully",
        "data": settings
    })))
}

pub async fn get_public_settings(
    State(state): State<Arc<AppConfig>>,
) -> Result<Json<Value>, AppError> {
    let settings = SettingsService::new(&state).get(None).await?;

    Ok(Json(json!({
        "success": true,
        "data": PublicSettings::from(settings)
    })))
}

// ==============================================================================
// USERS
// ==============================================================================

pub async fn list_users(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Query(query): Query<UserListQuery>,
) -> Result<Json<Value>, AppError> {
    let (users, pagination) = UserAdminService::new(&state).list(&query, auth.token()).await?;

    Ok(Json(json!({
        "success": true,
        "data": {
            "users": users,
            "pagination": pagination
        }
    })))
}

pub async fn update_user_status(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Path(user_id): Path<Uuid>,
    Json(request): Json<UserStatusRequest>,
) -> Result<Json<Value>, AppError> {
    let admin_id = user_uuid(&user)?;
    let profile = UserAdminService::new(&state)
        .set_active(admin_id, user_id, request.is_active, auth.token())
        .await?;

    let verb = if profile.is_active { "activated" } else { "deactivated" };
    Ok(Json(json!({
        "success": true,
        "message": format!("User {} successfully", verb),
        "user": profile
    })))
}

pub async fn update_user_role(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Path(user_id): Path<Uuid>,
    Json(request): Json<UserRoleRequest>,
) -> Result<Json<Value>, AppError> {
    let admin_id = user_uuid(&user)?;
    let profile = UserAdminService::new(&state)
        .set_role(admin_id, user_id, request, auth.token())
        .await?;

    Ok(Json(json!({
        "success": true,
        "message": format!("User role updated to {} successfully", profile.role),
        "user": profile
    })))
}

// ==============================================================================
// MONITORING
// ==============================================================================

pub async fn dashboard_stats(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
) -> Result<Json<Value>, AppError> {
    let stats = MonitoringService::new(&state).dashboard(auth.token()).await?;

    Ok(Json(json!({
        "success": true,
        "data": { "stats": stats }
    })))
}

pub async fn list_appointments(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Query(query): Query<AppointmentListQuery>,
) -> Result<Json<Value>, AppError> {
    let (appointments, pagination) = MonitoringService::new(&state)
        .appointments(&query, auth.token())
        .await?;
    let by_center = group_by_center(&appointments);

    Ok(Json(json!({
        "success": true,
        "data": {
            "appointments": appointments,
            "appointments_by_center": by_center,
            "pagination": pagination
        }
    })))
}

pub async fn appointment_stats(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Query(query): Query<StatsQuery>,
) -> Result<Json<Value>, AppError> {
    let stats = MonitoringService::new(&state)
        .appointment_stats(query.period(), auth.token())
        .await?;

    Ok(Json(json!({
        "success": true,
        "data": stats
    })))
}

// ==============================================================================
// CATALOG
// ==============================================================================

pub async fn list_services(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
) -> Result<Json<Value>, AppError> {
    let services = ServiceCatalog::new(&state).list_all_services(auth.token()).await?;

    Ok(Json(json!({
        "success": true,
        "data": services
    })))
}

/// New services are offered at every active center straight away.
pub async fn create_service(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Json(request): Json<CreateServiceRequest>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    let admin_id = user_uuid(&user)?;
    let service = ServiceCatalog::new(&state)
        .create_service(admin_id, request, auth.token())
        .await?;
    let centers_updated = CenterDirectory::new(&state)
        .offer_everywhere(service.id, auth.token())
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "success": true,
            "message": format!("Service created and added to {} centers", centers_updated),
            "data": service,
            "centers_updated": centers_updated
        })),
    ))
}

pub async fn update_service(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Path(service_id): Path<Uuid>,
    Json(request): Json<UpdateServiceRequest>,
) -> Result<Json<Value>, AppError> {
    let service = ServiceCatalog::new(&state)
        .update_service(service_id, request, auth.token())
        .await?;

    Ok(Json(json!({
        "success": true,
        "message": "Service updated successfully",
        "data": service
    })))
}

pub async fn delete_service(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Path(service_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    ServiceCatalog::new(&state).delete_service(service_id, auth.token()).await?;

    Ok(Json(json!({
        "success": true,
        "message": "Service deleted successfully"
    })))
}

pub async fn center_services(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Path(center_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let services = CenterDirectory::new(&state)
        .offered_services(center_id, auth.token())
        .await?;

    Ok(Json(json!({
        "success": true,
        "total": services.len(),
        "data": services
    })))
}

pub async fn enable_all_center_services(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Path(center_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let added = CenterDirectory::new(&state)
        .enable_all_services(center_id, auth.token())
        .await?;

    Ok(Json(json!({
        "success": true,
        "message": format!("{} services enabled", added),
        "added_services": added
    })))
}

pub async fn enable_center_service(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Path((center_id, service_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<Value>, AppError> {
    let center = CenterDirectory::new(&state)
        .set_service_enabled(center_id, service_id, true, auth.token())
        .await?;

    Ok(Json(json!({
        "success": true,
        "message": "Service enabled for center",
        "services": center.services
    })))
}

pub async fn disable_center_service(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Path((center_id, service_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<Value>, AppError> {
    let center = CenterDirectory::new(&state)
        .set_service_enabled(center_id, service_id, false, auth.token())
        .await?;

    Ok(Json(json!({
        "success": true,
        "message": "Service disabled for center",
        "services": center.services
    })))
}

// ==============================================================================
// NEWS
// ==============================================================================

pub async fn list_news(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
) -> Result<Json<Value>, AppError> {
    let news = NewsService::new(&state).list_all(auth.token()).await?;

    Ok(Json(json!({
        "success": true,
        "data": news
    })))
}

pub async fn create_news(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Json(request): Json<CreateNewsRequest>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    let admin_id = user_uuid(&user)?;
    let news = NewsService::new(&state).create(admin_id, request, auth.token()).await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "success": true,
            "message": "News created successfully",
            "data": news
        })),
    ))
}

pub async fn update_news(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Path(news_id): Path<Uuid>,
    Json(request): Json<UpdateNewsRequest>,
) -> Result<Json<Value>, AppError> {
    let news = NewsService::new(&state).update(news_id, request, auth.token()).await?;

    Ok(Json(json!({
        "success": true,
        "message": "News updated successfully",
        "data": news
    })))
}

pub async fn delete_news(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Path(news_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    NewsService::new(&state).delete(news_id, auth.token()).await?;

    Ok(Json(json!({
        "success": true,
        "message": "News deleted successfully"
    })))
}
