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

use crate::models::{
    CenterFilters, CenterSearchQuery, CreateCenterRequest, GeoPoint, NearbyQuery,
    UpdateCenterRequest, ValidateDocumentsRequest,
};
use crate::services::geo::DEFAULT_SEARCH_RADIUS_KM;
use crate::services::{CenterDirectory, ServiceCatalog};

// ==============================================================================
// SERVICES
// ==============================================================================

pub async fn list_services(
    State(state): State<Arc<AppConfig>>,
) -> Result<Json<Value>, AppError> {
    let services = ServiceCatalog::new(&state).list_services(None).await?;

    Ok(Json(json!({
        "success": true,
        "total": services.len(),
        "services": services
    })))
}

pub async fn get_service(
    State(state): State<Arc<AppConfig>>,
    Path(service_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let service = ServiceCatalog::new(&state).get_active_service(service_id, None).await?;

    Ok(Json(json!({
        "success": true,
        "service": service,
        "minimum_required_documents": service.minimum_documents()
    })))
}

pub async fn services_by_category(
    State(state): State<Arc<AppConfig>>,
    Path(category): Path<String>,
) -> Result<Json<Value>, AppError> {
    let services = ServiceCatalog::new(&state).services_by_category(&category, None).await?;

    Ok(Json(json!({
        "success": true,
        "category": category,
        "total": services.len(),
        "services": services
    })))
}

pub async fn search_services(
    State(state): State<Arc<AppConfig>>,
    Path(query): Path<String>,
) -> Result<Json<Value>, AppError> {
    let services = ServiceCatalog::new(&state).search_services(&query, None).await?;

    Ok(Json(json!({
        "success": true,
        "query": query,
        "total": services.len(),
        "services": services
    })))
}

pub async fn service_documents(
    State(state): State<Arc<AppConfig>>,
    Path(service_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let checklist = ServiceCatalog::new(&state).document_checklist(service_id, None).await?;

    Ok(Json(json!({
        "success": true,
        "data": checklist
    })))
}

pub async fn validate_documents(
    State(state): State<Arc<AppConfig>>,
    Json(request): Json<ValidateDocumentsRequest>,
) -> Result<Json<Value>, AppError> {
    let validation = ServiceCatalog::new(&state)
        .validate_documents(request.service_id, &request.selected_documents, None)
        .await?;

    Ok(Json(json!({
        "success": true,
        "data": validation
    })))
}

// ==============================================================================
// CENTERS
// ==============================================================================

pub async fn list_centers(
    State(state): State<Arc<AppConfig>>,
    Query(filters): Query<CenterFilters>,
) -> Result<Json<Value>, AppError> {
    let centers = CenterDirectory::new(&state).list_centers(&filters, None).await?;

    Ok(Json(json!({
        "success": true,
        "total": centers.len(),
        "centers": centers
    })))
}

pub async fn nearby_centers(
    State(state): State<Arc<AppConfig>>,
    Query(query): Query<NearbyQuery>,
) -> Result<Json<Value>, AppError> {
    let (lat, lng) = match (query.lat, query.lng) {
        (Some(lat), Some(lng)) => (lat, lng),
        _ => return Err(AppError::BadRequest("Latitude and longitude are required".to_string())),
    };
    let origin = GeoPoint { lat, lng };

    let centers = CenterDirectory::new(&state)
        .nearby_centers(origin, query.radius_km, None)
        .await?;

    Ok(Json(json!({
        "success": true,
        "total": centers.len(),
        "centers": centers,
        "search_location": origin,
        "radius_km": query.radius_km.unwrap_or(DEFAULT_SEARCH_RADIUS_KM)
    })))
}

pub async fn get_center(
    State(state): State<Arc<AppConfig>>,
    Path(center_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let center = CenterDirectory::new(&state).get_center(center_id, None).await?;

    Ok(Json(json!({
        "success": true,
        "center": center
    })))
}

pub async fn center_services(
    State(state): State<Arc<AppConfig>>,
    Path(center_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let center = CenterDirectory::new(&state).get_center(center_id, None).await?;
    let services = ServiceCatalog::new(&state).services_by_ids(&center.services, None).await?;

    Ok(Json(json!({
        "success": true,
        "center_name": center.name,
        "services": services
    })))
}

pub async fn search_centers(
    State(state): State<Arc<AppConfig>>,
    Query(query): Query<CenterSearchQuery>,
) -> Result<Json<Value>, AppError> {
    let text = query.query.unwrap_or_default();
    let (place, centers) = CenterDirectory::new(&state)
        .search_centers(&text, query.radius_km, None)
        .await?;

    Ok(Json(json!({
        "success": true,
        "total": centers.len(),
        "centers": centers,
        "search_query": text.trim(),
        "search_location": place.location,
        "display_name": place.display_name,
        "radius_km": query.radius_km.filter(|r| *r > 0.0).unwrap_or(DEFAULT_SEARCH_RADIUS_KM)
    })))
}

// ==============================================================================
// CENTER ADMINISTRATION
// ==============================================================================

pub async fn create_center(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Json(request): Json<CreateCenterRequest>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    let admin_id = user_uuid(&user)?;
    let center = CenterDirectory::new(&state)
        .create_center(admin_id, request, auth.token())
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "success": true,
            "message": "Center created successfully",
            "center": center
        })),
    ))
}

pub async fn update_center(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Path(center_id): Path<Uuid>,
    Json(request): Json<UpdateCenterRequest>,
) -> Result<Json<Value>, AppError> {
    let center = CenterDirectory::new(&state)
        .update_center(center_id, request, auth.token())
        .await?;

    Ok(Json(json!({
        "success": true,
        "message": "Center updated successfully",
        "center": center
    })))
}

pub async fn delete_center(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Path(center_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    CenterDirectory::new(&state).deactivate_center(center_id, auth.token()).await?;

    Ok(Json(json!({
        "success": true,
        "message": "Center deleted successfully"
    })))
}
