use std::sync::Arc;

use axum::{
    extract::{Extension, Json, State},
    http::HeaderMap,
};
use axum_extra::TypedHeader;
use headers::{authorization::Bearer, Authorization};
use serde_json::{json, Value};
use tracing::{debug, warn};

use shared_config::AppConfig;
use shared_database::supabase::SupabaseClient;
use shared_models::auth::{TokenResponse, User};
use shared_models::error::AppError;
use shared_models::profile::Profile;
use shared_utils::extractor::extract_bearer_token;
use shared_utils::jwt;

pub async fn validate_token(
    State(config): State<Arc<AppConfig>>,
    headers: HeaderMap,
) -> Result<Json<TokenResponse>, AppError> {
    debug!("Validating token");

    let token = extract_bearer_token(&headers)?;

    let user = jwt::validate_token(&token, &config.supabase_jwt_secret)
        .map_err(AppError::Auth)?;

    Ok(Json(TokenResponse {
        valid: true,
        user_id: user.id,
        email: user.email,
        role: user.role,
    }))
}

pub async fn verify_token(
    State(config): State<Arc<AppConfig>>,
    headers: HeaderMap,
) -> Result<Json<Value>, AppError> {
    debug!("Verifying token");

    let token = extract_bearer_token(&headers)?;
    let valid = jwt::validate_token(&token, &config.supabase_jwt_secret).is_ok();

    Ok(Json(json!({ "valid": valid })))
}

/// Profile row of the authenticated caller. Deactivated accounts are
/// treated as signed out.
pub async fn get_me(
    State(config): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    debug!("Getting profile for user: {}", user.id);

    let client = SupabaseClient::new(&config);
    let path = format!("/rest/v1/profiles?id=eq.{}", user.id);

    let profile: Profile = client
        .select_one(&path, Some(auth.token()))
        .await
        .map_err(|e| AppError::ExternalService(e.to_string()))?
        .ok_or_else(|| AppError::NotFound("Profile not found".to_string()))?;

    if !profile.is_active {
        warn!("Deactivated account {} attempted to load its profile", user.id);
        return Err(AppError::Auth("Account is deactivated".to_string()));
    }

    Ok(Json(json!({
        "success": true,
        "user": {
            "id": profile.id,
            "name": profile.name,
            "email": profile.email,
            "phone": profile.phone,
            "role": profile.role,
            "approval_status": profile.approval_status,
            "created_at": profile.created_at,
        }
    })))
}
