use std::sync::Arc;

use axum::{
    extract::State,
    http::{HeaderMap, Request},
    middleware::Next,
    response::Response,
    body::Body,
};

use uuid::Uuid;

use shared_models::auth::{Role, User};
use shared_models::error::AppError;
use shared_config::AppConfig;

use crate::jwt::validate_token;

/// Pull the bearer token out of an `Authorization` header.
pub fn extract_bearer_token(headers: &HeaderMap) -> Result<String, AppError> {
    let auth_header = headers
        .get("Authorization")
        .ok_or_else(|| AppError::Auth("Missing authorization header".to_string()))?;

    let auth_value = auth_header
        .to_str()
        .map_err(|_| AppError::Auth("Invalid authorization header format".to_string()))?;

    auth_value
        .strip_prefix("Bearer ")
        .map(str::to_string)
        .ok_or_else(|| AppError::Auth("Invalid authorization header format".to_string()))
}

// Validates the bearer token and stores the caller in request extensions
pub async fn auth_middleware(
    State(config): State<Arc<AppConfig>>,
    mut request: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    let token = extract_bearer_token(request.headers())?;

    let user = validate_token(&token, &config.supabase_jwt_secret)
        .map_err(AppError::Auth)?;

    request.extensions_mut().insert(user);

    Ok(next.run(request).await)
}

/// Layer after `auth_middleware`; rejects callers that are not admins.
pub async fn require_admin(
    request: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    let user = extract_user(&request).await?;
    require_role(&user, &[Role::Admin])?;
    Ok(next.run(request).await)
}

// Resolved eagerly so the returned future does not borrow the (non-`Sync`)
// request body, keeping middleware futures `Send`.
pub fn extract_user<B>(
    request: &Request<B>,
) -> std::future::Ready<Result<User, AppError>> {
    std::future::ready(
        request
            .extensions()
            .get::<User>()
            .cloned()
            .ok_or_else(|| AppError::Auth("User not found in request extensions".to_string())),
    )
}

/// Caller id as a UUID; tokens whose subject is not a UUID are rejected.
pub fn user_uuid(user: &User) -> Result<Uuid, AppError> {
    user.uuid()
        .ok_or_else(|| AppError::Auth("Invalid user id in token".to_string()))
}

pub fn require_role(user: &User, allowed: &[Role]) -> Result<(), AppError> {
    let role = user.platform_role();
    if allowed.contains(&role) {
        Ok(())
    } else {
        Err(AppError::Forbidden(format!(
            "Access denied. {} role required.",
            allowed.iter().map(Role::to_string).collect::<Vec<_>>().join(" or ")
        )))
    }
}
