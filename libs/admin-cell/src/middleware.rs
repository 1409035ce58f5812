use std::sync::Arc;

use axum::{
    body::Body,
    extract::State,
    http::{Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use tracing::debug;

use shared_config::AppConfig;

use crate::services::{SettingsCache, SettingsService};

/// Path prefixes that stay reachable while maintenance mode is on.
const MAINTENANCE_EXEMPT_PREFIXES: [&str; 3] = ["/admin", "/auth", "/health"];

#[derive(Clone)]
pub struct MaintenanceGuard {
    pub config: Arc<AppConfig>,
    pub cache: SettingsCache,
}

impl MaintenanceGuard {
    pub fn new(config: Arc<AppConfig>, cache: SettingsCache) -> Self {
        Self { config, cache }
    }
}

pub fn is_exempt(path: &str) -> bool {
    MAINTENANCE_EXEMPT_PREFIXES
        .iter()
        .any(|prefix| path == *prefix || path.starts_with(&format!("{}/", prefix)))
}

/// Answers 503 for everything except admin and auth routes while the
/// platform is in maintenance mode.
pub async fn maintenance_mode(
    State(guard): State<MaintenanceGuard>,
    request: Request<Body>,
    next: Next,
) -> Response {
    if is_exempt(request.uri().path()) {
        return next.run(request).await;
    }

    let settings = SettingsService::new(&guard.config).current(&guard.cache).await;
    if !settings.maintenance_mode {
        return next.run(request).await;
    }

    debug!("Maintenance mode: rejecting {}", request.uri().path());
    (
        StatusCode::SERVICE_UNAVAILABLE,
        Json(json!({
            "error": settings.maintenance_message(),
            "maintenance_mode": true,
            "estimated_downtime": settings.estimated_downtime,
        })),
    )
        .into_response()
}
