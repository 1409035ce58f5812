use std::sync::Arc;

use axum::{
    Json,
    Router,
    middleware,
    routing::get,
};
use serde_json::{json, Value};

use admin_cell::router::admin_routes;
use admin_cell::{maintenance_mode, MaintenanceGuard, SettingsCache};
use appointment_cell::router::appointment_routes;
use auth_cell::router::auth_routes;
use catalog_cell::router::{center_routes, document_routes, service_routes};
use news_cell::router::news_routes;
use payment_cell::router::payment_routes;
use rating_cell::router::rating_routes;
use shared_config::AppConfig;
use staff_cell::router::staff_routes;

async fn health() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "service": "akshaya-api"
    }))
}

pub fn create_router(state: Arc<AppConfig>) -> Router {
    // One cache so settings changes made through /admin reach the maintenance check
    let settings_cache = SettingsCache::default();
    let guard = MaintenanceGuard::new(state.clone(), settings_cache.clone());

    Router::new()
        .route("/", get(|| async { "Akshaya Services API is running!" }))
        .route("/health", get(health))
        .nest("/auth", auth_routes(state.clone()))
        .nest("/services", service_routes(state.clone()))
        .nest("/documents", document_routes(state.clone()))
        .nest("/centers", center_routes(state.clone()))
        .nest("/appointments", appointment_routes(state.clone()))
        .nest("/payments", payment_routes(state.clone()))
        .nest("/staff", staff_routes(state.clone()))
        .nest("/admin", admin_routes(state.clone(), settings_cache))
        .nest("/ratings", rating_routes(state.clone()))
        .nest("/news", news_routes(state))
        .layer(middleware::from_fn_with_state(guard, maintenance_mode))
}
