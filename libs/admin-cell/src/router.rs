use std::sync::Arc;

use axum::{
    Extension, Router,
    routing::{delete, get, patch, post, put},
    middleware,
};

use shared_config::AppConfig;
use shared_utils::extractor::{auth_middleware, require_admin};

use crate::handlers;
use crate::services::SettingsCache;

pub fn admin_routes(state: Arc<AppConfig>, cache: SettingsCache) -> Router {
    let public_routes = Router::new()
        .route("/settings/public", get(handlers::get_public_settings));

    // Layers run bottom-up: authenticate, then require the admin role
    let admin_only = Router::new()
        .route("/staff", get(handlers::list_staff))
        .route("/staff/{user_id}/approve", post(handlers::approve_staff))
        .route("/staff/{user_id}/reject", post(handlers::reject_staff))
        .route("/holidays", get(handlers::list_holidays).post(handlers::create_holiday))
        .route("/holidays/{holiday_id}", delete(handlers::delete_holiday))
        .route("/settings", get(handlers::get_settings).put(handlers::update_settings))
        .route("/dashboard-stats", get(handlers::dashboard_stats))
        .route("/users", get(handlers::list_users))
        .route("/users/{user_id}/status", patch(handlers::update_user_status))
        .route("/users/{user_id}/role", patch(handlers::update_user_role))
        .route("/appointments", get(handlers::list_appointments))
        .route("/appointments/stats", get(handlers::appointment_stats))
        .route("/services", get(handlers::list_services).post(handlers::create_service))
        .route("/services/{service_id}", put(handlers::update_service).delete(handlers::delete_service))
        .route("/centers/{center_id}/services", get(handlers::center_services))
        .route("/centers/{center_id}/services/enable-all", post(handlers::enable_all_center_services))
        .route(
            "/centers/{center_id}/services/{service_id}",
            post(handlers::enable_center_service).delete(handlers::disable_center_service),
        )
        .route("/news", get(handlers::list_news).post(handlers::create_news))
        .route("/news/{news_id}", put(handlers::update_news).delete(handlers::delete_news))
        .layer(middleware::from_fn(require_admin))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    Router::new()
        .merge(public_routes)
        .merge(admin_only)
        .layer(Extension(cache))
        .with_state(state)
}
