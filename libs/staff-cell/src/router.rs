use std::sync::Arc;

use axum::{
    Router,
    routing::{get, put},
    middleware,
};

use shared_config::AppConfig;
use shared_utils::extractor::auth_middleware;

use crate::handlers;

pub fn staff_routes(state: Arc<AppConfig>) -> Router {
    // Center access and permissions are resolved per request from the staff table
    let protected_routes = Router::new()
        .route("/appointments", get(handlers::list_appointments))
        .route("/appointments/stats/summary", get(handlers::get_stats_summary))
        .route("/appointments/{appointment_id}", get(handlers::get_appointment))
        .route("/appointments/{appointment_id}/status", put(handlers::update_appointment_status))
        .route("/services/available", get(handlers::available_services))
        .route("/services/center", get(handlers::center_services))
        .route("/services/hidden", get(handlers::hidden_services))
        .route("/services/{service_id}/toggle", put(handlers::toggle_service))
        .route("/services/{service_id}/hide", put(handlers::hide_service))
        .route("/services/{service_id}/settings", put(handlers::update_service_settings))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    Router::new()
        .merge(protected_routes)
        .with_state(state)
}
