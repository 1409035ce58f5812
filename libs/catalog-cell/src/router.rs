use std::sync::Arc;

use axum::{
    Router,
    middleware,
    routing::{get, post, put},
};

use shared_config::AppConfig;
use shared_utils::extractor::{auth_middleware, require_admin};

use crate::handlers;

// Catalog reads are public; they run with the anon key only.
// Center writes are admin-only.

pub fn service_routes(state: Arc<AppConfig>) -> Router {
    Router::new()
        .route("/", get(handlers::list_services))
        .route("/category/{category}", get(handlers::services_by_category))
        .route("/search/{query}", get(handlers::search_services))
        .route("/{service_id}", get(handlers::get_service))
        .route("/{service_id}/documents", get(handlers::service_documents))
        .with_state(state)
}

pub fn document_routes(state: Arc<AppConfig>) -> Router {
    Router::new()
        .route("/service/{service_id}", get(handlers::service_documents))
        .route("/validate", post(handlers::validate_documents))
        .with_state(state)
}

pub fn center_routes(state: Arc<AppConfig>) -> Router {
    let public_routes = Router::new()
        .route("/", get(handlers::list_centers))
        .route("/nearby", get(handlers::nearby_centers))
        .route("/search", get(handlers::search_centers))
        .route("/{center_id}", get(handlers::get_center))
        .route("/{center_id}/services", get(handlers::center_services));

    let admin_routes = Router::new()
        .route("/", post(handlers::create_center))
        .route("/{center_id}", put(handlers::update_center).delete(handlers::delete_center))
        .layer(middleware::from_fn(require_admin))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    Router::new()
        .merge(public_routes)
        .merge(admin_routes)
        .with_state(state)
}
