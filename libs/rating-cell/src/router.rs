use std::sync::Arc;

use axum::{
    Router,
    routing::{get, post, put},
    middleware,
};

use shared_config::AppConfig;
use shared_utils::extractor::auth_middleware;

use crate::handlers;

pub fn rating_routes(state: Arc<AppConfig>) -> Router {
    let public_routes = Router::new()
        .route("/center/{center_id}", get(handlers::get_center_ratings));

    let protected_routes = Router::new()
        .route("/", post(handlers::submit_rating))
        .route("/my-rating/{center_id}", get(handlers::get_my_rating))
        .route("/{rating_id}", put(handlers::update_rating).delete(handlers::delete_rating))
        .route("/{rating_id}/helpful", post(handlers::mark_helpful))
        .route("/{rating_id}/report", post(handlers::report_rating))
        .route("/{rating_id}/respond", post(handlers::respond_to_rating))
        .route("/staff/center-ratings", get(handlers::staff_center_ratings))
        .route("/staff/{rating_id}/visibility", put(handlers::set_rating_visibility))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .with_state(state)
}
