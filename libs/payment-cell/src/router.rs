use std::sync::Arc;

use axum::{
    Router,
    routing::{get, post},
    middleware,
};

use shared_config::AppConfig;
use shared_utils::extractor::auth_middleware;

use crate::handlers;

pub fn payment_routes(state: Arc<AppConfig>) -> Router {
    // Gateway callbacks carry no user token; they are authenticated by signature
    let public_routes = Router::new()
        .route("/config", get(handlers::get_payment_config))
        .route("/webhook", post(handlers::handle_webhook));

    let protected_routes = Router::new()
        .route("/create-order", post(handlers::create_order))
        .route("/verify", post(handlers::verify_payment))
        .route("/payment/{payment_id}", get(handlers::get_payment_details))
        .route("/refund", post(handlers::refund_payment))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .with_state(state)
}
