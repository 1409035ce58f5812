use std::sync::Arc;

use axum::{routing::get, Router};

use shared_config::AppConfig;

use crate::handlers;

/// Public reads only; writing happens under /admin/news.
pub fn news_routes(state: Arc<AppConfig>) -> Router {
    Router::new()
        .route("/", get(handlers::list_news))
        .route("/latest/{count}", get(handlers::latest_news))
        .route("/{news_id}", get(handlers::get_news))
        .with_state(state)
}
