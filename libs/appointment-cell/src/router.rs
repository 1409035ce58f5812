use std::sync::Arc;

use axum::{
    Router,
    routing::{get, put},
    middleware,
};

use shared_config::AppConfig;
use shared_utils::extractor::auth_middleware;

use crate::handlers;

pub fn appointment_routes(state: Arc<AppConfig>) -> Router {
    // All appointment operations require authentication
    let protected_routes = Router::new()
        .route("/", get(handlers::list_my_appointments).post(handlers::book_appointment))
        .route("/slots/{service_id}/{date}", get(handlers::get_available_slots))
        .route(
            "/{appointment_id}",
            get(handlers::get_appointment)
                .put(handlers::update_appointment)
                .delete(handlers::cancel_appointment),
        )
        .route("/{appointment_id}/reschedule", put(handlers::reschedule_appointment))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    Router::new()
        .merge(protected_routes)
        .with_state(state)
}
