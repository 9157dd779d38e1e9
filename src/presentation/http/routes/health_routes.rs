use axum::{Router, routing::get};
use std::sync::Arc;

use crate::presentation::http::handlers::HealthHandler;

pub fn health_routes(health_handler: Arc<HealthHandler>) -> Router {
    Router::new()
        .route("/health", get(HealthHandler::health))
        .with_state(health_handler)
}
