use axum::{Router, routing::get};
use std::sync::Arc;

use crate::presentation::http::handlers::QuotaHandler;

pub fn quota_routes(quota_handler: Arc<QuotaHandler>) -> Router {
    Router::new()
        .route("/quota", get(QuotaHandler::get_quota))
        .route("/quota/events", get(QuotaHandler::quota_events))
        .with_state(quota_handler)
}
