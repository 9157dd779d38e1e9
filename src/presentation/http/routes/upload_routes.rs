use axum::{
    Router,
    routing::{get, post},
};
use std::sync::Arc;

use crate::presentation::http::handlers::UploadHandler;

pub fn upload_routes(upload_handler: Arc<UploadHandler>) -> Router {
    Router::new()
        .route("/documents", post(UploadHandler::upload_document))
        .route("/uploads/{session_id}", get(UploadHandler::get_upload))
        .route("/uploads/{session_id}/events", get(UploadHandler::upload_events))
        .with_state(upload_handler)
}
