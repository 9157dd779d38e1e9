use axum::{Router, routing::get};
use std::sync::Arc;

use crate::presentation::http::handlers::BlobHandler;

pub fn blob_routes(blob_handler: Arc<BlobHandler>) -> Router {
    Router::new()
        .route("/blobs/{*path}", get(BlobHandler::get_blob))
        .with_state(blob_handler)
}
