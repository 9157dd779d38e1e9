use axum::{
    extract::{Path, State},
    http::{StatusCode, header},
    response::IntoResponse,
};
use std::sync::Arc;

use crate::application::ports::BlobStore;
use crate::application::ports::blob_store::BlobStoreError;
use crate::domain::value_objects::StoragePath;

/// Serves stored objects under the public download URL.
pub struct BlobHandler {
    blob_store: Arc<dyn BlobStore>,
}

impl BlobHandler {
    pub fn new(blob_store: Arc<dyn BlobStore>) -> Self {
        Self { blob_store }
    }

    pub async fn get_blob(
        State(handler): State<Arc<BlobHandler>>,
        Path(path): Path<String>,
    ) -> Result<impl IntoResponse, StatusCode> {
        let path = StoragePath::parse(&path).map_err(|_| StatusCode::BAD_REQUEST)?;

        match handler.blob_store.read(&path).await {
            Ok(bytes) => Ok((
                [(header::CONTENT_TYPE, "application/octet-stream")],
                bytes,
            )),
            Err(BlobStoreError::NotFound(_)) => Err(StatusCode::NOT_FOUND),
            Err(BlobStoreError::InvalidPath(_)) => Err(StatusCode::BAD_REQUEST),
            Err(e) => {
                tracing::error!("Failed to read blob {}: {}", path, e);
                Err(StatusCode::INTERNAL_SERVER_ERROR)
            }
        }
    }
}
