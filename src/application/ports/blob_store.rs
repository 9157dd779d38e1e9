use async_trait::async_trait;
use futures::stream::BoxStream;

use crate::domain::value_objects::StoragePath;

#[derive(Debug, Clone, PartialEq)]
pub enum BlobStoreError {
    NotFound(String),
    PermissionDenied(String),
    StorageFull,
    IoError(String),
    InvalidPath(String),
    TransferInterrupted(String),
}

impl std::fmt::Display for BlobStoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BlobStoreError::NotFound(path) => write!(f, "Object not found: {}", path),
            BlobStoreError::PermissionDenied(msg) => write!(f, "Permission denied: {}", msg),
            BlobStoreError::StorageFull => write!(f, "Storage full"),
            BlobStoreError::IoError(msg) => write!(f, "IO error: {}", msg),
            BlobStoreError::InvalidPath(path) => write!(f, "Invalid path: {}", path),
            BlobStoreError::TransferInterrupted(msg) => write!(f, "Transfer interrupted: {}", msg),
        }
    }
}

impl std::error::Error for BlobStoreError {}

impl From<std::io::Error> for BlobStoreError {
    fn from(error: std::io::Error) -> Self {
        match error.kind() {
            std::io::ErrorKind::NotFound => BlobStoreError::NotFound(error.to_string()),
            std::io::ErrorKind::PermissionDenied => {
                BlobStoreError::PermissionDenied(error.to_string())
            }
            _ => BlobStoreError::IoError(error.to_string()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransferProgress {
    pub bytes_transferred: u64,
    pub total_bytes: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredObject {
    pub path: StoragePath,
    pub size: u64,
    pub content_type: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransferEvent {
    Progress(TransferProgress),
    Completed(StoredObject),
}

/// Events of one resumable transfer. Ends after `Completed` or the first error.
pub type TransferStream = BoxStream<'static, Result<TransferEvent, BlobStoreError>>;

#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Starts writing `data` to `path`; progress is reported on the returned stream.
    fn put(&self, path: &StoragePath, data: Vec<u8>, content_type: Option<&str>) -> TransferStream;

    /// Durable URL under which the stored object can be downloaded.
    async fn download_url(&self, path: &StoragePath) -> Result<String, BlobStoreError>;

    async fn read(&self, path: &StoragePath) -> Result<Vec<u8>, BlobStoreError>;

    async fn delete(&self, path: &StoragePath) -> Result<bool, BlobStoreError>;
}
