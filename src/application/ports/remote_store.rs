use async_trait::async_trait;
use futures::stream::BoxStream;
use uuid::Uuid;

use crate::domain::entities::{Document, DocumentRecord, Subscription};
use crate::domain::value_objects::UserId;

#[derive(Debug, Clone, PartialEq)]
pub enum RemoteStoreError {
    ConnectionError(String),
    DatabaseError(String),
    ValidationError(String),
    DuplicateError(String),
}

impl std::fmt::Display for RemoteStoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RemoteStoreError::ConnectionError(msg) => write!(f, "Connection error: {}", msg),
            RemoteStoreError::DatabaseError(msg) => write!(f, "Database error: {}", msg),
            RemoteStoreError::ValidationError(msg) => write!(f, "Validation error: {}", msg),
            RemoteStoreError::DuplicateError(msg) => write!(f, "Duplicate error: {}", msg),
        }
    }
}

impl std::error::Error for RemoteStoreError {}

/// Live view of a user's document collection; yields the full collection on every change.
pub type DocumentFeed = BoxStream<'static, Result<Vec<Document>, RemoteStoreError>>;

/// Live view of a user's subscription record; `None` while no record exists.
pub type SubscriptionFeed = BoxStream<'static, Result<Option<Subscription>, RemoteStoreError>>;

#[async_trait]
pub trait RemoteStore: Send + Sync {
    async fn write_document(
        &self,
        user_id: &UserId,
        document_id: Uuid,
        record: &DocumentRecord,
    ) -> Result<(), RemoteStoreError>;

    /// The first item is the current collection, later items follow changes.
    fn subscribe_documents(&self, user_id: &UserId) -> DocumentFeed;

    /// Subscription records are owned by the billing system; this side only reads them.
    fn subscribe_subscription(&self, user_id: &UserId) -> SubscriptionFeed;
}
