use async_trait::async_trait;
use std::time::Duration;
use uuid::Uuid;

use crate::domain::value_objects::UserId;

#[derive(Debug, Clone, PartialEq)]
pub enum EmbeddingServiceError {
    NetworkError(String),
    ApiError(String),
    RateLimitExceeded,
    ServiceUnavailable,
    Timeout(Duration),
}

impl std::fmt::Display for EmbeddingServiceError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EmbeddingServiceError::NetworkError(msg) => write!(f, "Network error: {}", msg),
            EmbeddingServiceError::ApiError(msg) => write!(f, "API error: {}", msg),
            EmbeddingServiceError::RateLimitExceeded => write!(f, "Rate limit exceeded"),
            EmbeddingServiceError::ServiceUnavailable => write!(f, "Service unavailable"),
            EmbeddingServiceError::Timeout(after) => {
                write!(f, "Timed out after {}s", after.as_secs_f64())
            }
        }
    }
}

impl std::error::Error for EmbeddingServiceError {}

/// Triggers embedding generation for a stored document and waits for it to finish.
#[async_trait]
pub trait EmbeddingService: Send + Sync {
    async fn generate(&self, owner: &UserId, document_id: Uuid)
    -> Result<(), EmbeddingServiceError>;
}
