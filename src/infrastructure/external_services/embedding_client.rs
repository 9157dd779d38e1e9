use async_trait::async_trait;
use reqwest::{Client, Error as ReqwestError, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use uuid::Uuid;

use crate::application::ports::embedding_service::{EmbeddingService, EmbeddingServiceError};
use crate::domain::value_objects::UserId;

#[derive(Debug, Serialize)]
pub struct GenerateEmbeddingsRequest {
    pub document_id: Uuid,
    pub user_id: String,
}

#[derive(Debug, Deserialize)]
pub struct GenerateEmbeddingsResponse {
    #[serde(default)]
    pub success: Option<bool>,
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Clone)]
pub struct EmbeddingClientConfig {
    pub service_url: String,
    pub max_retries: u32,
    pub timeout_secs: u64,
    pub backoff_factor: f64,
}

impl Default for EmbeddingClientConfig {
    fn default() -> Self {
        Self {
            service_url: "http://localhost:8000/embeddings".to_string(),
            max_retries: 3,
            timeout_secs: 120,
            backoff_factor: 1.5,
        }
    }
}

/// Calls the remote embedding-generation endpoint for a stored document.
#[derive(Debug, Clone)]
pub struct HttpEmbeddingService {
    client: Client,
    config: EmbeddingClientConfig,
}

impl HttpEmbeddingService {
    pub fn new(config: EmbeddingClientConfig) -> Result<Self, ReqwestError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self { client, config })
    }

    fn backoff(&self, attempt: u32) -> Duration {
        Duration::from_millis((self.config.backoff_factor.powi(attempt as i32 - 1) * 1000.0) as u64)
    }

    async fn execute_request(
        &self,
        request: &GenerateEmbeddingsRequest,
    ) -> Result<(), EmbeddingServiceError> {
        let response = self
            .client
            .post(&self.config.service_url)
            .json(request)
            .send()
            .await
            .map_err(|e| EmbeddingServiceError::NetworkError(e.without_url().to_string()))?;

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(EmbeddingServiceError::RateLimitExceeded);
        }
        if status.is_server_error() {
            return Err(EmbeddingServiceError::ServiceUnavailable);
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(EmbeddingServiceError::ApiError(format!("{}: {}", status, body)));
        }

        // An empty body counts as success; an explicit `success: false` does not.
        let body = response
            .text()
            .await
            .map_err(|e| EmbeddingServiceError::NetworkError(e.to_string()))?;
        if body.trim().is_empty() {
            return Ok(());
        }

        let parsed: GenerateEmbeddingsResponse = serde_json::from_str(&body)
            .map_err(|e| EmbeddingServiceError::ApiError(format!("Invalid response: {}", e)))?;
        match parsed.success {
            Some(false) => Err(EmbeddingServiceError::ApiError(
                parsed
                    .message
                    .unwrap_or_else(|| "embedding generation rejected".to_string()),
            )),
            _ => Ok(()),
        }
    }
}

fn is_retryable(error: &EmbeddingServiceError) -> bool {
    matches!(
        error,
        EmbeddingServiceError::NetworkError(_)
            | EmbeddingServiceError::RateLimitExceeded
            | EmbeddingServiceError::ServiceUnavailable
    )
}

#[async_trait]
impl EmbeddingService for HttpEmbeddingService {
    async fn generate(
        &self,
        owner: &UserId,
        document_id: Uuid,
    ) -> Result<(), EmbeddingServiceError> {
        let request = GenerateEmbeddingsRequest {
            document_id,
            user_id: owner.to_string(),
        };
        let mut attempts = 0;

        loop {
            attempts += 1;

            match self.execute_request(&request).await {
                Ok(()) => return Ok(()),
                Err(e) if is_retryable(&e) && attempts <= self.config.max_retries => {
                    let wait = self.backoff(attempts);
                    tracing::warn!(
                        "Embedding request for document {} failed (attempt {}): {}; retrying in {:?}",
                        document_id,
                        attempts,
                        e,
                        wait
                    );
                    tokio::time::sleep(wait).await;
                }
                Err(e) => return Err(e),
            }
        }
    }
}
