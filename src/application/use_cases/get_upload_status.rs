use std::sync::Arc;
use tokio::sync::watch;
use uuid::Uuid;

use crate::application::services::UploadRegistry;
use crate::domain::entities::UploadSession;

#[derive(Debug)]
pub enum GetUploadStatusError {
    SessionNotFound(Uuid),
}

impl std::fmt::Display for GetUploadStatusError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GetUploadStatusError::SessionNotFound(id) => {
                write!(f, "Upload session not found: {}", id)
            }
        }
    }
}

impl std::error::Error for GetUploadStatusError {}

pub struct GetUploadStatusUseCase {
    registry: Arc<UploadRegistry>,
}

impl GetUploadStatusUseCase {
    pub fn new(registry: Arc<UploadRegistry>) -> Self {
        Self { registry }
    }

    pub async fn execute(&self, session_id: Uuid) -> Result<UploadSession, GetUploadStatusError> {
        self.registry
            .snapshot(session_id)
            .await
            .ok_or(GetUploadStatusError::SessionNotFound(session_id))
    }

    pub async fn subscribe(
        &self,
        session_id: Uuid,
    ) -> Result<watch::Receiver<UploadSession>, GetUploadStatusError> {
        self.registry
            .subscribe(session_id)
            .await
            .ok_or(GetUploadStatusError::SessionNotFound(session_id))
    }
}
