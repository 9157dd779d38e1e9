use serde::Serialize;
use uuid::Uuid;

use crate::application::use_cases::UploadDocumentResponse;
use crate::domain::entities::{UploadFailure, UploadSession};
use crate::presentation::http::dto::QuotaDto;

#[derive(Debug, Serialize)]
pub struct UploadFailureDto {
    pub stage: String,
    pub message: String,
}

impl From<&UploadFailure> for UploadFailureDto {
    fn from(failure: &UploadFailure) -> Self {
        Self {
            stage: failure.stage.as_str().to_string(),
            message: failure.message.clone(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct UploadSessionDto {
    pub file_id: Option<Uuid>,
    pub progress: u8,
    pub status: Option<String>,
    pub status_text: Option<String>,
    pub error: Option<UploadFailureDto>,
    pub is_terminal: bool,
}

impl From<&UploadSession> for UploadSessionDto {
    fn from(session: &UploadSession) -> Self {
        Self {
            file_id: session.file_id(),
            progress: session.progress(),
            status: session.status().map(|stage| stage.as_str().to_string()),
            status_text: session
                .status()
                .map(|stage| stage.status_text().to_string()),
            error: session.error().map(UploadFailureDto::from),
            is_terminal: session.is_terminal(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct UploadStartedDto {
    pub session_id: Uuid,
    pub session: UploadSessionDto,
    pub quota: QuotaDto,
    pub events_url: String,
}

impl From<UploadDocumentResponse> for UploadStartedDto {
    fn from(response: UploadDocumentResponse) -> Self {
        Self {
            session_id: response.session_id,
            session: UploadSessionDto::from(&response.session),
            quota: QuotaDto::from(&response.quota),
            events_url: format!("/uploads/{}/events", response.session_id),
        }
    }
}
