use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::value_objects::UploadStage;

/// Why a session ended in `Failed`, tagged with the stage that broke.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadFailure {
    pub stage: UploadStage,
    pub message: String,
}

/// Observable state of a single upload.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct UploadSession {
    file_id: Option<Uuid>,
    progress: u8,
    status: Option<UploadStage>,
    error: Option<UploadFailure>,
}

/// Percentage of a transfer, rounded. Only a finished transfer reports 100.
pub fn transfer_percent(bytes_transferred: u64, total_bytes: u64) -> u8 {
    if total_bytes == 0 || bytes_transferred >= total_bytes {
        return 100;
    }

    let ratio = bytes_transferred as f64 / total_bytes as f64;
    let percent = (ratio * 100.0).round() as u8;
    percent.min(99)
}

impl UploadSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn file_id(&self) -> Option<Uuid> {
        self.file_id
    }

    pub fn progress(&self) -> u8 {
        self.progress
    }

    pub fn status(&self) -> Option<UploadStage> {
        self.status
    }

    pub fn error(&self) -> Option<&UploadFailure> {
        self.error.as_ref()
    }

    pub fn is_complete(&self) -> bool {
        self.file_id.is_some()
    }

    pub fn is_failed(&self) -> bool {
        matches!(self.status, Some(UploadStage::Failed))
    }

    pub fn is_terminal(&self) -> bool {
        self.is_complete() || self.is_failed()
    }

    fn enter(&mut self, stage: UploadStage) -> Result<(), String> {
        if self.is_complete() {
            return Err("Upload session already completed".to_string());
        }

        match self.status {
            None => {}
            Some(current) if !current.can_transition_to(&stage) => {
                return Err(format!("Invalid stage transition: {} -> {}", current, stage));
            }
            Some(_) => {}
        }

        self.status = Some(stage);
        Ok(())
    }

    pub fn record_progress(
        &mut self,
        bytes_transferred: u64,
        total_bytes: u64,
    ) -> Result<(), String> {
        self.enter(UploadStage::Uploading)?;
        let percent = transfer_percent(bytes_transferred, total_bytes);
        self.progress = self.progress.max(percent);
        Ok(())
    }

    pub fn advance(&mut self, stage: UploadStage) -> Result<(), String> {
        if stage.is_failed() {
            return Err("Use fail() to record a failure".to_string());
        }

        self.enter(stage)?;
        if stage == UploadStage::Uploaded {
            self.progress = 100;
        }
        Ok(())
    }

    pub fn fail(&mut self, failure: UploadFailure) -> Result<(), String> {
        self.enter(UploadStage::Failed)?;
        self.error = Some(failure);
        Ok(())
    }

    pub fn complete(&mut self, document_id: Uuid) -> Result<(), String> {
        if self.status != Some(UploadStage::Generating) {
            return Err(format!(
                "Upload session cannot complete from {:?}",
                self.status
            ));
        }

        self.file_id = Some(document_id);
        Ok(())
    }
}
