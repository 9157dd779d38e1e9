use serde::{Deserialize, Serialize};

/// One step of the upload pipeline.
///
/// The forward stages are strictly ordered. `Failed` can be entered from any
/// forward stage and is never left again. Successful completion has no stage
/// of its own: the session exposes the document id instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UploadStage {
    Uploading,
    Uploaded,
    Saving,
    Generating,
    Failed,
}

impl UploadStage {
    /// Position in the forward order; `None` for `Failed`.
    pub fn rank(&self) -> Option<u8> {
        match self {
            UploadStage::Uploading => Some(0),
            UploadStage::Uploaded => Some(1),
            UploadStage::Saving => Some(2),
            UploadStage::Generating => Some(3),
            UploadStage::Failed => None,
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, UploadStage::Failed)
    }

    pub fn can_transition_to(&self, next: &UploadStage) -> bool {
        match (self.rank(), next.rank()) {
            (None, _) => false,
            (Some(_), None) => true,
            // Repeated progress events keep the session in `Uploading`.
            (Some(0), Some(0)) => true,
            (Some(current), Some(next)) => next > current,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            UploadStage::Uploading => "uploading",
            UploadStage::Uploaded => "uploaded",
            UploadStage::Saving => "saving",
            UploadStage::Generating => "generating",
            UploadStage::Failed => "failed",
        }
    }

    /// Human readable line shown next to the progress bar.
    pub fn status_text(&self) -> &'static str {
        match self {
            UploadStage::Uploading => "Uploading file...",
            UploadStage::Uploaded => "File uploaded successfully!",
            UploadStage::Saving => "Saving file to database...",
            UploadStage::Generating => "Generating AI Embeddings, this only takes a few seconds...",
            UploadStage::Failed => "Upload failed",
        }
    }

    pub fn from_string(s: &str) -> Result<Self, String> {
        match s.to_lowercase().as_str() {
            "uploading" => Ok(UploadStage::Uploading),
            "uploaded" => Ok(UploadStage::Uploaded),
            "saving" => Ok(UploadStage::Saving),
            "generating" => Ok(UploadStage::Generating),
            "failed" => Ok(UploadStage::Failed),
            _ => Err(format!("Invalid upload stage: {}", s)),
        }
    }
}

impl std::fmt::Display for UploadStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
