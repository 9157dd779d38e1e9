pub mod quota_observer;
pub mod upload_orchestrator;
pub mod upload_registry;

pub use quota_observer::QuotaObserver;
pub use upload_orchestrator::{UploadError, UploadFile, UploadHandle, UploadOrchestrator};
pub use upload_registry::UploadRegistry;
