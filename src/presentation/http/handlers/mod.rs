pub mod blob_handler;
pub mod health_handler;
pub mod identity;
pub mod quota_handler;
pub mod sse_handler;
pub mod upload_handler;

pub use blob_handler::BlobHandler;
pub use health_handler::HealthHandler;
pub use identity::CallerIdentity;
pub use quota_handler::QuotaHandler;
pub use upload_handler::UploadHandler;
