pub mod identity;
pub mod storage_path;
pub mod tier;
pub mod upload_stage;
pub mod user_id;

pub use identity::Identity;
pub use storage_path::StoragePath;
pub use tier::{QuotaLimits, Tier};
pub use upload_stage::UploadStage;
pub use user_id::UserId;
