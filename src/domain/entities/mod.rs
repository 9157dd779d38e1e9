pub mod document;
pub mod quota_state;
pub mod subscription;
pub mod upload_session;

pub use document::{Document, DocumentRecord};
pub use quota_state::{QuotaInputs, QuotaState};
pub use subscription::Subscription;
pub use upload_session::{UploadFailure, UploadSession};
