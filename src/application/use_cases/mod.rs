pub mod get_quota;
pub mod get_upload_status;
pub mod upload_document;

pub use get_quota::GetQuotaUseCase;
pub use get_upload_status::{GetUploadStatusError, GetUploadStatusUseCase};
pub use upload_document::{
    UploadDocumentError, UploadDocumentRequest, UploadDocumentResponse, UploadDocumentUseCase,
};
