pub mod quota_dto;
pub mod response_dto;
pub mod upload_dto;

pub use quota_dto::*;
pub use response_dto::*;
pub use upload_dto::*;
