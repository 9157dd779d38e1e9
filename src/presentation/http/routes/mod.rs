pub mod blob_routes;
pub mod health_routes;
pub mod quota_routes;
pub mod upload_routes;

pub use blob_routes::*;
pub use health_routes::*;
pub use quota_routes::*;
pub use upload_routes::*;
