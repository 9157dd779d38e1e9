pub mod blob_store;
pub mod embedding_service;
pub mod remote_store;

pub use blob_store::BlobStore;
pub use embedding_service::EmbeddingService;
pub use remote_store::RemoteStore;
