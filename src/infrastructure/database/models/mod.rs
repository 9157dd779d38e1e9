pub mod document_model;
pub mod subscription_model;

pub use document_model::{DocumentModel, NewDocumentModel};
pub use subscription_model::SubscriptionModel;
