use serde::Serialize;

use crate::domain::entities::QuotaState;

#[derive(Debug, Serialize)]
pub struct QuotaDto {
    pub tier: Option<String>,
    pub has_active_membership: Option<bool>,
    pub document_count: Option<usize>,
    pub limit: Option<u32>,
    pub remaining: Option<u32>,
    pub over_limit: bool,
    pub loading: bool,
    pub subscription_error: Option<String>,
    pub documents_error: Option<String>,
}

impl From<&QuotaState> for QuotaDto {
    fn from(state: &QuotaState) -> Self {
        Self {
            tier: state.tier.map(|tier| tier.as_str().to_string()),
            has_active_membership: state.has_active_membership,
            document_count: state.document_count,
            limit: state.limit,
            remaining: state.remaining(),
            over_limit: state.over_limit,
            loading: !state.is_settled(),
            subscription_error: state.subscription_error.clone(),
            documents_error: state.documents_error.clone(),
        }
    }
}
