use serde::Serialize;
use std::collections::BTreeSet;
use uuid::Uuid;

use crate::domain::value_objects::{QuotaLimits, Tier};

/// Latest values delivered by the two quota feeds.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct QuotaInputs {
    pub has_active_membership: Option<bool>,
    pub document_count: Option<usize>,
    /// Ids in the last delivered collection.
    pub document_ids: BTreeSet<Uuid>,
    pub subscription_loading: bool,
    pub documents_loading: bool,
    pub subscription_error: Option<String>,
    pub documents_error: Option<String>,
}

impl QuotaInputs {
    /// Both feeds open, nothing delivered yet.
    pub fn loading() -> Self {
        Self {
            subscription_loading: true,
            documents_loading: true,
            ..Self::default()
        }
    }
}

/// Derived quota view for one user.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct QuotaState {
    pub tier: Option<Tier>,
    pub has_active_membership: Option<bool>,
    pub document_count: Option<usize>,
    #[serde(skip)]
    pub document_ids: BTreeSet<Uuid>,
    pub limit: Option<u32>,
    pub over_limit: bool,
    pub subscription_loading: bool,
    pub documents_loading: bool,
    pub subscription_error: Option<String>,
    pub documents_error: Option<String>,
}

impl QuotaState {
    pub fn loading() -> Self {
        Self::derive(&QuotaInputs::loading(), false, &QuotaLimits::default())
    }

    /// Combines the feed inputs into a quota view.
    ///
    /// `over_limit` is only recomputed when both the tier and the document
    /// count are known; otherwise the previous value is carried forward.
    pub fn derive(inputs: &QuotaInputs, previous_over_limit: bool, limits: &QuotaLimits) -> Self {
        let tier = inputs.has_active_membership.map(Tier::from_membership);
        let limit = limits.limit_for(tier);

        let over_limit = match (limit, inputs.document_count) {
            (Some(limit), Some(count)) => count >= limit as usize,
            _ => previous_over_limit,
        };

        Self {
            tier,
            has_active_membership: inputs.has_active_membership,
            document_count: inputs.document_count,
            document_ids: inputs.document_ids.clone(),
            limit,
            over_limit,
            subscription_loading: inputs.subscription_loading,
            documents_loading: inputs.documents_loading,
            subscription_error: inputs.subscription_error.clone(),
            documents_error: inputs.documents_error.clone(),
        }
    }

    pub fn is_settled(&self) -> bool {
        !self.subscription_loading && !self.documents_loading
    }

    pub fn remaining(&self) -> Option<u32> {
        let limit = self.limit?;
        let count = u32::try_from(self.document_count?).unwrap_or(u32::MAX);
        Some(limit.saturating_sub(count))
    }
}
