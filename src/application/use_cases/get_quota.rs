use std::sync::Arc;
use std::time::Duration;

use crate::application::ports::RemoteStore;
use crate::application::services::QuotaObserver;
use crate::domain::entities::QuotaState;
use crate::domain::value_objects::{Identity, QuotaLimits};

pub struct GetQuotaUseCase {
    remote_store: Arc<dyn RemoteStore>,
    limits: QuotaLimits,
    settle_timeout: Duration,
}

impl GetQuotaUseCase {
    pub fn new(remote_store: Arc<dyn RemoteStore>, limits: QuotaLimits) -> Self {
        Self {
            remote_store,
            limits,
            settle_timeout: Duration::from_secs(10),
        }
    }

    pub fn with_settle_timeout(mut self, settle_timeout: Duration) -> Self {
        self.settle_timeout = settle_timeout;
        self
    }

    /// Starts a live quota observer for the caller.
    pub fn watch(&self, identity: &Identity) -> QuotaObserver {
        QuotaObserver::watch(
            self.remote_store.clone(),
            identity.user_id().cloned(),
            self.limits,
        )
    }

    /// Quota snapshot once both feeds have answered, or whatever is known
    /// when the timeout expires.
    pub async fn execute(&self, identity: &Identity) -> QuotaState {
        let mut observer = self.watch(identity);

        match tokio::time::timeout(self.settle_timeout, observer.wait_until_settled()).await {
            Ok(state) => state,
            Err(_) => {
                tracing::warn!(
                    "Quota feeds did not settle within {:?}, returning partial state",
                    self.settle_timeout
                );
                observer.current()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entities::Subscription;
    use crate::domain::value_objects::{Tier, UserId};
    use crate::infrastructure::memory::InMemoryRemoteStore;

    #[tokio::test]
    async fn test_quota_for_pro_user() {
        let store = Arc::new(InMemoryRemoteStore::new());
        let user_id = UserId::new("pro_user").unwrap();
        store
            .set_subscription(&Subscription::new(user_id.clone(), true));

        let use_case = GetQuotaUseCase::new(store, QuotaLimits::default());
        let state = use_case.execute(&Identity::signed_in(user_id)).await;

        assert_eq!(state.tier, Some(Tier::Pro));
        assert_eq!(state.limit, Some(20));
        assert_eq!(state.document_count, Some(0));
        assert_eq!(state.remaining(), Some(20));
    }

    #[tokio::test]
    async fn test_anonymous_quota_is_empty() {
        let store = Arc::new(InMemoryRemoteStore::new());
        let use_case = GetQuotaUseCase::new(store, QuotaLimits::default());
        let state = use_case.execute(&Identity::anonymous()).await;

        assert_eq!(state, QuotaState::default());
    }
}
