use futures::stream::{self, Stream, StreamExt};
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::application::ports::RemoteStore;
use crate::application::ports::remote_store::RemoteStoreError;
use crate::domain::entities::{Document, QuotaInputs, QuotaState, Subscription};
use crate::domain::value_objects::{QuotaLimits, UserId};

enum FeedEvent {
    Subscription(Result<Option<Subscription>, RemoteStoreError>),
    Documents(Result<Vec<Document>, RemoteStoreError>),
}

/// Live quota view for one user, fed by the subscription and document feeds.
///
/// Both feeds are merged into a single event stream; every event updates the
/// inputs and the state is re-derived from scratch. Dropping the observer
/// stops the feed task and with it both subscriptions.
pub struct QuotaObserver {
    state_rx: watch::Receiver<QuotaState>,
    feed_task: Option<JoinHandle<()>>,
}

impl QuotaObserver {
    pub fn watch(
        remote_store: Arc<dyn RemoteStore>,
        user_id: Option<UserId>,
        limits: QuotaLimits,
    ) -> Self {
        let Some(user_id) = user_id else {
            // Nobody to watch: settled, unknown tier, never over limit.
            let (_state_tx, state_rx) = watch::channel(QuotaState::default());
            return Self {
                state_rx,
                feed_task: None,
            };
        };

        let (state_tx, state_rx) = watch::channel(QuotaState::loading());

        let events = stream::select(
            remote_store
                .subscribe_subscription(&user_id)
                .map(FeedEvent::Subscription),
            remote_store
                .subscribe_documents(&user_id)
                .map(FeedEvent::Documents),
        );

        let feed_task = tokio::spawn(run_feeds(user_id, events, state_tx, limits));

        Self {
            state_rx,
            feed_task: Some(feed_task),
        }
    }

    pub fn current(&self) -> QuotaState {
        self.state_rx.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<QuotaState> {
        self.state_rx.clone()
    }

    /// Resolves once both feeds have delivered a value or an error.
    pub async fn wait_until_settled(&mut self) -> QuotaState {
        let settled = self
            .state_rx
            .wait_for(QuotaState::is_settled)
            .await
            .map(|state| state.clone());

        settled.unwrap_or_else(|_| self.current())
    }

    /// Waits for the next published state. `None` once the feeds have ended.
    pub async fn changed(&mut self) -> Option<QuotaState> {
        self.state_rx.changed().await.ok()?;
        Some(self.state_rx.borrow_and_update().clone())
    }
}

impl Drop for QuotaObserver {
    fn drop(&mut self) {
        if let Some(task) = self.feed_task.take() {
            task.abort();
        }
    }
}

fn apply(inputs: &mut QuotaInputs, event: FeedEvent, user_id: &UserId) {
    match event {
        FeedEvent::Subscription(Ok(record)) => {
            // A missing record leaves the last known membership in place.
            if let Some(record) = record {
                inputs.has_active_membership = Some(record.has_active_membership);
            }
            inputs.subscription_loading = false;
            inputs.subscription_error = None;
        }
        FeedEvent::Subscription(Err(e)) => {
            tracing::warn!("Subscription feed error for user {}: {}", user_id, e);
            inputs.subscription_loading = false;
            inputs.subscription_error = Some(e.to_string());
        }
        FeedEvent::Documents(Ok(documents)) => {
            inputs.document_count = Some(documents.len());
            inputs.document_ids = documents.iter().map(Document::id).collect();
            inputs.documents_loading = false;
            inputs.documents_error = None;
        }
        FeedEvent::Documents(Err(e)) => {
            tracing::warn!("Document feed error for user {}: {}", user_id, e);
            inputs.documents_loading = false;
            inputs.documents_error = Some(e.to_string());
        }
    }
}

async fn run_feeds<S>(
    user_id: UserId,
    mut events: S,
    state_tx: watch::Sender<QuotaState>,
    limits: QuotaLimits,
) where
    S: Stream<Item = FeedEvent> + Unpin,
{
    let mut inputs = QuotaInputs::loading();

    while let Some(event) = events.next().await {
        apply(&mut inputs, event, &user_id);

        let previous_over_limit = state_tx.borrow().over_limit;
        let next = QuotaState::derive(&inputs, previous_over_limit, &limits);

        tracing::debug!(
            "Quota for user {}: tier={:?} documents={:?} limit={:?} over_limit={}",
            user_id,
            next.tier,
            next.document_count,
            next.limit,
            next.over_limit
        );

        state_tx.send_replace(next);

        if state_tx.is_closed() {
            break;
        }
    }

    // Feeds ended without ever delivering: stop reporting them as loading.
    if inputs.subscription_loading || inputs.documents_loading {
        inputs.subscription_loading = false;
        inputs.documents_loading = false;
        let previous_over_limit = state_tx.borrow().over_limit;
        state_tx.send_replace(QuotaState::derive(&inputs, previous_over_limit, &limits));
    }
}
