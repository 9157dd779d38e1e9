use async_trait::async_trait;
use diesel::prelude::*;
use futures::stream::{self, BoxStream, StreamExt};
use std::time::Duration;
use uuid::Uuid;

use crate::application::ports::remote_store::{
    DocumentFeed, RemoteStore, RemoteStoreError, SubscriptionFeed,
};
use crate::domain::entities::{Document, DocumentRecord, Subscription};
use crate::domain::value_objects::UserId;
use crate::infrastructure::database::models::{DocumentModel, NewDocumentModel, SubscriptionModel};
use crate::infrastructure::database::schema::{documents, user_subscriptions};
use crate::infrastructure::database::{DbPool, get_connection_from_pool};

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(1000);

/// Postgres-backed metadata store. Feeds poll and emit only when the result changes.
pub struct PostgresRemoteStore {
    pool: DbPool,
    poll_interval: Duration,
}

impl PostgresRemoteStore {
    pub fn new(pool: DbPool) -> Self {
        Self {
            pool,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }
}

fn load_documents(pool: &DbPool, owner: &UserId) -> Result<Vec<Document>, RemoteStoreError> {
    let mut conn = get_connection_from_pool(pool)
        .map_err(|e| RemoteStoreError::ConnectionError(e.to_string()))?;

    let models = documents::table
        .filter(documents::owner_id.eq(owner.as_str()))
        .order(documents::created_at.asc())
        .select(DocumentModel::as_select())
        .load(&mut conn)
        .map_err(|e| RemoteStoreError::DatabaseError(e.to_string()))?;

    models
        .into_iter()
        .map(|model| Document::try_from(model).map_err(RemoteStoreError::ValidationError))
        .collect()
}

fn load_subscription(
    pool: &DbPool,
    user_id: &UserId,
) -> Result<Option<Subscription>, RemoteStoreError> {
    let mut conn = get_connection_from_pool(pool)
        .map_err(|e| RemoteStoreError::ConnectionError(e.to_string()))?;

    let model = user_subscriptions::table
        .find(user_id.as_str())
        .select(SubscriptionModel::as_select())
        .first(&mut conn)
        .optional()
        .map_err(|e| RemoteStoreError::DatabaseError(e.to_string()))?;

    model
        .map(|m| Subscription::try_from(m).map_err(RemoteStoreError::ValidationError))
        .transpose()
}

async fn blocking<T, F>(task: F) -> Result<T, RemoteStoreError>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T, RemoteStoreError> + Send + 'static,
{
    tokio::task::spawn_blocking(task)
        .await
        .unwrap_or_else(|e| Err(RemoteStoreError::DatabaseError(e.to_string())))
}

struct PollState<T> {
    last: Option<T>,
    failing: bool,
    first: bool,
}

/// Turns a query into a live feed by polling it.
///
/// Emits the first result immediately, then only values that differ from the
/// previous one. A run of failures is reported once, and the first success
/// after it is always emitted.
fn poll_feed<T, F>(interval: Duration, load: F) -> BoxStream<'static, Result<T, RemoteStoreError>>
where
    T: PartialEq + Clone + Send + 'static,
    F: Fn() -> Result<T, RemoteStoreError> + Clone + Send + Sync + 'static,
{
    let initial = PollState {
        last: None,
        failing: false,
        first: true,
    };

    stream::unfold(initial, move |mut state| {
        let load = load.clone();
        async move {
            loop {
                if !state.first {
                    tokio::time::sleep(interval).await;
                }
                state.first = false;

                let load = load.clone();
                match blocking(move || load()).await {
                    Ok(value) => {
                        state.failing = false;
                        if state.last.as_ref() != Some(&value) {
                            state.last = Some(value.clone());
                            return Some((Ok(value), state));
                        }
                    }
                    Err(e) if !state.failing => {
                        state.failing = true;
                        // The next success is published even if unchanged, clearing the error.
                        state.last = None;
                        return Some((Err(e), state));
                    }
                    Err(_) => {}
                }
            }
        }
    })
    .boxed()
}

#[async_trait]
impl RemoteStore for PostgresRemoteStore {
    async fn write_document(
        &self,
        user_id: &UserId,
        document_id: Uuid,
        record: &DocumentRecord,
    ) -> Result<(), RemoteStoreError> {
        let new_document = NewDocumentModel::from_record(user_id, document_id, record)
            .map_err(RemoteStoreError::ValidationError)?;
        let pool = self.pool.clone();

        blocking(move || {
            let mut conn = get_connection_from_pool(&pool)
                .map_err(|e| RemoteStoreError::ConnectionError(e.to_string()))?;

            diesel::insert_into(documents::table)
                .values(&new_document)
                .execute(&mut conn)
                .map_err(|e| match e {
                    diesel::result::Error::DatabaseError(
                        diesel::result::DatabaseErrorKind::UniqueViolation,
                        _,
                    ) => RemoteStoreError::DuplicateError(format!(
                        "Document {} already exists",
                        new_document.id
                    )),
                    other => RemoteStoreError::DatabaseError(other.to_string()),
                })?;

            Ok(())
        })
        .await
    }

    fn subscribe_documents(&self, user_id: &UserId) -> DocumentFeed {
        let pool = self.pool.clone();
        let owner = user_id.clone();
        poll_feed(self.poll_interval, move || load_documents(&pool, &owner))
    }

    fn subscribe_subscription(&self, user_id: &UserId) -> SubscriptionFeed {
        let pool = self.pool.clone();
        let user_id = user_id.clone();
        poll_feed(self.poll_interval, move || load_subscription(&pool, &user_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test]
    async fn test_poll_feed_emits_only_changes() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        // 0, 0, 1, 1, 2, ...
        let feed = poll_feed(Duration::from_millis(1), move || {
            Ok(counter.fetch_add(1, Ordering::SeqCst) / 2)
        });

        let values: Vec<usize> = feed
            .take(3)
            .map(|item| item.unwrap())
            .collect()
            .await;

        assert_eq!(values, vec![0, 1, 2]);
        assert!(calls.load(Ordering::SeqCst) >= 5);
    }

    #[tokio::test]
    async fn test_poll_feed_reports_a_failure_run_once() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        // ok(7), err, err, err, ok(8)
        let feed = poll_feed(Duration::from_millis(1), move || {
            match counter.fetch_add(1, Ordering::SeqCst) {
                0 => Ok(7),
                1..=3 => Err(RemoteStoreError::ConnectionError("down".to_string())),
                _ => Ok(8),
            }
        });

        let items: Vec<Result<u32, RemoteStoreError>> = feed.take(3).collect().await;

        assert_eq!(items[0], Ok(7));
        assert!(items[1].is_err());
        assert_eq!(items[2], Ok(8));
    }

    #[tokio::test]
    async fn test_poll_feed_republishes_unchanged_value_after_recovery() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        // ok(7), err, ok(7), ok(7), ...
        let feed = poll_feed(Duration::from_millis(1), move || {
            match counter.fetch_add(1, Ordering::SeqCst) {
                1 => Err(RemoteStoreError::ConnectionError("blip".to_string())),
                _ => Ok(7u32),
            }
        });

        let items = tokio::time::timeout(
            Duration::from_millis(500),
            feed.take(3).collect::<Vec<_>>(),
        )
        .await
        .expect("recovered value was not published");

        assert_eq!(items[0], Ok(7));
        assert!(items[1].is_err());
        assert_eq!(items[2], Ok(7));
    }
}
