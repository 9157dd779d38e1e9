use async_trait::async_trait;
use futures::stream::{self, BoxStream, StreamExt};
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use tokio::sync::watch;
use uuid::Uuid;

use crate::application::ports::remote_store::{
    DocumentFeed, RemoteStore, RemoteStoreError, SubscriptionFeed,
};
use crate::domain::entities::{Document, DocumentRecord, Subscription};
use crate::domain::value_objects::UserId;

struct UserEntry {
    documents: watch::Sender<Vec<Document>>,
    subscription: watch::Sender<Option<Subscription>>,
}

impl UserEntry {
    fn new() -> Self {
        Self {
            documents: watch::channel(Vec::new()).0,
            subscription: watch::channel(None).0,
        }
    }
}

/// Process-local metadata store with push-based feeds.
pub struct InMemoryRemoteStore {
    users: Mutex<HashMap<UserId, UserEntry>>,
}

impl InMemoryRemoteStore {
    pub fn new() -> Self {
        Self {
            users: Mutex::new(HashMap::new()),
        }
    }

    fn users(&self) -> MutexGuard<'_, HashMap<UserId, UserEntry>> {
        self.users
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Current documents of a user, oldest first.
    pub fn documents(&self, user_id: &UserId) -> Vec<Document> {
        self.users()
            .get(user_id)
            .map(|entry| entry.documents.borrow().clone())
            .unwrap_or_default()
    }

    /// Stands in for the billing system, which owns subscription records.
    pub fn set_subscription(&self, subscription: &Subscription) {
        let mut users = self.users();
        let entry = users
            .entry(subscription.user_id.clone())
            .or_insert_with(UserEntry::new);
        entry.subscription.send_replace(Some(subscription.clone()));
    }

    /// Number of open feeds for a user.
    pub fn active_feeds(&self, user_id: &UserId) -> usize {
        self.users()
            .get(user_id)
            .map(|entry| entry.documents.receiver_count() + entry.subscription.receiver_count())
            .unwrap_or(0)
    }
}

impl Default for InMemoryRemoteStore {
    fn default() -> Self {
        Self::new()
    }
}

fn feed<T>(receiver: watch::Receiver<T>) -> BoxStream<'static, Result<T, RemoteStoreError>>
where
    T: Clone + Send + Sync + 'static,
{
    stream::unfold((receiver, true), |(mut receiver, first)| async move {
        if !first && receiver.changed().await.is_err() {
            return None;
        }
        let value = receiver.borrow_and_update().clone();
        Some((Ok(value), (receiver, false)))
    })
    .boxed()
}

#[async_trait]
impl RemoteStore for InMemoryRemoteStore {
    async fn write_document(
        &self,
        user_id: &UserId,
        document_id: Uuid,
        record: &DocumentRecord,
    ) -> Result<(), RemoteStoreError> {
        let mut users = self.users();
        let entry = users.entry(user_id.clone()).or_insert_with(UserEntry::new);

        if entry.documents.borrow().iter().any(|d| d.id() == document_id) {
            return Err(RemoteStoreError::DuplicateError(format!(
                "Document {} already exists",
                document_id
            )));
        }

        let document = Document::from_record(document_id, user_id.clone(), record.clone());
        entry.documents.send_modify(|documents| documents.push(document));
        Ok(())
    }

    fn subscribe_documents(&self, user_id: &UserId) -> DocumentFeed {
        let mut users = self.users();
        let entry = users.entry(user_id.clone()).or_insert_with(UserEntry::new);
        feed(entry.documents.subscribe())
    }

    fn subscribe_subscription(&self, user_id: &UserId) -> SubscriptionFeed {
        let mut users = self.users();
        let entry = users.entry(user_id.clone()).or_insert_with(UserEntry::new);
        feed(entry.subscription.subscribe())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn user() -> UserId {
        UserId::new("user_1").unwrap()
    }

    fn record() -> DocumentRecord {
        DocumentRecord {
            name: "paper.pdf".to_string(),
            size: 100,
            mime_type: "application/pdf".to_string(),
            download_url: "https://blobs.test/users/user_1/files/a".to_string(),
            storage_ref: "users/user_1/files/a".to_string(),
            created_at: Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap(),
        }
    }

    #[tokio::test]
    async fn test_written_record_reads_back_identically() {
        let store = InMemoryRemoteStore::new();
        let id = Uuid::new_v4();
        store.write_document(&user(), id, &record()).await.unwrap();

        let mut documents = store.subscribe_documents(&user());
        let current = documents.next().await.unwrap().unwrap();

        assert_eq!(current.len(), 1);
        assert_eq!(current[0].id(), id);
        assert_eq!(current[0].record(), record());
    }

    #[tokio::test]
    async fn test_duplicate_document_id_is_rejected() {
        let store = InMemoryRemoteStore::new();
        let id = Uuid::new_v4();
        store.write_document(&user(), id, &record()).await.unwrap();

        let again = store.write_document(&user(), id, &record()).await;
        assert!(matches!(again, Err(RemoteStoreError::DuplicateError(_))));
    }

    #[tokio::test]
    async fn test_document_feed_pushes_changes() {
        let store = InMemoryRemoteStore::new();
        let mut documents = store.subscribe_documents(&user());
        assert!(documents.next().await.unwrap().unwrap().is_empty());

        store
            .write_document(&user(), Uuid::new_v4(), &record())
            .await
            .unwrap();
        assert_eq!(documents.next().await.unwrap().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_subscription_feed_starts_empty() {
        let store = InMemoryRemoteStore::new();
        let mut feed = store.subscribe_subscription(&user());
        assert_eq!(feed.next().await.unwrap().unwrap(), None);

        store
            .set_subscription(&Subscription::new(user(), true));
        let record = feed.next().await.unwrap().unwrap().unwrap();
        assert!(record.has_active_membership);
    }

    #[tokio::test]
    async fn test_users_are_isolated() {
        let store = InMemoryRemoteStore::new();
        let other = UserId::new("user_2").unwrap();
        store
            .write_document(&user(), Uuid::new_v4(), &record())
            .await
            .unwrap();

        assert_eq!(store.documents(&user()).len(), 1);
        assert!(store.documents(&other).is_empty());
    }
}
