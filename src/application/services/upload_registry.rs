use std::collections::HashMap;
use std::time::{Duration, Instant};
use tokio::sync::{RwLock, watch};
use uuid::Uuid;

use crate::domain::entities::UploadSession;

pub const DEFAULT_RETENTION: Duration = Duration::from_secs(15 * 60);
pub const DEFAULT_MAX_AGE: Duration = Duration::from_secs(6 * 60 * 60);

struct Entry {
    session: watch::Receiver<UploadSession>,
    registered_at: Instant,
    finished_at: Option<Instant>,
}

impl Entry {
    fn expired(&self, retention: Duration, max_age: Duration) -> bool {
        match self.finished_at {
            Some(finished_at) => finished_at.elapsed() >= retention,
            None => self.registered_at.elapsed() >= max_age,
        }
    }
}

/// Keeps running and recently finished upload sessions addressable by id.
///
/// A finished session stays visible for `retention` after `mark_finished`.
/// Sessions never marked finished are dropped once they are `max_age` old.
pub struct UploadRegistry {
    sessions: RwLock<HashMap<Uuid, Entry>>,
    retention: Duration,
    max_age: Duration,
}

impl UploadRegistry {
    pub fn new() -> Self {
        Self::with_limits(DEFAULT_RETENTION, DEFAULT_MAX_AGE)
    }

    pub fn with_limits(retention: Duration, max_age: Duration) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            retention,
            max_age,
        }
    }

    pub async fn register(&self, session: watch::Receiver<UploadSession>) -> Uuid {
        let session_id = Uuid::new_v4();
        let mut sessions = self.sessions.write().await;
        self.evict_expired(&mut sessions);
        sessions.insert(
            session_id,
            Entry {
                session,
                registered_at: Instant::now(),
                finished_at: None,
            },
        );
        session_id
    }

    /// Starts the retention clock for a session whose pipeline has ended.
    pub async fn mark_finished(&self, session_id: Uuid) {
        let mut sessions = self.sessions.write().await;
        if let Some(entry) = sessions.get_mut(&session_id) {
            entry.finished_at.get_or_insert_with(Instant::now);
        }
        self.evict_expired(&mut sessions);
    }

    pub async fn snapshot(&self, session_id: Uuid) -> Option<UploadSession> {
        let sessions = self.sessions.read().await;
        sessions
            .get(&session_id)
            .map(|entry| entry.session.borrow().clone())
    }

    pub async fn subscribe(&self, session_id: Uuid) -> Option<watch::Receiver<UploadSession>> {
        let sessions = self.sessions.read().await;
        sessions.get(&session_id).map(|entry| entry.session.clone())
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    fn evict_expired(&self, sessions: &mut HashMap<Uuid, Entry>) {
        let before = sessions.len();
        sessions.retain(|_, entry| !entry.expired(self.retention, self.max_age));
        let evicted = before - sessions.len();
        if evicted > 0 {
            tracing::debug!("Evicted {} upload sessions", evicted);
        }
    }
}

impl Default for UploadRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::value_objects::UploadStage;

    #[tokio::test]
    async fn test_register_and_snapshot() {
        let registry = UploadRegistry::new();
        let (tx, rx) = watch::channel(UploadSession::new());
        let session_id = registry.register(rx).await;

        tx.send_modify(|session| session.record_progress(10, 100).unwrap());

        let snapshot = registry.snapshot(session_id).await.unwrap();
        assert_eq!(snapshot.progress(), 10);
        assert_eq!(snapshot.status(), Some(UploadStage::Uploading));
        assert!(registry.snapshot(Uuid::new_v4()).await.is_none());
    }

    #[tokio::test]
    async fn test_retention_counts_from_finish() {
        let registry = UploadRegistry::with_limits(Duration::from_millis(50), DEFAULT_MAX_AGE);
        let (_tx, rx) = watch::channel(UploadSession::new());
        let session_id = registry.register(rx).await;

        // Older than the retention window, but not finished yet.
        tokio::time::sleep(Duration::from_millis(80)).await;
        registry.mark_finished(session_id).await;
        assert!(registry.snapshot(session_id).await.is_some());

        tokio::time::sleep(Duration::from_millis(80)).await;
        let (_other_tx, other_rx) = watch::channel(UploadSession::new());
        registry.register(other_rx).await;
        assert!(registry.snapshot(session_id).await.is_none());
        assert_eq!(registry.len().await, 1);
    }

    #[tokio::test]
    async fn test_stuck_sessions_are_evicted_by_age() {
        let registry = UploadRegistry::with_limits(DEFAULT_RETENTION, Duration::ZERO);
        let (_stuck_tx, stuck_rx) = watch::channel(UploadSession::new());
        let stuck_id = registry.register(stuck_rx).await;

        let (_next_tx, next_rx) = watch::channel(UploadSession::new());
        registry.register(next_rx).await;

        assert!(registry.snapshot(stuck_id).await.is_none());
    }
}
