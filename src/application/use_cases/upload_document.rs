use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use uuid::Uuid;

use crate::application::ports::RemoteStore;
use crate::application::services::{
    QuotaObserver, UploadError, UploadFile, UploadOrchestrator, UploadRegistry,
};
use crate::domain::entities::{QuotaState, UploadSession};
use crate::domain::value_objects::{Identity, QuotaLimits, Tier, UploadStage, UserId};

pub const DEFAULT_SETTLE_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug)]
pub enum UploadDocumentError {
    Unauthenticated,
    ValidationError(String),
    QuotaExceeded {
        tier: Tier,
        limit: u32,
        document_count: usize,
    },
    QuotaUnavailable(String),
}

impl std::fmt::Display for UploadDocumentError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            UploadDocumentError::Unauthenticated => write!(f, "Sign in to upload documents"),
            UploadDocumentError::ValidationError(msg) => write!(f, "Validation error: {}", msg),
            UploadDocumentError::QuotaExceeded {
                tier,
                limit,
                document_count,
            } => write!(
                f,
                "Document limit reached for the {} tier: {} of {} documents",
                tier, document_count, limit
            ),
            UploadDocumentError::QuotaUnavailable(msg) => {
                write!(f, "Quota could not be determined: {}", msg)
            }
        }
    }
}

impl std::error::Error for UploadDocumentError {}

#[derive(Debug, Clone)]
pub struct UploadDocumentRequest {
    pub identity: Identity,
    pub file: UploadFile,
}

#[derive(Debug, Clone)]
pub struct UploadDocumentResponse {
    pub session_id: Uuid,
    pub session: UploadSession,
    pub quota: QuotaState,
}

type PendingUploads = Arc<tokio::sync::Mutex<HashSet<Uuid>>>;

/// Document ids admitted per user that the document feed has not shown yet.
///
/// Each user's set sits behind an async mutex that is held from the quota
/// read until the new id is recorded, so admissions for one user run one at
/// a time.
#[derive(Clone, Default)]
struct ReservationTable {
    users: Arc<Mutex<HashMap<UserId, PendingUploads>>>,
}

impl ReservationTable {
    fn users(&self) -> MutexGuard<'_, HashMap<UserId, PendingUploads>> {
        self.users.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn pending_for(&self, user_id: &UserId) -> PendingUploads {
        self.users().entry(user_id.clone()).or_default().clone()
    }

    fn get(&self, user_id: &UserId) -> Option<PendingUploads> {
        self.users().get(user_id).cloned()
    }

    async fn release(&self, user_id: &UserId, document_id: Uuid) {
        let Some(pending) = self.get(user_id) else {
            return;
        };
        pending.lock().await.remove(&document_id);
        drop(pending);
        self.forget_if_idle(user_id);
    }

    /// Drops the user's entry when it is empty and nobody else holds it.
    fn forget_if_idle(&self, user_id: &UserId) {
        let mut users = self.users();
        let idle = users.get(user_id).is_some_and(|pending| {
            Arc::strong_count(pending) == 1
                && pending.try_lock().is_ok_and(|ids| ids.is_empty())
        });
        if idle {
            users.remove(user_id);
        }
    }
}

/// Admits `document_count + pending < limit`.
///
/// Unknown tier admits; known tier with an unknown count refuses.
fn check_admission(quota: &QuotaState, pending: usize) -> Result<(), UploadDocumentError> {
    let (Some(tier), Some(limit)) = (quota.tier, quota.limit) else {
        return Ok(());
    };

    let Some(document_count) = quota.document_count else {
        return Err(UploadDocumentError::QuotaUnavailable(
            quota
                .documents_error
                .clone()
                .unwrap_or_else(|| "document count unknown".to_string()),
        ));
    };

    if document_count + pending >= limit as usize {
        return Err(UploadDocumentError::QuotaExceeded {
            tier,
            limit,
            document_count,
        });
    }

    Ok(())
}

/// Whether a failed pipeline may have left its record behind.
fn record_may_exist(error: &UploadError, last_stage: Option<UploadStage>) -> bool {
    match error {
        UploadError::Embedding { .. } => true,
        UploadError::Interrupted(_) => matches!(
            last_stage,
            Some(UploadStage::Saving | UploadStage::Generating)
        ),
        UploadError::Transfer(_)
        | UploadError::DownloadReference(_)
        | UploadError::Persistence(_) => false,
    }
}

/// Admits an upload against the caller's quota and starts it.
pub struct UploadDocumentUseCase {
    remote_store: Arc<dyn RemoteStore>,
    orchestrator: UploadOrchestrator,
    registry: Arc<UploadRegistry>,
    limits: QuotaLimits,
    settle_timeout: Duration,
    reservations: ReservationTable,
}

impl UploadDocumentUseCase {
    pub fn new(
        remote_store: Arc<dyn RemoteStore>,
        orchestrator: UploadOrchestrator,
        registry: Arc<UploadRegistry>,
        limits: QuotaLimits,
    ) -> Self {
        Self {
            remote_store,
            orchestrator,
            registry,
            limits,
            settle_timeout: DEFAULT_SETTLE_TIMEOUT,
            reservations: ReservationTable::default(),
        }
    }

    pub fn with_settle_timeout(mut self, settle_timeout: Duration) -> Self {
        self.settle_timeout = settle_timeout;
        self
    }

    pub async fn execute(
        &self,
        request: UploadDocumentRequest,
    ) -> Result<UploadDocumentResponse, UploadDocumentError> {
        let user_id = request
            .identity
            .user_id()
            .cloned()
            .ok_or(UploadDocumentError::Unauthenticated)?;

        if request.file.name.trim().is_empty() {
            return Err(UploadDocumentError::ValidationError(
                "File name cannot be empty".to_string(),
            ));
        }

        let (document_id, quota) = self.admit(&user_id).await?;

        tracing::info!(
            "Starting upload of {} ({} bytes) for user {} (tier: {:?}, documents: {:?})",
            request.file.name,
            request.file.size(),
            user_id,
            quota.tier,
            quota.document_count
        );

        let handle = self
            .orchestrator
            .start_document(document_id, request.file, user_id.clone());
        let session_id = self.registry.register(handle.subscribe()).await;
        let session = handle.session();
        let progress = handle.subscribe();

        let registry = self.registry.clone();
        let reservations = self.reservations.clone();
        tokio::spawn(async move {
            match handle.finished().await {
                Ok(document_id) => tracing::info!(
                    "Upload session {} finished with document {}",
                    session_id,
                    document_id
                ),
                Err(e) => {
                    tracing::warn!("Upload session {} failed: {}", session_id, e);
                    let last_stage = progress.borrow().status();
                    if !record_may_exist(&e, last_stage) {
                        reservations.release(&user_id, document_id).await;
                    }
                }
            }
            registry.mark_finished(session_id).await;
        });

        Ok(UploadDocumentResponse {
            session_id,
            session,
            quota,
        })
    }

    /// Number of admitted uploads for `user_id` that the document feed has not shown yet.
    pub async fn in_flight(&self, user_id: &UserId) -> usize {
        match self.reservations.get(user_id) {
            Some(pending) => pending.lock().await.len(),
            None => 0,
        }
    }

    /// Reads a settled quota and reserves a document id, holding the user's lock throughout.
    async fn admit(&self, user_id: &UserId) -> Result<(Uuid, QuotaState), UploadDocumentError> {
        let pending = self.reservations.pending_for(user_id);
        let mut ids = pending.lock().await;

        let admitted = match self.settled_quota(user_id).await {
            Ok(quota) => {
                ids.retain(|id| !quota.document_ids.contains(id));
                check_admission(&quota, ids.len()).map(|()| quota)
            }
            Err(e) => Err(e),
        };

        let result = admitted.map(|quota| {
            let document_id = Uuid::new_v4();
            ids.insert(document_id);
            (document_id, quota)
        });

        drop(ids);
        drop(pending);
        if result.is_err() {
            self.reservations.forget_if_idle(user_id);
        }
        result
    }

    async fn settled_quota(&self, user_id: &UserId) -> Result<QuotaState, UploadDocumentError> {
        let mut observer =
            QuotaObserver::watch(self.remote_store.clone(), Some(user_id.clone()), self.limits);

        tokio::time::timeout(self.settle_timeout, observer.wait_until_settled())
            .await
            .map_err(|_| {
                UploadDocumentError::QuotaUnavailable(format!(
                    "quota feeds did not respond within {:?}",
                    self.settle_timeout
                ))
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use futures::{StreamExt, stream};

    use crate::application::ports::EmbeddingService;
    use crate::application::ports::embedding_service::EmbeddingServiceError;
    use crate::application::ports::remote_store::{
        DocumentFeed, RemoteStoreError, SubscriptionFeed,
    };
    use crate::domain::entities::{DocumentRecord, Subscription};
    use crate::infrastructure::file_system::LocalBlobStore;
    use crate::infrastructure::memory::InMemoryRemoteStore;

    struct NoopEmbeddings;

    #[async_trait]
    impl EmbeddingService for NoopEmbeddings {
        async fn generate(
            &self,
            _owner: &UserId,
            _document_id: Uuid,
        ) -> Result<(), EmbeddingServiceError> {
            Ok(())
        }
    }

    struct HangingEmbeddings;

    #[async_trait]
    impl EmbeddingService for HangingEmbeddings {
        async fn generate(
            &self,
            _owner: &UserId,
            _document_id: Uuid,
        ) -> Result<(), EmbeddingServiceError> {
            futures::future::pending().await
        }
    }

    #[derive(Clone, Copy)]
    enum WriteBehavior {
        Stall,
        Fail,
    }

    /// Wraps the in-memory store and overrides how records are written.
    struct BrokenWrites {
        inner: InMemoryRemoteStore,
        behavior: WriteBehavior,
    }

    #[async_trait]
    impl RemoteStore for BrokenWrites {
        async fn write_document(
            &self,
            _user_id: &UserId,
            _document_id: Uuid,
            _record: &DocumentRecord,
        ) -> Result<(), RemoteStoreError> {
            match self.behavior {
                WriteBehavior::Stall => futures::future::pending().await,
                WriteBehavior::Fail => {
                    Err(RemoteStoreError::ConnectionError("metadata store offline".to_string()))
                }
            }
        }

        fn subscribe_documents(&self, user_id: &UserId) -> DocumentFeed {
            self.inner.subscribe_documents(user_id)
        }

        fn subscribe_subscription(&self, user_id: &UserId) -> SubscriptionFeed {
            self.inner.subscribe_subscription(user_id)
        }
    }

    /// Writes land, but the document feed keeps serving an empty collection,
    /// like a polled feed that has not caught up yet.
    struct LaggingDocumentFeed {
        inner: InMemoryRemoteStore,
    }

    #[async_trait]
    impl RemoteStore for LaggingDocumentFeed {
        async fn write_document(
            &self,
            user_id: &UserId,
            document_id: Uuid,
            record: &DocumentRecord,
        ) -> Result<(), RemoteStoreError> {
            self.inner.write_document(user_id, document_id, record).await
        }

        fn subscribe_documents(&self, _user_id: &UserId) -> DocumentFeed {
            stream::once(async { Ok(Vec::new()) })
                .chain(stream::pending())
                .boxed()
        }

        fn subscribe_subscription(&self, user_id: &UserId) -> SubscriptionFeed {
            self.inner.subscribe_subscription(user_id)
        }
    }

    fn user() -> UserId {
        UserId::new("user_1").unwrap()
    }

    fn free_member() -> Subscription {
        Subscription::new(user(), false)
    }

    fn file(name: &str) -> UploadFile {
        UploadFile {
            name: name.to_string(),
            content_type: Some("text/plain".to_string()),
            data: vec![b'x'; 100],
        }
    }

    fn request(name: &str) -> UploadDocumentRequest {
        UploadDocumentRequest {
            identity: Identity::signed_in(user()),
            file: file(name),
        }
    }

    fn use_case(store: Arc<dyn RemoteStore>, dir: &std::path::Path) -> UploadDocumentUseCase {
        use_case_with(store, Arc::new(NoopEmbeddings), dir)
    }

    fn use_case_with(
        store: Arc<dyn RemoteStore>,
        embeddings: Arc<dyn EmbeddingService>,
        dir: &std::path::Path,
    ) -> UploadDocumentUseCase {
        let blob_store = Arc::new(LocalBlobStore::new(
            dir.to_path_buf(),
            url::Url::parse("http://localhost/blobs/").unwrap(),
        ));
        let orchestrator = UploadOrchestrator::new(blob_store, store.clone(), embeddings);
        UploadDocumentUseCase::new(
            store,
            orchestrator,
            Arc::new(UploadRegistry::new()),
            QuotaLimits::default(),
        )
        .with_settle_timeout(Duration::from_secs(2))
    }

    fn temp_dir(name: &str) -> std::path::PathBuf {
        let dir = std::env::temp_dir().join(format!("docquota-{}-{}", name, Uuid::new_v4()));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    async fn wait_for_documents(store: &InMemoryRemoteStore, expected: usize) {
        for _ in 0..100 {
            if store.documents(&user()).len() == expected {
                return;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        panic!("expected {} documents", expected);
    }

    async fn wait_for_idle(use_case: &UploadDocumentUseCase) {
        for _ in 0..100 {
            if use_case.in_flight(&user()).await == 0 {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("reservations were not released");
    }

    fn is_free_limit(result: &Result<UploadDocumentResponse, UploadDocumentError>) -> bool {
        matches!(
            result,
            Err(UploadDocumentError::QuotaExceeded {
                tier: Tier::Free,
                limit: 2,
                ..
            })
        )
    }

    #[tokio::test]
    async fn test_anonymous_caller_is_rejected() {
        let dir = temp_dir("anon");
        let store = Arc::new(InMemoryRemoteStore::new());
        let use_case = use_case(store, &dir);

        let result = use_case
            .execute(UploadDocumentRequest {
                identity: Identity::anonymous(),
                file: file("a.txt"),
            })
            .await;

        assert!(matches!(result, Err(UploadDocumentError::Unauthenticated)));
        let _ = std::fs::remove_dir_all(dir);
    }

    #[tokio::test]
    async fn test_free_user_is_stopped_at_two_documents() {
        let dir = temp_dir("free");
        let store = Arc::new(InMemoryRemoteStore::new());
        store.set_subscription(&free_member());
        let use_case = use_case(store.clone(), &dir);

        use_case.execute(request("a.txt")).await.unwrap();
        wait_for_documents(&store, 1).await;
        use_case.execute(request("b.txt")).await.unwrap();
        wait_for_documents(&store, 2).await;

        let result = use_case.execute(request("c.txt")).await;
        assert!(matches!(
            result,
            Err(UploadDocumentError::QuotaExceeded {
                tier: Tier::Free,
                limit: 2,
                document_count: 2
            })
        ));
        // Both written ids were seen in the feed and dropped from the table.
        assert_eq!(use_case.in_flight(&user()).await, 0);
        let _ = std::fs::remove_dir_all(dir);
    }

    #[tokio::test]
    async fn test_concurrent_uploads_cannot_overshoot_the_limit() {
        let dir = temp_dir("concurrent");
        let store = Arc::new(InMemoryRemoteStore::new());
        store.set_subscription(&free_member());
        let use_case = use_case(store.clone(), &dir);

        let (a, b, c) = tokio::join!(
            use_case.execute(request("a.txt")),
            use_case.execute(request("b.txt")),
            use_case.execute(request("c.txt")),
        );
        let results = [a, b, c];

        assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 2);
        assert_eq!(results.iter().filter(|r| is_free_limit(r)).count(), 1);
        wait_for_documents(&store, 2).await;
        let _ = std::fs::remove_dir_all(dir);
    }

    #[tokio::test]
    async fn test_in_flight_uploads_count_against_the_limit() {
        let dir = temp_dir("inflight");
        let store = Arc::new(BrokenWrites {
            inner: InMemoryRemoteStore::new(),
            behavior: WriteBehavior::Stall,
        });
        store.inner.set_subscription(&free_member());
        let use_case = use_case(store, &dir);

        use_case.execute(request("a.txt")).await.unwrap();
        use_case.execute(request("b.txt")).await.unwrap();
        assert_eq!(use_case.in_flight(&user()).await, 2);

        let result = use_case.execute(request("c.txt")).await;
        assert!(matches!(
            result,
            Err(UploadDocumentError::QuotaExceeded {
                document_count: 0,
                ..
            })
        ));
        let _ = std::fs::remove_dir_all(dir);
    }

    #[tokio::test]
    async fn test_written_record_stays_reserved_until_the_feed_shows_it() {
        let dir = temp_dir("lagging");
        let store = Arc::new(LaggingDocumentFeed {
            inner: InMemoryRemoteStore::new(),
        });
        store.inner.set_subscription(&free_member());
        let use_case = use_case(store.clone(), &dir);

        use_case.execute(request("a.txt")).await.unwrap();
        wait_for_documents(&store.inner, 1).await;
        use_case.execute(request("b.txt")).await.unwrap();
        wait_for_documents(&store.inner, 2).await;

        // Both pipelines are done, yet the feed still reports zero documents.
        let result = use_case.execute(request("c.txt")).await;
        assert!(matches!(
            result,
            Err(UploadDocumentError::QuotaExceeded {
                document_count: 0,
                ..
            })
        ));
        assert_eq!(use_case.in_flight(&user()).await, 2);
        let _ = std::fs::remove_dir_all(dir);
    }

    #[tokio::test]
    async fn test_upload_being_indexed_is_counted_once() {
        let dir = temp_dir("indexing");
        let store = Arc::new(InMemoryRemoteStore::new());
        store.set_subscription(&free_member());
        let use_case = use_case_with(store.clone(), Arc::new(HangingEmbeddings), &dir);

        use_case.execute(request("a.txt")).await.unwrap();
        wait_for_documents(&store, 1).await;

        // The first upload is stuck generating embeddings; its record is in the
        // feed, so only the second upload is still reserved.
        let response = use_case.execute(request("b.txt")).await.unwrap();
        assert_eq!(response.quota.document_count, Some(1));
        assert_eq!(use_case.in_flight(&user()).await, 1);
        let _ = std::fs::remove_dir_all(dir);
    }

    #[tokio::test]
    async fn test_unknown_tier_is_admitted() {
        let dir = temp_dir("unknown");
        let store = Arc::new(InMemoryRemoteStore::new());
        let use_case = use_case(store.clone(), &dir);

        for name in ["a.txt", "b.txt", "c.txt"] {
            let response = use_case.execute(request(name)).await.unwrap();
            assert_eq!(response.quota.tier, None);
        }

        wait_for_documents(&store, 3).await;
        let _ = std::fs::remove_dir_all(dir);
    }

    #[tokio::test]
    async fn test_failed_write_releases_its_reservation() {
        let dir = temp_dir("release");
        let store = Arc::new(BrokenWrites {
            inner: InMemoryRemoteStore::new(),
            behavior: WriteBehavior::Fail,
        });
        store.inner.set_subscription(&free_member());
        let use_case = use_case(store, &dir);

        for name in ["a.txt", "b.txt", "c.txt"] {
            use_case.execute(request(name)).await.unwrap();
            wait_for_idle(&use_case).await;
        }
        let _ = std::fs::remove_dir_all(dir);
    }

    #[test]
    fn test_interrupted_pipeline_keeps_reservation_once_saving_started() {
        let interrupted = UploadError::Interrupted("task aborted".to_string());
        assert!(!record_may_exist(&interrupted, Some(UploadStage::Uploaded)));
        assert!(record_may_exist(&interrupted, Some(UploadStage::Saving)));
        assert!(record_may_exist(&interrupted, Some(UploadStage::Generating)));

        let persistence = UploadError::Persistence("write failed".to_string());
        assert!(!record_may_exist(&persistence, Some(UploadStage::Failed)));
    }
}
