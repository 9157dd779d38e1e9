use futures::StreamExt;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::application::ports::blob_store::{StoredObject, TransferEvent};
use crate::application::ports::embedding_service::EmbeddingServiceError;
use crate::application::ports::{BlobStore, EmbeddingService, RemoteStore};
use crate::domain::entities::{Document, UploadFailure, UploadSession};
use crate::domain::value_objects::{StoragePath, UploadStage, UserId};

#[derive(Debug, Clone, PartialEq)]
pub enum UploadError {
    Transfer(String),
    DownloadReference(String),
    Persistence(String),
    Embedding { document_id: Uuid, message: String },
    Interrupted(String),
}

impl UploadError {
    /// Pipeline stage the error belongs to.
    pub fn stage(&self) -> UploadStage {
        match self {
            UploadError::Transfer(_) | UploadError::Interrupted(_) => UploadStage::Uploading,
            UploadError::DownloadReference(_) => UploadStage::Uploaded,
            UploadError::Persistence(_) => UploadStage::Saving,
            UploadError::Embedding { .. } => UploadStage::Generating,
        }
    }

    pub fn failure(&self) -> UploadFailure {
        UploadFailure {
            stage: self.stage(),
            message: self.to_string(),
        }
    }
}

impl std::fmt::Display for UploadError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            UploadError::Transfer(msg) => write!(f, "Transfer error: {}", msg),
            UploadError::DownloadReference(msg) => write!(f, "Download reference error: {}", msg),
            UploadError::Persistence(msg) => write!(f, "Persistence error: {}", msg),
            UploadError::Embedding {
                document_id,
                message,
            } => write!(
                f,
                "Embedding error: {} (document {} is stored but not indexed)",
                message, document_id
            ),
            UploadError::Interrupted(msg) => write!(f, "Upload interrupted: {}", msg),
        }
    }
}

impl std::error::Error for UploadError {}

/// A file selected by the caller for upload.
#[derive(Debug, Clone)]
pub struct UploadFile {
    pub name: String,
    pub content_type: Option<String>,
    pub data: Vec<u8>,
}

impl UploadFile {
    pub fn size(&self) -> u64 {
        self.data.len() as u64
    }
}

/// Caller's view of one running upload.
pub struct UploadHandle {
    document_id: Uuid,
    session: watch::Receiver<UploadSession>,
    task: JoinHandle<Result<Uuid, UploadError>>,
}

impl UploadHandle {
    /// Id the document record will be written under.
    pub fn document_id(&self) -> Uuid {
        self.document_id
    }

    pub fn session(&self) -> UploadSession {
        self.session.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<UploadSession> {
        self.session.clone()
    }

    pub async fn finished(self) -> Result<Uuid, UploadError> {
        self.task
            .await
            .unwrap_or_else(|e| Err(UploadError::Interrupted(e.to_string())))
    }
}

/// Drives a file through upload → save → embedding generation.
///
/// Quota admission is not checked here; callers decide whether an upload may start.
#[derive(Clone)]
pub struct UploadOrchestrator {
    blob_store: Arc<dyn BlobStore>,
    remote_store: Arc<dyn RemoteStore>,
    embedding_service: Arc<dyn EmbeddingService>,
    embedding_timeout: Option<Duration>,
}

impl UploadOrchestrator {
    pub fn new(
        blob_store: Arc<dyn BlobStore>,
        remote_store: Arc<dyn RemoteStore>,
        embedding_service: Arc<dyn EmbeddingService>,
    ) -> Self {
        Self {
            blob_store,
            remote_store,
            embedding_service,
            embedding_timeout: None,
        }
    }

    pub fn with_embedding_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.embedding_timeout = timeout;
        self
    }

    /// Spawns the pipeline for `file` under a fresh document id and returns immediately.
    pub fn start(&self, file: UploadFile, user_id: UserId) -> UploadHandle {
        self.start_document(Uuid::new_v4(), file, user_id)
    }

    /// Like `start`, for callers that picked the document id up front.
    pub fn start_document(
        &self,
        document_id: Uuid,
        file: UploadFile,
        user_id: UserId,
    ) -> UploadHandle {
        let (session_tx, session_rx) = watch::channel(UploadSession::new());
        let orchestrator = self.clone();

        let task = tokio::spawn(async move {
            orchestrator
                .run(document_id, file, user_id, session_tx)
                .await
        });

        UploadHandle {
            document_id,
            session: session_rx,
            task,
        }
    }

    /// Runs the pipeline to the end, publishing every state change on `session`.
    pub async fn run(
        &self,
        document_id: Uuid,
        file: UploadFile,
        user_id: UserId,
        session: watch::Sender<UploadSession>,
    ) -> Result<Uuid, UploadError> {
        tracing::info!(
            "Starting upload of {} ({} bytes) for user {} as document {}",
            file.name,
            file.size(),
            user_id,
            document_id
        );

        let result = self.drive(file, &user_id, document_id, &session).await;

        match &result {
            Ok(id) => {
                update(&session, |s| s.complete(*id));
                tracing::info!("Document {} uploaded and indexed", id);
            }
            Err(e) => {
                update(&session, |s| s.fail(e.failure()));
                tracing::error!("Upload of document {} failed at {}: {}", document_id, e.stage(), e);
            }
        }

        result
    }

    async fn drive(
        &self,
        file: UploadFile,
        user_id: &UserId,
        document_id: Uuid,
        session: &watch::Sender<UploadSession>,
    ) -> Result<Uuid, UploadError> {
        let UploadFile {
            name,
            content_type,
            data,
        } = file;
        let size = data.len() as u64;
        let path = StoragePath::for_document(user_id, document_id);

        let stored = self
            .transfer(&path, data, content_type.as_deref(), session)
            .await?;
        update(session, |s| s.advance(UploadStage::Uploaded));

        let download_url = match self.blob_store.download_url(&stored.path).await {
            Ok(url) => url,
            Err(e) => {
                self.discard_blob(&stored.path).await;
                return Err(UploadError::DownloadReference(e.to_string()));
            }
        };

        update(session, |s| s.advance(UploadStage::Saving));
        let document = Document::new(
            document_id,
            user_id.clone(),
            name,
            size,
            content_type,
            download_url,
            stored.path.to_string(),
        );

        if let Err(e) = self
            .remote_store
            .write_document(user_id, document_id, &document.record())
            .await
        {
            self.discard_blob(&stored.path).await;
            return Err(UploadError::Persistence(e.to_string()));
        }

        update(session, |s| s.advance(UploadStage::Generating));
        self.generate_embeddings(user_id, document_id)
            .await
            .map_err(|e| UploadError::Embedding {
                document_id,
                message: e.to_string(),
            })?;

        Ok(document_id)
    }

    async fn transfer(
        &self,
        path: &StoragePath,
        data: Vec<u8>,
        content_type: Option<&str>,
        session: &watch::Sender<UploadSession>,
    ) -> Result<StoredObject, UploadError> {
        let mut events = self.blob_store.put(path, data, content_type);

        while let Some(event) = events.next().await {
            match event.map_err(|e| UploadError::Transfer(e.to_string()))? {
                TransferEvent::Progress(progress) => update(session, |s| {
                    s.record_progress(progress.bytes_transferred, progress.total_bytes)
                }),
                TransferEvent::Completed(stored) => return Ok(stored),
            }
        }

        Err(UploadError::Transfer(
            "transfer ended before completion".to_string(),
        ))
    }

    async fn generate_embeddings(
        &self,
        user_id: &UserId,
        document_id: Uuid,
    ) -> Result<(), EmbeddingServiceError> {
        let call = self.embedding_service.generate(user_id, document_id);

        match self.embedding_timeout {
            Some(limit) => tokio::time::timeout(limit, call)
                .await
                .unwrap_or(Err(EmbeddingServiceError::Timeout(limit))),
            None => call.await,
        }
    }

    // Compensation for a blob that no record will ever point to.
    async fn discard_blob(&self, path: &StoragePath) {
        match self.blob_store.delete(path).await {
            Ok(_) => tracing::info!("Removed orphaned blob {}", path),
            Err(e) => tracing::warn!("Failed to remove orphaned blob {}: {}", path, e),
        }
    }
}

fn update(
    session: &watch::Sender<UploadSession>,
    apply: impl FnOnce(&mut UploadSession) -> Result<(), String>,
) {
    session.send_modify(|state| {
        if let Err(e) = apply(state) {
            tracing::warn!("Ignoring invalid session update: {}", e);
        }
    });
}
