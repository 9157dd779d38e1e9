use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use std::path::PathBuf;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tokio::sync::mpsc;
use url::Url;

use crate::application::ports::blob_store::{
    BlobStore, BlobStoreError, StoredObject, TransferEvent, TransferProgress, TransferStream,
};
use crate::domain::value_objects::StoragePath;

pub const DEFAULT_CHUNK_SIZE: usize = 256 * 1024;

/// Blob store backed by a local directory; objects are served under `public_base_url`.
pub struct LocalBlobStore {
    base_path: PathBuf,
    public_base_url: Url,
    chunk_size: usize,
}

impl LocalBlobStore {
    pub fn new(base_path: PathBuf, public_base_url: Url) -> Self {
        Self {
            base_path,
            public_base_url,
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }

    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }

    fn object_path(&self, path: &StoragePath) -> PathBuf {
        self.base_path.join(path.as_str())
    }
}

struct PendingWrite {
    final_path: PathBuf,
    part_path: PathBuf,
    data: Vec<u8>,
    chunk_size: usize,
}

type EventSender = mpsc::UnboundedSender<Result<TransferEvent, BlobStoreError>>;

impl PendingWrite {
    /// Writes chunk by chunk into a `.part` file and renames it once complete.
    async fn run(self, events: &EventSender) -> Result<u64, BlobStoreError> {
        if let Some(parent) = self.final_path.parent() {
            fs::create_dir_all(parent).await?;
        }

        let total_bytes = self.data.len() as u64;
        let mut file = fs::File::create(&self.part_path).await?;
        let mut bytes_transferred = 0u64;

        for chunk in self.data.chunks(self.chunk_size) {
            file.write_all(chunk).await?;
            bytes_transferred += chunk.len() as u64;

            let progress = TransferEvent::Progress(TransferProgress {
                bytes_transferred,
                total_bytes,
            });
            if events.send(Ok(progress)).is_err() {
                return Err(BlobStoreError::TransferInterrupted(
                    "receiver dropped".to_string(),
                ));
            }
        }

        file.flush().await?;
        file.sync_all().await?;
        drop(file);

        fs::rename(&self.part_path, &self.final_path).await?;
        Ok(total_bytes)
    }
}

#[async_trait]
impl BlobStore for LocalBlobStore {
    fn put(&self, path: &StoragePath, data: Vec<u8>, content_type: Option<&str>) -> TransferStream {
        let (sender, receiver) = mpsc::unbounded_channel();
        let final_path = self.object_path(path);
        let part_path = final_path.with_extension("part");
        let stored_path = path.clone();
        let content_type = content_type.map(|s| s.to_string());

        let write = PendingWrite {
            final_path,
            part_path: part_path.clone(),
            data,
            chunk_size: self.chunk_size,
        };

        tokio::spawn(async move {
            match write.run(&sender).await {
                Ok(size) => {
                    let _ = sender.send(Ok(TransferEvent::Completed(StoredObject {
                        path: stored_path,
                        size,
                        content_type,
                    })));
                }
                Err(e) => {
                    tracing::warn!("Transfer to {} failed: {}", stored_path, e);
                    let _ = fs::remove_file(&part_path).await;
                    let _ = sender.send(Err(e));
                }
            }
        });

        stream::unfold(receiver, |mut receiver| async move {
            receiver.recv().await.map(|event| (event, receiver))
        })
        .boxed()
    }

    async fn download_url(&self, path: &StoragePath) -> Result<String, BlobStoreError> {
        if !fs::try_exists(self.object_path(path)).await? {
            return Err(BlobStoreError::NotFound(path.to_string()));
        }

        self.public_base_url
            .join(path.as_str())
            .map(|url| url.to_string())
            .map_err(|e| BlobStoreError::InvalidPath(format!("{}: {}", path, e)))
    }

    async fn read(&self, path: &StoragePath) -> Result<Vec<u8>, BlobStoreError> {
        let object_path = self.object_path(path);

        if !fs::try_exists(&object_path).await? {
            return Err(BlobStoreError::NotFound(path.to_string()));
        }

        Ok(fs::read(&object_path).await?)
    }

    async fn delete(&self, path: &StoragePath) -> Result<bool, BlobStoreError> {
        let object_path = self.object_path(path);

        if !fs::try_exists(&object_path).await? {
            return Ok(false);
        }

        fs::remove_file(&object_path).await?;
        Ok(true)
    }
}
