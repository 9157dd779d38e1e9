use std::sync::Arc;

use crate::{
    application::{
        ports::{BlobStore, EmbeddingService, RemoteStore},
        services::{UploadOrchestrator, UploadRegistry},
        use_cases::{GetQuotaUseCase, GetUploadStatusUseCase, UploadDocumentUseCase},
    },
    infrastructure::{
        config::AppConfig,
        database::{create_connection_pool, repositories::PostgresRemoteStore, run_migrations},
        external_services::HttpEmbeddingService,
        file_system::LocalBlobStore,
        memory::InMemoryRemoteStore,
    },
    presentation::http::{
        HttpServer,
        handlers::{BlobHandler, HealthHandler, QuotaHandler, UploadHandler},
    },
};

pub struct AppContainer {
    // Adapters
    pub remote_store: Arc<dyn RemoteStore>,
    pub blob_store: Arc<dyn BlobStore>,
    pub embedding_service: Arc<dyn EmbeddingService>,

    // Application Services
    pub upload_orchestrator: UploadOrchestrator,
    pub upload_registry: Arc<UploadRegistry>,

    // Use Cases
    pub upload_document_use_case: Arc<UploadDocumentUseCase>,
    pub get_upload_status_use_case: Arc<GetUploadStatusUseCase>,
    pub get_quota_use_case: Arc<GetQuotaUseCase>,

    // HTTP Handlers
    pub health_handler: Arc<HealthHandler>,
    pub upload_handler: Arc<UploadHandler>,
    pub quota_handler: Arc<QuotaHandler>,
    pub blob_handler: Arc<BlobHandler>,

    port: u16,
}

impl AppContainer {
    pub async fn new(config: &AppConfig) -> Result<Self, Box<dyn std::error::Error>> {
        let (metadata_store, remote_store) = match &config.database_url {
            Some(database_url) => {
                run_migrations(database_url)
                    .map_err(|e| format!("Failed to run database migrations: {}", e))?;
                let pool = create_connection_pool(database_url)?;
                tracing::info!("Using Postgres document store");
                let store: Arc<dyn RemoteStore> = Arc::new(
                    PostgresRemoteStore::new(pool).with_poll_interval(config.feed_poll_interval),
                );
                ("postgres", store)
            }
            None => {
                tracing::warn!("DATABASE_URL not set, documents are kept in memory");
                let store: Arc<dyn RemoteStore> = Arc::new(InMemoryRemoteStore::new());
                ("memory", store)
            }
        };

        tokio::fs::create_dir_all(&config.upload_dir).await?;
        let blob_store: Arc<dyn BlobStore> = Arc::new(LocalBlobStore::new(
            config.upload_dir.clone(),
            config.public_base_url.clone(),
        ));

        let embedding_service: Arc<dyn EmbeddingService> =
            Arc::new(HttpEmbeddingService::new(config.embeddings.clone())?);

        Ok(Self::with_adapters(
            config,
            metadata_store,
            remote_store,
            blob_store,
            embedding_service,
        ))
    }

    /// Wires services, use cases and handlers around already built adapters.
    /// `metadata_store` names the remote store backend for the health report.
    pub fn with_adapters(
        config: &AppConfig,
        metadata_store: &'static str,
        remote_store: Arc<dyn RemoteStore>,
        blob_store: Arc<dyn BlobStore>,
        embedding_service: Arc<dyn EmbeddingService>,
    ) -> Self {
        // Create application services
        let upload_orchestrator = UploadOrchestrator::new(
            blob_store.clone(),
            remote_store.clone(),
            embedding_service.clone(),
        )
        .with_embedding_timeout(config.embedding_timeout);
        let upload_registry = Arc::new(UploadRegistry::new());

        // Create use cases
        let upload_document_use_case = Arc::new(UploadDocumentUseCase::new(
            remote_store.clone(),
            upload_orchestrator.clone(),
            upload_registry.clone(),
            config.quota_limits,
        ));
        let get_upload_status_use_case =
            Arc::new(GetUploadStatusUseCase::new(upload_registry.clone()));
        let get_quota_use_case =
            Arc::new(GetQuotaUseCase::new(remote_store.clone(), config.quota_limits));

        // Create HTTP handlers
        let health_handler = Arc::new(HealthHandler::new(metadata_store, config.quota_limits));
        let upload_handler = Arc::new(UploadHandler::new(
            upload_document_use_case.clone(),
            get_upload_status_use_case.clone(),
        ));
        let quota_handler = Arc::new(QuotaHandler::new(get_quota_use_case.clone()));
        let blob_handler = Arc::new(BlobHandler::new(blob_store.clone()));

        Self {
            remote_store,
            blob_store,
            embedding_service,
            upload_orchestrator,
            upload_registry,
            upload_document_use_case,
            get_upload_status_use_case,
            get_quota_use_case,
            health_handler,
            upload_handler,
            quota_handler,
            blob_handler,
            port: config.port,
        }
    }

    pub fn http_server(&self) -> HttpServer {
        HttpServer::new(
            self.health_handler.clone(),
            self.upload_handler.clone(),
            self.quota_handler.clone(),
            self.blob_handler.clone(),
            Some(self.port),
        )
    }
}
