use axum::Router;
use axum::extract::DefaultBodyLimit;
use std::{net::SocketAddr, sync::Arc};
use tokio::net::TcpListener;
use tower_http::classify::ServerErrorsFailureClass;
use tower_http::cors::{Any, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;

use crate::presentation::http::{
    handlers::{BlobHandler, HealthHandler, QuotaHandler, UploadHandler},
    routes::{blob_routes, health_routes, quota_routes, upload_routes},
};

pub const MAX_UPLOAD_BYTES: usize = 250 * 1024 * 1024;

pub struct HttpServer {
    health_handler: Arc<HealthHandler>,
    upload_handler: Arc<UploadHandler>,
    quota_handler: Arc<QuotaHandler>,
    blob_handler: Arc<BlobHandler>,
    port: u16,
}

impl HttpServer {
    pub fn new(
        health_handler: Arc<HealthHandler>,
        upload_handler: Arc<UploadHandler>,
        quota_handler: Arc<QuotaHandler>,
        blob_handler: Arc<BlobHandler>,
        port: Option<u16>,
    ) -> Self {
        Self {
            health_handler,
            upload_handler,
            quota_handler,
            blob_handler,
            port: port.unwrap_or(3000),
        }
    }

    pub fn router(&self) -> Router {
        let cors = CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any);

        Router::new()
            .merge(health_routes(self.health_handler.clone()))
            .merge(upload_routes(self.upload_handler.clone()))
            .merge(quota_routes(self.quota_handler.clone()))
            .merge(blob_routes(self.blob_handler.clone()))
            .layer(cors)
            .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
            .layer(RequestBodyLimitLayer::new(MAX_UPLOAD_BYTES))
            .layer(
                TraceLayer::new_for_http()
                    .on_request(
                        |request: &axum::http::Request<axum::body::Body>, _span: &tracing::Span| {
                            tracing::info!(
                                "Received request: {} {}",
                                request.method(),
                                request.uri()
                            );
                        },
                    )
                    .on_response(
                        |response: &axum::http::Response<axum::body::Body>,
                         latency: std::time::Duration,
                         _span: &tracing::Span| {
                            tracing::info!(
                                "Response: {} (took {} ms)",
                                response.status(),
                                latency.as_millis()
                            );
                        },
                    )
                    .on_failure(
                        |error: ServerErrorsFailureClass,
                         latency: std::time::Duration,
                         _span: &tracing::Span| {
                            tracing::error!(
                                "Request failed: {:?} (took {} ms)",
                                error,
                                latency.as_millis()
                            );
                        },
                    ),
            )
    }

    pub async fn run(self) -> Result<(), Box<dyn std::error::Error>> {
        let app = self.router();
        let addr = SocketAddr::from(([0, 0, 0, 0], self.port));

        tracing::info!("Listening on {}", addr);

        let listener = TcpListener::bind(addr).await?;
        axum::serve(listener, app).await?;

        Ok(())
    }
}
