use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use std::sync::Arc;

use crate::domain::value_objects::QuotaLimits;
use crate::presentation::http::dto::{ApiResponse, HealthResponseDto};

/// Reports which metadata backend was wired and the limits admission runs with.
pub struct HealthHandler {
    metadata_store: &'static str,
    quota_limits: QuotaLimits,
}

impl HealthHandler {
    pub fn new(metadata_store: &'static str, quota_limits: QuotaLimits) -> Self {
        Self {
            metadata_store,
            quota_limits,
        }
    }

    pub async fn health(State(handler): State<Arc<HealthHandler>>) -> impl IntoResponse {
        let health = HealthResponseDto {
            status: "healthy",
            version: env!("CARGO_PKG_VERSION"),
            metadata_store: handler.metadata_store,
            quota_limits: handler.quota_limits.into(),
        };

        (StatusCode::OK, Json(ApiResponse::success(health)))
    }
}
