use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use futures::stream;
use std::{convert::Infallible, sync::Arc};

use crate::application::use_cases::GetQuotaUseCase;
use crate::presentation::http::dto::{ApiResponse, QuotaDto};
use crate::presentation::http::handlers::identity::CallerIdentity;
use crate::presentation::http::handlers::sse_handler::{create_sse_response, json_event};

pub struct QuotaHandler {
    get_quota_use_case: Arc<GetQuotaUseCase>,
}

impl QuotaHandler {
    pub fn new(get_quota_use_case: Arc<GetQuotaUseCase>) -> Self {
        Self { get_quota_use_case }
    }

    pub async fn get_quota(
        State(handler): State<Arc<QuotaHandler>>,
        CallerIdentity(identity): CallerIdentity,
    ) -> Result<impl IntoResponse, StatusCode> {
        let state = handler.get_quota_use_case.execute(&identity).await;
        Ok((StatusCode::OK, Json(ApiResponse::success(QuotaDto::from(&state)))))
    }

    /// Pushes the quota view on connect and after every feed update.
    /// The observer lives inside the stream, so a disconnect releases both feeds.
    pub async fn quota_events(
        State(handler): State<Arc<QuotaHandler>>,
        CallerIdentity(identity): CallerIdentity,
    ) -> Result<impl IntoResponse, StatusCode> {
        let observer = handler.get_quota_use_case.watch(&identity);

        let stream = stream::unfold((observer, true), |(mut observer, first)| async move {
            let state = if first {
                observer.current()
            } else {
                observer.changed().await?
            };

            let event = json_event("quota", &QuotaDto::from(&state));
            Some((Ok::<_, Infallible>(event), (observer, false)))
        });

        Ok(create_sse_response(stream))
    }
}
