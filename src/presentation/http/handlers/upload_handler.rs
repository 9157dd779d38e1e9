use axum::{
    Json,
    extract::{Multipart, Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use futures::stream;
use std::{convert::Infallible, sync::Arc};
use tokio::sync::watch;
use uuid::Uuid;

use crate::application::services::UploadFile;
use crate::application::use_cases::{
    GetUploadStatusUseCase, UploadDocumentError, UploadDocumentRequest, UploadDocumentUseCase,
};
use crate::domain::entities::UploadSession;
use crate::presentation::http::dto::{ApiResponse, UploadSessionDto, UploadStartedDto};
use crate::presentation::http::handlers::identity::CallerIdentity;
use crate::presentation::http::handlers::sse_handler::{create_sse_response, json_event};

pub struct UploadHandler {
    upload_document_use_case: Arc<UploadDocumentUseCase>,
    get_upload_status_use_case: Arc<GetUploadStatusUseCase>,
}

impl UploadHandler {
    pub fn new(
        upload_document_use_case: Arc<UploadDocumentUseCase>,
        get_upload_status_use_case: Arc<GetUploadStatusUseCase>,
    ) -> Self {
        Self {
            upload_document_use_case,
            get_upload_status_use_case,
        }
    }

    pub async fn upload_document(
        State(handler): State<Arc<UploadHandler>>,
        CallerIdentity(identity): CallerIdentity,
        mut multipart: Multipart,
    ) -> Result<impl IntoResponse, StatusCode> {
        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|_| StatusCode::BAD_REQUEST)?
        {
            let Some(name) = field.file_name().map(|name| name.to_string()) else {
                continue;
            };

            let content_type = field.content_type().map(|ct| ct.to_string());

            let data = field
                .bytes()
                .await
                .map_err(|_| StatusCode::BAD_REQUEST)?
                .to_vec();

            let request = UploadDocumentRequest {
                identity,
                file: UploadFile {
                    name,
                    content_type,
                    data,
                },
            };

            return match handler.upload_document_use_case.execute(request).await {
                Ok(response) => {
                    let dto = UploadStartedDto::from(response);
                    Ok((StatusCode::ACCEPTED, Json(ApiResponse::success(dto))))
                }
                Err(e) => {
                    let (status, code) = upload_error_status(&e);
                    Ok((
                        status,
                        Json(ApiResponse::error(code, e.to_string())),
                    ))
                }
            };
        }

        Ok((
            StatusCode::BAD_REQUEST,
            Json(ApiResponse::error(
                "NO_FILE_PROVIDED",
                "No file provided in the request",
            )),
        ))
    }

    pub async fn get_upload(
        State(handler): State<Arc<UploadHandler>>,
        Path(session_id): Path<Uuid>,
    ) -> Result<impl IntoResponse, StatusCode> {
        match handler.get_upload_status_use_case.execute(session_id).await {
            Ok(session) => Ok((
                StatusCode::OK,
                Json(ApiResponse::success(UploadSessionDto::from(&session))),
            )),
            Err(e) => Ok((
                StatusCode::NOT_FOUND,
                Json(ApiResponse::error("UPLOAD_NOT_FOUND", e.to_string())),
            )),
        }
    }

    /// Streams every session change until the upload finishes or fails.
    pub async fn upload_events(
        State(handler): State<Arc<UploadHandler>>,
        Path(session_id): Path<Uuid>,
    ) -> Result<impl IntoResponse, StatusCode> {
        let session_rx = handler
            .get_upload_status_use_case
            .subscribe(session_id)
            .await
            .map_err(|_| StatusCode::NOT_FOUND)?;

        let stream = stream::unfold(Some((session_rx, true)), |state| async move {
            let (mut session_rx, first): (watch::Receiver<UploadSession>, bool) = state?;

            if !first && session_rx.changed().await.is_err() {
                return None;
            }

            let session = session_rx.borrow_and_update().clone();
            let event = json_event("upload_progress", &UploadSessionDto::from(&session));

            if session.is_terminal() {
                Some((Ok::<_, Infallible>(event), None))
            } else {
                Some((Ok::<_, Infallible>(event), Some((session_rx, false))))
            }
        });

        Ok(create_sse_response(stream))
    }
}

fn upload_error_status(error: &UploadDocumentError) -> (StatusCode, &'static str) {
    match error {
        UploadDocumentError::Unauthenticated => (StatusCode::UNAUTHORIZED, "UNAUTHENTICATED"),
        UploadDocumentError::ValidationError(_) => (StatusCode::BAD_REQUEST, "UPLOAD_FAILED"),
        UploadDocumentError::QuotaExceeded { .. } => (StatusCode::FORBIDDEN, "QUOTA_EXCEEDED"),
        UploadDocumentError::QuotaUnavailable(_) => {
            (StatusCode::SERVICE_UNAVAILABLE, "QUOTA_UNAVAILABLE")
        }
    }
}
