use axum::{
    Json,
    extract::FromRequestParts,
    http::{StatusCode, request::Parts},
};

use crate::domain::value_objects::{Identity, UserId};
use crate::presentation::http::dto::ApiResponse;

pub const USER_ID_HEADER: &str = "x-user-id";

/// Caller identity as forwarded by the identity provider in `x-user-id`.
/// A missing header means an anonymous caller.
pub struct CallerIdentity(pub Identity);

impl<S> FromRequestParts<S> for CallerIdentity
where
    S: Send + Sync,
{
    type Rejection = (StatusCode, Json<ApiResponse<()>>);

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let Some(value) = parts.headers.get(USER_ID_HEADER) else {
            return Ok(Self(Identity::anonymous()));
        };

        let user_id = value
            .to_str()
            .map_err(|e| e.to_string())
            .and_then(UserId::new)
            .map_err(|message| {
                (
                    StatusCode::BAD_REQUEST,
                    Json(ApiResponse::error("INVALID_USER_ID", message)),
                )
            })?;

        Ok(Self(Identity::signed_in(user_id)))
    }
}
