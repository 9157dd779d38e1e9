use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::domain::value_objects::QuotaLimits;

/// Envelope shared by every JSON endpoint.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<ApiError>,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct ApiError {
    pub code: String,
    pub message: String,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
            timestamp: Utc::now(),
        }
    }

    pub fn error(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(ApiError {
                code: code.into(),
                message: message.into(),
            }),
            timestamp: Utc::now(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct QuotaLimitsDto {
    pub free: u32,
    pub pro: u32,
}

impl From<QuotaLimits> for QuotaLimitsDto {
    fn from(limits: QuotaLimits) -> Self {
        Self {
            free: limits.free,
            pro: limits.pro,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct HealthResponseDto {
    pub status: &'static str,
    pub version: &'static str,
    pub metadata_store: &'static str,
    pub quota_limits: QuotaLimitsDto,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_envelope_shape() {
        let response = ApiResponse::<()>::error("QUOTA_EXCEEDED", "limit reached");
        let json = serde_json::to_value(&response).unwrap();

        assert_eq!(json["success"], false);
        assert!(json["data"].is_null());
        assert_eq!(json["error"]["code"], "QUOTA_EXCEEDED");
        assert_eq!(json["error"]["message"], "limit reached");
        assert!(json["timestamp"].is_string());
    }
}
