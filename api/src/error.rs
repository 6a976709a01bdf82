//! API error types.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;

/// Errors surfaced by the HTTP and WebSocket handlers.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Missing or rejected bearer credential.
    #[error("authentication required")]
    Unauthorized,

    /// Topic failed validation.
    #[error("invalid topic: {0}")]
    InvalidTopic(String),

    /// Malformed request.
    #[error("bad request: {0}")]
    BadRequest(String),

    /// The connection has already been torn down.
    #[error("connection {0} not found")]
    ConnectionNotFound(u64),

    /// Payload could not be encoded.
    #[error("serialization failed: {0}")]
    Serialization(String),

    /// Unexpected failure.
    #[error("internal error: {0}")]
    Internal(String),
}

impl ApiError {
    /// Returns the stable error code sent to clients.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::Unauthorized => "UNAUTHORIZED",
            Self::InvalidTopic(_) => "INVALID_TOPIC",
            Self::BadRequest(_) => "BAD_REQUEST",
            Self::ConnectionNotFound(_) => "CONNECTION_NOT_FOUND",
            Self::Serialization(_) => "SERIALIZATION_ERROR",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Returns the HTTP status for this error.
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::InvalidTopic(_) | Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::ConnectionNotFound(_) => StatusCode::NOT_FOUND,
            Self::Serialization(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<marketstream_sdk::SdkError> for ApiError {
    fn from(err: marketstream_sdk::SdkError) -> Self {
        use marketstream_sdk::SdkError;
        match err {
            SdkError::InvalidTopic(msg) | SdkError::UnknownTopicType(msg) => Self::InvalidTopic(msg),
            SdkError::InvalidBook(msg) | SdkError::InvalidConfig(msg) => Self::BadRequest(msg),
            SdkError::Serialization(msg) | SdkError::Deserialization(msg) => {
                Self::Serialization(msg)
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = json!({
            "error": {
                "code": self.code(),
                "message": self.to_string(),
            }
        });
        (self.status(), Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(ApiError::Unauthorized.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            ApiError::InvalidTopic("stock:".to_string()).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(ApiError::ConnectionNotFound(3).status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_display() {
        assert_eq!(ApiError::Unauthorized.to_string(), "authentication required");
        assert_eq!(
            ApiError::ConnectionNotFound(7).to_string(),
            "connection 7 not found"
        );
    }

    #[test]
    fn test_from_sdk_error() {
        let err: ApiError = marketstream_sdk::SdkError::InvalidTopic("x".to_string()).into();
        assert_eq!(err.code(), "INVALID_TOPIC");
    }

    #[test]
    fn test_into_response_status() {
        let response = ApiError::Unauthorized.into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }
}
