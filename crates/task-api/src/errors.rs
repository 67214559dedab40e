//! Task API error types.
//!
//! Every error becomes a flat JSON body `{"error": "<message>"}`. Messages for
//! authentication and authorization failures are part of the client contract;
//! server-side failures are logged and answered with a generic message.

use crate::auth::codec::CodecError;
use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

/// Message returned when no bearer token could be found.
pub const MSG_TOKEN_REQUIRED: &str = "Authorization header required";

/// Message returned for a token present in the revocation registry.
pub const MSG_TOKEN_REVOKED: &str = "Token has been revoked";

/// Message returned when the subject claim is missing, empty, or not a string.
pub const MSG_INVALID_SUBJECT: &str = "Invalid user ID in token";

/// Message returned when the role claim is missing or unrecognized.
pub const MSG_INVALID_ROLE: &str = "Invalid role in token";

/// Message returned when a handler or role gate runs without an identity.
pub const MSG_NOT_AUTHENTICATED: &str = "User not authenticated";

/// Task API error type.
///
/// Maps to HTTP status codes:
/// - Unauthenticated, InvalidCredentials: 401 Unauthorized
/// - Forbidden: 403 Forbidden
/// - BadRequest: 400 Bad Request
/// - Database, Internal: 500 Internal Server Error
/// - ServiceUnavailable: 503 Service Unavailable
#[derive(Debug, Error)]
pub enum ApiError {
    /// Caller could not be identified. The message is returned verbatim.
    #[error("{0}")]
    Unauthenticated(String),

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("forbidden")]
    Forbidden,

    #[error("{0}")]
    BadRequest(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Service unavailable: {0}")]
    ServiceUnavailable(String),

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl ApiError {
    /// Returns the HTTP status code for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Unauthenticated(_) | ApiError::InvalidCredentials => {
                StatusCode::UNAUTHORIZED
            }
            ApiError::Forbidden => StatusCode::FORBIDDEN,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Database(_) | ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        }
    }

    /// Shorthand for an `Unauthenticated` error with a contract message.
    pub fn unauthenticated(message: impl Into<String>) -> Self {
        ApiError::Unauthenticated(message.into())
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        let message = match &self {
            ApiError::Database(err) => {
                tracing::error!(target: "task_api.database", error = %err, "Database operation failed");
                "An internal database error occurred".to_string()
            }
            ApiError::Internal(err) => {
                tracing::error!(target: "task_api.internal", error = %err, "Internal error");
                "An internal error occurred".to_string()
            }
            ApiError::ServiceUnavailable(reason) => {
                tracing::warn!(target: "task_api.availability", reason = %reason, "Service unavailable");
                "Service temporarily unavailable".to_string()
            }
            other => other.to_string(),
        };

        let mut response = (status, Json(ErrorResponse { error: message })).into_response();

        if status == StatusCode::UNAUTHORIZED {
            response.headers_mut().insert(
                header::WWW_AUTHENTICATE,
                HeaderValue::from_static("Bearer realm=\"task-api\""),
            );
        }

        response
    }
}

/// Maps a codec failure to the 401 body the gate returns for it.
impl From<CodecError> for ApiError {
    fn from(err: CodecError) -> Self {
        match err {
            CodecError::InvalidSubject => ApiError::unauthenticated(MSG_INVALID_SUBJECT),
            CodecError::InvalidRole => ApiError::unauthenticated(MSG_INVALID_ROLE),
            CodecError::Expired | CodecError::Invalid(_) => {
                ApiError::Unauthenticated(format!("Invalid token: {}", err))
            }
            CodecError::Signing(detail) => ApiError::Internal(detail),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;

    async fn body_json(response: Response) -> serde_json::Value {
        let body = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&body).unwrap()
    }

    #[tokio::test]
    async fn test_unauthenticated_body_is_flat_and_verbatim() {
        let response = ApiError::unauthenticated(MSG_TOKEN_REVOKED).into_response();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            response.headers().get(header::WWW_AUTHENTICATE).unwrap(),
            "Bearer realm=\"task-api\""
        );
        assert_eq!(
            body_json(response).await,
            serde_json::json!({"error": "Token has been revoked"})
        );
    }

    #[tokio::test]
    async fn test_forbidden_body() {
        let response = ApiError::Forbidden.into_response();

        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        assert!(response.headers().get(header::WWW_AUTHENTICATE).is_none());
        assert_eq!(
            body_json(response).await,
            serde_json::json!({"error": "forbidden"})
        );
    }

    #[tokio::test]
    async fn test_invalid_credentials_is_401() {
        let response = ApiError::InvalidCredentials.into_response();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(body_json(response).await["error"], "Invalid credentials");
    }

    #[tokio::test]
    async fn test_database_error_is_generic() {
        let response =
            ApiError::Database("relation \"users\" does not exist".to_string()).into_response();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = body_json(response).await;
        assert_eq!(body["error"], "An internal database error occurred");
    }

    #[tokio::test]
    async fn test_internal_error_hides_detail() {
        let response = ApiError::Internal("hmac key rejected".to_string()).into_response();
        let body = body_json(response).await;
        assert_eq!(body["error"], "An internal error occurred");
    }

    #[test]
    fn test_codec_errors_map_to_contract_messages() {
        let cases = [
            (CodecError::Expired, "Invalid token: token is expired"),
            (
                CodecError::Invalid("signature is invalid".to_string()),
                "Invalid token: signature is invalid",
            ),
            (CodecError::InvalidSubject, MSG_INVALID_SUBJECT),
            (CodecError::InvalidRole, MSG_INVALID_ROLE),
        ];

        for (codec_err, expected) in cases {
            let api_err = ApiError::from(codec_err);
            assert_eq!(api_err.status_code(), StatusCode::UNAUTHORIZED);
            assert_eq!(api_err.to_string(), expected);
        }
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(
            ApiError::BadRequest("x".to_string()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::ServiceUnavailable("db".to_string()).status_code(),
            StatusCode::SERVICE_UNAVAILABLE
        );
    }
}
