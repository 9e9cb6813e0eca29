// HTTP API Error Types
use axum::{extract::rejection::JsonRejection, http::StatusCode, response::IntoResponse, Json};
use serde_json::{json, Value};

use crate::auth::AuthError;
use crate::services::ProfileServiceError;

/// HTTP API error. Every variant renders as the `{ "error": ..., "details"? }` envelope.
#[derive(Debug)]
pub enum ApiError {
    // 400 Bad Request
    MissingIdentity,
    InvalidPayload(String),
    IdentityMismatch,
    EmptyUpdate,

    // 401 Unauthorized
    MissingToken(String),

    // 403 Forbidden
    InvalidToken,

    // 404 Not Found
    NotFound(String),

    // 405 Method Not Allowed
    MethodNotAllowed,

    // 413 Payload Too Large
    PayloadTooLarge,

    // 500 Internal Server Error
    StoreError {
        message: String,
        details: Option<String>,
    },
    Internal(String),
}

impl ApiError {
    /// Get HTTP status code
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::MissingIdentity => StatusCode::BAD_REQUEST,
            ApiError::InvalidPayload(_) => StatusCode::BAD_REQUEST,
            ApiError::IdentityMismatch => StatusCode::BAD_REQUEST,
            ApiError::EmptyUpdate => StatusCode::BAD_REQUEST,
            ApiError::MissingToken(_) => StatusCode::UNAUTHORIZED,
            ApiError::InvalidToken => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            ApiError::PayloadTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            ApiError::StoreError { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Get client-safe error message
    pub fn message(&self) -> &str {
        match self {
            ApiError::MissingIdentity => "User ID is required",
            ApiError::InvalidPayload(_) => "Invalid request body",
            ApiError::IdentityMismatch => "User ID in body does not match authenticated user ID",
            ApiError::EmptyUpdate => "No valid data provided",
            ApiError::MissingToken(msg) => msg,
            ApiError::InvalidToken => "Invalid token",
            ApiError::NotFound(msg) => msg,
            ApiError::MethodNotAllowed => "Method not allowed",
            ApiError::PayloadTooLarge => "Request body too large",
            ApiError::StoreError { message, .. } => message,
            ApiError::Internal(msg) => msg,
        }
    }

    pub fn details(&self) -> Option<&str> {
        match self {
            ApiError::InvalidPayload(details) => Some(details),
            ApiError::StoreError { details, .. } => details.as_deref(),
            _ => None,
        }
    }

    /// Convert to JSON response body
    pub fn to_json(&self) -> Value {
        let mut body = json!({ "error": self.message() });
        if let Some(details) = self.details() {
            body["details"] = json!(details);
        }
        body
    }
}

impl ApiError {
    pub fn invalid_payload(details: impl Into<String>) -> Self {
        ApiError::InvalidPayload(details.into())
    }

    pub fn missing_token(message: impl Into<String>) -> Self {
        ApiError::MissingToken(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        ApiError::NotFound(message.into())
    }

    pub fn internal(message: impl Into<String>) -> Self {
        ApiError::Internal(message.into())
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::MissingToken(msg) => ApiError::missing_token(msg),
            AuthError::InvalidToken(reason) => {
                tracing::warn!("Rejected bearer token: {}", reason);
                ApiError::InvalidToken
            }
            AuthError::Misconfigured(msg) => {
                tracing::error!("Token verifier misconfigured: {}", msg);
                ApiError::internal("Internal Server Error")
            }
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
            return ApiError::PayloadTooLarge;
        }
        ApiError::invalid_payload(rejection.body_text())
    }
}

impl From<ProfileServiceError> for ApiError {
    fn from(err: ProfileServiceError) -> Self {
        match err {
            ProfileServiceError::IdentityMismatch => ApiError::IdentityMismatch,
            ProfileServiceError::EmptyUpdate => ApiError::EmptyUpdate,
            ProfileServiceError::NotFound | ProfileServiceError::VanishedAfterWrite => {
                ApiError::not_found("User not found")
            }
            ProfileServiceError::Store { operation, source } => {
                tracing::error!("Store error while trying to {} user data: {}", operation, source);
                ApiError::StoreError {
                    message: format!("Failed to {} user data.", operation),
                    details: Some(source.to_string()),
                }
            }
        }
    }
}

// Standard error trait implementations
impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message())
    }
}

impl std::error::Error for ApiError {}

// Automatic HTTP response conversion for Axum
impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        (self.status_code(), Json(self.to_json())).into_response()
    }
}
