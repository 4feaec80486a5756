//! # ApiError
//!
//! The HTTP-facing error taxonomy. Every handler and middleware classifies lower-level
//! failures into one of these variants before responding; raw storage errors never
//! reach the client.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

use crate::{repository::StoreError, token::TokenError};

#[derive(Error, Debug)]
pub enum ApiError {
    /// No credential, or one that is malformed, badly signed or expired.
    #[error("authentication required")]
    AuthenticationMissing,

    /// Valid credential, insufficient rights for the target.
    #[error("forbidden")]
    AuthorizationDenied,

    /// The username exists but the password does not match.
    #[error("incorrect username / password")]
    InvalidCredentials,

    #[error("{0} not found")]
    NotFound(&'static str),

    /// Uniqueness violation, e.g. a duplicate username or topic.
    #[error("{0}")]
    Conflict(String),

    /// Missing or empty required field.
    #[error("{0}")]
    Validation(String),

    /// Storage, signing or hashing failure. The detail is logged, not returned.
    #[error("internal error: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::AuthenticationMissing | ApiError::InvalidCredentials => {
                StatusCode::UNAUTHORIZED
            }
            ApiError::AuthorizationDenied => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match &self {
            ApiError::Internal(detail) => {
                tracing::error!(detail = %detail, "request failed with internal error");
                "internal server error".to_string()
            }
            other => other.to_string(),
        };
        (status, Json(serde_json::json!({ "error": message }))).into_response()
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(what) => ApiError::NotFound(what),
            StoreError::Conflict(msg) => ApiError::Conflict(msg),
            StoreError::Database(e) => ApiError::Internal(e.to_string()),
        }
    }
}

impl From<TokenError> for ApiError {
    fn from(err: TokenError) -> Self {
        ApiError::Internal(err.to_string())
    }
}
