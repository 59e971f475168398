//! HTTP error mapping
//!
//! Deny reasons are collapsed on the wire: every denial reads "Unauthorized"
//! except a missing token, which is reported as a bad request.

use crate::auth::errors::AuthError;
use crate::auth::gate::DenyReason;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use tracing::{debug, error};

/// Errors surfaced by the REST handlers
#[derive(Debug)]
pub enum ApiError {
    Denied(DenyReason),
    InvalidCredentials,
    NotFound(&'static str),
    Conflict(String),
    Validation(String),
    Internal,
}

impl From<DenyReason> for ApiError {
    fn from(reason: DenyReason) -> Self {
        debug!(reason = %reason, "Request denied");
        ApiError::Denied(reason)
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::MissingToken => DenyReason::MissingToken.into(),
            AuthError::MalformedToken => DenyReason::MalformedToken.into(),
            AuthError::ExpiredOrInvalidSignature | AuthError::UnexpectedAlgorithm => {
                DenyReason::ExpiredOrInvalidSignature.into()
            }
            AuthError::InsufficientRole => DenyReason::InsufficientRole.into(),
            AuthError::NotOwner => DenyReason::NotOwner.into(),
            AuthError::AccountNotFound => ApiError::NotFound("Account"),
            AuthError::Hashing(_) | AuthError::Signing(_) | AuthError::InvalidHashFormat(_) => {
                error!("Authentication failure: {}", err);
                ApiError::Internal
            }
        }
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        error!("Storage failure: {:#}", err);
        ApiError::Internal
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::Denied(DenyReason::MissingToken) => (
                StatusCode::BAD_REQUEST,
                "bearer token is required".to_string(),
            ),
            ApiError::Denied(_) => (StatusCode::UNAUTHORIZED, "Unauthorized".to_string()),
            ApiError::InvalidCredentials => {
                (StatusCode::UNAUTHORIZED, "Invalid credentials".to_string())
            }
            ApiError::NotFound(what) => (StatusCode::NOT_FOUND, format!("{what} not found")),
            ApiError::Conflict(message) => (StatusCode::CONFLICT, message),
            ApiError::Validation(message) => (StatusCode::BAD_REQUEST, message),
            ApiError::Internal => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal server error".to_string(),
            ),
        };

        (status, message).into_response()
    }
}
