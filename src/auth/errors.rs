//! Authentication Errors
//! Mission: One variant per failure kind, no status codes smuggled in structs

use thiserror::Error;

/// Failures of the token codec
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TokenError {
    #[error("token is malformed")]
    Malformed,
    #[error("token has expired")]
    Expired,
    #[error("token signature or claims are invalid")]
    InvalidSignature,
    #[error("unexpected signing algorithm: {0}")]
    UnexpectedAlgorithm(String),
    #[error("failed to sign token: {0}")]
    Signing(String),
}

/// Failures of the credential verifier
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CredentialError {
    #[error("failed to hash password: {0}")]
    Hashing(String),
    #[error("stored password hash is corrupt: {0}")]
    InvalidHashFormat(String),
}

/// Full authentication/authorization taxonomy
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
    #[error("bearer token is required")]
    MissingToken,
    #[error("malformed token")]
    MalformedToken,
    #[error("expired token or invalid signature")]
    ExpiredOrInvalidSignature,
    #[error("unexpected signing algorithm")]
    UnexpectedAlgorithm,
    #[error("insufficient role")]
    InsufficientRole,
    #[error("caller does not own this resource")]
    NotOwner,
    #[error("account not found")]
    AccountNotFound,
    #[error("password hashing failed: {0}")]
    Hashing(String),
    #[error("invalid password hash format: {0}")]
    InvalidHashFormat(String),
    #[error("token signing failed: {0}")]
    Signing(String),
}

impl From<TokenError> for AuthError {
    fn from(err: TokenError) -> Self {
        match err {
            TokenError::Malformed => AuthError::MalformedToken,
            TokenError::Expired | TokenError::InvalidSignature => {
                AuthError::ExpiredOrInvalidSignature
            }
            TokenError::UnexpectedAlgorithm(_) => AuthError::UnexpectedAlgorithm,
            TokenError::Signing(msg) => AuthError::Signing(msg),
        }
    }
}

impl From<CredentialError> for AuthError {
    fn from(err: CredentialError) -> Self {
        match err {
            CredentialError::Hashing(msg) => AuthError::Hashing(msg),
            CredentialError::InvalidHashFormat(msg) => AuthError::InvalidHashFormat(msg),
        }
    }
}
