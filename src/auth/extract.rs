//! Authentication Extractors
//! Mission: Gate handlers on a valid bearer token or the admin role

use crate::api::{error::ApiError, AppState};
use crate::auth::gate::DenyReason;
use crate::auth::models::Claims;
use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
};

/// Raw `Authorization` header; a non-text value is malformed
fn authorization_header(parts: &Parts) -> Result<Option<&str>, DenyReason> {
    match parts.headers.get(AUTHORIZATION) {
        None => Ok(None),
        Some(value) => value
            .to_str()
            .map(Some)
            .map_err(|_| DenyReason::MalformedToken),
    }
}

/// Any caller holding a valid token
#[derive(Debug, Clone)]
pub struct Authenticated {
    pub claims: Claims,
    /// Header as presented, for ownership checks further down
    pub authorization: String,
}

#[async_trait]
impl FromRequestParts<AppState> for Authenticated {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, ApiError> {
        let header = authorization_header(parts)?;
        let claims = state.gate.require_authenticated(header).into_result()?;

        Ok(Self {
            claims,
            authorization: header.unwrap_or_default().to_string(),
        })
    }
}

/// A caller whose account currently has the admin role
#[derive(Debug, Clone)]
pub struct AdminCaller {
    pub claims: Claims,
}

#[async_trait]
impl FromRequestParts<AppState> for AdminCaller {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, ApiError> {
        let header = authorization_header(parts)?;
        let claims = state.gate.require_admin(header).into_result()?;

        Ok(Self { claims })
    }
}
