//! Authorization Gate
//! Mission: Turn an Authorization header into an allow/deny decision

use crate::auth::account_store::AccountStore;
use crate::auth::errors::{AuthError, TokenError};
use crate::auth::jwt::TokenCodec;
use crate::auth::models::Claims;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, warn};

/// Why a request was denied
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DenyReason {
    MissingToken,
    MalformedToken,
    ExpiredOrInvalidSignature,
    InsufficientRole,
    NotOwner,
}

impl DenyReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            DenyReason::MissingToken => "missing-token",
            DenyReason::MalformedToken => "malformed-token",
            DenyReason::ExpiredOrInvalidSignature => "expired-or-invalid-signature",
            DenyReason::InsufficientRole => "insufficient-role",
            DenyReason::NotOwner => "not-owner",
        }
    }
}

impl fmt::Display for DenyReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<DenyReason> for AuthError {
    fn from(reason: DenyReason) -> Self {
        match reason {
            DenyReason::MissingToken => AuthError::MissingToken,
            DenyReason::MalformedToken => AuthError::MalformedToken,
            DenyReason::ExpiredOrInvalidSignature => AuthError::ExpiredOrInvalidSignature,
            DenyReason::InsufficientRole => AuthError::InsufficientRole,
            DenyReason::NotOwner => AuthError::NotOwner,
        }
    }
}

impl From<TokenError> for DenyReason {
    fn from(err: TokenError) -> Self {
        match err {
            TokenError::Malformed => DenyReason::MalformedToken,
            TokenError::Expired
            | TokenError::InvalidSignature
            | TokenError::UnexpectedAlgorithm(_)
            | TokenError::Signing(_) => DenyReason::ExpiredOrInvalidSignature,
        }
    }
}

/// Outcome of an authorization check
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthorizationDecision {
    Allow(Claims),
    Deny(DenyReason),
}

impl AuthorizationDecision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, AuthorizationDecision::Allow(_))
    }

    pub fn deny_reason(&self) -> Option<DenyReason> {
        match self {
            AuthorizationDecision::Allow(_) => None,
            AuthorizationDecision::Deny(reason) => Some(*reason),
        }
    }

    pub fn into_result(self) -> Result<Claims, DenyReason> {
        match self {
            AuthorizationDecision::Allow(claims) => Ok(claims),
            AuthorizationDecision::Deny(reason) => Err(reason),
        }
    }
}

/// Extract the token from an `Authorization: Bearer <token>` header value.
///
/// Absent or blank headers are a missing token; anything else that is not
/// exactly one scheme and one non-empty token is malformed.
pub fn parse_bearer(header: Option<&str>) -> Result<&str, DenyReason> {
    let value = match header.map(str::trim) {
        None | Some("") => return Err(DenyReason::MissingToken),
        Some(value) => value,
    };

    let (scheme, token) = value
        .split_once(' ')
        .ok_or(DenyReason::MalformedToken)?;

    if !scheme.eq_ignore_ascii_case("bearer") {
        return Err(DenyReason::MalformedToken);
    }

    let token = token.trim();
    if token.is_empty() || token.contains(char::is_whitespace) {
        return Err(DenyReason::MalformedToken);
    }

    Ok(token)
}

/// Header → claims, shared by the gate and the ownership guard
pub(crate) fn authenticate(codec: &TokenCodec, header: Option<&str>) -> AuthorizationDecision {
    let token = match parse_bearer(header) {
        Ok(token) => token,
        Err(reason) => return AuthorizationDecision::Deny(reason),
    };

    let claims = match codec.decode(token) {
        Ok(claims) => claims,
        Err(err) => {
            debug!("Token rejected: {}", err);
            return AuthorizationDecision::Deny(err.into());
        }
    };

    // Every downstream check keys on the subject as an account id
    if claims.subject().is_none() {
        return AuthorizationDecision::Deny(DenyReason::MalformedToken);
    }

    AuthorizationDecision::Allow(claims)
}

/// Decides user- and admin-level access
pub struct AuthorizationGate {
    codec: Arc<TokenCodec>,
    accounts: Arc<dyn AccountStore>,
}

impl AuthorizationGate {
    pub fn new(codec: Arc<TokenCodec>, accounts: Arc<dyn AccountStore>) -> Self {
        Self { codec, accounts }
    }

    /// Allow any caller presenting a valid token
    pub fn require_authenticated(&self, header: Option<&str>) -> AuthorizationDecision {
        authenticate(&self.codec, header)
    }

    /// Allow only callers whose account currently holds the admin role
    pub fn require_admin(&self, header: Option<&str>) -> AuthorizationDecision {
        let claims = match self.require_authenticated(header) {
            AuthorizationDecision::Allow(claims) => claims,
            deny => return deny,
        };

        let Some(subject) = claims.subject() else {
            return AuthorizationDecision::Deny(DenyReason::MalformedToken);
        };

        match self.accounts.find_by_id(&subject) {
            Ok(Some(account)) if account.is_admin() => {
                AuthorizationDecision::Allow(claims)
            }
            Ok(Some(_)) => {
                debug!("Account {} is not an admin", subject);
                AuthorizationDecision::Deny(DenyReason::InsufficientRole)
            }
            Ok(None) => {
                debug!("Token subject {} no longer exists", subject);
                AuthorizationDecision::Deny(DenyReason::InsufficientRole)
            }
            Err(e) => {
                warn!("Role lookup failed for {}: {:#}", subject, e);
                AuthorizationDecision::Deny(DenyReason::InsufficientRole)
            }
        }
    }
}
