//! Ownership Guard
//! Mission: Only the owning account may mutate its own resources

use crate::auth::gate::{authenticate, AuthorizationDecision, DenyReason};
use crate::auth::jwt::TokenCodec;
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

/// Compares the token subject against a resource owner.
///
/// Admins get no special treatment here.
pub struct OwnershipGuard {
    codec: Arc<TokenCodec>,
}

impl OwnershipGuard {
    pub fn new(codec: Arc<TokenCodec>) -> Self {
        Self { codec }
    }

    /// Allow only when the caller is `owner_id`. Run before any write.
    pub fn require_owner(&self, header: Option<&str>, owner_id: Uuid) -> AuthorizationDecision {
        let claims = match authenticate(&self.codec, header) {
            AuthorizationDecision::Allow(claims) => claims,
            deny => return deny,
        };

        if claims.subject() != Some(owner_id) {
            debug!("Caller {} is not owner {}", claims.sub, owner_id);
            return AuthorizationDecision::Deny(DenyReason::NotOwner);
        }

        AuthorizationDecision::Allow(claims)
    }
}
