//! Credential Verifier
//! Mission: Salted, adaptive one-way password hashing

use crate::auth::errors::CredentialError;
use bcrypt::{hash, verify, BcryptError, DEFAULT_COST};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::OnceLock;
use tracing::debug;

/// A bcrypt hash as persisted in the account store
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HashedCredential(String);

impl HashedCredential {
    /// Wrap a hash read back from storage
    pub fn from_stored(hash: String) -> Self {
        Self(hash)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for HashedCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("HashedCredential(**redacted**)")
    }
}

/// Plaintext behind the decoy hash used for unknown accounts
const DECOY_PASSWORD: &str = "decoy-credential";

/// Hashes and verifies passwords with a fixed bcrypt cost
#[derive(Debug, Clone)]
pub struct CredentialVerifier {
    cost: u32,
    decoy: OnceLock<Option<HashedCredential>>,
}

impl Default for CredentialVerifier {
    fn default() -> Self {
        Self::new(DEFAULT_COST)
    }
}

impl CredentialVerifier {
    pub fn new(cost: u32) -> Self {
        Self {
            cost,
            decoy: OnceLock::new(),
        }
    }

    /// Hash a plaintext password
    pub fn hash(&self, plaintext: &str) -> Result<HashedCredential, CredentialError> {
        let hashed =
            hash(plaintext, self.cost).map_err(|e| CredentialError::Hashing(e.to_string()))?;
        Ok(HashedCredential(hashed))
    }

    /// Compare a plaintext password against a stored hash.
    ///
    /// A mismatch is `Ok(false)`; only an unreadable hash is an error.
    pub fn verify(
        &self,
        hashed: &HashedCredential,
        plaintext: &str,
    ) -> Result<bool, CredentialError> {
        let valid = verify(plaintext, hashed.as_str())
            .map_err(|e: BcryptError| CredentialError::InvalidHashFormat(e.to_string()))?;
        debug!(valid, "Password verification finished");
        Ok(valid)
    }

    /// Spend the same bcrypt work as `verify` when no account matched
    pub fn verify_absent(&self, plaintext: &str) {
        let decoy = self.decoy.get_or_init(|| self.hash(DECOY_PASSWORD).ok());
        if let Some(decoy) = decoy {
            let _ = verify(plaintext, decoy.as_str());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fast_verifier() -> CredentialVerifier {
        CredentialVerifier::new(4)
    }

    #[test]
    fn test_hash_and_verify() {
        let verifier = fast_verifier();
        let hashed = verifier.hash("secret1").unwrap();

        assert_ne!(hashed.as_str(), "secret1");
        assert!(verifier.verify(&hashed, "secret1").unwrap());
    }

    #[test]
    fn test_wrong_password_is_false_not_error() {
        let verifier = fast_verifier();
        let hashed = verifier.hash("secret1").unwrap();

        assert_eq!(verifier.verify(&hashed, "secret2"), Ok(false));
        assert_eq!(verifier.verify(&hashed, ""), Ok(false));
    }

    #[test]
    fn test_hashes_are_salted() {
        let verifier = fast_verifier();
        let first = verifier.hash("same-password").unwrap();
        let second = verifier.hash("same-password").unwrap();

        assert_ne!(first, second);
        assert!(verifier.verify(&second, "same-password").unwrap());
    }

    #[test]
    fn test_corrupt_hash_is_invalid_format() {
        let verifier = fast_verifier();
        let corrupt = HashedCredential::from_stored("not-a-bcrypt-hash".to_string());

        let result = verifier.verify(&corrupt, "anything");
        assert!(matches!(result, Err(CredentialError::InvalidHashFormat(_))));
    }

    #[test]
    fn test_unsupported_cost_is_hashing_error() {
        let verifier = CredentialVerifier::new(99);

        let result = verifier.hash("password");
        assert!(matches!(result, Err(CredentialError::Hashing(_))));
    }

    #[test]
    fn test_verify_absent_uses_configured_cost() {
        let verifier = fast_verifier();
        verifier.verify_absent("whatever");

        let decoy = verifier.decoy.get().cloned().flatten().unwrap();
        assert!(decoy.as_str().starts_with("$2b$04$"));
        assert!(verifier.verify(&decoy, DECOY_PASSWORD).unwrap());

        // Cached after the first call
        verifier.verify_absent("again");
        assert_eq!(verifier.decoy.get().cloned().flatten(), Some(decoy));
    }

    #[test]
    fn test_debug_redacts_hash() {
        let hashed = fast_verifier().hash("secret1").unwrap();
        let rendered = format!("{hashed:?}");
        assert!(!rendered.contains(hashed.as_str()));
    }
}
