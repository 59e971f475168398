//! Authentication Module
//! Mission: Bearer tokens, password hashing, and role/ownership checks

pub mod account_store;
pub mod api;
pub mod errors;
pub mod extract;
pub mod gate;
pub mod jwt;
pub mod models;
pub mod ownership;
pub mod password;

pub use account_store::{AccountStore, MemoryAccountStore};
pub use errors::AuthError;
pub use gate::{AuthorizationDecision, AuthorizationGate, DenyReason};
pub use jwt::TokenCodec;
pub use ownership::OwnershipGuard;
pub use password::CredentialVerifier;
