//! Authentication API Endpoints
//! Mission: Provide login and registration

use crate::api::{
    error::ApiError,
    validate::{require_email, require_non_empty, require_password},
    AppState,
};
use crate::auth::{
    account_store::AccountStore,
    errors::AuthError,
    models::{
        normalize_email, Account, AccountResponse, CreateAccountRequest, LoginRequest,
        LoginResponse, Role,
    },
    password::CredentialVerifier,
};
use crate::db::is_unique_violation;
use anyhow::{Context, Result};
use axum::{extract::State, http::StatusCode, Json};
use chrono::Utc;
use tracing::{info, warn};

/// Login endpoint - POST /auth/login
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, ApiError> {
    let email = normalize_email(&payload.email);
    info!("Login attempt: {}", email);

    let Some(mut account) = state.db.find_by_email(&email)? else {
        state.credentials.verify_absent(&payload.password);
        warn!("Failed login attempt: {}", email);
        return Err(ApiError::InvalidCredentials);
    };

    let valid = state
        .credentials
        .verify(&account.password_hash, &payload.password)
        .map_err(AuthError::from)?;

    if !valid {
        warn!("Failed login attempt: {}", email);
        return Err(ApiError::InvalidCredentials);
    }

    account.last_login = Some(Utc::now());
    state.db.save(&account)?;

    let issued = state
        .codec
        .issue_for(&account)
        .map_err(AuthError::from)?;

    info!("Login successful: {} ({})", account.email, account.role.as_str());

    Ok(Json(LoginResponse {
        token: issued.token,
        expires_in: issued.expires_in,
        user: AccountResponse::from_account(&account),
    }))
}

/// Registration endpoint - POST /users
pub async fn register(
    State(state): State<AppState>,
    Json(payload): Json<CreateAccountRequest>,
) -> Result<(StatusCode, Json<AccountResponse>), ApiError> {
    let email = normalize_email(&payload.email);
    require_email(&email)?;
    require_non_empty("firstName", &payload.first_name)?;
    require_non_empty("lastName", &payload.last_name)?;
    require_password(&payload.password)?;

    if state.db.find_by_email(&email)?.is_some() {
        return Err(email_taken(&email));
    }

    let password_hash = state
        .credentials
        .hash(&payload.password)
        .map_err(AuthError::from)?;

    let account = Account::new(
        email,
        password_hash,
        payload.first_name.trim().to_string(),
        payload.last_name.trim().to_string(),
    );

    state.db.save(&account).map_err(|e| {
        if is_unique_violation(&e) {
            email_taken(&account.email)
        } else {
            e.into()
        }
    })?;

    info!("Registered account {} ({})", account.email, account.id);

    Ok((
        StatusCode::CREATED,
        Json(AccountResponse::from_account(&account)),
    ))
}

pub(crate) fn email_taken(email: &str) -> ApiError {
    ApiError::Conflict(format!("Account with email {email} already exists"))
}

/// Create the admin account `email` if no admin exists yet.
///
/// An already registered `email` is left untouched: startup configuration
/// never changes the role of an existing account.
/// Returns true when an account was created.
pub fn ensure_admin(
    store: &dyn AccountStore,
    admins_present: bool,
    credentials: &CredentialVerifier,
    email: &str,
    password: &str,
) -> Result<bool> {
    if admins_present {
        return Ok(false);
    }

    let email = normalize_email(email);
    if store.find_by_email(&email)?.is_some() {
        warn!(
            "Bootstrap admin {} is already registered; not promoting it",
            email
        );
        return Ok(false);
    }

    let password_hash = credentials
        .hash(password)
        .context("Failed to hash bootstrap admin password")?;
    let mut account = Account::new(
        email,
        password_hash,
        "Admin".to_string(),
        "Account".to_string(),
    );
    account.role = Role::Admin;

    store.save(&account).context("Failed to save bootstrap admin")?;
    info!("Bootstrap admin ready: {}", account.email);
    Ok(true)
}
