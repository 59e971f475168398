use crate::api::{
    error::ApiError,
    validate::{require_email, require_non_empty},
    AppState,
};
use crate::auth::{
    account_store::AccountStore,
    api::email_taken,
    extract::{AdminCaller, Authenticated},
    models::{normalize_email, AccountResponse, UpdateAccountRequest},
};
use crate::db::is_unique_violation;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use chrono::Utc;
use tracing::info;
use uuid::Uuid;

/// GET /users
pub async fn list_users(
    _caller: Authenticated,
    State(state): State<AppState>,
) -> Result<Json<Vec<AccountResponse>>, ApiError> {
    let accounts = state.db.list_accounts()?;
    Ok(Json(
        accounts.iter().map(AccountResponse::from_account).collect(),
    ))
}

/// GET /users/:id
pub async fn get_user(
    _caller: Authenticated,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<AccountResponse>, ApiError> {
    let account = state
        .db
        .find_by_id(&id)?
        .ok_or(ApiError::NotFound("Account"))?;
    Ok(Json(AccountResponse::from_account(&account)))
}

/// PUT /users/:id - owner only
pub async fn update_user(
    caller: Authenticated,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateAccountRequest>,
) -> Result<Json<AccountResponse>, ApiError> {
    state
        .owners
        .require_owner(Some(&caller.authorization), id)
        .into_result()?;

    let mut account = state
        .db
        .find_by_id(&id)?
        .ok_or(ApiError::NotFound("Account"))?;

    let email = normalize_email(&payload.email);
    require_email(&email)?;
    require_non_empty("firstName", &payload.first_name)?;
    require_non_empty("lastName", &payload.last_name)?;

    if email != account.email {
        if let Some(other) = state.db.find_by_email(&email)? {
            if other.id != account.id {
                return Err(email_taken(&email));
            }
        }
    }

    account.email = email;
    account.first_name = payload.first_name.trim().to_string();
    account.last_name = payload.last_name.trim().to_string();
    account.updated_at = Utc::now();

    state.db.save(&account).map_err(|e| {
        if is_unique_violation(&e) {
            email_taken(&account.email)
        } else {
            e.into()
        }
    })?;

    info!("Updated account {}", account.id);
    Ok(Json(AccountResponse::from_account(&account)))
}

/// DELETE /users/:id - admin only
pub async fn delete_user(
    admin: AdminCaller,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    if !state.db.delete_account(&id)? {
        return Err(ApiError::NotFound("Account"));
    }

    info!("Account {} deleted by {}", id, admin.claims.sub);
    Ok(StatusCode::NO_CONTENT)
}
