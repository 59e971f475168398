//! REST surface
//!
//! Public: health, login, registration. Everything else sits behind the
//! authorization extractors in `auth::extract`.

pub mod error;
pub mod movies;
pub mod reviews;
pub mod users;
pub mod validate;

use crate::auth::{
    api as auth_api, AccountStore, AuthorizationGate, CredentialVerifier, OwnershipGuard,
    TokenCodec,
};
use crate::config::Config;
use crate::db::Database;
use crate::middleware::request_logging;
use axum::{
    middleware,
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};
use std::sync::Arc;
use tower_http::cors::CorsLayer;

/// Shared handler state
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<Database>,
    pub codec: Arc<TokenCodec>,
    pub credentials: Arc<CredentialVerifier>,
    pub gate: Arc<AuthorizationGate>,
    pub owners: Arc<OwnershipGuard>,
}

impl AppState {
    pub fn new(db: Arc<Database>, codec: Arc<TokenCodec>, credentials: CredentialVerifier) -> Self {
        let accounts: Arc<dyn AccountStore> = db.clone();
        Self {
            gate: Arc::new(AuthorizationGate::new(codec.clone(), accounts)),
            owners: Arc::new(OwnershipGuard::new(codec.clone())),
            credentials: Arc::new(credentials),
            codec,
            db,
        }
    }

    pub fn from_config(db: Arc<Database>, config: &Config) -> Self {
        Self::new(
            db,
            Arc::new(TokenCodec::new(config.jwt_secret.clone())),
            CredentialVerifier::new(config.bcrypt_cost),
        )
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/auth/login", post(auth_api::login))
        .route("/users", get(users::list_users).post(auth_api::register))
        .route(
            "/users/:id",
            get(users::get_user)
                .put(users::update_user)
                .delete(users::delete_user),
        )
        .route("/movies", get(movies::list_movies).post(movies::create_movie))
        .route(
            "/movies/:id",
            get(movies::get_movie)
                .put(movies::update_movie)
                .delete(movies::delete_movie),
        )
        .route("/reviews", post(reviews::create_review))
        .route(
            "/reviews/:id",
            get(reviews::reviews_for_movie)
                .put(reviews::update_review)
                .delete(reviews::delete_review),
        )
        .layer(middleware::from_fn(request_logging))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn health_check() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}
