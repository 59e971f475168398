//! Movie Review API
//! Mission: Serve movies, reviews and accounts behind bearer-token auth

use anyhow::{Context, Result};
use clap::Parser;
use dotenv::dotenv;
use movie_api::{
    api::{self, AppState},
    auth::api::ensure_admin,
    config::Config,
    db::Database,
};
use std::{net::SocketAddr, path::Path, sync::Arc};
use tokio::net::TcpListener;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    load_env();
    init_tracing();

    let config = Config::parse();
    config.validate()?;
    info!("Starting movie-api with {:?}", config);

    let db = Arc::new(Database::open(&config.database_path)?);
    info!("Database ready at: {}", config.database_path);

    let state = AppState::from_config(db.clone(), &config);

    if let Some((email, password)) = config.bootstrap_admin() {
        let admins_present = db.count_admins()? > 0;
        if ensure_admin(db.as_ref(), admins_present, &state.credentials, email, password)? {
            warn!("Bootstrap admin account provisioned; rotate ADMIN_PASSWORD");
        }
    }

    let app = api::router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    info!("API server listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}

fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "movie_api=debug,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

fn load_env() {
    let _ = dotenv();

    // Also try the manifest directory when launched from elsewhere
    let manifest_env = Path::new(env!("CARGO_MANIFEST_DIR")).join(".env");
    if manifest_env.exists() {
        let _ = dotenv::from_path(&manifest_env);
    }
}
