//! # netnode-api — Binary Entry Point
//!
//! Reads configuration from the environment, connects to Postgres when
//! `DATABASE_URL` is set, and serves the API.

use netnode_api::state::{AppConfig, AppState};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let json_logs = std::env::var("NETNODE_LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);
    if json_logs {
        tracing_subscriber::fmt().json().with_env_filter(filter).init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }

    let config = AppConfig::from_env().map_err(|e| {
        tracing::error!(error = %e, "invalid configuration");
        e
    })?;
    tracing::debug!(?config, "configuration loaded");
    let port = config.port;

    // Absent DATABASE_URL means in-memory only.
    let db_pool = netnode_api::db::init_pool(config.database_url.as_deref())
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "database initialization failed");
            e
        })?;

    let state = AppState::with_config(config, db_pool);

    state.hydrate_from_db().await.map_err(|e| {
        tracing::error!(error = %e, "database hydration failed");
        e
    })?;

    let app = netnode_api::app(state);

    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], port));
    tracing::info!(%addr, "netnode API listening");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
