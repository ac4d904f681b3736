//! # Database Persistence Layer
//!
//! Postgres persistence for network nodes, products, and accounts via SQLx.
//!
//! ## Architecture
//!
//! The database layer is **optional**. When `DATABASE_URL` is set, the API
//! writes every mutation through to PostgreSQL and hydrates its in-memory
//! stores from it on startup. When absent, the API operates in
//! in-memory-only mode (suitable for development and testing).
//!
//! ## Referential rules
//!
//! The schema carries the deletion rules as foreign keys: deleting a node
//! sets `supplier_id` to NULL on its dependents and deletes its products.

pub mod accounts;
pub mod nodes;
pub mod products;

use sqlx::postgres::{PgPool, PgPoolOptions};

/// Connect to Postgres and run embedded migrations.
///
/// Returns `None` when no URL is configured (in-memory-only mode).
/// Returns `Err` if the URL is set but the connection or migration fails.
pub async fn init_pool(url: Option<&str>) -> Result<Option<PgPool>, sqlx::Error> {
    let Some(url) = url else {
        tracing::warn!(
            "DATABASE_URL not set; running in-memory only mode. \
             State will not survive restarts."
        );
        return Ok(None);
    };

    let pool = connect(url).await?;
    tracing::info!("connected to PostgreSQL");

    sqlx::migrate!("./migrations").run(&pool).await?;
    tracing::info!("database migrations applied");

    Ok(Some(pool))
}

/// Open a connection pool without running migrations.
pub async fn connect(url: &str) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(1)
        .acquire_timeout(std::time::Duration::from_secs(5))
        .connect(url)
        .await
}

/// A pool whose every connection attempt fails quickly.
#[cfg(test)]
pub(crate) fn unreachable_pool() -> PgPool {
    PgPoolOptions::new()
        .acquire_timeout(std::time::Duration::from_millis(500))
        .connect_lazy("postgres://netnode@127.0.0.1:1/netnode")
        .expect("lazy pool from a well-formed URL")
}
