//! # netnode-cli — Operator CLI for the Distribution Network
//!
//! Provides the `netnode` command-line interface.
//!
//! ## Subcommands
//!
//! - `netnode openapi` — Print or write the OpenAPI document.
//! - `netnode account` — Create, deactivate, and list API accounts.
//! - `netnode hierarchy` — Audit supplier chains stored in the database.
//!
//! Commands that touch the database read `DATABASE_URL` unless
//! `--database-url` is given.

pub mod account;
pub mod hierarchy;
pub mod openapi;

use anyhow::{Context, Result};
use sqlx::PgPool;
use tokio::runtime::Runtime;

/// Resolve the database URL from the flag or the environment.
pub fn database_url(flag: Option<&str>) -> Result<String> {
    resolve_database_url(flag, std::env::var("DATABASE_URL").ok())
}

fn resolve_database_url(flag: Option<&str>, env: Option<String>) -> Result<String> {
    flag.map(str::to_string)
        .or(env)
        .filter(|url| !url.trim().is_empty())
        .context("no database configured: pass --database-url or set DATABASE_URL")
}

/// Single-threaded runtime for one-shot database commands.
pub(crate) fn runtime() -> Result<Runtime> {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("failed to start async runtime")
}

/// Connect and apply pending migrations.
pub(crate) async fn connect(url: &str) -> Result<PgPool> {
    netnode_api::db::init_pool(Some(url))
        .await
        .context("failed to connect to database")?
        .context("database pool was not created")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flag_wins_over_environment() {
        let url = resolve_database_url(
            Some("postgres://flag/netnode"),
            Some("postgres://env/netnode".into()),
        )
        .unwrap();
        assert_eq!(url, "postgres://flag/netnode");
    }

    #[test]
    fn environment_is_fallback() {
        let url = resolve_database_url(None, Some("postgres://env/netnode".into())).unwrap();
        assert_eq!(url, "postgres://env/netnode");
    }

    #[test]
    fn missing_url_is_an_error() {
        assert!(resolve_database_url(None, None).is_err());
        assert!(resolve_database_url(Some("  "), None).is_err());
    }
}
