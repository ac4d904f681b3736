//! # Application State
//!
//! Shared state for the Axum application, passed to all route handlers
//! via the `State` extractor.
//!
//! ## Architecture
//!
//! - **Network nodes** and **products** live in in-memory stores that serve
//!   every read. When a database pool is configured, the stores are hydrated
//!   from Postgres on startup and each mutation is written to Postgres first;
//!   the in-memory change is applied only once that write succeeds.
//! - Mutations are serialized by [`AppState::begin_write`], so the database
//!   sees them in the same order as the stores.
//! - **Accounts** seeded from `NETNODE_ACCOUNTS` live in memory. Accounts in
//!   the `accounts` table are looked up on every request instead; see
//!   [`crate::auth`].

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use netnode_core::{NetworkNode, NodeId, Product, ProductId};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use thiserror::Error;
use tokio::sync::{Mutex, MutexGuard};
use uuid::Uuid;

use crate::auth::token_digest;

// -- Generic In-Memory Store --------------------------------------------------

/// Thread-safe, cloneable in-memory key-value store.
///
/// All operations are synchronous (the RwLock is `parking_lot`, not `tokio::sync`)
/// because the lock is never held across `.await` points.
#[derive(Debug)]
pub struct Store<K, T> {
    data: Arc<RwLock<HashMap<K, T>>>,
}

impl<K, T> Clone for Store<K, T> {
    fn clone(&self) -> Self {
        Self {
            data: Arc::clone(&self.data),
        }
    }
}

impl<K, T> Store<K, T>
where
    K: Eq + Hash + Clone,
    T: Clone,
{
    /// Create an empty store.
    pub fn new() -> Self {
        Self {
            data: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Insert a record, returning the previous value if the key existed.
    pub fn insert(&self, id: K, value: T) -> Option<T> {
        self.data.write().insert(id, value)
    }

    /// Retrieve a record by ID.
    pub fn get(&self, id: &K) -> Option<T> {
        self.data.read().get(id).cloned()
    }

    /// List all records.
    pub fn list(&self) -> Vec<T> {
        self.data.read().values().cloned().collect()
    }

    /// Update a record in place. Returns the updated record, or `None` if not found.
    pub fn update(&self, id: &K, f: impl FnOnce(&mut T)) -> Option<T> {
        let mut guard = self.data.write();
        let entry = guard.get_mut(id)?;
        f(entry);
        Some(entry.clone())
    }

    /// Run `f` with exclusive access to the whole map.
    ///
    /// For changes that touch many records at once, such as orphaning the
    /// dependents of a deleted node.
    pub fn with_write<R>(&self, f: impl FnOnce(&mut HashMap<K, T>) -> R) -> R {
        f(&mut self.data.write())
    }

    /// Remove a record by ID.
    pub fn remove(&self, id: &K) -> Option<T> {
        self.data.write().remove(id)
    }

    /// Keep only the records matching `keep`. Returns how many were dropped.
    pub fn retain(&self, mut keep: impl FnMut(&T) -> bool) -> usize {
        let mut guard = self.data.write();
        let before = guard.len();
        guard.retain(|_, v| keep(v));
        before - guard.len()
    }

    /// Check if a record exists.
    pub fn contains(&self, id: &K) -> bool {
        self.data.read().contains_key(id)
    }

    /// Return the number of records.
    pub fn len(&self) -> usize {
        self.data.read().len()
    }

    /// Whether the store is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<K, T> Default for Store<K, T>
where
    K: Eq + Hash + Clone,
    T: Clone,
{
    fn default() -> Self {
        Self::new()
    }
}

// -- Accounts -----------------------------------------------------------------

/// An API caller.
///
/// Only the SHA-256 digest of the bearer token is kept.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountRecord {
    pub id: Uuid,
    pub username: String,
    /// Lowercase hex SHA-256 of the bearer token.
    pub token_digest: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl AccountRecord {
    pub fn new(username: impl Into<String>, token: &str, is_active: bool) -> Self {
        Self {
            id: Uuid::new_v4(),
            username: username.into(),
            token_digest: token_digest(token),
            is_active,
            created_at: Utc::now(),
        }
    }
}

/// An account declared in configuration.
#[derive(Clone, PartialEq, Eq)]
pub struct AccountSeed {
    pub username: String,
    pub token: String,
    pub is_active: bool,
}

impl std::fmt::Debug for AccountSeed {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccountSeed")
            .field("username", &self.username)
            .field("token", &"[REDACTED]")
            .field("is_active", &self.is_active)
            .finish()
    }
}

impl AccountSeed {
    /// Parse one `username:token[:inactive]` entry.
    pub fn parse(entry: &str) -> Result<Self, ConfigError> {
        let parts: Vec<&str> = entry.trim().split(':').collect();
        let (username, token, is_active) = match parts.as_slice() {
            [username, token] => (*username, *token, true),
            [username, token, "inactive"] => (*username, *token, false),
            [username, token, "active"] => (*username, *token, true),
            _ => return Err(ConfigError::InvalidAccount(redact_entry(entry))),
        };
        if username.is_empty() || token.is_empty() {
            return Err(ConfigError::InvalidAccount(redact_entry(entry)));
        }
        Ok(Self {
            username: username.to_string(),
            token: token.to_string(),
            is_active,
        })
    }
}

/// Keep only the username part of a malformed entry for error messages.
fn redact_entry(entry: &str) -> String {
    let username = entry.trim().split(':').next().unwrap_or_default();
    format!("{username}:[REDACTED]")
}

// -- Configuration ------------------------------------------------------------

/// Default page size for list endpoints.
pub const DEFAULT_PAGE_SIZE: usize = 10;
/// Largest page size a client may request.
pub const MAX_PAGE_SIZE: usize = 100;

/// Invalid configuration value.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("PORT must be a valid port number, got {0:?}")]
    InvalidPort(String),

    #[error("NETNODE_PAGE_SIZE must be between 1 and 100, got {0:?}")]
    InvalidPageSize(String),

    #[error("NETNODE_ACCOUNTS entry must be username:token[:inactive], got {0:?}")]
    InvalidAccount(String),

    #[error("{name} must be true or false, got {value:?}")]
    InvalidFlag { name: &'static str, value: String },
}

/// Application configuration.
///
/// Custom `Debug` redacts the database URL and account tokens to prevent
/// credential leakage in logs.
#[derive(Clone)]
pub struct AppConfig {
    /// Port to bind the HTTP server to.
    pub port: u16,
    /// Postgres connection string. `None` runs in-memory only.
    pub database_url: Option<String>,
    /// Accounts created at startup.
    pub accounts: Vec<AccountSeed>,
    /// Default page size for list endpoints.
    pub page_size: usize,
    /// Whether `/metrics` and the metrics middleware are mounted.
    pub metrics_enabled: bool,
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("port", &self.port)
            .field(
                "database_url",
                &self.database_url.as_ref().map(|_| "[REDACTED]"),
            )
            .field("accounts", &self.accounts)
            .field("page_size", &self.page_size)
            .field("metrics_enabled", &self.metrics_enabled)
            .finish()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            port: 8080,
            database_url: None,
            accounts: Vec::new(),
            page_size: DEFAULT_PAGE_SIZE,
            metrics_enabled: true,
        }
    }
}

impl AppConfig {
    /// Build configuration from process environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from an arbitrary key lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Some(port) = lookup("PORT") {
            config.port = port
                .trim()
                .parse()
                .map_err(|_| ConfigError::InvalidPort(port.clone()))?;
        }

        config.database_url = lookup("DATABASE_URL").filter(|url| !url.trim().is_empty());

        if let Some(accounts) = lookup("NETNODE_ACCOUNTS") {
            config.accounts = accounts
                .split(',')
                .filter(|entry| !entry.trim().is_empty())
                .map(AccountSeed::parse)
                .collect::<Result<_, _>>()?;
        }

        if let Some(size) = lookup("NETNODE_PAGE_SIZE") {
            config.page_size = match size.trim().parse::<usize>() {
                Ok(n) if (1..=MAX_PAGE_SIZE).contains(&n) => n,
                _ => return Err(ConfigError::InvalidPageSize(size)),
            };
        }

        if let Some(flag) = lookup("NETNODE_METRICS_ENABLED") {
            config.metrics_enabled = match flag.trim().to_lowercase().as_str() {
                "true" | "1" | "yes" => true,
                "false" | "0" | "no" => false,
                _ => {
                    return Err(ConfigError::InvalidFlag {
                        name: "NETNODE_METRICS_ENABLED",
                        value: flag,
                    })
                }
            };
        }

        Ok(config)
    }
}

// -- Application State --------------------------------------------------------

/// Shared application state.
#[derive(Debug, Clone)]
pub struct AppState {
    pub nodes: Store<NodeId, NetworkNode>,
    pub products: Store<ProductId, Product>,
    /// Accounts seeded from configuration.
    pub accounts: Store<Uuid, AccountRecord>,

    // -- Database persistence (optional) --
    /// When `Some`, every mutation is written to Postgres before the stores.
    pub db_pool: Option<PgPool>,

    pub config: AppConfig,

    writer: Arc<Mutex<()>>,
}

impl AppState {
    /// Create a new application state with default configuration.
    pub fn new() -> Self {
        Self::with_config(AppConfig::default(), None)
    }

    /// Create application state, seeding accounts from configuration.
    pub fn with_config(config: AppConfig, db_pool: Option<PgPool>) -> Self {
        let state = Self {
            nodes: Store::new(),
            products: Store::new(),
            accounts: Store::new(),
            db_pool,
            config,
            writer: Arc::new(Mutex::new(())),
        };
        for seed in &state.config.accounts {
            let record = AccountRecord::new(&seed.username, &seed.token, seed.is_active);
            state.accounts.insert(record.id, record);
        }
        if state.accounts.is_empty() && state.db_pool.is_none() {
            tracing::warn!("no API accounts configured; every API request will be rejected");
        }
        state
    }

    /// Take the single-writer gate.
    ///
    /// Every mutating handler holds the guard from validation until the
    /// stores are updated, across the database write. Reads never take it.
    pub async fn begin_write(&self) -> MutexGuard<'_, ()> {
        self.writer.lock().await
    }

    /// Hydrate the node and product stores from the database.
    ///
    /// Called once on startup when a database pool is available. Stored
    /// accounts are not copied; authentication reads them per request.
    pub async fn hydrate_from_db(&self) -> Result<(), sqlx::Error> {
        let pool = match &self.db_pool {
            Some(pool) => pool,
            None => return Ok(()),
        };

        let nodes = crate::db::nodes::load_all(pool).await?;
        let node_count = nodes.len();
        for node in nodes {
            self.nodes.insert(node.id, node);
        }

        let products = crate::db::products::load_all(pool).await?;
        let product_count = products.len();
        for product in products {
            self.products.insert(product.id, product);
        }

        tracing::info!(
            nodes = node_count,
            products = product_count,
            "hydrated in-memory stores from database"
        );

        Ok(())
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    // -- Store tests ----------------------------------------------------------

    #[test]
    fn store_insert_get_remove() {
        let store: Store<Uuid, String> = Store::new();
        let id = Uuid::new_v4();
        assert!(store.insert(id, "a".into()).is_none());
        assert_eq!(store.insert(id, "b".into()).as_deref(), Some("a"));
        assert_eq!(store.get(&id).as_deref(), Some("b"));
        assert!(store.contains(&id));
        assert_eq!(store.remove(&id).as_deref(), Some("b"));
        assert!(store.is_empty());
    }

    #[test]
    fn store_update_in_place() {
        let store: Store<Uuid, u32> = Store::new();
        let id = Uuid::new_v4();
        store.insert(id, 1);
        assert_eq!(store.update(&id, |v| *v += 1), Some(2));
        assert!(store.update(&Uuid::new_v4(), |v| *v += 1).is_none());
        assert_eq!(store.get(&id), Some(2));
    }

    #[test]
    fn store_retain_reports_dropped() {
        let store: Store<u32, u32> = Store::new();
        for i in 0..10 {
            store.insert(i, i);
        }
        assert_eq!(store.retain(|v| v % 2 == 0), 5);
        assert_eq!(store.len(), 5);
    }

    #[test]
    fn store_clone_shares_underlying_data() {
        let store: Store<u32, u32> = Store::new();
        let clone = store.clone();
        clone.insert(1, 1);
        assert_eq!(store.len(), 1);
        store.with_write(|map| map.clear());
        assert!(clone.is_empty());
    }

    // -- Config tests ---------------------------------------------------------

    #[test]
    fn config_defaults() {
        let config = AppConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.port, 8080);
        assert!(config.database_url.is_none());
        assert!(config.accounts.is_empty());
        assert_eq!(config.page_size, DEFAULT_PAGE_SIZE);
        assert!(config.metrics_enabled);
    }

    #[test]
    fn config_reads_every_variable() {
        let config = AppConfig::from_lookup(lookup(&[
            ("PORT", "3000"),
            ("DATABASE_URL", "postgres://u:p@localhost/netnode"),
            ("NETNODE_ACCOUNTS", "alice:s3cret, bob:hunter2:inactive"),
            ("NETNODE_PAGE_SIZE", "25"),
            ("NETNODE_METRICS_ENABLED", "false"),
        ]))
        .unwrap();
        assert_eq!(config.port, 3000);
        assert!(config.database_url.is_some());
        assert_eq!(config.accounts.len(), 2);
        assert!(config.accounts[0].is_active);
        assert!(!config.accounts[1].is_active);
        assert_eq!(config.accounts[1].username, "bob");
        assert_eq!(config.page_size, 25);
        assert!(!config.metrics_enabled);
    }

    #[test]
    fn config_rejects_malformed_values() {
        assert!(matches!(
            AppConfig::from_lookup(lookup(&[("PORT", "http")])),
            Err(ConfigError::InvalidPort(_))
        ));
        assert!(matches!(
            AppConfig::from_lookup(lookup(&[("NETNODE_PAGE_SIZE", "500")])),
            Err(ConfigError::InvalidPageSize(_))
        ));
        assert!(matches!(
            AppConfig::from_lookup(lookup(&[("NETNODE_ACCOUNTS", "nobody")])),
            Err(ConfigError::InvalidAccount(_))
        ));
        assert!(matches!(
            AppConfig::from_lookup(lookup(&[("NETNODE_METRICS_ENABLED", "maybe")])),
            Err(ConfigError::InvalidFlag { .. })
        ));
    }

    #[test]
    fn debug_redacts_secrets() {
        let config = AppConfig::from_lookup(lookup(&[
            ("DATABASE_URL", "postgres://u:topsecret@db/netnode"),
            ("NETNODE_ACCOUNTS", "alice:tokenvalue"),
        ]))
        .unwrap();
        let debug = format!("{config:?}");
        assert!(!debug.contains("topsecret"));
        assert!(!debug.contains("tokenvalue"));
        assert!(debug.contains("alice"));
    }

    #[test]
    fn malformed_account_error_hides_token() {
        let err = AccountSeed::parse("alice:tok:weird").unwrap_err();
        assert!(!err.to_string().contains("tok:"));
    }

    // -- AppState tests -------------------------------------------------------

    #[test]
    fn app_state_new_creates_empty_stores() {
        let state = AppState::new();
        assert!(state.nodes.is_empty());
        assert!(state.products.is_empty());
        assert!(state.accounts.is_empty());
        assert!(state.db_pool.is_none());
    }

    #[test]
    fn app_state_seeds_accounts() {
        let config = AppConfig {
            accounts: vec![AccountSeed::parse("alice:s3cret").unwrap()],
            ..AppConfig::default()
        };
        let state = AppState::with_config(config, None);
        let accounts = state.accounts.list();
        assert_eq!(accounts.len(), 1);
        let alice = &accounts[0];
        assert_eq!(alice.username, "alice");
        assert!(alice.is_active);
        assert_eq!(alice.token_digest, token_digest("s3cret"));
        assert_ne!(alice.token_digest, "s3cret");
    }

    #[tokio::test]
    async fn writers_are_serialized() {
        let state = AppState::new();
        let guard = state.begin_write().await;
        let other = state.clone();
        let waiter = tokio::spawn(async move {
            let _guard = other.begin_write().await;
        });
        tokio::task::yield_now().await;
        assert!(!waiter.is_finished());
        drop(guard);
        waiter.await.unwrap();
    }
}
