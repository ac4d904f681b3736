//! # Authentication Middleware
//!
//! Bearer token middleware. Every request to the node and product API must
//! carry `Authorization: Bearer <token>` matching an active account.
//!
//! Tokens are never stored: accounts keep the SHA-256 digest, and the
//! middleware compares digests in constant time against every account so
//! the response time does not depend on which account matched.
//!
//! A missing token, an unknown token, and a deactivated account are all
//! rejected with 403.
//!
//! ## Account sources
//!
//! Seed accounts from configuration are checked first and take precedence
//! over a database account with the same username. Any other token is
//! looked up in Postgres on every request, so `netnode-cli account
//! deactivate` and `account create` take effect without a restart. When the
//! database cannot be reached that lookup fails with 503.
//!
//! ## Caller
//!
//! Every authenticated request gets a [`Caller`] injected into the request
//! extensions. Handlers extract it via the `FromRequestParts` impl.

use axum::extract::Request;
use axum::http::header;
use axum::http::request::Parts;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use sha2::{Digest, Sha256};
use sqlx::PgPool;
use subtle::ConstantTimeEq;
use uuid::Uuid;

use crate::error::AppError;
use crate::state::{AccountRecord, Store};

/// Identity of the authenticated caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Caller {
    pub account_id: Uuid,
    pub username: String,
}

/// Extracts the caller that the auth middleware injected into extensions.
#[axum::async_trait]
impl<S: Send + Sync> axum::extract::FromRequestParts<S> for Caller {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Caller>()
            .cloned()
            .ok_or_else(|| AppError::Forbidden("no caller identity in request context".into()))
    }
}

/// Auth configuration injected into request extensions.
#[derive(Debug, Clone)]
pub struct AuthConfig {
    /// Accounts seeded from configuration.
    pub accounts: Store<Uuid, AccountRecord>,
    /// Source of every other account.
    pub db_pool: Option<PgPool>,
}

/// Lowercase hex SHA-256 digest of a bearer token.
pub fn token_digest(token: &str) -> String {
    format!("{:x}", Sha256::digest(token.as_bytes()))
}

/// Find the account whose digest matches `digest`.
///
/// Every account is compared, so timing does not reveal which account (if
/// any) matched.
fn find_account(accounts: &[AccountRecord], digest: &str) -> Option<AccountRecord> {
    let mut found = None;
    for account in accounts {
        let matches: bool = digest
            .as_bytes()
            .ct_eq(account.token_digest.as_bytes())
            .into();
        if matches && found.is_none() {
            found = Some(account.clone());
        }
    }
    found
}

/// Pull the token out of an `Authorization` header value.
fn bearer_token(header_value: Option<&str>) -> Result<&str, AppError> {
    let header_value = header_value.ok_or_else(|| {
        AppError::Forbidden("Authentication credentials were not provided.".into())
    })?;
    header_value
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or_else(|| AppError::Forbidden("authorization header must use Bearer scheme".into()))
}

fn invalid_token() -> AppError {
    AppError::Forbidden("Invalid token.".into())
}

fn into_caller(account: AccountRecord) -> Result<Caller, AppError> {
    if !account.is_active {
        return Err(AppError::Forbidden("User inactive or deleted.".into()));
    }
    Ok(Caller {
        account_id: account.id,
        username: account.username,
    })
}

/// Resolve an `Authorization` header value against the seed accounts, then
/// the database.
pub async fn resolve_caller(
    config: &AuthConfig,
    header_value: Option<&str>,
) -> Result<Caller, AppError> {
    let token = bearer_token(header_value)?;
    let digest = token_digest(token);
    let seeds = config.accounts.list();

    if let Some(account) = find_account(&seeds, &digest) {
        return into_caller(account);
    }

    let Some(pool) = &config.db_pool else {
        return Err(invalid_token());
    };
    let account = crate::db::accounts::find_by_digest(pool, &digest)
        .await
        .map_err(|e| {
            tracing::warn!(error = %e, "account lookup failed");
            AppError::ServiceUnavailable("account store unreachable".into())
        })?
        .ok_or_else(invalid_token)?;

    // A seed account shadows the stored account of the same name.
    if seeds.iter().any(|s| s.username == account.username) {
        return Err(invalid_token());
    }
    into_caller(account)
}

/// Validate the bearer token and inject the [`Caller`] for downstream handlers.
pub async fn auth_middleware(mut request: Request, next: Next) -> Response {
    let Some(config) = request.extensions().get::<AuthConfig>().cloned() else {
        tracing::error!("auth middleware mounted without AuthConfig extension");
        return AppError::Internal("authentication is not configured".into()).into_response();
    };

    let header_value = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok());

    match resolve_caller(&config, header_value).await {
        Ok(caller) => {
            tracing::debug!(user = %caller.username, "authenticated request");
            request.extensions_mut().insert(caller);
            next.run(request).await
        }
        Err(err) => {
            tracing::warn!(reason = %err, "authentication failed");
            err.into_response()
        }
    }
}
