//! Account persistence operations on the `accounts` table.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::state::AccountRecord;

/// Insert a new account. Fails on a duplicate username.
pub async fn insert(pool: &PgPool, account: &AccountRecord) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO accounts (id, username, token_digest, is_active, created_at)
         VALUES ($1, $2, $3, $4, $5)",
    )
    .bind(account.id)
    .bind(&account.username)
    .bind(&account.token_digest)
    .bind(account.is_active)
    .bind(account.created_at)
    .execute(pool)
    .await?;

    Ok(())
}

/// Flip the active flag. Returns `false` if no such username exists.
pub async fn set_active(pool: &PgPool, username: &str, is_active: bool) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("UPDATE accounts SET is_active = $1 WHERE username = $2")
        .bind(is_active)
        .bind(username)
        .execute(pool)
        .await?;

    Ok(result.rows_affected() > 0)
}

/// Find the account holding a token digest.
///
/// Runs on every authenticated request so deactivation and new accounts
/// take effect without a restart.
pub async fn find_by_digest(
    pool: &PgPool,
    token_digest: &str,
) -> Result<Option<AccountRecord>, sqlx::Error> {
    let row = sqlx::query_as::<_, AccountRow>(
        "SELECT id, username, token_digest, is_active, created_at
         FROM accounts WHERE token_digest = $1
         ORDER BY created_at LIMIT 1",
    )
    .bind(token_digest)
    .fetch_optional(pool)
    .await?;

    Ok(row.map(AccountRecord::from))
}

/// Load every account ordered by username.
pub async fn load_all(pool: &PgPool) -> Result<Vec<AccountRecord>, sqlx::Error> {
    let rows = sqlx::query_as::<_, AccountRow>(
        "SELECT id, username, token_digest, is_active, created_at FROM accounts ORDER BY username",
    )
    .fetch_all(pool)
    .await?;

    Ok(rows.into_iter().map(AccountRecord::from).collect())
}

#[derive(sqlx::FromRow)]
struct AccountRow {
    id: Uuid,
    username: String,
    token_digest: String,
    is_active: bool,
    created_at: DateTime<Utc>,
}

impl From<AccountRow> for AccountRecord {
    fn from(r: AccountRow) -> Self {
        Self {
            id: r.id,
            username: r.username,
            token_digest: r.token_digest,
            is_active: r.is_active,
            created_at: r.created_at,
        }
    }
}
