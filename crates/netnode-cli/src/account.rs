//! # Account Subcommand
//!
//! Manages the accounts allowed to call the API. Only token digests are
//! stored; the plaintext token is whatever the operator passes on the
//! command line.
//!
//! ## Commands
//!
//! - `netnode account create --username <name> --token <token> [--inactive]`
//! - `netnode account deactivate --username <name>`
//! - `netnode account list`

use anyhow::{bail, Context, Result};
use clap::{Args, Subcommand};

use netnode_api::db;
use netnode_api::state::AccountRecord;

/// Arguments for the `netnode account` subcommand.
#[derive(Args, Debug)]
pub struct AccountArgs {
    /// Postgres connection string. Defaults to `DATABASE_URL`.
    #[arg(long, global = true)]
    pub database_url: Option<String>,

    #[command(subcommand)]
    pub command: AccountCommand,
}

/// Account subcommands.
#[derive(Subcommand, Debug)]
pub enum AccountCommand {
    /// Create an account.
    Create {
        #[arg(long)]
        username: String,

        /// Bearer token the account will authenticate with.
        #[arg(long)]
        token: String,

        /// Create the account already deactivated.
        #[arg(long)]
        inactive: bool,
    },

    /// Deactivate an account. The API rejects its token from the next
    /// request on.
    Deactivate {
        #[arg(long)]
        username: String,
    },

    /// List accounts.
    List,
}

/// Check the credentials an operator supplied before touching the database.
pub fn new_account(username: &str, token: &str, is_active: bool) -> Result<AccountRecord> {
    let username = username.trim();
    if username.is_empty() {
        bail!("username must not be empty");
    }
    if username.contains(':') || username.contains(',') {
        bail!("username must not contain ':' or ','");
    }
    if token.trim().is_empty() {
        bail!("token must not be empty");
    }
    Ok(AccountRecord::new(username, token, is_active))
}

/// One line per account: username, status, creation time.
pub fn format_accounts(accounts: &[AccountRecord]) -> String {
    accounts
        .iter()
        .map(|a| {
            let status = if a.is_active { "active" } else { "inactive" };
            format!(
                "{:<24} {:<8} {}",
                a.username,
                status,
                a.created_at.format("%Y-%m-%d %H:%M:%S UTC")
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Execute the account subcommand.
pub fn run_account(args: &AccountArgs) -> Result<u8> {
    // Validate before opening a connection.
    let record = match &args.command {
        AccountCommand::Create {
            username,
            token,
            inactive,
        } => Some(new_account(username, token, !inactive)?),
        _ => None,
    };

    let url = crate::database_url(args.database_url.as_deref())?;
    let runtime = crate::runtime()?;

    runtime.block_on(async {
        let pool = crate::connect(&url).await?;
        match &args.command {
            AccountCommand::Create { .. } => {
                let record = record.context("account record was not prepared")?;
                db::accounts::insert(&pool, &record)
                    .await
                    .with_context(|| format!("failed to create account {:?}", record.username))?;
                tracing::info!(user = %record.username, active = record.is_active, "account created");
                println!("created account {} ({})", record.username, record.id);
                Ok(0)
            }
            AccountCommand::Deactivate { username } => {
                let found = db::accounts::set_active(&pool, username, false)
                    .await
                    .context("failed to deactivate account")?;
                if found {
                    println!("deactivated account {username}");
                    Ok(0)
                } else {
                    eprintln!("no account named {username}");
                    Ok(1)
                }
            }
            AccountCommand::List => {
                let accounts = db::accounts::load_all(&pool)
                    .await
                    .context("failed to load accounts")?;
                if accounts.is_empty() {
                    println!("no accounts");
                } else {
                    println!("{}", format_accounts(&accounts));
                }
                Ok(0)
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_account_hashes_token() {
        let account = new_account(" alice ", "s3cret", true).unwrap();
        assert_eq!(account.username, "alice");
        assert_eq!(account.token_digest, netnode_api::auth::token_digest("s3cret"));
        assert!(account.is_active);
    }

    #[test]
    fn new_account_rejects_bad_input() {
        assert!(new_account("", "token", true).is_err());
        assert!(new_account("alice", "  ", true).is_err());
        assert!(new_account("al:ice", "token", true).is_err());
    }

    #[test]
    fn format_marks_inactive_accounts() {
        let accounts = vec![
            AccountRecord::new("alice", "a", true),
            AccountRecord::new("bob", "b", false),
        ];
        let out = format_accounts(&accounts);
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("alice"));
        assert!(lines[0].contains("active"));
        assert!(lines[1].contains("inactive"));
        assert!(!out.contains(&accounts[0].token_digest));
    }
}
