//! # netnode CLI entry point
//!
//! Parses command-line arguments and dispatches to subcommand handlers.

use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use netnode_cli::account::{run_account, AccountArgs};
use netnode_cli::hierarchy::{run_hierarchy, HierarchyArgs};
use netnode_cli::openapi::{run_openapi, OpenapiArgs};

/// Operator tooling for the distribution network service.
///
/// Exports the OpenAPI document, manages API accounts, and audits the
/// supplier hierarchy stored in Postgres.
#[derive(Parser, Debug)]
#[command(name = "netnode", version, about, long_about = None)]
struct Cli {
    /// Enable verbose output. Repeat for more verbosity (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Print or write the OpenAPI document.
    Openapi(OpenapiArgs),

    /// Create, deactivate, and list API accounts.
    Account(AccountArgs),

    /// Print every node's hierarchy level; exit 1 on a broken chain.
    Hierarchy(HierarchyArgs),
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => EnvFilter::new("warn"),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let result = match cli.command {
        Commands::Openapi(args) => run_openapi(&args),
        Commands::Account(args) => run_account(&args),
        Commands::Hierarchy(args) => run_hierarchy(&args),
    };

    match result {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            tracing::error!("{e:#}");
            eprintln!("error: {e:#}");
            ExitCode::from(1)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use netnode_cli::account::AccountCommand;

    #[test]
    fn cli_parse_openapi_with_output() {
        let cli = Cli::try_parse_from(["netnode", "openapi", "--output", "api.json"]).unwrap();
        if let Commands::Openapi(args) = cli.command {
            assert_eq!(args.output, Some("api.json".into()));
        } else {
            panic!("expected openapi command");
        }
    }

    #[test]
    fn cli_parse_account_create_inactive() {
        let cli = Cli::try_parse_from([
            "netnode", "account", "create", "--username", "alice", "--token", "t0k", "--inactive",
        ])
        .unwrap();
        match cli.command {
            Commands::Account(AccountArgs {
                command:
                    AccountCommand::Create {
                        username,
                        token,
                        inactive,
                    },
                ..
            }) => {
                assert_eq!(username, "alice");
                assert_eq!(token, "t0k");
                assert!(inactive);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn cli_parse_account_deactivate_requires_username() {
        assert!(Cli::try_parse_from(["netnode", "account", "deactivate"]).is_err());
        let cli = Cli::try_parse_from(["netnode", "account", "deactivate", "--username", "bob"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Account(AccountArgs {
                command: AccountCommand::Deactivate { .. },
                ..
            })
        ));
    }

    #[test]
    fn cli_parse_hierarchy_with_database_url_and_verbosity() {
        let cli = Cli::try_parse_from([
            "netnode",
            "-vv",
            "hierarchy",
            "--database-url",
            "postgres://localhost/netnode",
        ])
        .unwrap();
        assert_eq!(cli.verbose, 2);
        if let Commands::Hierarchy(args) = cli.command {
            assert_eq!(args.database_url.as_deref(), Some("postgres://localhost/netnode"));
        } else {
            panic!("expected hierarchy command");
        }
    }

    #[test]
    fn cli_verify_command() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
