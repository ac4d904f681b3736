//! # OpenAPI Subcommand
//!
//! Exports the API's OpenAPI document without starting the server.
//!
//! - `netnode openapi` — print to stdout.
//! - `netnode openapi --output api.json` — write to a file.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use utoipa::OpenApi;

use netnode_api::openapi::ApiDoc;

/// Arguments for the `netnode openapi` subcommand.
#[derive(Args, Debug)]
pub struct OpenapiArgs {
    /// Write the document to this file instead of stdout.
    #[arg(long, short)]
    pub output: Option<PathBuf>,
}

/// Pretty-printed OpenAPI JSON.
pub fn render_document() -> Result<String> {
    ApiDoc::openapi()
        .to_pretty_json()
        .context("failed to serialize OpenAPI document")
}

/// Execute the openapi subcommand.
pub fn run_openapi(args: &OpenapiArgs) -> Result<u8> {
    let document = render_document()?;
    match &args.output {
        Some(path) => {
            std::fs::write(path, document.as_bytes())
                .with_context(|| format!("failed to write {}", path.display()))?;
            tracing::info!(path = %path.display(), "wrote OpenAPI document");
        }
        None => println!("{document}"),
    }
    Ok(0)
}
