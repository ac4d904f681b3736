//! # Hierarchy Subcommand
//!
//! Loads every stored node and reports its hierarchy level. Exits with 1 if
//! any supplier chain is broken, so the command can run as a database
//! consistency check.

use anyhow::{Context, Result};
use clap::Args;

use netnode_core::{NetworkNode, NodeId, SupplierIndex};

/// Arguments for the `netnode hierarchy` subcommand.
#[derive(Args, Debug)]
pub struct HierarchyArgs {
    /// Postgres connection string. Defaults to `DATABASE_URL`.
    #[arg(long)]
    pub database_url: Option<String>,
}

/// Result of auditing a set of nodes.
#[derive(Debug)]
pub struct HierarchyReport {
    /// `(level, name, id)`, ordered by level then name.
    pub levels: Vec<(u32, String, NodeId)>,
    /// Human-readable description of each broken chain.
    pub problems: Vec<String>,
}

impl HierarchyReport {
    pub fn is_consistent(&self) -> bool {
        self.problems.is_empty()
    }

    pub fn render(&self) -> String {
        let mut out: Vec<String> = self
            .levels
            .iter()
            .map(|(level, name, id)| format!("{level:>3}  {name}  ({id})"))
            .collect();
        for problem in &self.problems {
            out.push(format!("ERROR  {problem}"));
        }
        out.join("\n")
    }
}

/// Compute every node's level.
pub fn audit(nodes: &[NetworkNode]) -> HierarchyReport {
    let index = SupplierIndex::from_nodes(nodes);
    let (levels, errors) = index.levels();

    let name_of = |id: NodeId| {
        nodes
            .iter()
            .find(|n| n.id == id)
            .map(|n| n.name.clone())
            .unwrap_or_default()
    };
    let mut levels: Vec<(u32, String, NodeId)> = levels
        .into_iter()
        .map(|(id, level)| (level, name_of(id), id))
        .collect();
    levels.sort();

    HierarchyReport {
        levels,
        problems: errors.iter().map(ToString::to_string).collect(),
    }
}

/// Execute the hierarchy subcommand.
pub fn run_hierarchy(args: &HierarchyArgs) -> Result<u8> {
    let url = crate::database_url(args.database_url.as_deref())?;
    let runtime = crate::runtime()?;

    let nodes = runtime.block_on(async {
        let pool = crate::connect(&url).await?;
        netnode_api::db::nodes::load_all(&pool)
            .await
            .context("failed to load network nodes")
    })?;

    let report = audit(&nodes);
    if report.levels.is_empty() && report.is_consistent() {
        println!("no network nodes");
    } else {
        println!("{}", report.render());
    }

    if report.is_consistent() {
        tracing::info!(nodes = nodes.len(), "supplier hierarchy is consistent");
        Ok(0)
    } else {
        tracing::error!(problems = report.problems.len(), "supplier hierarchy is inconsistent");
        Ok(1)
    }
}
