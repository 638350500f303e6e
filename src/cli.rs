//! CLI argument parsing module for enginefit

use crate::domain::Engine;
use crate::graph::TreeMode;
use clap::{ArgAction, Parser};
use std::path::PathBuf;

/// Resolves a `--flag` / `--no-flag` pair; `None` when neither was given
fn toggle(yes: bool, no: bool) -> Option<bool> {
    match (yes, no) {
        (true, _) => Some(true),
        (_, true) => Some(false),
        _ => None,
    }
}

/// Checks that a package's `engines` field matches its dependency graph
#[derive(Parser, Debug, Clone)]
#[command(
    name = "enginefit",
    version,
    about = "Check a package's engines field against its dependency graph"
)]
pub struct CliArgs {
    /// Project directory (default: current directory)
    #[arg(default_value = ".")]
    pub path: PathBuf,

    // Tree options
    /// "actual" reads node_modules; "virtual" reads a lockfile; "ideal" reads package.json
    #[arg(long, value_enum)]
    pub mode: Option<TreeMode>,

    /// Include production dependencies (default)
    #[arg(long, overrides_with = "no_production")]
    pub production: bool,

    /// Exclude production dependencies
    #[arg(long, overrides_with = "production")]
    pub no_production: bool,

    /// Include dev dependencies
    #[arg(long, overrides_with = "no_dev")]
    pub dev: bool,

    /// Exclude dev dependencies (default)
    #[arg(long, overrides_with = "dev")]
    pub no_dev: bool,

    /// Include peer dependencies (default)
    #[arg(long, overrides_with = "no_peer")]
    pub peer: bool,

    /// Exclude peer dependencies
    #[arg(long, overrides_with = "peer")]
    pub no_peer: bool,

    /// Only check these engines (can be specified multiple times)
    #[arg(long = "engine", value_name = "ENGINE", action = ArgAction::Append)]
    pub engines: Vec<Engine>,

    // Checks
    /// Update package.json's engines field to match the dependency graph
    #[arg(long)]
    pub save: bool,

    /// Check that the installed engine versions satisfy the graph (default)
    #[arg(long, overrides_with = "no_current")]
    pub current: bool,

    /// Skip the installed engine version check
    #[arg(long, overrides_with = "current")]
    pub no_current: bool,

    // Sources
    /// Read engine releases from a JSON file instead of the network
    #[arg(long, value_name = "FILE")]
    pub catalog: Option<PathBuf>,

    /// npm registry URL used to resolve the ideal tree
    #[arg(long, value_name = "URL")]
    pub registry: Option<String>,

    /// Maximum concurrent registry requests
    #[arg(long, value_name = "N")]
    pub concurrency: Option<usize>,

    // Output options
    /// Output results in JSON format
    #[arg(long)]
    pub json: bool,

    /// Enable verbose output
    #[arg(long)]
    pub verbose: bool,

    /// Enable quiet mode - minimal output
    #[arg(short, long)]
    pub quiet: bool,
}

impl CliArgs {
    /// Explicit `--production` / `--no-production`
    pub fn production_flag(&self) -> Option<bool> {
        toggle(self.production, self.no_production)
    }

    /// Explicit `--dev` / `--no-dev`
    pub fn dev_flag(&self) -> Option<bool> {
        toggle(self.dev, self.no_dev)
    }

    /// Explicit `--peer` / `--no-peer`
    pub fn peer_flag(&self) -> Option<bool> {
        toggle(self.peer, self.no_peer)
    }

    /// Explicit `--current` / `--no-current`
    pub fn current_flag(&self) -> Option<bool> {
        toggle(self.current, self.no_current)
    }

    /// Check if progress output should be shown
    pub fn show_progress(&self) -> bool {
        !self.quiet && !self.json
    }
}
