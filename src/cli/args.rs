//! CLI argument definitions.
//!
//! This module defines all CLI arguments using clap's derive macros.
//! The main entry point is the [`Cli`] struct.

use clap::{Parser, Subcommand};
use clap_complete::Shell;
use std::path::PathBuf;

use crate::cache::CacheKey;
use crate::remediation::RemediationAction;

/// Devtopo - inventory and tidy your local development toolchain.
#[derive(Debug, Parser)]
#[command(name = "devtopo")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to settings file (overrides ~/.devtopo/config.yml)
    #[arg(short, long, global = true, env = "DEVTOPO_CONFIG")]
    pub config: Option<PathBuf>,

    /// Show entry details
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Show the tree only
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Enable debug logging
    #[arg(long, global = true)]
    pub debug: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Show the toolchain tree (default if no command specified)
    Show(ShowArgs),

    /// List registered sources and whether they are available
    Sources(SourcesArgs),

    /// Run a remediation action against a source
    Fix(FixArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

/// Arguments for the `show` command.
#[derive(Debug, Clone, Default, clap::Args)]
pub struct ShowArgs {
    /// Only show these sources (e.g. brew path)
    #[arg(value_name = "SOURCE")]
    pub sources: Vec<String>,

    /// Output a snapshot as JSON
    #[arg(long)]
    pub json: bool,

    /// Do not wait for slow sources; show them as loading
    #[arg(long)]
    pub no_wait: bool,
}

/// Arguments for the `sources` command.
#[derive(Debug, Clone, Default, clap::Args)]
pub struct SourcesArgs {
    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the `fix` command.
#[derive(Debug, Clone, clap::Args)]
pub struct FixArgs {
    /// Action: uninstall, upgrade, update, remove, remove-line
    pub action: RemediationAction,

    /// Source, optionally scoped (e.g. brew, npm:global)
    #[arg(value_name = "SOURCE[:SCOPE]")]
    pub key: CacheKey,

    /// What to act on: a package, a path, or FILE:LINE
    pub target: String,

    /// Skip the confirmation prompt
    #[arg(short, long)]
    pub yes: bool,

    /// Show what would run without changing anything
    #[arg(long)]
    pub dry_run: bool,
}

/// Arguments for the `completions` command.
#[derive(Debug, Clone, clap::Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    #[arg(value_enum)]
    pub shell: Shell,
}
