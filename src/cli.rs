// src/cli.rs

//! CLI argument parsing using `clap`.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

use crate::types::GraphFormat;

/// Command-line arguments for `cfngin`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "cfngin",
    version,
    about = "Deploy and destroy infrastructure stacks in dependency order.",
    long_about = None
)]
pub struct CliArgs {
    /// Path to the config file (TOML).
    #[arg(long, value_name = "PATH", default_value = "cfngin.toml", global = true)]
    pub config: String,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `CFNGIN_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL", global = true)]
    pub log_level: Option<LogLevel>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Create or update stacks, dependencies first.
    Deploy(DeployArgs),
    /// Destroy stacks, dependents first.
    Destroy(DestroyArgs),
    /// Print the stack dependency graph.
    Graph(GraphArgs),
    /// Write rendered templates to a directory without deploying.
    Dump(DumpArgs),
}

/// Options shared by `deploy` and `destroy`.
#[derive(Debug, Clone, Args)]
pub struct RunArgs {
    /// Only act on these stacks (and what they depend on).
    #[arg(long = "stacks", value_name = "NAME", num_args = 1..)]
    pub stacks: Vec<String>,

    /// Override `[config].concurrency` (0 = unlimited, 1 = serial).
    #[arg(long, value_name = "N")]
    pub concurrency: Option<usize>,

    /// Stream stack command output while steps run.
    #[arg(long)]
    pub tail: bool,
}

#[derive(Debug, Clone, Args)]
pub struct DeployArgs {
    #[command(flatten)]
    pub run: RunArgs,

    /// Print the plan outline but don't execute it.
    #[arg(long)]
    pub dry_run: bool,
}

#[derive(Debug, Clone, Args)]
pub struct DestroyArgs {
    #[command(flatten)]
    pub run: RunArgs,

    /// Actually destroy; without this only the plan is printed.
    #[arg(long)]
    pub force: bool,
}

#[derive(Debug, Clone, Args)]
pub struct GraphArgs {
    #[arg(long, value_name = "FORMAT", default_value = "dot")]
    pub format: GraphFormat,

    /// Drop edges implied by longer paths.
    #[arg(long)]
    pub reduce: bool,
}

#[derive(Debug, Clone, Args)]
pub struct DumpArgs {
    #[arg(long, value_name = "DIR")]
    pub directory: PathBuf,

    #[arg(long = "stacks", value_name = "NAME", num_args = 1..)]
    pub stacks: Vec<String>,
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}
