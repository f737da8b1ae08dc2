// src/cli.rs

//! CLI argument parsing using `clap`.

use std::path::PathBuf;

use clap::{Parser, ValueEnum};

/// Command-line arguments for `bistro`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "bistro",
    version,
    about = "Run tasks on changed files and re-run everything that depends on them.",
    long_about = None
)]
pub struct CliArgs {
    /// Path to the config file (TOML).
    #[arg(long, value_name = "PATH", default_value = "Bistro.toml")]
    pub config: PathBuf,

    /// Directory task patterns are relative to.
    ///
    /// Overrides `[config].base_dir`. Defaults to the config file's directory.
    #[arg(long, value_name = "PATH")]
    pub base_dir: Option<PathBuf>,

    /// Run every task once over its current files and exit, no watching.
    #[arg(long)]
    pub once: bool,

    /// Print a progress trace of task runs.
    #[arg(long)]
    pub verbose: bool,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `BISTRO_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    /// Parse + validate, print the task order, but don't run anything.
    #[arg(long)]
    pub dry_run: bool,
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
