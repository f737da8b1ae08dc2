// src/lib.rs

pub mod cli;
pub mod config;
pub mod dag;
pub mod engine;
pub mod errors;
pub mod exec;
pub mod fs;
pub mod logging;
pub mod types;
pub mod watch;

use std::path::{Path, PathBuf};

use anyhow::Result;
use tracing::{debug, info};

pub use crate::config::{BistroOptions, TaskConfig, TaskSet};
pub use crate::engine::{Bistro, Invocation, ReactionContext};
pub use crate::errors::BistroError;
pub use crate::types::{FinishEvent, Method};

use crate::cli::CliArgs;
use crate::config::loader::load_and_validate;
use crate::config::model::ConfigFile;
use crate::dag::DependencyGraph;
use crate::watch::path_utils::absolutize;

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - config loading
/// - shell reactions
/// - the orchestrator
/// - Ctrl-C handling
pub async fn run(args: CliArgs) -> Result<()> {
    let cfg = load_and_validate(&args.config)?;

    if args.dry_run {
        print_dry_run(&cfg)?;
        return Ok(());
    }

    let config_dir = config_root_dir(&args.config);
    let base_dir = match (&args.base_dir, &cfg.config.base_dir) {
        (Some(dir), _) => dir.clone(),
        (None, Some(dir)) => absolutize(&config_dir, dir),
        (None, None) => config_dir.clone(),
    };

    let options = BistroOptions::new()
        .base_dir(base_dir)
        .verbose(args.verbose || cfg.config.verbose)
        .on_task_finish(|event| {
            if event.is_bulk() {
                info!(tasks = ?event.dependencies, "initial run finished");
            } else {
                debug!(
                    task = ?event.task_name,
                    file = ?event.file_name,
                    dependencies = ?event.dependencies,
                    "cascade finished"
                );
            }
        });

    let bistro = Bistro::new(cfg.task_set(&config_dir), options)?;
    bistro.start().await?;

    if args.once {
        bistro.stop();
        return Ok(());
    }

    info!(base_dir = ?bistro.base_dir(), "watching for changes (Ctrl-C to stop)");
    tokio::signal::ctrl_c().await?;
    info!("shutdown requested");
    bistro.stop();
    Ok(())
}

/// Figure out the directory the config file lives in.
///
/// - If the config path has a non-empty parent (e.g. "site/Bistro.toml"),
///   we use that directory.
/// - If it's just a bare filename like "Bistro.toml" (parent = ""),
///   we fall back to the current working directory.
fn config_root_dir(config_path: &Path) -> PathBuf {
    let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
    match config_path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => absolutize(&cwd, parent),
        _ => cwd,
    }
}

/// Simple dry-run output: print tasks in startup order with their settings.
fn print_dry_run(cfg: &ConfigFile) -> Result<()> {
    let graph = DependencyGraph::from_run_lists(
        cfg.tasks()
            .iter()
            .map(|(name, task)| (name.as_str(), task.run.as_slice())),
    )?;

    println!("bistro dry-run");
    if let Some(dir) = &cfg.config.base_dir {
        println!("  config.base_dir = {}", dir.display());
    }
    println!();

    println!("tasks ({}), in startup order:", graph.len());
    for name in graph.overall_order() {
        let Some((_, task)) = cfg.tasks().iter().find(|(n, _)| *n == name) else {
            continue;
        };
        println!("  - {name}");
        println!("      pattern: {}", task.pattern);
        if task.read {
            println!("      read: true");
        }
        if !task.run.is_empty() {
            println!("      run: {:?}", task.run);
        }
        if let Some(ref cmd) = task.update {
            println!("      update: {cmd}");
        }
        if let Some(ref cmd) = task.remove {
            println!("      remove: {cmd}");
        }
    }

    debug!("dry-run complete (no execution)");
    Ok(())
}
