//! Hutch - session store maintenance
//!
//! Main entry point for the Hutch CLI.

use std::path::{Path, PathBuf};

use anyhow::{Context as _, Result};
use clap::{Parser, Subcommand};
use tracing::warn;
use tracing_appender::non_blocking::WorkerGuard;

mod commands;

use commands::{check, gc, show};

// ─────────────────────────────────────────────────────────────────────────────
// CLI Structure
// ─────────────────────────────────────────────────────────────────────────────

/// Hutch - inspect and maintain a file-backed session store
#[derive(Parser)]
#[command(name = "hutch")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Output as JSON (for scripting)
    #[arg(long, global = true)]
    pub json: bool,

    /// Config file applied on top of the discovered layers
    #[arg(long, global = true, env = "HUTCH_CONFIG", value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Data directory (overrides [paths].data_dir and HUTCH_DATA_DIR)
    #[arg(long, global = true, value_name = "PATH")]
    pub data_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Remove expired session records
    Gc(gc::GcArgs),

    /// Print the decoded payload of a session record
    Show(show::ShowArgs),

    /// Report whether a session record is still live
    Check(check::CheckArgs),
}

// ─────────────────────────────────────────────────────────────────────────────
// Main
// ─────────────────────────────────────────────────────────────────────────────

fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut loaded = hutch_config::load_config(None)?;
    if let Some(path) = &cli.config {
        let layer = hutch_config::load_config_file(path)
            .with_context(|| format!("Failed to load config file {}", path.display()))?;
        loaded.config.merge(layer);
    }

    let _guard = init_tracing(cli.verbose, loaded.config.log_dir());
    for warning in &loaded.warnings {
        warn!("{warning}");
    }

    let data_dir = cli
        .data_dir
        .unwrap_or_else(|| loaded.config.data_dir());

    let ctx = commands::Context {
        config: loaded.config,
        data_dir,
        json_output: cli.json,
        verbose: cli.verbose,
    };

    match cli.command {
        Commands::Gc(args) => gc::run(args, &ctx),
        Commands::Show(args) => show::run(args, &ctx),
        Commands::Check(args) => check::run(args, &ctx),
    }
}

/// Console (human-readable, stderr) plus an optional daily-rolling JSON file.
///
/// The returned guard flushes the file writer on drop.
fn init_tracing(verbose: bool, log_dir: Option<&Path>) -> Option<WorkerGuard> {
    use tracing_subscriber::EnvFilter;
    use tracing_subscriber::prelude::*;

    let filter = if verbose {
        "hutch=debug,hutch_session=debug,hutch_config=debug,info"
    } else {
        "hutch=info,hutch_session=info,hutch_config=info,warn"
    };

    let (file_layer, guard) = match log_dir {
        Some(dir) => {
            let file_appender = tracing_appender::rolling::daily(dir, "hutch.log");
            let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
            let layer = tracing_subscriber::fmt::layer()
                .json()
                .with_writer(non_blocking)
                .with_filter(EnvFilter::new(
                    "hutch=trace,hutch_session=trace,hutch_config=trace,info",
                ));
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(true)
                .with_writer(std::io::stderr)
                .with_filter(EnvFilter::new(filter)),
        )
        .with(file_layer)
        .init();

    guard
}
