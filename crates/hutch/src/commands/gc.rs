//! Gc command - sweeps expired session records.

use std::time::Duration;

use anyhow::{Result, bail};
use clap::Args;
use console::{Style, style};
use hutch_session::SessionContainer;
use serde::Serialize;
use tracing::info;

use super::Context;

/// Arguments for the gc command.
#[derive(Args, Debug)]
pub struct GcArgs {
    /// Max-age in seconds (defaults to the configured value)
    #[arg(long, value_name = "SECONDS")]
    pub max_age: Option<u64>,
}

#[derive(Debug, Serialize)]
struct GcOutput {
    dir: String,
    max_age_secs: u64,
    removed: usize,
}

/// Run the gc command.
pub fn run(args: GcArgs, ctx: &Context) -> Result<()> {
    let storage = ctx.storage()?;
    let max_age = match args.max_age {
        Some(0) => bail!("--max-age must be positive"),
        Some(secs) => Duration::from_secs(secs),
        None => storage.max_age(),
    };

    let container = storage.container();
    let removed = container.clean_expired_sessions(max_age);
    info!(removed, max_age_secs = max_age.as_secs(), "Session sweep finished");

    if ctx.json_output {
        let output = GcOutput {
            dir: container.dir().display().to_string(),
            max_age_secs: max_age.as_secs(),
            removed,
        };
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    let dim = Style::new().dim();
    println!(
        "{} {} expired session(s) from {}",
        style("Removed").green(),
        removed,
        container.dir().display()
    );
    if ctx.verbose {
        println!("  {} {}s", dim.apply_to("Max-age:"), max_age.as_secs());
    }
    Ok(())
}
