//! Check command - reports whether a session is still live.

use anyhow::{Result, bail};
use clap::Args;
use console::Style;
use hutch_session::{SessionContainer, validate_id};
use serde::Serialize;

use super::Context;

/// Arguments for the check command.
#[derive(Args, Debug)]
pub struct CheckArgs {
    /// Session identifier
    pub id: String,
}

#[derive(Debug, Serialize)]
struct CheckOutput {
    id: String,
    live: bool,
    max_age_secs: u64,
}

/// Run the check command.
pub fn run(args: CheckArgs, ctx: &Context) -> Result<()> {
    if !validate_id(&args.id) {
        bail!("Invalid session ID: '{}'", args.id);
    }
    let container = ctx.existing_container()?;
    let max_age = ctx.max_age();
    let live = container.contains(&args.id, max_age);

    if ctx.json_output {
        let output = CheckOutput {
            id: args.id,
            live,
            max_age_secs: max_age.as_secs(),
        };
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    if live {
        println!("{} {}", Style::new().green().apply_to("● live"), args.id);
    } else {
        println!(
            "{} {}",
            Style::new().red().apply_to("● expired or missing"),
            args.id
        );
    }
    Ok(())
}
