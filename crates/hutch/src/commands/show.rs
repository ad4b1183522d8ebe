//! Show command - prints a stored session payload.

use anyhow::{Result, bail};
use clap::Args;
use console::{Style, style};
use hutch_session::{Value, validate_id};

use super::Context;

/// Arguments for the show command.
#[derive(Args, Debug)]
pub struct ShowArgs {
    /// Session identifier
    pub id: String,
}

/// Run the show command.
///
/// Reads the record without refreshing its mtime, so inspecting a session
/// does not extend its life.
pub fn run(args: ShowArgs, ctx: &Context) -> Result<()> {
    if !validate_id(&args.id) {
        bail!("Invalid session ID: '{}'", args.id);
    }
    let container = ctx.existing_container()?;
    let Some(payload) = container.peek(&args.id)? else {
        bail!("No session record for '{}'", args.id);
    };

    if ctx.json_output {
        let object: serde_json::Map<String, serde_json::Value> = payload
            .iter()
            .map(|(key, value)| (key.to_string(), to_json(value)))
            .collect();
        println!("{}", serde_json::to_string_pretty(&object)?);
        return Ok(());
    }

    let dim = Style::new().dim();
    println!("{} {}", style("Session").bold(), args.id);
    if payload.is_empty() {
        println!("  {}", dim.apply_to("(empty)"));
    }
    let mut lines = Vec::new();
    for (key, value) in payload.iter() {
        render(key, value, 1, &mut lines);
    }
    for line in lines {
        println!("{line}");
    }
    Ok(())
}

fn to_json(value: &Value) -> serde_json::Value {
    match value {
        Value::Null => serde_json::Value::Null,
        Value::Bool(b) => (*b).into(),
        Value::Int(n) => (*n).into(),
        // NaN and infinities have no JSON form.
        Value::Float(f) => serde_json::Number::from_f64(*f)
            .map_or(serde_json::Value::Null, serde_json::Value::Number),
        Value::String(bytes) => String::from_utf8_lossy(bytes).into_owned().into(),
        Value::Map(entries) => serde_json::Value::Object(
            entries
                .iter()
                .map(|(k, v)| (key_label(k), to_json(v)))
                .collect(),
        ),
    }
}

fn key_label(key: &Value) -> String {
    match key {
        Value::String(bytes) => String::from_utf8_lossy(bytes).into_owned(),
        other => scalar(other),
    }
}

fn scalar(value: &Value) -> String {
    match value {
        Value::Null => "null".to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Int(n) => n.to_string(),
        Value::Float(f) => f.to_string(),
        Value::String(bytes) => format!("{:?}", String::from_utf8_lossy(bytes)),
        Value::Map(entries) => format!("{{{} entries}}", entries.len()),
    }
}

fn render(label: &str, value: &Value, depth: usize, lines: &mut Vec<String>) {
    let indent = "  ".repeat(depth);
    match value {
        Value::Map(entries) if !entries.is_empty() => {
            lines.push(format!("{indent}{label}:"));
            for (k, v) in entries {
                render(&key_label(k), v, depth + 1, lines);
            }
        }
        Value::Map(_) => lines.push(format!("{indent}{label}: {{}}")),
        other => lines.push(format!("{indent}{label}: {}", scalar(other))),
    }
}
