use anyhow::Context;
use chrono::{DateTime, Utc};
use clap::Parser;
use when_engine::resolve;

/// Resolve a scheduling-time expression to a canonical UTC timestamp.
#[derive(Parser)]
#[command(name = "when", version, about)]
struct Cli {
    /// Time expression: "in 5 minutes", "tomorrow at 9am",
    /// "next monday at 3pm", "now", or an RFC 3339 timestamp.
    /// Omitted means "now" (immediate delivery).
    #[arg(default_value = "now")]
    expression: String,

    /// Reference clock override as an RFC 3339 timestamp.
    /// Defaults to the current time.
    #[arg(long, value_name = "TIMESTAMP")]
    now: Option<String>,

    /// Emit the full resolution result as JSON instead of the bare timestamp.
    #[arg(long)]
    json: bool,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let clock = match &cli.now {
        Some(s) => DateTime::parse_from_rfc3339(s)
            .map(|dt| dt.with_timezone(&Utc))
            .with_context(|| format!("invalid --now timestamp '{s}'"))?,
        None => Utc::now(),
    };

    let resolved = resolve(&cli.expression, clock)?;
    if cli.json {
        println!("{}", serde_json::to_string_pretty(&resolved)?);
    } else {
        println!("{}", resolved.canonical);
    }
    Ok(())
}
