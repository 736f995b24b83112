//! storecall replay tool
//!
//! Runs a JSON script of actions through the store-call middleware against an
//! in-memory document store and prints every emitted action as one JSON line.
//!
//! Usage:
//!   storecall-replay script.json --marker CALL_STORE

use anyhow::{Context, Result};
use clap::Parser;
use std::{fs, path::PathBuf};
use storecall_middleware::{MiddlewareConfig, DEFAULT_MARKER};
use storecall_replay::{run, Script};
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser, Debug)]
#[command(name = "storecall-replay")]
#[command(about = "Replay store-call actions against an in-memory document store")]
struct Args {
    /// Path to the replay script
    script: PathBuf,

    /// Action property carrying store-call descriptors
    #[arg(short, long, default_value = DEFAULT_MARKER)]
    marker: String,

    /// Enable verbose debug logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let log_level = if args.verbose { Level::DEBUG } else { Level::INFO };
    FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .compact()
        .init();

    let text = fs::read_to_string(&args.script)
        .with_context(|| format!("Failed to read script {}", args.script.display()))?;
    let script = Script::from_json(&text).context("Failed to parse script")?;
    info!(
        documents = script.documents.len(),
        actions = script.actions.len(),
        "replaying script"
    );

    let replay = run(&script, MiddlewareConfig { marker: args.marker }).await;

    for action in &replay.emitted {
        println!("{}", serde_json::to_string(action).context("Failed to encode action")?);
    }
    info!(
        emitted = replay.emitted.len(),
        rejected = replay.rejected.len(),
        "replay finished"
    );
    Ok(())
}
