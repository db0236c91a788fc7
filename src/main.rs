use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::Parser;

use candidate_collector::config::Config;
use candidate_collector::metrics::METRICS;
use candidate_collector::pipeline;

// ------------------------------------------------------------
// Command line
// ------------------------------------------------------------
#[derive(Parser, Debug)]
#[command(about = "Merge retrieval rule candidates into one candidate list per customer")]
struct Args {
    /// Path to the JSON configuration file
    #[arg(long, default_value = "config.json")]
    config: PathBuf,
}

// ------------------------------------------------------------
// Application entry point
// ------------------------------------------------------------
//
// Responsibilities:
// - Initialize logging
// - Load configuration
// - Run the collector pipeline
// - Report metrics
//
fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let config = load_config(&args.config)?;

    // --------------------------------------------------------
    // Logging
    //
    // RUST_LOG always wins; `debug.log` only raises the default.
    // --------------------------------------------------------
    let verbose = config
        .debug
        .as_ref()
        .is_some_and(|d| d.log.unwrap_or(false));
    let default_level = if verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .init();

    let (_, report) = pipeline::run(&config)?;

    log::info!(
        "done: {} rows for {} customers ({} empty) in {} ms",
        report.rows,
        report.customers,
        report.empty_customers,
        report.elapsed_ms
    );
    log::debug!("run report: {}", serde_json::to_string(&report)?);
    println!("{}", METRICS.summary());

    Ok(())
}

// ------------------------------------------------------------
// Configuration loader
// ------------------------------------------------------------
//
// Reads a JSON configuration file from disk and deserializes
// it into the strongly typed `Config` structure.
//
fn load_config(path: &Path) -> anyhow::Result<Config> {
    let data = fs::read_to_string(path)
        .with_context(|| format!("failed to read config {}", path.display()))?;
    let cfg = serde_json::from_str(&data)?;
    Ok(cfg)
}
