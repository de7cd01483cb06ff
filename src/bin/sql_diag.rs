//! Demo CLI: reads a SQL statement and a plan-text file, runs the
//! diagnostic engine, and prints the resulting report as pretty JSON.

use anyhow::{Context, Result};
use clap::Parser;
use sql_diag_engine::config::{CommandLineArgs, Config};
use sql_diag_engine::environment::EnvironmentContext;
use sql_diag_engine::orchestrator::{analyze, AnalysisRequest};
use sql_diag_engine::regression::FileBaselineStore;
use std::path::Path;
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    tracing_subscriber::fmt().with_env_filter(EnvFilter::from_default_env()).init();

    let args = CommandLineArgs::parse();

    let config = match &args.config {
        Some(path) => Config::load(Path::new(path)).context("loading config file")?,
        None => Config::default(),
    };

    let sql = std::fs::read_to_string(&args.sql).with_context(|| format!("reading SQL file {}", args.sql))?;
    let plan_text = std::fs::read_to_string(&args.plan).with_context(|| format!("reading plan file {}", args.plan))?;

    let baseline_dir = args.baseline_dir.as_deref().unwrap_or(&config.baseline_store.directory);
    let store = FileBaselineStore::new(baseline_dir, config.baseline_store.max_snapshots_per_hash)
        .context("opening baseline store")?;
    tracing::info!(baseline_dir, "baseline store opened");

    let request = AnalysisRequest {
        sql,
        plan_text,
        driver_name: "mysql".to_string(),
        env: EnvironmentContext::default(),
        profile: None,
        is_intentional_scan: false,
        supports_analyze: true,
        table_size: None,
        existing_indexes: Vec::new(),
        sort_buffer_size: 262_144,
        config: &config,
        baseline_store: &store,
        cancellation: None,
        budget_ms: 2000,
    };

    let report = analyze(request).map_err(|e| anyhow::anyhow!(e.to_string()))?;
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}
