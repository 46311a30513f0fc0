//! trace-rules: inspect and watch trace rule files.
//!
//! - `check <path>`: parse a CSV rule file and report every rule or error
//! - `watch [path]`: run the configured loader until Ctrl-C, logging reloads
//! - `match <path> <Owner.method>`: show which rule a call-site resolves to

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use tracing::info;

use traceable_core::config::load_dotenv;
use traceable_core::{CallSite, TraceConfig};
use traceable_rules::loader::reload_cycle;
use traceable_rules::{CsvRulesStorage, RuleStore, StrategyRegistry};

// ── CLI ─────────────────────────────────────────────────────────────

/// Inspect and watch trace rule files.
#[derive(Parser, Debug)]
#[command(name = "trace-rules", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Parse a rule file and report malformed records.
    Check {
        /// Path to the CSV rule file.
        path: PathBuf,
    },
    /// Run the configured loader and log every reload until Ctrl-C.
    Watch {
        /// Rule file (overrides TRACE_RULES_PATH).
        path: Option<PathBuf>,
    },
    /// Show the first rule matching a call-site.
    Match {
        /// Path to the CSV rule file.
        path: PathBuf,
        /// Call-site as `Owner.method`.
        call: String,
        /// Parameter types of the call, in order.
        #[arg(long = "param", value_name = "TYPE")]
        params: Vec<String>,
    },
}

// ── main ────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    load_dotenv();
    let cli = Cli::parse();

    match cli.command {
        Command::Check { path } => check(path),
        Command::Watch { path } => watch(path).await,
        Command::Match { path, call, params } => match_call(path, &call, params),
    }
}

fn check(path: PathBuf) -> anyhow::Result<()> {
    let storage = CsvRulesStorage::new(&path);
    let store = RuleStore::new();
    let report = reload_cycle(&storage, &store)
        .with_context(|| format!("failed to read {}", path.display()))?;

    for (position, rule) in store.current().rules().iter().enumerate() {
        let formatter = rule.formatter.as_deref().unwrap_or("(default)");
        let persister = rule.persister.as_deref().unwrap_or("(default)");
        println!(
            "{:>3}  {:<40} {:<15} formatter={} persister={}",
            position,
            rule.pattern.as_str(),
            rule.entry.to_string(),
            formatter,
            persister
        );
    }
    for skipped in &report.skipped {
        println!("  !  record {} '{}': {}", skipped.index, skipped.pattern, skipped.error);
    }

    if !report.is_clean() {
        bail!("{} malformed record(s) in {}", report.skipped.len(), path.display());
    }
    println!("{} rule(s) OK", report.installed);
    Ok(())
}

async fn watch(path: Option<PathBuf>) -> anyhow::Result<()> {
    let mut config = TraceConfig::from_env();
    if let Some(path) = path {
        config.rules_path = path;
    }
    config.log_summary();

    let store = Arc::new(RuleStore::new());
    let loader = StrategyRegistry::builtin().build(&config, Arc::clone(&store));
    let handle = loader.spawn().context("failed to start rules loader")?;

    tokio::signal::ctrl_c().await?;
    info!("shutdown requested");
    handle.stop().await;

    info!(rules = store.len(), generation = store.current().generation(), "trace-rules exited cleanly");
    Ok(())
}

fn match_call(path: PathBuf, call: &str, params: Vec<String>) -> anyhow::Result<()> {
    let (owner, method) = call
        .rsplit_once('.')
        .with_context(|| format!("call-site '{}' is not Owner.method", call))?;

    let storage = CsvRulesStorage::new(&path);
    let store = RuleStore::new();
    reload_cycle(&storage, &store)
        .with_context(|| format!("failed to read {}", path.display()))?;

    let mut site = CallSite::new(owner, method);
    site.parameter_types = params;

    match store.match_first(&site) {
        Some(rule) => println!("{} -> {} ({})", site.signature(), rule.pattern, rule.entry),
        None => println!("{} -> no rule ({} rule(s) checked)", site.signature(), store.len()),
    }
    Ok(())
}
