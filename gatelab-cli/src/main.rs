//! GateLab CLI — run, search, and validate commands.
//!
//! Commands:
//! - `run` — execute the full pipeline (evaluation → gate → deploy check →
//!   challenger search → champion refresh) and print the run summary
//! - `search` — challenger search only; print the top of the leaderboard
//! - `validate` — check a symbol list against the deploy policy
//!
//! Bars come from the seeded synthetic source; real feeds live outside
//! this workspace and plug in through the same `BarSeriesSource` trait.

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use chrono::Utc;
use clap::{Parser, Subcommand};

use gatelab_core::{SeriesStore, SyntheticSource};
use gatelab_runner::{
    run_pipeline, run_search, validate_scope, DeployPolicy, RunConfig, TradableScope,
};

#[derive(Parser)]
#[command(name = "gatelab", about = "GateLab CLI — symbol gating and champion refresh pipeline")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Execute the full pipeline and print the run summary.
    Run {
        /// Path to a TOML run configuration.
        #[arg(long)]
        config: Option<PathBuf>,

        /// Candidate universe (ignored when --config is given).
        #[arg(long, value_delimiter = ',', default_value = "QQQ,SPY,AAPL,IWM")]
        symbols: Vec<String>,

        /// Mandated deploy symbol (ignored when --config is given).
        #[arg(long, default_value = "QQQ")]
        mandated: String,

        /// Bars per symbol for the synthetic source.
        #[arg(long, default_value_t = 800)]
        bars: usize,

        /// Master seed for the synthetic source.
        #[arg(long, default_value_t = 5)]
        seed: u64,
    },
    /// Challenger search only; print the top of the leaderboard.
    Search {
        /// Symbols to search over.
        #[arg(long, value_delimiter = ',', default_value = "QQQ")]
        symbols: Vec<String>,

        /// Bars per symbol for the synthetic source.
        #[arg(long, default_value_t = 800)]
        bars: usize,

        /// Master seed for the synthetic source.
        #[arg(long, default_value_t = 5)]
        seed: u64,

        /// Rows to print.
        #[arg(long, default_value_t = 10)]
        top: usize,
    },
    /// Validate a symbol list against the deploy policy.
    Validate {
        /// Scope symbols to check.
        #[arg(required = true, value_delimiter = ',')]
        symbols: Vec<String>,

        /// Mandated deploy symbol.
        #[arg(long, default_value = "QQQ")]
        mandated: String,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Run {
            config,
            symbols,
            mandated,
            bars,
            seed,
        } => cmd_run(config, symbols, mandated, bars, seed),
        Commands::Search {
            symbols,
            bars,
            seed,
            top,
        } => cmd_search(symbols, bars, seed, top),
        Commands::Validate { symbols, mandated } => cmd_validate(symbols, mandated),
    }
}

fn cmd_run(
    config_path: Option<PathBuf>,
    symbols: Vec<String>,
    mandated: String,
    bars: usize,
    seed: u64,
) -> Result<()> {
    let config = match config_path {
        Some(path) => RunConfig::load(&path)
            .with_context(|| format!("loading config from {}", path.display()))?,
        None => RunConfig::for_universe(symbols, mandated),
    };

    let source = SyntheticSource::new(config.universe.clone(), bars, seed);
    let mut store = SeriesStore::new();

    let summary = run_pipeline(&config, &source, &mut store, Utc::now())?;

    println!("Promotion matrix:");
    println!(
        "{:<6} {:>7} {:>9} {:>8} {:>11} {:>8}  {}",
        "symbol", "trades", "pf", "stab", "degradation", "passed", "reasons"
    );
    for row in &summary.matrix {
        println!(
            "{:<6} {:>7} {:>9.3} {:>8.2} {:>11.3} {:>8}  {}",
            row.symbol,
            row.trades,
            row.profit_factor,
            row.stability_score,
            row.degradation_ratio,
            row.passed,
            row.reasons
        );
    }

    println!(
        "\nTradable scope: {:?} (fallback: {})",
        summary.scope.symbols, summary.scope.is_fallback
    );
    println!("{}", summary.deploy_message);
    println!(
        "Refresh: {:?} -> champion {}",
        summary.refresh.decision,
        summary.refresh.champion.identity()
    );
    println!(
        "Artifacts: {} | {} | {}",
        config.artifacts.promotion_matrix.display(),
        config.artifacts.leaderboard.display(),
        config.artifacts.audit_log.display()
    );
    Ok(())
}

fn cmd_search(symbols: Vec<String>, bars: usize, seed: u64, top: usize) -> Result<()> {
    if symbols.is_empty() {
        bail!("at least one symbol is required");
    }
    let config = RunConfig::for_universe(symbols.clone(), symbols[0].clone());
    let source = SyntheticSource::new(symbols.clone(), bars, seed);
    let mut store = SeriesStore::new();
    store.refresh_all(&source, &symbols);

    let leaderboard = run_search(
        &store,
        &symbols,
        &config.strategy,
        &config.search.grid,
        &config.costs,
        &config.rolling,
        &config.stress,
        &config.search.weights,
    );

    if leaderboard.is_empty() {
        bail!("no candidates evaluated — no series available");
    }

    println!(
        "{:<5} {:<6} {:>6} {:>6} {:>8} {:>11} {:>9}",
        "rank", "symbol", "disp", "rr", "trades", "expectancy", "score"
    );
    for (rank, entry) in leaderboard.entries().iter().take(top).enumerate() {
        println!(
            "{:<5} {:<6} {:>6.2} {:>6.2} {:>8} {:>11.4} {:>9.4}",
            rank + 1,
            entry.symbol,
            entry.params.displacement_atr_mult,
            entry.params.rr_target,
            entry.metrics.trade_count,
            entry.metrics.expectancy,
            entry.score
        );
    }
    Ok(())
}

fn cmd_validate(symbols: Vec<String>, mandated: String) -> Result<()> {
    let scope = TradableScope {
        symbols,
        is_fallback: false,
    };
    let policy = DeployPolicy::single(mandated);
    match validate_scope(&scope, &policy) {
        Ok(message) => {
            println!("{message}");
            Ok(())
        }
        Err(violation) => bail!("{violation}"),
    }
}
