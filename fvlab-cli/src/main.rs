//! FVLab CLI — run level backtests and export the annotated feature dataset.
//!
//! Commands:
//! - `run` — execute a batch backtest from a TOML config and write artifacts
//! - `features` — export the annotated bar dataset and feature matrix

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use fvlab_runner::{
    build_filter, load_bars_csv, run_batch, run_symbol, write_dataset_csv, write_features_csv,
    write_filtered_csv, write_result_json, write_trades_csv, BacktestConfig,
};

#[derive(Parser)]
#[command(name = "fvlab", about = "FVLab CLI — FV/L1 zone backtesting engine")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Execute a batch backtest from a TOML config file.
    Run {
        /// Path to a TOML config file.
        #[arg(long)]
        config: PathBuf,

        /// Directory holding one <symbol>.csv per configured symbol.
        #[arg(long, default_value = "data")]
        data_dir: PathBuf,

        /// Output directory for artifacts.
        #[arg(long, default_value = "results")]
        output_dir: PathBuf,

        /// Override the configured probability threshold.
        #[arg(long)]
        threshold: Option<f64>,
    },
    /// Export the annotated dataset and feature matrix without filtering.
    Features {
        /// Path to a TOML config file.
        #[arg(long)]
        config: PathBuf,

        /// Directory holding one <symbol>.csv per configured symbol.
        #[arg(long, default_value = "data")]
        data_dir: PathBuf,

        /// Output directory for dataset CSVs.
        #[arg(long, default_value = "results")]
        output_dir: PathBuf,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    match Cli::parse().command {
        Commands::Run {
            config,
            data_dir,
            output_dir,
            threshold,
        } => cmd_run(&config, &data_dir, &output_dir, threshold),
        Commands::Features {
            config,
            data_dir,
            output_dir,
        } => cmd_features(&config, &data_dir, &output_dir),
    }
}

fn load_config(path: &PathBuf, threshold: Option<f64>) -> Result<BacktestConfig> {
    let mut config = BacktestConfig::load(path)
        .with_context(|| format!("loading config from {}", path.display()))?;
    if let Some(threshold) = threshold {
        if !(0.0..=1.0).contains(&threshold) {
            bail!("--threshold must be in [0,1], got {threshold}");
        }
        config.filter.threshold = threshold;
    }
    Ok(config)
}

fn cmd_run(
    config_path: &PathBuf,
    data_dir: &PathBuf,
    output_dir: &PathBuf,
    threshold: Option<f64>,
) -> Result<()> {
    let config = load_config(config_path, threshold)?;
    std::fs::create_dir_all(output_dir)
        .with_context(|| format!("creating {}", output_dir.display()))?;

    let batch = run_batch(&config, data_dir)?;

    for result in &batch.symbols {
        let prefix = output_dir.join(&result.symbol);
        write_trades_csv(&prefix.with_extension("trades.csv"), &result.trades)?;
        write_features_csv(&prefix.with_extension("features.csv"), &result.trades)?;
        if let Some(filtered) = &result.filtered {
            write_filtered_csv(&prefix.with_extension("filtered.csv"), filtered)?;
        }

        let m = &result.metrics;
        println!("── {} ──", result.symbol);
        println!("  trades:        {}", m.trade_count);
        println!("  win rate:      {:.1}%", m.win_rate * 100.0);
        println!("  profit factor: {:.2}", m.profit_factor);
        println!("  total pips:    {:.1}", m.total_pips);
        println!("  expectancy:    {:.2} pips/trade", m.expectancy_pips);
        println!(
            "  exits (tp/sl/close): {}/{}/{}",
            m.take_profit_exits, m.stop_loss_exits, m.session_close_exits
        );
        if let Some(filtered) = &result.filtered {
            let kept = filtered.iter().filter(|f| f.keep).count();
            println!("  kept by filter: {kept}/{}", filtered.len());
        }
    }
    for failure in &batch.failures {
        eprintln!("FAILED {}: {}", failure.symbol, failure.reason);
    }

    let result_path = output_dir.join("result.json");
    write_result_json(&result_path, &batch)?;
    println!("\nresults written to {}", result_path.display());

    if batch.symbols.is_empty() {
        bail!("no symbol completed successfully");
    }
    Ok(())
}

fn cmd_features(config_path: &PathBuf, data_dir: &PathBuf, output_dir: &PathBuf) -> Result<()> {
    let config = load_config(config_path, None)?;
    std::fs::create_dir_all(output_dir)
        .with_context(|| format!("creating {}", output_dir.display()))?;
    let filter = build_filter(&config)?;

    for symbol in &config.backtest.symbols {
        let csv_path = data_dir.join(format!("{symbol}.csv"));
        let bars = load_bars_csv(&csv_path, symbol)
            .with_context(|| format!("loading {}", csv_path.display()))?;
        let run = run_symbol(&config, symbol, &bars, filter.as_ref())?;

        let prefix = output_dir.join(symbol);
        write_dataset_csv(&prefix.with_extension("dataset.csv"), &run.annotated)?;
        write_features_csv(&prefix.with_extension("features.csv"), &run.result.trades)?;
        println!(
            "{symbol}: {} bars annotated, {} trade rows × {} feature columns",
            run.annotated.len(),
            run.result.trades.len(),
            fvlab_core::domain::FEATURE_SCHEMA.len()
        );
    }
    Ok(())
}
