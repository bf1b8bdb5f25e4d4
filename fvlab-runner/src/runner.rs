//! Backtest runner — wires sessionizer, scorer, level engine, simulation,
//! and the probability gate into one per-symbol pipeline.
//!
//! Symbol streams are mutually independent, so the batch fans out with
//! rayon — one worker per symbol, no shared mutable state. A fatal error
//! halts only its own symbol's stream; the batch records the failure and
//! continues.

use crate::config::{BacktestConfig, ConfigError};
use crate::data_loader::{dataset_hash, load_bars_csv, LoadError};
use crate::metrics::SummaryMetrics;
use fvlab_core::domain::{Bar, FilteredTrade, Trade};
use fvlab_core::engine::{AnnotatedBar, BacktestEngine};
use fvlab_core::filter::{LogisticModel, TradeFilter};
use fvlab_core::levels::build_level_map;
use fvlab_core::session::{SessionError, Sessionizer};
use fvlab_core::volatility::VolatilityScorer;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;
use tracing::{info, info_span, warn};

/// Current schema version for persisted artifacts.
pub const SCHEMA_VERSION: u32 = 1;

/// Errors from the runner.
#[derive(Debug, Error)]
pub enum RunError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
    #[error("data error: {0}")]
    Data(#[from] LoadError),
    #[error("session error: {0}")]
    Session(#[from] SessionError),
    #[error("model error at '{path}': {reason}")]
    Model { path: String, reason: String },
}

/// Result for one symbol's stream.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SymbolResult {
    pub symbol: String,
    pub metrics: SummaryMetrics,
    pub trades: Vec<Trade>,
    /// Present only when a probability model was configured.
    pub filtered: Option<Vec<FilteredTrade>>,
    pub bar_count: usize,
    pub days_processed: usize,
    pub dataset_hash: String,
}

/// A symbol result plus the annotated bar stream (not serialized with the
/// batch — exported separately on demand).
#[derive(Debug, Clone)]
pub struct SymbolRun {
    pub result: SymbolResult,
    pub annotated: Vec<AnnotatedBar>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SymbolFailure {
    pub symbol: String,
    pub reason: String,
}

/// Result of a whole batch run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchResult {
    /// Schema version for forward-compatible deserialization.
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,
    pub run_id: String,
    pub symbols: Vec<SymbolResult>,
    pub failures: Vec<SymbolFailure>,
}

fn default_schema_version() -> u32 {
    SCHEMA_VERSION
}

/// Build the probability gate from config, if one is configured.
pub fn build_filter(config: &BacktestConfig) -> Result<Option<TradeFilter>, RunError> {
    let path = match &config.filter.model_path {
        Some(path) => path,
        None => return Ok(None),
    };
    let display = path.display().to_string();
    let json = std::fs::read_to_string(path).map_err(|e| RunError::Model {
        path: display.clone(),
        reason: e.to_string(),
    })?;
    let model = LogisticModel::from_json(&json).map_err(|e| RunError::Model {
        path: display,
        reason: e.to_string(),
    })?;
    Ok(Some(TradeFilter::new(
        Box::new(model),
        config.filter.threshold,
    )))
}

/// Run the full pipeline for one symbol's pre-loaded bars.
pub fn run_symbol(
    config: &BacktestConfig,
    symbol: &str,
    bars: &[Bar],
    filter: Option<&TradeFilter>,
) -> Result<SymbolRun, RunError> {
    let sessionizer = Sessionizer::new(config.session_config()?);
    let sessionized = sessionizer.annotate(bars)?;

    let vol = VolatilityScorer::new(config.volatility_config()).score(&sessionized);
    let levels = build_level_map(&sessionized, &vol, config.level_config());
    let engine = BacktestEngine::new(config.engine_config()?);
    let run = engine.run(&sessionized, &vol, &levels);

    let filtered = filter.map(|f| {
        let mut scored = f.apply(&run.trades);
        f.rank(&mut scored, config.filter.seed);
        scored
    });

    let metrics = SummaryMetrics::compute(&run.trades);
    info!(
        symbol,
        trades = run.trades.len(),
        kept = filtered
            .as_ref()
            .map(|f| f.iter().filter(|t| t.keep).count()),
        days = run.days_processed,
        "symbol run complete"
    );

    Ok(SymbolRun {
        result: SymbolResult {
            symbol: symbol.to_string(),
            metrics,
            trades: run.trades,
            filtered,
            bar_count: run.bar_count,
            days_processed: run.days_processed,
            dataset_hash: dataset_hash(bars),
        },
        annotated: run.annotated,
    })
}

/// Run every configured symbol against `<data_dir>/<symbol>.csv`, in
/// parallel. Per-symbol failures are collected, not propagated.
pub fn run_batch(config: &BacktestConfig, data_dir: &Path) -> Result<BatchResult, RunError> {
    config.validate()?;
    let filter = build_filter(config)?;

    let outcomes: Vec<Result<SymbolResult, SymbolFailure>> = config
        .backtest
        .symbols
        .par_iter()
        .map(|symbol| {
            let _span = info_span!("symbol_run", %symbol).entered();
            let path = data_dir.join(format!("{symbol}.csv"));
            let outcome = load_bars_csv(&path, symbol)
                .map_err(RunError::from)
                .and_then(|bars| run_symbol(config, symbol, &bars, filter.as_ref()));
            match outcome {
                Ok(run) => Ok(run.result),
                Err(err) => {
                    warn!(%symbol, %err, "symbol stream failed");
                    Err(SymbolFailure {
                        symbol: symbol.clone(),
                        reason: err.to_string(),
                    })
                }
            }
        })
        .collect();

    let mut symbols = Vec::new();
    let mut failures = Vec::new();
    for outcome in outcomes {
        match outcome {
            Ok(result) => symbols.push(result),
            Err(failure) => failures.push(failure),
        }
    }

    Ok(BatchResult {
        schema_version: SCHEMA_VERSION,
        run_id: config.run_id(),
        symbols,
        failures,
    })
}
