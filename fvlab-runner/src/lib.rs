//! FVLab Runner — backtest orchestration on top of `fvlab-core`.
//!
//! This crate provides:
//! - TOML configuration with content-hash run ids
//! - Minute-bar CSV loading (RFC 3339 and Dukascopy timestamp shapes)
//! - The per-symbol pipeline runner with parallel batch execution
//! - Trade-list performance metrics
//! - Artifact export (trades, filtered trades, annotated dataset, feature
//!   matrix, result JSON)

pub mod config;
pub mod data_loader;
pub mod export;
pub mod metrics;
pub mod runner;

pub use config::{BacktestConfig, ConfigError, RunId};
pub use data_loader::{dataset_hash, load_bars_csv, LoadError};
pub use export::{
    write_dataset_csv, write_features_csv, write_filtered_csv, write_result_json,
    write_trades_csv, ExportError,
};
pub use metrics::SummaryMetrics;
pub use runner::{
    build_filter, run_batch, run_symbol, BatchResult, RunError, SymbolFailure, SymbolResult,
    SymbolRun, SCHEMA_VERSION,
};
