//! Trade simulation — walks bars in time order against the active LevelSet.
//!
//! Per bar: (1) resolve the active LevelSet, (2) entry check while flat,
//! (3) exit check while entered (the entry bar included), (4) emit the
//! annotated bar. Fills are pessimistic throughout: entries at the
//! triggering boundary price, stop-first tie-breaks, adverse gaps filled at
//! the open.

pub mod backtest;
pub mod config;

pub use backtest::{entry_features, AnnotatedBar, BacktestEngine, RunResult};
pub use config::{EngineConfig, TieBreak};
