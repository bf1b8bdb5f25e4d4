//! Bar — the fundamental market data unit.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// OHLCV bar for a single symbol at 1-minute resolution.
///
/// Ingestion (an external collaborator) guarantees deduplicated rows,
/// strictly increasing timestamps, and volume > 0. `is_sane` re-checks the
/// OHLC geometry cheaply where bars enter the pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Bar {
    pub symbol: String,
    pub ts: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

impl Bar {
    /// Basic OHLCV sanity check: high >= low, high bounds open/close, positive prices.
    pub fn is_sane(&self) -> bool {
        self.high >= self.low
            && self.high >= self.open
            && self.high >= self.close
            && self.low <= self.open
            && self.low <= self.close
            && self.open > 0.0
            && self.close > 0.0
            && self.volume > 0.0
    }

    /// Typical price (H+L+C)/3, used for VWAP accumulation.
    pub fn typical_price(&self) -> f64 {
        (self.high + self.low + self.close) / 3.0
    }
}
