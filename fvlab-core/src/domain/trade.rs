//! Trade — a completed round-trip simulated against the active LevelSet.

use super::features::FeatureVector;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Side {
    Long,
    Short,
}

impl Side {
    /// Numeric encoding for the feature vector: long +1, short -1.
    pub fn as_feature(&self) -> f64 {
        match self {
            Side::Long => 1.0,
            Side::Short => -1.0,
        }
    }
}

/// Why a position was closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExitReason {
    TakeProfit,
    StopLoss,
    /// Forced flat at (or past) the NY close.
    SessionClose,
}

/// A complete round-trip trade: entry at a level boundary → exit.
///
/// Carries the date of the LevelSet that produced the entry and the full
/// feature snapshot taken at entry time, so downstream scoring never has to
/// re-derive state (and can never accidentally use post-entry data).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trade {
    pub symbol: String,
    pub side: Side,

    pub entry_ts: DateTime<Utc>,
    pub entry_price: f64,
    /// Date of the LevelSet whose boundary triggered the entry.
    pub level_date: NaiveDate,

    pub exit_ts: DateTime<Utc>,
    pub exit_price: f64,
    pub exit_reason: ExitReason,

    /// Realized P&L in price units (positive = profit).
    pub pnl: f64,
    /// Realized P&L in pips.
    pub pnl_pips: f64,

    /// Engineered features captured at entry time.
    pub features: FeatureVector,
}

impl Trade {
    pub fn is_winner(&self) -> bool {
        self.pnl > 0.0
    }

    pub fn bars_held_minutes(&self) -> i64 {
        (self.exit_ts - self.entry_ts).num_minutes()
    }
}

/// A trade after the probability gate. Wraps the trade — never mutates it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilteredTrade {
    pub trade: Trade,
    /// Model probability for this trade's feature vector.
    pub probability: f64,
    /// probability >= threshold.
    pub keep: bool,
}
