//! Engine configuration.

use chrono::NaiveTime;
use serde::{Deserialize, Serialize};

/// Resolution order when one bar's range covers both the stop and the target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TieBreak {
    /// The stop is assumed to have triggered first. Conservative default —
    /// the favorable order is never assumed.
    StopFirst,
    /// The level nearer the bar's open is assumed to be reached first;
    /// equidistant still resolves to the stop.
    OpenDistance,
}

/// Configuration for a single simulation run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// NY time-of-day from which today's LevelSet becomes usable.
    pub cutover: NaiveTime,
    /// Take-profit distance from entry, in pips.
    pub tp_pips: f64,
    /// Stop-loss distance from entry, in pips.
    pub sl_pips: f64,
    /// Pip size in price units (0.0001 for EUR/USD).
    pub pip_size: f64,
    pub tie_break: TieBreak,
    /// Arm entries on L1 band touches (fade back toward FV).
    pub enter_on_l1: bool,
    /// Arm entries on FV boundary touches as well.
    pub enter_on_fv: bool,
    /// Permit entries on days flagged insufficient_history.
    pub allow_insufficient_history: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            cutover: NaiveTime::from_hms_opt(10, 0, 0).unwrap(),
            tp_pips: 20.0,
            sl_pips: 10.0,
            pip_size: 0.0001,
            tie_break: TieBreak::StopFirst,
            enter_on_l1: true,
            enter_on_fv: false,
            allow_insufficient_history: false,
        }
    }
}
