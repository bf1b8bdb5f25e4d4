//! VolatilityRecord — one day's pre-US volatility regime.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Volatility regime for one trading day, computed from bars strictly
/// before `ny_open` plus a rolling history of prior days' true ranges.
///
/// `vol_score` is the clipped ratio `pre_us_range / atr`; `is_volatile`
/// compares the *raw* ratio against a separate threshold, so the flag and
/// the clip ceiling are independent knobs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VolatilityRecord {
    pub date: NaiveDate,
    /// max(high) - min(low) over the pre-US window.
    pub pre_us_range: f64,
    /// Rolling average true range of prior days, None with insufficient history.
    pub atr: Option<f64>,
    /// Clipped pre-US range / ATR ratio; 1.0 when history is insufficient.
    pub vol_score: f64,
    /// Raw (pre-clip) ratio >= the configured threshold.
    pub is_volatile: bool,
    /// Fewer prior days than the ATR lookback; the day is flagged for
    /// downstream exclusion rather than aborting the stream.
    pub insufficient_history: bool,
}

impl VolatilityRecord {
    /// A neutral record for days where no score could be formed.
    pub fn neutral(date: NaiveDate, pre_us_range: f64) -> Self {
        Self {
            date,
            pre_us_range,
            atr: None,
            vol_score: 1.0,
            is_volatile: false,
            insufficient_history: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn neutral_record_defaults() {
        let rec = VolatilityRecord::neutral(NaiveDate::from_ymd_opt(2024, 1, 2).unwrap(), 0.0042);
        assert_eq!(rec.vol_score, 1.0);
        assert!(rec.insufficient_history);
        assert!(!rec.is_volatile);
        assert!(rec.atr.is_none());
    }

    #[test]
    fn record_serialization_roundtrip() {
        let rec = VolatilityRecord {
            date: NaiveDate::from_ymd_opt(2024, 1, 2).unwrap(),
            pre_us_range: 0.0130,
            atr: Some(0.0100),
            vol_score: 1.3,
            is_volatile: true,
            insufficient_history: false,
        };
        let json = serde_json::to_string(&rec).unwrap();
        let deser: VolatilityRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(rec, deser);
    }
}
