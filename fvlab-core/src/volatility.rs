//! VolatilityScorer — per-day volatility regime from the pre-US range.
//!
//! For each trading day: the pre-US range (bars strictly before `ny_open`)
//! is compared against a rolling ATR of *prior* days' full-session true
//! ranges. The current day never contributes to its own ATR — that is the
//! history boundary the rest of the pipeline relies on.
//!
//! `vol_score` is the ratio clipped into [cap_lo, cap_hi]; `is_volatile`
//! compares the raw ratio against an independent threshold `k_atr`, so the
//! flag is not welded to the clip ceiling.

use crate::domain::VolatilityRecord;
use crate::session::Sessionized;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

const ATR_EPS: f64 = 1e-12;

/// Rolling-average flavor for the ATR.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AtrMethod {
    Sma,
    Ema,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VolatilityConfig {
    /// ATR lookback in trading days.
    pub lookback: usize,
    pub method: AtrMethod,
    /// Lower clip for vol_score.
    pub cap_lo: f64,
    /// Upper clip for vol_score.
    pub cap_hi: f64,
    /// Raw-ratio threshold for the is_volatile flag.
    pub k_atr: f64,
}

impl Default for VolatilityConfig {
    fn default() -> Self {
        Self {
            lookback: 14,
            method: AtrMethod::Sma,
            cap_lo: 0.7,
            cap_hi: 1.3,
            k_atr: 1.2,
        }
    }
}

/// Per-day OHLC aggregates accumulated in one pass over the bar stream.
#[derive(Debug, Clone)]
struct DayAggregate {
    date: NaiveDate,
    pre_high: Option<f64>,
    pre_low: Option<f64>,
    day_high: f64,
    day_low: f64,
    day_close: f64,
}

impl DayAggregate {
    fn pre_us_range(&self) -> Option<f64> {
        match (self.pre_high, self.pre_low) {
            (Some(h), Some(l)) => Some(h - l),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct VolatilityScorer {
    config: VolatilityConfig,
}

impl VolatilityScorer {
    pub fn new(config: VolatilityConfig) -> Self {
        Self { config }
    }

    /// Score every trading day in the stream. Days whose pre-US window is
    /// empty get a neutral record (score 1.0, flagged insufficient).
    pub fn score(&self, sessionized: &Sessionized) -> BTreeMap<NaiveDate, VolatilityRecord> {
        let days = aggregate_days(sessionized);
        let tr = true_ranges(&days);

        let mut records = BTreeMap::new();
        let mut ema: Option<f64> = None;
        let alpha = 2.0 / (self.config.lookback as f64 + 1.0);

        for (i, day) in days.iter().enumerate() {
            // ATR over prior days only. `ema` holds the state through day i-1.
            let atr = if i < self.config.lookback {
                None
            } else {
                match self.config.method {
                    AtrMethod::Sma => {
                        let window = &tr[i - self.config.lookback..i];
                        Some(window.iter().sum::<f64>() / window.len() as f64)
                    }
                    AtrMethod::Ema => ema,
                }
            };

            let record = match (day.pre_us_range(), atr) {
                (Some(range), Some(atr)) if atr > ATR_EPS => {
                    let raw = range / atr;
                    VolatilityRecord {
                        date: day.date,
                        pre_us_range: range,
                        atr: Some(atr),
                        vol_score: raw.clamp(self.config.cap_lo, self.config.cap_hi),
                        is_volatile: raw >= self.config.k_atr,
                        insufficient_history: false,
                    }
                }
                (range, _) => VolatilityRecord::neutral(day.date, range.unwrap_or(0.0)),
            };
            records.insert(day.date, record);

            // Fold day i's TR into the EMA state for day i+1.
            ema = Some(match ema {
                Some(prev) => alpha * tr[i] + (1.0 - alpha) * prev,
                None => tr[i],
            });
        }

        records
    }
}

/// Collapse the sessionized stream into one aggregate per trading day,
/// preserving day order.
fn aggregate_days(sessionized: &Sessionized) -> Vec<DayAggregate> {
    let mut days: Vec<DayAggregate> = Vec::new();

    for sb in &sessionized.bars {
        let is_new_day = days.last().map(|d| d.date != sb.trading_date).unwrap_or(true);
        if is_new_day {
            days.push(DayAggregate {
                date: sb.trading_date,
                pre_high: None,
                pre_low: None,
                day_high: sb.bar.high,
                day_low: sb.bar.low,
                day_close: sb.bar.close,
            });
        }

        let day = days.last_mut().unwrap();
        day.day_high = day.day_high.max(sb.bar.high);
        day.day_low = day.day_low.min(sb.bar.low);
        day.day_close = sb.bar.close;

        let pre_us = sessionized
            .sessions
            .get(sb.trading_date)
            .map(|s| s.is_pre_us(sb.bar.ts))
            .unwrap_or(false);
        if pre_us {
            day.pre_high = Some(day.pre_high.map_or(sb.bar.high, |h| h.max(sb.bar.high)));
            day.pre_low = Some(day.pre_low.map_or(sb.bar.low, |l| l.min(sb.bar.low)));
        }
    }

    days
}

/// Daily true range: max(h-l, |h-prev_close|, |l-prev_close|).
/// The first day has no previous close and falls back to h-l.
fn true_ranges(days: &[DayAggregate]) -> Vec<f64> {
    days.iter()
        .enumerate()
        .map(|(i, d)| {
            let hl = d.day_high - d.day_low;
            if i == 0 {
                hl
            } else {
                let pc = days[i - 1].day_close;
                hl.max((d.day_high - pc).abs()).max((d.day_low - pc).abs())
            }
        })
        .collect()
}
