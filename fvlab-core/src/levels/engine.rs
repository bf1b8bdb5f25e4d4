//! LevelEngine — derives the daily FV zone and L1 bands from the warmup window.
//!
//! Only bars inside `[ny_open, ny_warmup_end)` enter any derivation here.
//! This is the first anti-look-ahead boundary: a LevelSet exists only after
//! its warmup window has fully closed, and nothing later than the window
//! can influence it.

use crate::domain::{FvWidthMode, LevelSet, ScaleMode, SessionDay, VolatilityRecord};
use crate::session::{Sessionized, SessionizedBar};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LevelConfig {
    pub fv_width: FvWidthMode,
    /// VWAP blend weight in [0,1]: 0 = pure warmup midpoint, 1 = pure VWAP.
    pub vwap_alpha: f64,
    /// L1 gap as a multiple of the warmup range.
    pub ib_k: f64,
    pub scale_mode: ScaleMode,
    /// Optional hard floor on the L1 gap, applied before vol scaling.
    pub cap_gap_lo: Option<f64>,
    /// Optional hard ceiling on the L1 gap, applied before vol scaling.
    pub cap_gap_hi: Option<f64>,
}

impl Default for LevelConfig {
    fn default() -> Self {
        Self {
            fv_width: FvWidthMode::IbRange,
            vwap_alpha: 0.0,
            ib_k: 1.0,
            scale_mode: ScaleMode::UpOnly,
            cap_gap_lo: None,
            cap_gap_hi: None,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct LevelEngine {
    config: LevelConfig,
}

impl LevelEngine {
    pub fn new(config: LevelConfig) -> Self {
        assert!(
            (0.0..=1.0).contains(&config.vwap_alpha),
            "vwap_alpha must be in [0,1]"
        );
        assert!(config.ib_k >= 0.0, "ib_k must be >= 0");
        if let FvWidthMode::Fixed { width } = config.fv_width {
            assert!(width >= 0.0, "fixed FV half-width must be >= 0");
        }
        Self { config }
    }

    /// Compute the LevelSet for one day. Returns None when the warmup window
    /// holds no bars — the day contributes no levels and the prior day's
    /// carry forward instead.
    pub fn compute_day(
        &self,
        day: &SessionDay,
        bars: &[SessionizedBar],
        vol: Option<&VolatilityRecord>,
    ) -> Option<LevelSet> {
        let warmup: Vec<&SessionizedBar> = bars
            .iter()
            .filter(|sb| sb.trading_date == day.date && day.in_warmup(sb.bar.ts))
            .collect();
        if warmup.is_empty() {
            return None;
        }

        let ib_high = warmup.iter().map(|sb| sb.bar.high).fold(f64::MIN, f64::max);
        let ib_low = warmup.iter().map(|sb| sb.bar.low).fold(f64::MAX, f64::min);
        let ib_range = ib_high - ib_low;
        let midpoint = 0.5 * (ib_high + ib_low);

        let vol_score = vol.map(|v| v.vol_score).unwrap_or(1.0);

        let fv_mid = match warmup_vwap(&warmup) {
            Some(vwap) if self.config.vwap_alpha > 0.0 => {
                (1.0 - self.config.vwap_alpha) * midpoint + self.config.vwap_alpha * vwap
            }
            _ => midpoint,
        };

        let fv_half_width = match self.config.fv_width {
            FvWidthMode::IbRange => 0.5 * ib_range,
            FvWidthMode::Fixed { width } => width,
            FvWidthMode::VolScaled => 0.5 * ib_range * vol_score,
        };

        let mut gap = ib_range * self.config.ib_k;
        if let Some(lo) = self.config.cap_gap_lo {
            gap = gap.max(lo);
        }
        if let Some(hi) = self.config.cap_gap_hi {
            gap = gap.min(hi);
        }

        let (l1_upper_offset, l1_lower_offset) = match self.config.scale_mode {
            ScaleMode::None => (gap, gap),
            ScaleMode::UpOnly => (gap * vol_score.max(1.0), gap),
            ScaleMode::Both => (gap * vol_score, gap * vol_score),
        };

        Some(LevelSet {
            date: day.date,
            fv_mid,
            fv_half_width,
            l1_upper_offset,
            l1_lower_offset,
        })
    }
}

/// Volume-weighted typical price over the warmup bars.
fn warmup_vwap(warmup: &[&SessionizedBar]) -> Option<f64> {
    let total_volume: f64 = warmup.iter().map(|sb| sb.bar.volume).sum();
    if total_volume <= 0.0 {
        return None;
    }
    let weighted: f64 = warmup
        .iter()
        .map(|sb| sb.bar.typical_price() * sb.bar.volume)
        .sum();
    Some(weighted / total_volume)
}

/// Compute a LevelSet for every trading day in the stream.
///
/// Bars arrive grouped by trading day (timestamps are ordered and the
/// weekend roll preserves day order), so each day sees only its own slice.
pub fn build_level_map(
    sessionized: &Sessionized,
    vol_records: &BTreeMap<NaiveDate, VolatilityRecord>,
    config: LevelConfig,
) -> BTreeMap<NaiveDate, LevelSet> {
    let engine = LevelEngine::new(config);
    let mut levels = BTreeMap::new();
    let bars = &sessionized.bars;

    let mut start = 0;
    while start < bars.len() {
        let date = bars[start].trading_date;
        let end = bars[start..]
            .iter()
            .position(|sb| sb.trading_date != date)
            .map(|offset| start + offset)
            .unwrap_or(bars.len());

        if let Some(day) = sessionized.sessions.get(date) {
            if let Some(ls) = engine.compute_day(day, &bars[start..end], vol_records.get(&date)) {
                levels.insert(date, ls);
            }
        }
        start = end;
    }

    levels
}
