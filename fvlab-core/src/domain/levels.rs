//! LevelSet — the daily Fair Value zone and L1 bands.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// How the L1 offsets react to the day's volatility score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScaleMode {
    /// Ignore vol_score entirely.
    None,
    /// Scale only the upper offset, by max(1.0, vol_score) — expand on high
    /// volatility, never shrink. The lower offset stays at its base value.
    UpOnly,
    /// Scale both offsets by vol_score, stored independently per side.
    Both,
}

/// How the FV half-width is derived from the warmup window.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FvWidthMode {
    /// Half the warmup-window range (the IB half-range).
    IbRange,
    /// Fixed half-width in price units.
    Fixed { width: f64 },
    /// IB half-range scaled by the day's vol_score.
    VolScaled,
}

/// One day's finalized levels: FV zone center/half-width and the L1 offsets.
///
/// Derived bands are methods rather than stored fields so a LevelSet can
/// never hold internally inconsistent prices. Immutable once computed — the
/// warmup window closed before this struct existed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LevelSet {
    pub date: NaiveDate,
    pub fv_mid: f64,
    pub fv_half_width: f64,
    /// Distance from fv_high up to the upper L1 band.
    pub l1_upper_offset: f64,
    /// Distance from fv_low down to the lower L1 band.
    pub l1_lower_offset: f64,
}

impl LevelSet {
    pub fn fv_high(&self) -> f64 {
        self.fv_mid + self.fv_half_width
    }

    pub fn fv_low(&self) -> f64 {
        self.fv_mid - self.fv_half_width
    }

    pub fn l1_up(&self) -> f64 {
        self.fv_high() + self.l1_upper_offset
    }

    pub fn l1_dn(&self) -> f64 {
        self.fv_low() - self.l1_lower_offset
    }

    /// Midpoint between FV center and FV high.
    pub fn fv_half_up(&self) -> f64 {
        0.5 * (self.fv_mid + self.fv_high())
    }

    /// Midpoint between FV center and FV low.
    pub fn fv_half_dn(&self) -> f64 {
        0.5 * (self.fv_mid + self.fv_low())
    }

    /// Midpoint between FV high and the upper L1 band.
    pub fn l1_mid_up(&self) -> f64 {
        0.5 * (self.fv_high() + self.l1_up())
    }

    /// Midpoint between FV low and the lower L1 band.
    pub fn l1_mid_dn(&self) -> f64 {
        0.5 * (self.fv_low() + self.l1_dn())
    }
}
