//! The bar-by-bar simulation loop: FLAT → ENTERED → CLOSED.

use crate::domain::{
    cyclical, ExitReason, FeatureVector, LevelSet, SessionDay, Side, Trade, VolatilityRecord,
    FEATURE_SCHEMA,
};
use crate::engine::config::{EngineConfig, TieBreak};
use crate::levels::active_level_for;
use crate::session::{Sessionized, SessionizedBar};
use chrono::{DateTime, Datelike, NaiveDate, Timelike, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A bar annotated with its session context — the dataset row the external
/// consumers (visualization, export, classifier training) read.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnnotatedBar {
    pub ts: DateTime<Utc>,
    pub trading_date: NaiveDate,
    pub ny_time: chrono::NaiveTime,
    pub close: f64,
    /// Date of the LevelSet visible at this bar, if any.
    pub active_level_date: Option<NaiveDate>,
    pub can_trade_now: bool,
}

/// Result of a complete simulation run for one symbol.
#[derive(Debug, Clone)]
pub struct RunResult {
    pub trades: Vec<Trade>,
    pub annotated: Vec<AnnotatedBar>,
    pub bar_count: usize,
    pub days_processed: usize,
}

/// An open position between entry and exit.
#[derive(Debug, Clone)]
struct OpenPosition {
    side: Side,
    entry_ts: DateTime<Utc>,
    entry_price: f64,
    entry_trading_date: NaiveDate,
    tp: f64,
    sl: f64,
    level_date: NaiveDate,
    features: FeatureVector,
}

#[derive(Debug, Clone, Default)]
pub struct BacktestEngine {
    config: EngineConfig,
}

impl BacktestEngine {
    pub fn new(config: EngineConfig) -> Self {
        assert!(config.tp_pips > 0.0, "tp_pips must be > 0");
        assert!(config.sl_pips > 0.0, "sl_pips must be > 0");
        assert!(config.pip_size > 0.0, "pip_size must be > 0");
        Self { config }
    }

    /// Walk the sessionized stream and produce trades plus the annotated
    /// dataset. At most one position is open at any time; a position left
    /// open when the stream ends is closed at the final bar's close.
    pub fn run(
        &self,
        sessionized: &Sessionized,
        vol_records: &BTreeMap<NaiveDate, VolatilityRecord>,
        levels: &BTreeMap<NaiveDate, LevelSet>,
    ) -> RunResult {
        let mut trades = Vec::new();
        let mut annotated = Vec::with_capacity(sessionized.bars.len());
        let mut position: Option<OpenPosition> = None;

        for sb in &sessionized.bars {
            let day = match sessionized.sessions.get(sb.trading_date) {
                Some(day) => day,
                None => continue, // sessionizer emits a day for every bar
            };
            let vol = vol_records.get(&sb.trading_date);
            let active = active_level_for(levels, day, sb.bar.ts, sb.ny_time, self.config.cutover);
            let can_trade = self.can_trade_now(day, vol, active.is_some(), sb.bar.ts);

            // Entry first, then exits: a fresh entry is exit-checked on its
            // own bar, so a bar that immediately covers the stop closes at
            // the stop.
            if position.is_none() && can_trade {
                if let Some(level) = active {
                    position = self.try_enter(sb, day, vol, level);
                }
            }

            if let Some(pos) = position.take() {
                match self.resolve_exit(&pos, sb, day) {
                    Some((exit_price, reason)) => {
                        trades.push(self.close_trade(pos, sb.bar.ts, exit_price, reason, &sb.bar.symbol));
                    }
                    None => position = Some(pos),
                }
            }

            annotated.push(AnnotatedBar {
                ts: sb.bar.ts,
                trading_date: sb.trading_date,
                ny_time: sb.ny_time,
                close: sb.bar.close,
                active_level_date: active.map(|ls| ls.date),
                can_trade_now: can_trade,
            });
        }

        // Data ended mid-session: flatten at the last observed close.
        if let Some(pos) = position {
            if let Some(last) = sessionized.bars.last() {
                trades.push(self.close_trade(
                    pos,
                    last.bar.ts,
                    last.bar.close,
                    ExitReason::SessionClose,
                    &last.bar.symbol,
                ));
            }
        }

        RunResult {
            trades,
            annotated,
            bar_count: sessionized.bars.len(),
            days_processed: sessionized.sessions.len(),
        }
    }

    /// Eligibility gate: active levels present, today's warmup complete,
    /// before the close, and an acceptable volatility regime.
    fn can_trade_now(
        &self,
        day: &SessionDay,
        vol: Option<&VolatilityRecord>,
        has_active_level: bool,
        ts: DateTime<Utc>,
    ) -> bool {
        if !has_active_level || ts < day.ny_warmup_end || ts >= day.ny_close {
            return false;
        }
        match vol {
            Some(v) => {
                !v.is_volatile
                    && (self.config.allow_insufficient_history || !v.insufficient_history)
            }
            None => self.config.allow_insufficient_history,
        }
    }

    /// Check the armed boundaries for a touch. When more than one boundary
    /// is inside the bar's range, the one nearest the open is taken as
    /// touched first.
    fn try_enter(
        &self,
        sb: &SessionizedBar,
        day: &SessionDay,
        vol: Option<&VolatilityRecord>,
        level: &LevelSet,
    ) -> Option<OpenPosition> {
        let mut candidates: Vec<(Side, f64)> = Vec::new();

        if self.config.enter_on_l1 {
            if sb.bar.low <= level.l1_dn() {
                candidates.push((Side::Long, level.l1_dn()));
            }
            if sb.bar.high >= level.l1_up() {
                candidates.push((Side::Short, level.l1_up()));
            }
        }
        if self.config.enter_on_fv {
            if sb.bar.low <= level.fv_low() {
                candidates.push((Side::Long, level.fv_low()));
            }
            if sb.bar.high >= level.fv_high() {
                candidates.push((Side::Short, level.fv_high()));
            }
        }

        let (side, entry_price) = candidates.into_iter().min_by(|a, b| {
            let da = (a.1 - sb.bar.open).abs();
            let db = (b.1 - sb.bar.open).abs();
            da.partial_cmp(&db).unwrap_or(std::cmp::Ordering::Equal)
        })?;

        let tp_dist = self.config.tp_pips * self.config.pip_size;
        let sl_dist = self.config.sl_pips * self.config.pip_size;
        let (tp, sl) = match side {
            Side::Long => (entry_price + tp_dist, entry_price - sl_dist),
            Side::Short => (entry_price - tp_dist, entry_price + sl_dist),
        };

        Some(OpenPosition {
            side,
            entry_ts: sb.bar.ts,
            entry_price,
            entry_trading_date: sb.trading_date,
            tp,
            sl,
            level_date: level.date,
            features: entry_features(sb, day, vol, level, side, entry_price),
        })
    }

    /// Exit resolution for one bar, pessimistic throughout.
    ///
    /// Order: forced session close (at/past ny_close, or the trading day
    /// changed under a data gap) fills at the bar's open; otherwise stop and
    /// target touches resolve per the tie-break. Adverse gaps through the
    /// stop fill at the open; target fills never improve past the target.
    fn resolve_exit(
        &self,
        pos: &OpenPosition,
        sb: &SessionizedBar,
        day: &SessionDay,
    ) -> Option<(f64, ExitReason)> {
        if sb.bar.ts >= day.ny_close || sb.trading_date != pos.entry_trading_date {
            return Some((sb.bar.open, ExitReason::SessionClose));
        }

        let (tp_hit, sl_hit) = match pos.side {
            Side::Long => (sb.bar.high >= pos.tp, sb.bar.low <= pos.sl),
            Side::Short => (sb.bar.low <= pos.tp, sb.bar.high >= pos.sl),
        };

        let stop_fill = match pos.side {
            // A bar opening beyond the stop fills at the (worse) open.
            Side::Long if sb.bar.open < pos.sl => sb.bar.open,
            Side::Short if sb.bar.open > pos.sl => sb.bar.open,
            _ => pos.sl,
        };

        match (tp_hit, sl_hit) {
            (false, false) => None,
            (true, false) => Some((pos.tp, ExitReason::TakeProfit)),
            (false, true) => Some((stop_fill, ExitReason::StopLoss)),
            (true, true) => match self.config.tie_break {
                TieBreak::StopFirst => Some((stop_fill, ExitReason::StopLoss)),
                TieBreak::OpenDistance => {
                    let to_tp = (pos.tp - sb.bar.open).abs();
                    let to_sl = (pos.sl - sb.bar.open).abs();
                    if to_tp < to_sl {
                        Some((pos.tp, ExitReason::TakeProfit))
                    } else {
                        Some((stop_fill, ExitReason::StopLoss))
                    }
                }
            },
        }
    }

    fn close_trade(
        &self,
        pos: OpenPosition,
        exit_ts: DateTime<Utc>,
        exit_price: f64,
        exit_reason: ExitReason,
        symbol: &str,
    ) -> Trade {
        let pnl = match pos.side {
            Side::Long => exit_price - pos.entry_price,
            Side::Short => pos.entry_price - exit_price,
        };
        Trade {
            symbol: symbol.to_string(),
            side: pos.side,
            entry_ts: pos.entry_ts,
            entry_price: pos.entry_price,
            level_date: pos.level_date,
            exit_ts,
            exit_price,
            exit_reason,
            pnl,
            pnl_pips: pnl / self.config.pip_size,
            features: pos.features,
        }
    }
}

/// The full engineered feature snapshot at entry time, in schema order.
pub fn entry_features(
    sb: &SessionizedBar,
    day: &SessionDay,
    vol: Option<&VolatilityRecord>,
    level: &LevelSet,
    side: Side,
    entry_price: f64,
) -> FeatureVector {
    let hour = sb.bar.ts.hour() as f64;
    let dow = sb.bar.ts.weekday().num_days_from_monday() as f64;
    let month = sb.bar.ts.month() as f64;
    let (hour_sin, hour_cos) = cyclical(hour, 24.0);
    let (dow_sin, dow_cos) = cyclical(dow, 7.0);
    let (month_sin, month_cos) = cyclical(month - 1.0, 12.0);

    let minutes_since_open = (sb.bar.ts - day.ny_open).num_minutes() as f64;
    let vol_score = vol.map(|v| v.vol_score).unwrap_or(1.0);
    let is_volatile = vol.map(|v| v.is_volatile as i64 as f64).unwrap_or(0.0);
    let pre_us_range = vol.map(|v| v.pre_us_range).unwrap_or(0.0);

    let values = vec![
        hour,
        dow,
        month,
        hour_sin,
        hour_cos,
        dow_sin,
        dow_cos,
        month_sin,
        month_cos,
        minutes_since_open,
        vol_score,
        is_volatile,
        pre_us_range,
        level.fv_mid,
        level.fv_half_width,
        level.l1_upper_offset,
        level.l1_lower_offset,
        entry_price - level.fv_mid,
        side.as_feature(),
    ];
    debug_assert_eq!(values.len(), FEATURE_SCHEMA.len());
    FeatureVector::from_schema(values)
}
