//! Look-ahead contamination tests for the level pipeline.
//!
//! Invariant: no value visible at time T may depend on data from after T.
//!
//! Method: run the pipeline on a truncated stream (days 0..5) and the full
//! stream (days 0..10), then assert the shared prefix is identical. Any
//! difference means future bars leaked into past values. A direct check on
//! the active-level pointer closes the loop: the referenced LevelSet's
//! warmup window must end at or before the bar that sees it.

use chrono::{Datelike, Duration, NaiveDate, TimeZone, Utc, Weekday};
use fvlab_core::domain::{Bar, ExitReason};
use fvlab_core::engine::{BacktestEngine, EngineConfig};
use fvlab_core::levels::{build_level_map, LevelConfig};
use fvlab_core::session::{Sessionized, Sessionizer};
use fvlab_core::volatility::VolatilityScorer;
use std::collections::BTreeMap;

/// First `n` weekdays starting 2024-01-01 (a Monday; all EST, no DST edge).
fn weekdays(n: usize) -> Vec<NaiveDate> {
    let mut dates = Vec::with_capacity(n);
    let mut date = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
    while dates.len() < n {
        if !matches!(date.weekday(), Weekday::Sat | Weekday::Sun) {
            dates.push(date);
        }
        date += Duration::days(1);
    }
    dates
}

/// Deterministic pseudo-random minute bars, 13:00–21:00 UTC inclusive
/// (08:00–16:00 NY in winter), so each day has a pre-US window, a warmup
/// window, and a session-close bar.
fn make_minute_bars(days: &[NaiveDate]) -> Vec<Bar> {
    let mut bars = Vec::new();
    let mut price = 1.1000_f64;

    for (day_idx, date) in days.iter().enumerate() {
        let start = Utc
            .with_ymd_and_hms(date.year(), date.month(), date.day(), 13, 0, 0)
            .unwrap();
        for i in 0..=480 {
            let seed = ((day_idx * 481 + i) as u64)
                .wrapping_mul(6364136223846793005)
                .wrapping_add(1442695040888963407);
            let change = ((seed >> 33) % 2001) as f64 / 1000.0 - 1.0; // -1.0..1.0
            let open = price;
            price = (price + change * 0.0004).clamp(1.0500, 1.1500);
            let close = price;
            bars.push(Bar {
                symbol: "EURUSD".into(),
                ts: start + Duration::minutes(i as i64),
                open,
                high: open.max(close) + 0.0002,
                low: open.min(close) - 0.0002,
                close,
                volume: 100.0 + (seed % 400) as f64,
            });
        }
    }

    bars
}

struct Pipeline {
    sessionized: Sessionized,
    vol: BTreeMap<NaiveDate, fvlab_core::domain::VolatilityRecord>,
    levels: BTreeMap<NaiveDate, fvlab_core::domain::LevelSet>,
    result: fvlab_core::engine::RunResult,
}

fn run_pipeline(bars: &[Bar]) -> Pipeline {
    let sessionized = Sessionizer::default().annotate(bars).unwrap();
    let vol = VolatilityScorer::default().score(&sessionized);
    let levels = build_level_map(&sessionized, &vol, LevelConfig::default());
    let engine = BacktestEngine::new(EngineConfig {
        allow_insufficient_history: true,
        ..EngineConfig::default()
    });
    let result = engine.run(&sessionized, &vol, &levels);
    Pipeline {
        sessionized,
        vol,
        levels,
        result,
    }
}

#[test]
fn lookahead_level_sets() {
    let days = weekdays(10);
    let full_bars = make_minute_bars(&days);
    let truncated_bars = make_minute_bars(&days[..5]);

    let full = run_pipeline(&full_bars);
    let truncated = run_pipeline(&truncated_bars);

    for date in &days[..5] {
        let f = full.levels.get(date);
        let t = truncated.levels.get(date);
        assert_eq!(
            f, t,
            "level set for {date} differs between truncated and full runs"
        );
    }
}

#[test]
fn lookahead_volatility_records() {
    let days = weekdays(10);
    let full = run_pipeline(&make_minute_bars(&days));
    let truncated = run_pipeline(&make_minute_bars(&days[..5]));

    for date in &days[..5] {
        assert_eq!(
            full.vol.get(date),
            truncated.vol.get(date),
            "volatility record for {date} differs between truncated and full runs"
        );
    }
}

#[test]
fn active_level_never_references_future_warmup() {
    let days = weekdays(10);
    let p = run_pipeline(&make_minute_bars(&days));

    for annotated in &p.result.annotated {
        if let Some(level_date) = annotated.active_level_date {
            let day = p
                .sessionized
                .sessions
                .get(level_date)
                .expect("active level references a known session day");
            assert!(
                day.ny_warmup_end <= annotated.ts,
                "bar at {} sees levels of {} whose warmup ends at {}",
                annotated.ts,
                level_date,
                day.ny_warmup_end
            );
        }
    }
}

#[test]
fn annotated_prefix_is_truncation_invariant() {
    let days = weekdays(10);
    let full = run_pipeline(&make_minute_bars(&days));
    let truncated = run_pipeline(&make_minute_bars(&days[..5]));

    for (t, f) in truncated
        .result
        .annotated
        .iter()
        .zip(full.result.annotated.iter())
    {
        assert_eq!(t.ts, f.ts);
        assert_eq!(t.trading_date, f.trading_date);
        assert_eq!(t.active_level_date, f.active_level_date);
        assert_eq!(t.can_trade_now, f.can_trade_now);
    }
}

#[test]
fn closed_trades_are_truncation_invariant() {
    let days = weekdays(10);
    let full = run_pipeline(&make_minute_bars(&days));
    let truncated = run_pipeline(&make_minute_bars(&days[..5]));

    // Every truncated trade that closed on its own (not forced flat by the
    // end of the shorter stream) must appear identically in the full run.
    for t in truncated
        .result
        .trades
        .iter()
        .filter(|t| t.exit_reason != ExitReason::SessionClose)
    {
        let f = full
            .result
            .trades
            .iter()
            .find(|f| f.entry_ts == t.entry_ts)
            .expect("trade from truncated run missing in full run");
        assert_eq!(t.entry_price, f.entry_price);
        assert_eq!(t.side, f.side);
        assert_eq!(t.exit_ts, f.exit_ts);
        assert_eq!(t.exit_price, f.exit_price);
        assert_eq!(t.exit_reason, f.exit_reason);
    }
}
