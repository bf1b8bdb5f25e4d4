//! End-to-end batch tests: temp CSV data in, trades and artifacts out.

use chrono::{Datelike, Duration, NaiveDate, Weekday};
use fvlab_runner::{run_batch, write_features_csv, write_result_json, write_trades_csv};
use std::fmt::Write as _;
use std::path::Path;

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

fn push_row(out: &mut String, date: NaiveDate, h: u32, m: u32, o: f64, hi: f64, lo: f64, c: f64) {
    writeln!(
        out,
        "{}T{:02}:{:02}:00Z,{:.5},{:.5},{:.5},{:.5},100",
        date, h, m, o, hi, lo, c
    )
    .unwrap();
}

/// Fifteen uniform days (pre-US range 100 pips, warmup 20 pips); the last
/// day touches the lower L1 band and then crosses the 20-pip target.
fn scenario_csv() -> String {
    let mut out = String::from("timestamp,open,high,low,close,volume\n");
    let days = weekdays(15);
    for (i, date) in days.iter().enumerate() {
        push_row(&mut out, *date, 13, 30, 1.1000, 1.1050, 1.0950, 1.1020);
        push_row(&mut out, *date, 14, 30, 1.1020, 1.1030, 1.1010, 1.1020);
        if i == 14 {
            push_row(&mut out, *date, 15, 5, 1.0995, 1.0996, 1.0988, 1.0992);
            push_row(&mut out, *date, 15, 20, 1.0992, 1.1012, 1.0991, 1.1008);
        }
        push_row(&mut out, *date, 16, 0, 1.1020, 1.1025, 1.1015, 1.1020);
        push_row(&mut out, *date, 21, 0, 1.1020, 1.1022, 1.1018, 1.1020);
    }
    out
}

fn write_data(dir: &Path, symbol: &str, content: &str) {
    std::fs::write(dir.join(format!("{symbol}.csv")), content).unwrap();
}

#[test]
fn batch_produces_trades_and_artifacts() {
    let dir = tempfile::tempdir().unwrap();
    write_data(dir.path(), "EURUSD", &scenario_csv());

    let config = fvlab_runner::BacktestConfig::default();
    let batch = run_batch(&config, dir.path()).unwrap();

    assert!(batch.failures.is_empty());
    assert_eq!(batch.symbols.len(), 1);
    let result = &batch.symbols[0];
    assert_eq!(result.symbol, "EURUSD");
    assert_eq!(result.trades.len(), 1);
    assert!((result.trades[0].pnl_pips - 20.0).abs() < 1e-6);
    assert_eq!(result.days_processed, 15);
    assert!(result.filtered.is_none());

    // Artifacts
    let trades_path = dir.path().join("trades.csv");
    let features_path = dir.path().join("features.csv");
    let json_path = dir.path().join("result.json");
    write_trades_csv(&trades_path, &result.trades).unwrap();
    write_features_csv(&features_path, &result.trades).unwrap();
    write_result_json(&json_path, &batch).unwrap();
    assert!(trades_path.exists());
    assert!(features_path.exists());
    assert!(json_path.exists());
}

#[test]
fn missing_symbol_is_isolated_as_failure() {
    let dir = tempfile::tempdir().unwrap();
    write_data(dir.path(), "EURUSD", &scenario_csv());

    let mut config = fvlab_runner::BacktestConfig::default();
    config.backtest.symbols = vec!["EURUSD".into(), "GBPUSD".into()];
    let batch = run_batch(&config, dir.path()).unwrap();

    assert_eq!(batch.symbols.len(), 1);
    assert_eq!(batch.symbols[0].symbol, "EURUSD");
    assert_eq!(batch.failures.len(), 1);
    assert_eq!(batch.failures[0].symbol, "GBPUSD");
}

#[test]
fn corrupt_data_is_isolated_as_failure() {
    let dir = tempfile::tempdir().unwrap();
    write_data(dir.path(), "EURUSD", &scenario_csv());
    write_data(
        dir.path(),
        "GBPUSD",
        "timestamp,open,high,low,close,volume\nnot-a-time,1,1,1,1,1\n",
    );

    let mut config = fvlab_runner::BacktestConfig::default();
    config.backtest.symbols = vec!["EURUSD".into(), "GBPUSD".into()];
    let batch = run_batch(&config, dir.path()).unwrap();

    assert_eq!(batch.symbols.len(), 1);
    assert_eq!(batch.failures.len(), 1);
    assert!(batch.failures[0].reason.contains("timestamp"));
}

#[test]
fn probability_gate_applies_when_model_configured() {
    use fvlab_core::domain::FEATURE_SCHEMA;

    let dir = tempfile::tempdir().unwrap();
    write_data(dir.path(), "EURUSD", &scenario_csv());

    // Zero-weight model with a strongly negative intercept: p ≈ 0.047.
    let names: Vec<String> = FEATURE_SCHEMA.iter().map(|s| s.to_string()).collect();
    let weights = vec![0.0; names.len()];
    let model = serde_json::json!({
        "names": names,
        "weights": weights,
        "intercept": -3.0,
    });
    let model_path = dir.path().join("model.json");
    std::fs::write(&model_path, model.to_string()).unwrap();

    let mut config = fvlab_runner::BacktestConfig::default();
    config.filter.model_path = Some(model_path);
    config.filter.threshold = 0.5;
    let batch = run_batch(&config, dir.path()).unwrap();

    let filtered = batch.symbols[0].filtered.as_ref().unwrap();
    assert_eq!(filtered.len(), 1);
    assert!(!filtered[0].keep);
    assert!(filtered[0].probability < 0.1);
}

#[test]
fn run_id_recorded_in_batch() {
    let dir = tempfile::tempdir().unwrap();
    write_data(dir.path(), "EURUSD", &scenario_csv());

    let config = fvlab_runner::BacktestConfig::default();
    let batch = run_batch(&config, dir.path()).unwrap();
    assert_eq!(batch.run_id, config.run_id());
    assert_eq!(batch.schema_version, fvlab_runner::SCHEMA_VERSION);
}
