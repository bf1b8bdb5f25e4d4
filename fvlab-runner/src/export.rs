//! Artifact export — trades, filtered trades, the annotated dataset, the
//! feature matrix consumed by the external classifier, and the batch JSON.

use crate::runner::BatchResult;
use fvlab_core::domain::{ExitReason, FilteredTrade, Side, Trade, FEATURE_SCHEMA};
use fvlab_core::engine::AnnotatedBar;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

fn side_str(side: Side) -> &'static str {
    match side {
        Side::Long => "long",
        Side::Short => "short",
    }
}

fn reason_str(reason: ExitReason) -> &'static str {
    match reason {
        ExitReason::TakeProfit => "take_profit",
        ExitReason::StopLoss => "stop_loss",
        ExitReason::SessionClose => "session_close",
    }
}

/// One row per trade: identification, entry/exit, P&L.
pub fn write_trades_csv(path: &Path, trades: &[Trade]) -> Result<(), ExportError> {
    let mut writer = csv::Writer::from_path(path)?;
    writer.write_record([
        "symbol",
        "side",
        "entry_ts",
        "entry_price",
        "level_date",
        "exit_ts",
        "exit_price",
        "exit_reason",
        "pnl",
        "pnl_pips",
    ])?;
    for t in trades {
        let row = [
            t.symbol.clone(),
            side_str(t.side).to_string(),
            t.entry_ts.to_rfc3339(),
            format!("{:.5}", t.entry_price),
            t.level_date.to_string(),
            t.exit_ts.to_rfc3339(),
            format!("{:.5}", t.exit_price),
            reason_str(t.exit_reason).to_string(),
            format!("{:.5}", t.pnl),
            format!("{:.1}", t.pnl_pips),
        ];
        writer.write_record(&row)?;
    }
    writer.flush().map_err(ExportError::from)?;
    Ok(())
}

/// Trades after the probability gate, with score and keep flag.
pub fn write_filtered_csv(path: &Path, filtered: &[FilteredTrade]) -> Result<(), ExportError> {
    let mut writer = csv::Writer::from_path(path)?;
    writer.write_record([
        "symbol",
        "side",
        "entry_ts",
        "exit_reason",
        "pnl_pips",
        "probability",
        "keep",
    ])?;
    for f in filtered {
        let row = [
            f.trade.symbol.clone(),
            side_str(f.trade.side).to_string(),
            f.trade.entry_ts.to_rfc3339(),
            reason_str(f.trade.exit_reason).to_string(),
            format!("{:.1}", f.trade.pnl_pips),
            format!("{:.4}", f.probability),
            (if f.keep { "1" } else { "0" }).to_string(),
        ];
        writer.write_record(&row)?;
    }
    writer.flush().map_err(ExportError::from)?;
    Ok(())
}

/// The annotated bar stream: session markers, active level, trade gate.
pub fn write_dataset_csv(path: &Path, annotated: &[AnnotatedBar]) -> Result<(), ExportError> {
    let mut writer = csv::Writer::from_path(path)?;
    writer.write_record([
        "ts",
        "trading_date",
        "ny_time",
        "close",
        "active_level_date",
        "can_trade_now",
    ])?;
    for a in annotated {
        let row = [
            a.ts.to_rfc3339(),
            a.trading_date.to_string(),
            a.ny_time.to_string(),
            format!("{:.5}", a.close),
            a.active_level_date
                .map(|d| d.to_string())
                .unwrap_or_default(),
            (if a.can_trade_now { "1" } else { "0" }).to_string(),
        ];
        writer.write_record(&row)?;
    }
    writer.flush().map_err(ExportError::from)?;
    Ok(())
}

/// The feature matrix for classifier training: one row per trade, the
/// canonical feature columns plus realized outcome.
pub fn write_features_csv(path: &Path, trades: &[Trade]) -> Result<(), ExportError> {
    let mut writer = csv::Writer::from_path(path)?;
    let mut header: Vec<&str> = FEATURE_SCHEMA.to_vec();
    header.push("pnl_pips");
    header.push("win");
    writer.write_record(&header)?;

    for t in trades {
        let mut row: Vec<String> = t.features.values().iter().map(|v| v.to_string()).collect();
        row.push(format!("{:.1}", t.pnl_pips));
        row.push(if t.is_winner() { "1".into() } else { "0".into() });
        writer.write_record(&row)?;
    }
    writer.flush().map_err(ExportError::from)?;
    Ok(())
}

/// Full batch result as pretty JSON.
pub fn write_result_json(path: &Path, batch: &BatchResult) -> Result<(), ExportError> {
    let file = std::fs::File::create(path)?;
    serde_json::to_writer_pretty(file, batch)?;
    Ok(())
}
