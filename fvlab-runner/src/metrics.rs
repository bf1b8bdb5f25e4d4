//! Performance metrics — pure functions over the trade list.
//!
//! Every metric is a pure function: trades in, scalar out. No dependency on
//! the runner or the engine. P&L is measured in pips throughout; there is no
//! equity model here (position sizing is out of scope).

use fvlab_core::domain::{ExitReason, Trade};
use serde::{Deserialize, Serialize};

/// Aggregate metrics for one symbol's run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummaryMetrics {
    pub trade_count: usize,
    pub win_rate: f64,
    pub profit_factor: f64,
    pub total_pips: f64,
    pub avg_win_pips: f64,
    pub avg_loss_pips: f64,
    pub expectancy_pips: f64,
    pub max_consecutive_losses: usize,
    pub take_profit_exits: usize,
    pub stop_loss_exits: usize,
    pub session_close_exits: usize,
}

impl SummaryMetrics {
    pub fn compute(trades: &[Trade]) -> Self {
        let (tp, sl, sc) = exit_counts(trades);
        Self {
            trade_count: trades.len(),
            win_rate: win_rate(trades),
            profit_factor: profit_factor(trades),
            total_pips: total_pips(trades),
            avg_win_pips: avg_win_pips(trades),
            avg_loss_pips: avg_loss_pips(trades),
            expectancy_pips: expectancy_pips(trades),
            max_consecutive_losses: max_consecutive_losses(trades),
            take_profit_exits: tp,
            stop_loss_exits: sl,
            session_close_exits: sc,
        }
    }
}

// ─── Individual metric functions ────────────────────────────────────

/// Fraction of trades with positive P&L. 0.0 for an empty list.
pub fn win_rate(trades: &[Trade]) -> f64 {
    if trades.is_empty() {
        return 0.0;
    }
    trades.iter().filter(|t| t.is_winner()).count() as f64 / trades.len() as f64
}

/// Gross profit / gross loss. 0.0 with no losses and no wins; f64::INFINITY
/// with wins but no losses.
pub fn profit_factor(trades: &[Trade]) -> f64 {
    let gross_profit: f64 = trades.iter().filter(|t| t.pnl > 0.0).map(|t| t.pnl).sum();
    let gross_loss: f64 = trades
        .iter()
        .filter(|t| t.pnl < 0.0)
        .map(|t| -t.pnl)
        .sum();
    if gross_loss < 1e-15 {
        if gross_profit < 1e-15 {
            0.0
        } else {
            f64::INFINITY
        }
    } else {
        gross_profit / gross_loss
    }
}

pub fn total_pips(trades: &[Trade]) -> f64 {
    trades.iter().map(|t| t.pnl_pips).sum()
}

pub fn avg_win_pips(trades: &[Trade]) -> f64 {
    let wins: Vec<f64> = trades
        .iter()
        .filter(|t| t.pnl > 0.0)
        .map(|t| t.pnl_pips)
        .collect();
    if wins.is_empty() {
        0.0
    } else {
        wins.iter().sum::<f64>() / wins.len() as f64
    }
}

pub fn avg_loss_pips(trades: &[Trade]) -> f64 {
    let losses: Vec<f64> = trades
        .iter()
        .filter(|t| t.pnl < 0.0)
        .map(|t| t.pnl_pips)
        .collect();
    if losses.is_empty() {
        0.0
    } else {
        losses.iter().sum::<f64>() / losses.len() as f64
    }
}

/// Mean pips per trade. 0.0 for an empty list.
pub fn expectancy_pips(trades: &[Trade]) -> f64 {
    if trades.is_empty() {
        return 0.0;
    }
    total_pips(trades) / trades.len() as f64
}

pub fn max_consecutive_losses(trades: &[Trade]) -> usize {
    let mut max = 0;
    let mut streak = 0;
    for trade in trades {
        if trade.pnl < 0.0 {
            streak += 1;
            max = max.max(streak);
        } else {
            streak = 0;
        }
    }
    max
}

/// (take-profit, stop-loss, session-close) exit counts.
pub fn exit_counts(trades: &[Trade]) -> (usize, usize, usize) {
    let mut tp = 0;
    let mut sl = 0;
    let mut sc = 0;
    for trade in trades {
        match trade.exit_reason {
            ExitReason::TakeProfit => tp += 1,
            ExitReason::StopLoss => sl += 1,
            ExitReason::SessionClose => sc += 1,
        }
    }
    (tp, sl, sc)
}
