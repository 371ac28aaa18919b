//! Performance metrics derived after a full replay.

use super::backtest::EquityPoint;
use super::trade::{Trade, TradeStatus};
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Metrics {
    pub total_trades: usize,
    pub winning_trades: usize,
    pub losing_trades: usize,
    pub breakeven_trades: usize,
    /// Percent of all closed trades that won; 0 without trades.
    pub win_rate: f64,
    pub avg_win: f64,
    /// Positive magnitude.
    pub avg_loss: f64,
    pub largest_win: f64,
    /// Most negative P&L, 0 without losses.
    pub largest_loss: f64,
    /// `INFINITY` with profits and no losses, 0 with neither.
    pub profit_factor: f64,
    pub total_return: f64,
    pub total_return_percent: f64,
    pub sharpe_ratio: f64,
    pub sortino_ratio: f64,
    pub max_drawdown: f64,
    pub max_drawdown_percent: f64,
    pub avg_trade_duration_hours: f64,
    pub avg_risk_reward: f64,
}

impl Metrics {
    pub fn compute(
        trades: &[Trade],
        equity: &[EquityPoint],
        initial_capital: f64,
        annualization: f64,
    ) -> Self {
        let mut winning_trades = 0usize;
        let mut losing_trades = 0usize;
        let mut breakeven_trades = 0usize;
        let mut total_wins = 0.0_f64;
        let mut total_losses = 0.0_f64;
        let mut largest_win = 0.0_f64;
        let mut largest_loss = 0.0_f64;

        for trade in trades {
            match trade.status {
                TradeStatus::ClosedWin => {
                    winning_trades += 1;
                    total_wins += trade.pnl;
                    largest_win = largest_win.max(trade.pnl);
                }
                TradeStatus::ClosedLoss => {
                    losing_trades += 1;
                    total_losses += trade.pnl.abs();
                    largest_loss = largest_loss.min(trade.pnl);
                }
                TradeStatus::ClosedBreakeven => breakeven_trades += 1,
                TradeStatus::Open => {}
            }
        }

        let total_trades = trades.len();
        let win_rate = if total_trades > 0 {
            winning_trades as f64 / total_trades as f64 * 100.0
        } else {
            0.0
        };

        let profit_factor = if total_losses > 0.0 {
            total_wins / total_losses
        } else if total_wins > 0.0 {
            f64::INFINITY
        } else {
            0.0
        };

        let avg_win = if winning_trades > 0 {
            total_wins / winning_trades as f64
        } else {
            0.0
        };

        let avg_loss = if losing_trades > 0 {
            total_losses / losing_trades as f64
        } else {
            0.0
        };

        let total_return: f64 = trades.iter().map(|t| t.pnl).sum();
        let total_return_percent = if initial_capital > 0.0 {
            total_return / initial_capital * 100.0
        } else {
            0.0
        };

        let returns: Vec<f64> = trades.iter().map(|t| t.pnl_percent).collect();
        let (sharpe_ratio, sortino_ratio) = compute_risk_adjusted(&returns, annualization);

        let max_drawdown = equity.iter().map(|e| e.drawdown).fold(0.0, f64::max);
        let max_drawdown_percent = equity
            .iter()
            .map(|e| e.drawdown_percent)
            .fold(0.0, f64::max);

        let durations: Vec<f64> = trades.iter().filter_map(Trade::duration_hours).collect();
        let avg_trade_duration_hours = mean(&durations);

        let ratios: Vec<f64> = trades.iter().filter_map(Trade::risk_reward).collect();
        let avg_risk_reward = mean(&ratios);

        Metrics {
            total_trades,
            winning_trades,
            losing_trades,
            breakeven_trades,
            win_rate,
            avg_win,
            avg_loss,
            largest_win,
            largest_loss,
            profit_factor,
            total_return,
            total_return_percent,
            sharpe_ratio,
            sortino_ratio,
            max_drawdown,
            max_drawdown_percent,
            avg_trade_duration_hours,
            avg_risk_reward,
        }
    }
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        0.0
    } else {
        values.iter().sum::<f64>() / values.len() as f64
    }
}

/// Sharpe and Sortino of per-trade percent returns, scaled by
/// sqrt(`annualization`). Both are 0 when their deviation is 0.
fn compute_risk_adjusted(returns: &[f64], annualization: f64) -> (f64, f64) {
    if returns.is_empty() {
        return (0.0, 0.0);
    }

    let n = returns.len() as f64;
    let mean = mean(returns);
    let variance: f64 = returns.iter().map(|r| (r - mean).powi(2)).sum::<f64>() / n;
    let stddev = variance.sqrt();
    let scale = annualization.max(0.0).sqrt();

    let sharpe = if stddev > 0.0 {
        mean / stddev * scale
    } else {
        0.0
    };

    let downside_variance: f64 = returns
        .iter()
        .filter(|&&r| r < 0.0)
        .map(|r| r.powi(2))
        .sum::<f64>()
        / n;
    let downside_stddev = downside_variance.sqrt();

    let sortino = if downside_stddev > 0.0 {
        mean / downside_stddev * scale
    } else {
        0.0
    };

    (sharpe, sortino)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::trade::fixtures::open_trade;
    use crate::domain::trade::{ExitReason, Side};
    use chrono::{Duration, TimeZone, Utc};

    /// Long trade of 1000 capital at 100 closed at `exit` after `hours`.
    fn make_trade(exit: f64, hours: i64) -> Trade {
        let mut t = open_trade(Side::Long, 100.0, 95.0, Some(110.0));
        let when = t.entry_time + Duration::hours(hours);
        t.close(when, exit, ExitReason::Signal);
        t
    }

    fn make_equity(values: &[f64]) -> Vec<EquityPoint> {
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let mut peak = f64::NEG_INFINITY;
        values
            .iter()
            .enumerate()
            .map(|(i, &equity)| {
                peak = peak.max(equity);
                EquityPoint {
                    timestamp: start + Duration::hours(i as i64),
                    equity,
                    drawdown: peak - equity,
                    drawdown_percent: (peak - equity) / peak * 100.0,
                }
            })
            .collect()
    }

    #[test]
    fn metrics_no_trades() {
        let m = Metrics::compute(&[], &make_equity(&[1000.0, 1000.0]), 1000.0, 252.0);
        assert_eq!(m.total_trades, 0);
        assert_eq!(m.win_rate, 0.0);
        assert_eq!(m.profit_factor, 0.0);
        assert_eq!(m.sharpe_ratio, 0.0);
        assert_eq!(m.sortino_ratio, 0.0);
        assert_eq!(m.avg_trade_duration_hours, 0.0);
        assert_eq!(m.avg_risk_reward, 0.0);
        assert!(!m.win_rate.is_nan());
    }

    #[test]
    fn metrics_trade_counts() {
        let trades = vec![
            make_trade(110.0, 4),
            make_trade(95.0, 2),
            make_trade(120.0, 6),
            make_trade(100.0, 1),
        ];
        let m = Metrics::compute(&trades, &[], 10_000.0, 252.0);
        assert_eq!(m.winning_trades, 2);
        assert_eq!(m.losing_trades, 1);
        assert_eq!(m.breakeven_trades, 1);
        assert!((m.win_rate - 50.0).abs() < 1e-9);
        assert!((m.avg_trade_duration_hours - 3.25).abs() < 1e-9);
    }

    #[test]
    fn metrics_pnl_aggregates() {
        // +100, -50, +200 on 1000 capital each
        let trades = vec![
            make_trade(110.0, 1),
            make_trade(95.0, 1),
            make_trade(120.0, 1),
        ];
        let m = Metrics::compute(&trades, &[], 10_000.0, 252.0);
        assert!((m.profit_factor - 6.0).abs() < 1e-9);
        assert!((m.avg_win - 150.0).abs() < 1e-9);
        assert!((m.avg_loss - 50.0).abs() < 1e-9);
        assert!((m.largest_win - 200.0).abs() < 1e-9);
        assert!((m.largest_loss + 50.0).abs() < 1e-9);
        assert!((m.total_return - 250.0).abs() < 1e-9);
        assert!((m.total_return_percent - 2.5).abs() < 1e-9);
        assert!((m.avg_risk_reward - 2.0).abs() < 1e-9);
    }

    #[test]
    fn profit_factor_without_losses_is_infinite() {
        let m = Metrics::compute(&[make_trade(110.0, 1)], &[], 10_000.0, 252.0);
        assert!(m.profit_factor.is_infinite());
    }

    #[test]
    fn metrics_max_drawdown() {
        let equity = make_equity(&[100.0, 110.0, 90.0, 95.0, 80.0, 100.0]);
        let m = Metrics::compute(&[], &equity, 100.0, 252.0);
        assert!((m.max_drawdown - 30.0).abs() < 1e-9);
        assert!((m.max_drawdown_percent - 30.0 / 110.0 * 100.0).abs() < 1e-9);
    }

    #[test]
    fn sharpe_uses_annualization() {
        let returns = [10.0, -5.0, 20.0];
        let (sharpe_252, sortino) = compute_risk_adjusted(&returns, 252.0);
        let (sharpe_365, _) = compute_risk_adjusted(&returns, 365.0);
        assert!(sharpe_252 > 0.0);
        assert!(sortino > sharpe_252);
        assert!((sharpe_365 / sharpe_252 - (365.0_f64 / 252.0).sqrt()).abs() < 1e-9);
    }

    #[test]
    fn identical_returns_have_zero_sharpe() {
        let (sharpe, sortino) = compute_risk_adjusted(&[5.0, 5.0, 5.0], 252.0);
        assert_eq!(sharpe, 0.0);
        assert_eq!(sortino, 0.0);
    }
}
