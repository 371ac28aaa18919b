//! Versioned storage schema for backtest results.
//!
//! The record is decoupled from [`BacktestResult`]: it keeps the figures a
//! later reader needs (config, metrics, trade outcomes, equity curve) in a
//! flat form tagged with [`SCHEMA_VERSION`]. Decoding rejects any other
//! version instead of guessing.

use crate::domain::backtest::{BacktestResult, EquityPoint};
use crate::domain::error::CallerError;
use crate::domain::timeframe::Timeframe;
use crate::domain::trade::{ExitReason, Side, TradeStatus};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const SCHEMA_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordMetrics {
    pub total_trades: usize,
    pub winning_trades: usize,
    pub losing_trades: usize,
    pub breakeven_trades: usize,
    pub win_rate: f64,
    pub avg_win: f64,
    pub avg_loss: f64,
    pub largest_win: f64,
    pub largest_loss: f64,
    /// `None` when gross loss is zero and gross profit positive.
    pub profit_factor: Option<f64>,
    pub total_return: f64,
    pub total_return_percent: f64,
    pub sharpe_ratio: f64,
    pub sortino_ratio: f64,
    pub max_drawdown: f64,
    pub max_drawdown_percent: f64,
    pub avg_trade_duration_hours: f64,
    pub avg_risk_reward: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeRecord {
    pub id: String,
    pub side: Side,
    pub entry_time: DateTime<Utc>,
    pub entry_price: f64,
    pub exit_time: Option<DateTime<Utc>>,
    pub exit_price: Option<f64>,
    pub stop_loss: f64,
    pub take_profit: Option<f64>,
    pub status: TradeStatus,
    pub exit_reason: Option<ExitReason>,
    pub pnl: f64,
    pub pnl_percent: f64,
    pub entry_rsi: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacktestRecord {
    pub schema_version: u32,
    pub id: String,
    pub created_at: DateTime<Utc>,
    pub symbol: String,
    pub timeframe: Timeframe,
    pub strategy: String,
    pub initial_capital: f64,
    pub position_size: f64,
    pub metrics: RecordMetrics,
    pub trades: Vec<TradeRecord>,
    pub equity: Vec<EquityPoint>,
    pub recommendations: Vec<String>,
}

/// `SOL_rsi-oversold-long_20250601T120000Z`
pub fn record_id(symbol: &str, strategy: &str, at: DateTime<Utc>) -> String {
    let slug: String = strategy
        .split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|part| !part.is_empty())
        .map(|part| part.to_ascii_lowercase())
        .collect::<Vec<_>>()
        .join("-");
    format!("{}_{}_{}", symbol, slug, at.format("%Y%m%dT%H%M%SZ"))
}

impl BacktestRecord {
    pub fn from_result(result: &BacktestResult) -> Self {
        let m = &result.metrics;
        BacktestRecord {
            schema_version: SCHEMA_VERSION,
            id: record_id(
                &result.config.symbol,
                &result.strategy_name,
                result.timestamp,
            ),
            created_at: result.timestamp,
            symbol: result.config.symbol.clone(),
            timeframe: result.config.timeframe,
            strategy: result.strategy_name.clone(),
            initial_capital: result.config.initial_capital,
            position_size: result.config.position_size,
            metrics: RecordMetrics {
                total_trades: m.total_trades,
                winning_trades: m.winning_trades,
                losing_trades: m.losing_trades,
                breakeven_trades: m.breakeven_trades,
                win_rate: m.win_rate,
                avg_win: m.avg_win,
                avg_loss: m.avg_loss,
                largest_win: m.largest_win,
                largest_loss: m.largest_loss,
                profit_factor: m.profit_factor.is_finite().then_some(m.profit_factor),
                total_return: m.total_return,
                total_return_percent: m.total_return_percent,
                sharpe_ratio: m.sharpe_ratio,
                sortino_ratio: m.sortino_ratio,
                max_drawdown: m.max_drawdown,
                max_drawdown_percent: m.max_drawdown_percent,
                avg_trade_duration_hours: m.avg_trade_duration_hours,
                avg_risk_reward: m.avg_risk_reward,
            },
            trades: result
                .trades
                .iter()
                .map(|t| TradeRecord {
                    id: t.id.clone(),
                    side: t.side,
                    entry_time: t.entry_time,
                    entry_price: t.entry_price,
                    exit_time: t.exit_time,
                    exit_price: t.exit_price,
                    stop_loss: t.stop_loss,
                    take_profit: t.take_profit,
                    status: t.status,
                    exit_reason: t.exit_reason,
                    pnl: t.pnl,
                    pnl_percent: t.pnl_percent,
                    entry_rsi: t.entry_snapshot.rsi,
                })
                .collect(),
            equity: result.equity.clone(),
            recommendations: result.analysis.recommendations.clone(),
        }
    }

    /// Profit factor with the stored `null` read back as infinity.
    pub fn profit_factor(&self) -> f64 {
        match self.metrics.profit_factor {
            Some(pf) => pf,
            None if self.metrics.total_return > 0.0 => f64::INFINITY,
            None => 0.0,
        }
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, CallerError> {
        serde_json::to_vec_pretty(self).map_err(|e| CallerError::Record {
            reason: format!("encode {}: {e}", self.id),
        })
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, CallerError> {
        #[derive(Deserialize)]
        struct Header {
            schema_version: u32,
        }

        let header: Header = serde_json::from_slice(bytes).map_err(|e| CallerError::Record {
            reason: format!("missing schema version: {e}"),
        })?;
        if header.schema_version != SCHEMA_VERSION {
            return Err(CallerError::UnsupportedSchema {
                found: header.schema_version,
                supported: SCHEMA_VERSION,
            });
        }
        serde_json::from_slice(bytes).map_err(|e| CallerError::Record {
            reason: format!("decode: {e}"),
        })
    }
}
