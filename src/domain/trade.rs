//! Simulated trades and their lifecycle.
//!
//! A trade is created `Open` and makes exactly one terminal transition via
//! [`Trade::close`].

use crate::domain::snapshot::IndicatorSnapshot;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// |pnl%| below this closes a trade as breakeven.
pub const BREAKEVEN_PERCENT: f64 = 0.1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Side {
    Long,
    Short,
}

impl Side {
    /// +1 for long, -1 for short.
    pub fn sign(&self) -> f64 {
        match self {
            Side::Long => 1.0,
            Side::Short => -1.0,
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Long => f.write_str("LONG"),
            Side::Short => f.write_str("SHORT"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TradeStatus {
    Open,
    ClosedWin,
    ClosedLoss,
    ClosedBreakeven,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExitReason {
    StopLoss,
    TakeProfit,
    Signal,
    EndOfPeriod,
}

impl fmt::Display for ExitReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ExitReason::StopLoss => "STOP_LOSS",
            ExitReason::TakeProfit => "TAKE_PROFIT",
            ExitReason::Signal => "SIGNAL",
            ExitReason::EndOfPeriod => "END_OF_PERIOD",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trade {
    pub id: String,
    pub side: Side,
    pub entry_time: DateTime<Utc>,
    pub entry_price: f64,
    pub exit_time: Option<DateTime<Utc>>,
    pub exit_price: Option<f64>,
    /// Units of the token held.
    pub size: f64,
    /// Quote currency committed at entry.
    pub capital: f64,
    /// Active stop. Trailing targets move it in the trade's favour.
    pub stop_loss: f64,
    /// Distance between entry and the stop placed at entry.
    pub initial_risk: f64,
    /// `None` for trailing exits.
    pub take_profit: Option<f64>,
    pub trail_percent: Option<f64>,
    pub status: TradeStatus,
    pub pnl: f64,
    pub pnl_percent: f64,
    pub exit_reason: Option<ExitReason>,
    pub entry_snapshot: IndicatorSnapshot,
}

impl Trade {
    pub fn is_open(&self) -> bool {
        self.status == TradeStatus::Open
    }

    pub fn is_win(&self) -> bool {
        self.status == TradeStatus::ClosedWin
    }

    pub fn unrealized_pnl(&self, price: f64) -> f64 {
        (price - self.entry_price) * self.size * self.side.sign()
    }

    /// Whether a candle trading between `low` and `high` touched the stop.
    pub fn stop_hit(&self, low: f64, high: f64) -> bool {
        match self.side {
            Side::Long => low <= self.stop_loss,
            Side::Short => high >= self.stop_loss,
        }
    }

    pub fn target_hit(&self, low: f64, high: f64) -> bool {
        match (self.side, self.take_profit) {
            (Side::Long, Some(tp)) => high >= tp,
            (Side::Short, Some(tp)) => low <= tp,
            (_, None) => false,
        }
    }

    /// Ratchet a trailing stop behind the candle's favourable extreme.
    pub fn trail(&mut self, low: f64, high: f64) {
        let Some(percent) = self.trail_percent else {
            return;
        };
        match self.side {
            Side::Long => {
                self.stop_loss = self.stop_loss.max(high * (1.0 - percent / 100.0));
            }
            Side::Short => {
                self.stop_loss = self.stop_loss.min(low * (1.0 + percent / 100.0));
            }
        }
    }

    /// Reward over initial risk; `None` without a fixed target or risk.
    pub fn risk_reward(&self) -> Option<f64> {
        let tp = self.take_profit?;
        if self.initial_risk <= 0.0 {
            return None;
        }
        Some((tp - self.entry_price).abs() / self.initial_risk)
    }

    pub fn duration_hours(&self) -> Option<f64> {
        let exit = self.exit_time?;
        Some((exit - self.entry_time).num_seconds() as f64 / 3600.0)
    }

    /// Terminal transition. Returns the realised P&L; a closed trade is left
    /// untouched and yields 0.
    pub fn close(&mut self, time: DateTime<Utc>, price: f64, reason: ExitReason) -> f64 {
        if !self.is_open() {
            return 0.0;
        }
        let pnl = self.unrealized_pnl(price);
        let pnl_percent = if self.capital > 0.0 {
            pnl / self.capital * 100.0
        } else {
            0.0
        };

        self.status = if pnl_percent.abs() < BREAKEVEN_PERCENT {
            TradeStatus::ClosedBreakeven
        } else if pnl > 0.0 {
            TradeStatus::ClosedWin
        } else {
            TradeStatus::ClosedLoss
        };
        self.exit_time = Some(time);
        self.exit_price = Some(price);
        self.pnl = pnl;
        self.pnl_percent = pnl_percent;
        self.exit_reason = Some(reason);
        pnl
    }
}
