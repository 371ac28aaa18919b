//! Backtest simulator: replays a strategy over historical candles.
//!
//! The replay is a strict sequential fold. For each candle:
//! 1. an open trade is checked against the candle's range (stop-loss before
//!    take-profit), then against the strategy's exit rules at the close;
//! 2. with no open trade, and no trade closed on this candle, the entry rules
//!    are scored against the candle's indicator snapshot;
//! 3. an equity point is recorded from capital plus unrealized P&L.
//!
//! A trade still open after the last candle closes at its close with
//! `END_OF_PERIOD`.

use crate::domain::candle::{Candle, is_chronological};
use crate::domain::error::CallerError;
use crate::domain::insights::StrategyInsights;
use crate::domain::metrics::Metrics;
use crate::domain::snapshot::{IndicatorSnapshot, SnapshotSeries};
use crate::domain::strategy::{StopLossRule, Strategy, TakeProfitRule};
use crate::domain::timeframe::Timeframe;
use crate::domain::trade::{ExitReason, Side, Trade, TradeStatus};
use crate::ports::clock_port::Clock;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const DEFAULT_INITIAL_CAPITAL: f64 = 10_000.0;
pub const DEFAULT_POSITION_SIZE: f64 = 100.0;
pub const DEFAULT_ENTRY_THRESHOLD: f64 = 50.0;
/// Periods per year used to annualize Sharpe and Sortino.
pub const DEFAULT_ANNUALIZATION: f64 = 252.0;
/// Fallback distance to the level when no support/resistance is known.
const FALLBACK_LEVEL_PERCENT: f64 = 5.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacktestConfig {
    pub symbol: String,
    pub timeframe: Timeframe,
    pub initial_capital: f64,
    /// Percent of current capital committed per trade, in (0, 100].
    pub position_size: f64,
    /// Summed weight of matching entry rules needed to open a trade.
    pub entry_threshold: f64,
    pub annualization: f64,
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
}

impl BacktestConfig {
    pub fn new(symbol: impl Into<String>, timeframe: Timeframe) -> Self {
        BacktestConfig {
            symbol: symbol.into(),
            timeframe,
            initial_capital: DEFAULT_INITIAL_CAPITAL,
            position_size: DEFAULT_POSITION_SIZE,
            entry_threshold: DEFAULT_ENTRY_THRESHOLD,
            annualization: DEFAULT_ANNUALIZATION,
            start: None,
            end: None,
        }
    }

    pub fn validate(&self) -> Result<(), CallerError> {
        let invalid = |key: &str, reason: String| CallerError::ConfigInvalid {
            section: "backtest".into(),
            key: key.into(),
            reason,
        };
        if !(self.initial_capital.is_finite() && self.initial_capital > 0.0) {
            return Err(invalid(
                "initial_capital",
                format!("must be positive, got {}", self.initial_capital),
            ));
        }
        if !(self.position_size > 0.0 && self.position_size <= 100.0) {
            return Err(invalid(
                "position_size",
                format!("must be in (0, 100], got {}", self.position_size),
            ));
        }
        if !(self.entry_threshold.is_finite() && self.entry_threshold > 0.0) {
            return Err(invalid(
                "entry_threshold",
                format!("must be positive, got {}", self.entry_threshold),
            ));
        }
        if !(self.annualization.is_finite() && self.annualization > 0.0) {
            return Err(invalid(
                "annualization",
                format!("must be positive, got {}", self.annualization),
            ));
        }
        if let (Some(start), Some(end)) = (self.start, self.end)
            && start > end
        {
            return Err(invalid("start", format!("{start} is after end {end}")));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EquityPoint {
    pub timestamp: DateTime<Utc>,
    pub equity: f64,
    /// max(0, running peak - equity)
    pub drawdown: f64,
    pub drawdown_percent: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BacktestResult {
    pub config: BacktestConfig,
    pub strategy_name: String,
    pub trades: Vec<Trade>,
    pub metrics: Metrics,
    pub equity: Vec<EquityPoint>,
    pub analysis: StrategyInsights,
    pub timestamp: DateTime<Utc>,
}

impl BacktestResult {
    pub fn final_equity(&self) -> f64 {
        self.config.initial_capital + self.metrics.total_return
    }
}

struct Simulator<'a> {
    config: &'a BacktestConfig,
    strategy: &'a Strategy,
    capital: f64,
    peak: f64,
    open: Option<Trade>,
    trades: Vec<Trade>,
    equity: Vec<EquityPoint>,
}

impl<'a> Simulator<'a> {
    fn new(config: &'a BacktestConfig, strategy: &'a Strategy) -> Self {
        Simulator {
            config,
            strategy,
            capital: config.initial_capital,
            peak: config.initial_capital,
            open: None,
            trades: Vec::new(),
            equity: Vec::new(),
        }
    }

    fn step(&mut self, candle: &Candle, snapshot: &IndicatorSnapshot) {
        let closed_now = self.open.is_some() && self.check_exit(candle, snapshot);
        if self.open.is_none() && !closed_now {
            self.check_entry(candle, snapshot);
        }
        self.record_equity(candle);
    }

    /// Returns whether the open trade was closed on this candle.
    fn check_exit(&mut self, candle: &Candle, snapshot: &IndicatorSnapshot) -> bool {
        let Some(trade) = self.open.as_mut() else {
            return false;
        };

        let exit = if trade.stop_hit(candle.low, candle.high) {
            // a gap through the stop fills at the open
            let price = match trade.side {
                Side::Long => candle.open.min(trade.stop_loss),
                Side::Short => candle.open.max(trade.stop_loss),
            };
            let locked_in = trade.trail_percent.is_some() && trade.unrealized_pnl(price) > 0.0;
            let reason = if locked_in {
                ExitReason::TakeProfit
            } else {
                ExitReason::StopLoss
            };
            Some((price, reason))
        } else if let Some(target) = trade
            .take_profit
            .filter(|_| trade.target_hit(candle.low, candle.high))
        {
            let price = match trade.side {
                Side::Long => candle.open.max(target),
                Side::Short => candle.open.min(target),
            };
            Some((price, ExitReason::TakeProfit))
        } else if self
            .strategy
            .exit_rules()
            .any(|r| r.condition.evaluate(snapshot))
        {
            Some((candle.close, ExitReason::Signal))
        } else {
            trade.trail(candle.low, candle.high);
            None
        };

        match exit {
            Some((price, reason)) => {
                self.close(candle.timestamp, price, reason);
                true
            }
            None => false,
        }
    }

    fn close(&mut self, time: DateTime<Utc>, price: f64, reason: ExitReason) {
        let Some(mut trade) = self.open.take() else {
            return;
        };
        let pnl = trade.close(time, price, reason);
        self.capital += pnl;
        tracing::debug!(
            trade = %trade.id,
            side = %trade.side,
            exit_price = price,
            pnl,
            reason = %reason,
            "closed trade"
        );
        self.trades.push(trade);
    }

    fn check_entry(&mut self, candle: &Candle, snapshot: &IndicatorSnapshot) {
        let mut score: f64 = 0.0;
        let mut side = None;
        for rule in self.strategy.entry_rules() {
            if rule.condition.evaluate(snapshot) {
                score += rule.weight;
                if side.is_none() {
                    side = rule.action.side();
                }
            }
        }

        let Some(side) = side else {
            return;
        };
        if score < self.config.entry_threshold {
            return;
        }

        let entry_price = candle.close;
        let capital = self.capital * self.config.position_size / 100.0;
        if entry_price <= 0.0 || capital <= 0.0 {
            return;
        }
        let Some(stop_loss) = self.stop_price(side, entry_price, snapshot) else {
            return;
        };

        let sign = side.sign();
        let initial_risk = (entry_price - stop_loss).abs();
        let (take_profit, trail_percent) = match self.strategy.take_profit {
            TakeProfitRule::FixedPercent(p) => (Some(entry_price * (1.0 + sign * p / 100.0)), None),
            TakeProfitRule::RiskReward(ratio) => {
                (Some(entry_price + sign * ratio * initial_risk), None)
            }
            TakeProfitRule::Trailing(p) => (None, Some(p)),
        };

        let trade = Trade {
            id: format!("trade_{}", self.trades.len() + 1),
            side,
            entry_time: candle.timestamp,
            entry_price,
            exit_time: None,
            exit_price: None,
            size: capital / entry_price,
            capital,
            stop_loss,
            initial_risk,
            take_profit,
            trail_percent,
            status: TradeStatus::Open,
            pnl: 0.0,
            pnl_percent: 0.0,
            exit_reason: None,
            entry_snapshot: snapshot.clone(),
        };
        tracing::debug!(
            trade = %trade.id,
            side = %side,
            entry_price,
            stop_loss,
            score,
            "opened trade"
        );
        self.open = Some(trade);
    }

    /// Stop for a new trade; `None` when the rule cannot be applied yet.
    fn stop_price(&self, side: Side, entry: f64, snapshot: &IndicatorSnapshot) -> Option<f64> {
        let sign = side.sign();
        let stop = match self.strategy.stop_loss {
            StopLossRule::FixedPercent(p) => entry * (1.0 - sign * p / 100.0),
            StopLossRule::Atr { multiplier } => {
                let atr = snapshot.atr.filter(|a| *a > 0.0)?;
                entry - sign * multiplier * atr
            }
            StopLossRule::SupportLevel {
                buffer_percent,
                min_distance_percent,
            } => {
                let buffered = |level: f64| level * (1.0 - sign * buffer_percent / 100.0);
                let min_distance = entry * (1.0 - sign * min_distance_percent / 100.0);
                match side {
                    Side::Long => {
                        let support = snapshot
                            .nearest_support
                            .unwrap_or(entry * (1.0 - FALLBACK_LEVEL_PERCENT / 100.0));
                        buffered(support).min(min_distance)
                    }
                    Side::Short => {
                        let resistance = snapshot
                            .nearest_resistance
                            .unwrap_or(entry * (1.0 + FALLBACK_LEVEL_PERCENT / 100.0));
                        buffered(resistance).max(min_distance)
                    }
                }
            }
        };
        let on_loss_side = (entry - stop) * sign > 0.0;
        (stop.is_finite() && stop > 0.0 && on_loss_side).then_some(stop)
    }

    fn record_equity(&mut self, candle: &Candle) {
        let unrealized = self
            .open
            .as_ref()
            .map_or(0.0, |t| t.unrealized_pnl(candle.close));
        let equity = self.capital + unrealized;
        self.peak = self.peak.max(equity);
        let drawdown = (self.peak - equity).max(0.0);
        let drawdown_percent = if self.peak > 0.0 {
            drawdown / self.peak * 100.0
        } else {
            0.0
        };
        self.equity.push(EquityPoint {
            timestamp: candle.timestamp,
            equity,
            drawdown,
            drawdown_percent,
        });
    }

    fn finish(mut self, last: &Candle) -> (Vec<Trade>, Vec<EquityPoint>) {
        if self.open.is_some() {
            self.close(last.timestamp, last.close, ExitReason::EndOfPeriod);
        }
        (self.trades, self.equity)
    }
}

/// Replay `strategy` over `candles` (restricted to the configured date
/// range). A run with no entries is a valid result with zero trades.
pub fn run_backtest(
    config: &BacktestConfig,
    strategy: &Strategy,
    candles: &[Candle],
    clock: &dyn Clock,
) -> Result<BacktestResult, CallerError> {
    config.validate()?;
    strategy.validate()?;

    if !is_chronological(candles) {
        return Err(CallerError::DataSource {
            reason: format!(
                "candles for {} {} are not in strictly increasing time order",
                config.symbol, config.timeframe
            ),
        });
    }

    let window: Vec<Candle> = candles
        .iter()
        .filter(|c| config.start.is_none_or(|s| c.timestamp >= s))
        .filter(|c| config.end.is_none_or(|e| c.timestamp <= e))
        .copied()
        .collect();
    let Some(last) = window.last().copied() else {
        return Err(CallerError::NoData {
            symbol: config.symbol.clone(),
            timeframe: config.timeframe.to_string(),
        });
    };

    let series = SnapshotSeries::new(&window, strategy.needs_levels());
    let mut sim = Simulator::new(config, strategy);
    for (i, candle) in window.iter().enumerate() {
        if let Some(snapshot) = series.at(i) {
            sim.step(candle, &snapshot);
        }
    }
    let (trades, equity) = sim.finish(&last);

    let metrics = Metrics::compute(&trades, &equity, config.initial_capital, config.annualization);
    let analysis = StrategyInsights::analyze(&trades, &metrics, config.timeframe);

    tracing::info!(
        symbol = %config.symbol,
        strategy = %strategy.name,
        candles = window.len(),
        trades = metrics.total_trades,
        win_rate = metrics.win_rate,
        "backtest complete"
    );

    Ok(BacktestResult {
        config: config.clone(),
        strategy_name: strategy.name.clone(),
        trades,
        metrics,
        equity,
        analysis,
        timestamp: clock.now(),
    })
}
