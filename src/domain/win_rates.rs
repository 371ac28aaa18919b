//! Historical win-rate providers for the confidence scorer.

use crate::domain::confidence::{HistoricalStats, MIN_HISTORICAL_SAMPLE};
use crate::domain::indicator::TrendDirection;
use crate::domain::timeframe::Timeframe;
use crate::domain::trade::{Side, Trade, TradeStatus};
use crate::ports::win_rate_port::{WinRateProvider, WinRateQuery};
use std::collections::HashMap;

/// Width of an RSI bucket in the ledger.
const RSI_BUCKET: f64 = 10.0;

fn rsi_bucket(rsi: f64) -> u8 {
    (rsi / RSI_BUCKET).floor().clamp(0.0, 9.0) as u8
}

fn aligned(side: Side, trend: TrendDirection) -> bool {
    matches!(
        (side, trend),
        (Side::Long, TrendDirection::Up) | (Side::Short, TrendDirection::Down)
    )
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct SetupKey {
    timeframe: Timeframe,
    side: Side,
    rsi_bucket: u8,
    with_trend: bool,
}

#[derive(Debug, Clone, Copy, Default)]
struct Tally {
    wins: usize,
    total: usize,
}

/// Win rates of closed backtest trades grouped by timeframe, side, entry
/// RSI bucket and trend alignment.
#[derive(Debug, Clone, Default)]
pub struct WinRateLedger {
    tallies: HashMap<SetupKey, Tally>,
}

impl WinRateLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add closed trades simulated on `timeframe`. Open trades and trades
    /// without an entry RSI are ignored.
    pub fn record(&mut self, timeframe: Timeframe, trades: &[Trade]) {
        for trade in trades {
            if trade.status == TradeStatus::Open {
                continue;
            }
            let Some(rsi) = trade.entry_snapshot.rsi else {
                continue;
            };
            let key = SetupKey {
                timeframe,
                side: trade.side,
                rsi_bucket: rsi_bucket(rsi),
                with_trend: aligned(trade.side, trade.entry_snapshot.trend),
            };
            let tally = self.tallies.entry(key).or_default();
            tally.total += 1;
            if trade.is_win() {
                tally.wins += 1;
            }
        }
    }

    pub fn len(&self) -> usize {
        self.tallies.values().map(|t| t.total).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl WinRateProvider for WinRateLedger {
    fn win_rate(&self, query: &WinRateQuery) -> Option<HistoricalStats> {
        let key = SetupKey {
            timeframe: query.timeframe,
            side: query.side,
            rsi_bucket: rsi_bucket(query.rsi),
            with_trend: aligned(query.side, query.trend),
        };
        let tally = self.tallies.get(&key)?;
        (tally.total > 0).then(|| HistoricalStats {
            win_rate: tally.wins as f64 / tally.total as f64 * 100.0,
            sample_size: tally.total,
        })
    }
}

/// Fixed priors by RSI extremity, used when no ledger is available.
/// Trend-aligned setups get +8 points.
#[derive(Debug, Clone, Copy, Default)]
pub struct RsiPriorWinRates;

impl WinRateProvider for RsiPriorWinRates {
    fn win_rate(&self, query: &WinRateQuery) -> Option<HistoricalStats> {
        let base = match query.side {
            Side::Long if query.rsi <= 20.0 => 72.0,
            Side::Long if query.rsi <= 30.0 => 64.0,
            Side::Long if query.rsi <= 40.0 => 56.0,
            Side::Short if query.rsi >= 80.0 => 68.0,
            Side::Short if query.rsi >= 70.0 => 61.0,
            Side::Short if query.rsi >= 60.0 => 54.0,
            _ => return None,
        };
        let bonus = if aligned(query.side, query.trend) {
            8.0
        } else {
            0.0
        };
        Some(HistoricalStats {
            win_rate: base + bonus,
            sample_size: MIN_HISTORICAL_SAMPLE,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::trade::ExitReason;
    use crate::domain::trade::fixtures::open_trade;

    fn closed(rsi: f64, trend: TrendDirection, exit: f64) -> Trade {
        let mut t = open_trade(Side::Long, 100.0, 95.0, Some(110.0));
        t.entry_snapshot.rsi = Some(rsi);
        t.entry_snapshot.trend = trend;
        t.close(t.entry_time, exit, ExitReason::Signal);
        t
    }

    fn query(rsi: f64, trend: TrendDirection) -> WinRateQuery {
        WinRateQuery {
            side: Side::Long,
            rsi,
            trend,
            timeframe: Timeframe::FourHours,
        }
    }

    #[test]
    fn ledger_groups_by_setup() {
        let mut ledger = WinRateLedger::new();
        ledger.record(
            Timeframe::FourHours,
            &[
                closed(25.0, TrendDirection::Up, 110.0),
                closed(22.0, TrendDirection::Up, 110.0),
                closed(28.0, TrendDirection::Up, 95.0),
                closed(28.0, TrendDirection::Down, 95.0),
                open_trade(Side::Long, 100.0, 95.0, None),
            ],
        );
        assert_eq!(ledger.len(), 4);

        let stats = ledger.win_rate(&query(21.0, TrendDirection::Up)).unwrap();
        assert_eq!(stats.sample_size, 3);
        assert!((stats.win_rate - 200.0 / 3.0).abs() < 1e-9);

        let against = ledger.win_rate(&query(29.0, TrendDirection::Down)).unwrap();
        assert_eq!(against.win_rate, 0.0);

        assert!(ledger.win_rate(&query(45.0, TrendDirection::Up)).is_none());
        let mut other_tf = query(25.0, TrendDirection::Up);
        other_tf.timeframe = Timeframe::OneDay;
        assert!(ledger.win_rate(&other_tf).is_none());
    }

    #[test]
    fn priors_reward_extremes_and_alignment() {
        let p = RsiPriorWinRates;
        assert_eq!(p.win_rate(&query(18.0, TrendDirection::Sideways)).unwrap().win_rate, 72.0);
        assert_eq!(p.win_rate(&query(30.0, TrendDirection::Up)).unwrap().win_rate, 72.0);
        assert!(p.win_rate(&query(50.0, TrendDirection::Up)).is_none());

        let short = WinRateQuery {
            side: Side::Short,
            rsi: 72.0,
            trend: TrendDirection::Down,
            timeframe: Timeframe::FourHours,
        };
        assert_eq!(p.win_rate(&short).unwrap().win_rate, 69.0);
    }
}
