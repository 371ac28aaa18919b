//! Post-run strategy analysis: where a strategy's edge came from.

use super::indicator::{TrendDirection, rsi};
use super::metrics::Metrics;
use super::timeframe::Timeframe;
use super::trade::{Side, Trade};
use serde::{Deserialize, Serialize};

/// Entry volume ratio at or above this counts as high volume.
pub const HIGH_VOLUME_RATIO: f64 = 1.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RsiBand {
    Oversold,
    Neutral,
    Overbought,
}

impl RsiBand {
    pub fn of(value: f64) -> Self {
        if value < rsi::OVERSOLD {
            RsiBand::Oversold
        } else if value > rsi::OVERBOUGHT {
            RsiBand::Overbought
        } else {
            RsiBand::Neutral
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            RsiBand::Oversold => "Oversold (<30)",
            RsiBand::Neutral => "Neutral (30-70)",
            RsiBand::Overbought => "Overbought (>70)",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TimeframeStat {
    pub timeframe: Timeframe,
    pub win_rate: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RsiBandStat {
    pub band: RsiBand,
    pub trades: usize,
    pub win_rate: f64,
    pub avg_return: f64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct GroupStat {
    pub trades: usize,
    pub win_rate: f64,
}

impl GroupStat {
    fn of<'a>(trades: impl Iterator<Item = &'a Trade>) -> Self {
        let (mut total, mut wins) = (0usize, 0usize);
        for t in trades {
            total += 1;
            if t.is_win() {
                wins += 1;
            }
        }
        GroupStat {
            trades: total,
            win_rate: if total > 0 {
                wins as f64 / total as f64 * 100.0
            } else {
                0.0
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrategyInsights {
    pub best_timeframes: Vec<TimeframeStat>,
    /// Best win rate first.
    pub rsi_bands: Vec<RsiBandStat>,
    pub with_trend: GroupStat,
    pub against_trend: GroupStat,
    pub high_volume: GroupStat,
    pub low_volume: GroupStat,
    pub recommendations: Vec<String>,
}

fn with_trend(trade: &Trade) -> bool {
    matches!(
        (trade.side, trade.entry_snapshot.trend),
        (Side::Long, TrendDirection::Up) | (Side::Short, TrendDirection::Down)
    )
}

fn against_trend(trade: &Trade) -> bool {
    matches!(
        (trade.side, trade.entry_snapshot.trend),
        (Side::Long, TrendDirection::Down) | (Side::Short, TrendDirection::Up)
    )
}

fn rsi_band_stats(trades: &[Trade]) -> Vec<RsiBandStat> {
    let mut stats: Vec<RsiBandStat> = [RsiBand::Oversold, RsiBand::Neutral, RsiBand::Overbought]
        .into_iter()
        .filter_map(|band| {
            let in_band: Vec<&Trade> = trades
                .iter()
                .filter(|t| t.entry_snapshot.rsi.map(RsiBand::of) == Some(band))
                .collect();
            if in_band.is_empty() {
                return None;
            }
            let group = GroupStat::of(in_band.iter().copied());
            let avg_return =
                in_band.iter().map(|t| t.pnl_percent).sum::<f64>() / in_band.len() as f64;
            Some(RsiBandStat {
                band,
                trades: group.trades,
                win_rate: group.win_rate,
                avg_return,
            })
        })
        .collect();
    stats.sort_by(|a, b| b.win_rate.total_cmp(&a.win_rate));
    stats
}

impl StrategyInsights {
    pub fn analyze(trades: &[Trade], metrics: &Metrics, timeframe: Timeframe) -> Self {
        let rsi_bands = rsi_band_stats(trades);
        let with = GroupStat::of(trades.iter().filter(|t| with_trend(t)));
        let against = GroupStat::of(trades.iter().filter(|t| against_trend(t)));
        let is_high_volume = |t: &&Trade| {
            t.entry_snapshot
                .volume_ratio
                .is_some_and(|r| r >= HIGH_VOLUME_RATIO)
        };
        let high_volume = GroupStat::of(trades.iter().filter(is_high_volume));
        let low_volume = GroupStat::of(
            trades
                .iter()
                .filter(|t| t.entry_snapshot.volume_ratio.is_some() && !is_high_volume(t)),
        );

        let mut recommendations = Vec::new();
        if metrics.win_rate < 50.0 {
            recommendations
                .push("Consider tightening entry criteria or adjusting stop-loss levels".into());
        }
        if metrics.profit_factor < 1.5 {
            recommendations.push("Profit factor is low - review risk/reward ratio".into());
        }
        if with.win_rate > against.win_rate + 10.0 {
            recommendations.push("Trading with the trend shows significantly better results".into());
        }
        if let Some(best) = rsi_bands.first()
            && best.win_rate > 60.0
        {
            recommendations.push(format!(
                "{} RSI levels show best performance",
                best.band.label()
            ));
        }

        StrategyInsights {
            best_timeframes: vec![TimeframeStat {
                timeframe,
                win_rate: metrics.win_rate,
            }],
            rsi_bands,
            with_trend: with,
            against_trend: against,
            high_volume,
            low_volume,
            recommendations,
        }
    }
}
