//! RSI (Relative Strength Index) with Wilder's smoothing.
//!
//! - First average: simple mean of gains/losses over the first n changes
//! - Subsequent: avg = (prev_avg * (n-1) + current) / n
//!
//! RSI = 100 - 100 / (1 + RS). A zero average loss is treated as RS = 100,
//! so a one-way rally saturates just under 100 instead of dividing by zero.
//!
//! Warmup: the first n points are invalid (n changes are needed).

use crate::domain::candle::Candle;
use crate::domain::indicator::{IndicatorSeries, IndicatorType, series_from_values};
use serde::{Deserialize, Serialize};

pub const DEFAULT_PERIOD: usize = 14;
pub const OVERSOLD: f64 = 30.0;
pub const OVERBOUGHT: f64 = 70.0;
pub const DIVERGENCE_LOOKBACK: usize = 10;

/// RS used when the average loss is zero.
const RS_CAP: f64 = 100.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RsiSignal {
    Oversold,
    Overbought,
    Neutral,
}

impl RsiSignal {
    pub fn classify(value: f64) -> Self {
        if value <= OVERSOLD {
            RsiSignal::Oversold
        } else if value >= OVERBOUGHT {
            RsiSignal::Overbought
        } else {
            RsiSignal::Neutral
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RsiDivergence {
    Bullish,
    Bearish,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RsiResult {
    pub value: f64,
    pub signal: RsiSignal,
    pub divergence: Option<RsiDivergence>,
}

impl RsiResult {
    pub fn neutral() -> Self {
        RsiResult {
            value: 50.0,
            signal: RsiSignal::Neutral,
            divergence: None,
        }
    }

    pub fn description(&self) -> String {
        let value = round2(self.value);
        match self.signal {
            RsiSignal::Oversold => {
                let tail = if self.divergence == Some(RsiDivergence::Bullish) {
                    "with bullish divergence forming, potential reversal signal"
                } else {
                    "watch for bounce or continued weakness"
                };
                format!("RSI at {value} indicates oversold conditions, {tail}")
            }
            RsiSignal::Overbought => {
                let tail = if self.divergence == Some(RsiDivergence::Bearish) {
                    "with bearish divergence forming, potential reversal signal"
                } else {
                    "watch for pullback or momentum continuation"
                };
                format!("RSI at {value} indicates overbought conditions, {tail}")
            }
            RsiSignal::Neutral if self.value > 50.0 => {
                format!("RSI at {value} is neutral with slight bullish bias")
            }
            RsiSignal::Neutral if self.value < 50.0 => {
                format!("RSI at {value} is neutral with slight bearish bias")
            }
            RsiSignal::Neutral => format!("RSI at {value} is neutral"),
        }
    }
}

fn rsi_from_averages(avg_gain: f64, avg_loss: f64) -> f64 {
    let rs = if avg_loss == 0.0 {
        RS_CAP
    } else {
        avg_gain / avg_loss
    };
    100.0 - 100.0 / (1.0 + rs)
}

/// Aligned RSI of `closes`; `None` for the first `period` points.
pub fn rsi_values(closes: &[f64], period: usize) -> Vec<Option<f64>> {
    let mut out = vec![None; closes.len()];
    if period == 0 || closes.len() < period + 1 {
        return out;
    }

    let changes: Vec<f64> = closes.windows(2).map(|w| w[1] - w[0]).collect();
    let gain = |c: f64| if c > 0.0 { c } else { 0.0 };
    let loss = |c: f64| if c < 0.0 { -c } else { 0.0 };

    let mut avg_gain = changes[..period].iter().map(|&c| gain(c)).sum::<f64>() / period as f64;
    let mut avg_loss = changes[..period].iter().map(|&c| loss(c)).sum::<f64>() / period as f64;
    out[period] = Some(rsi_from_averages(avg_gain, avg_loss));

    for (offset, &change) in changes.iter().enumerate().skip(period) {
        avg_gain = (avg_gain * (period - 1) as f64 + gain(change)) / period as f64;
        avg_loss = (avg_loss * (period - 1) as f64 + loss(change)) / period as f64;
        out[offset + 1] = Some(rsi_from_averages(avg_gain, avg_loss));
    }
    out
}

pub fn calculate_rsi(candles: &[Candle], period: usize) -> IndicatorSeries {
    let closes: Vec<f64> = candles.iter().map(|c| c.close).collect();
    series_from_values(
        IndicatorType::Rsi(period),
        candles.iter().map(|c| c.timestamp),
        &rsi_values(&closes, period),
    )
}

/// Latest RSI with signal and divergence. Short input yields the neutral
/// 50 sentinel.
pub fn analyze_rsi(closes: &[f64], period: usize) -> RsiResult {
    let series = rsi_values(closes, period);
    let Some(value) = series.last().copied().flatten() else {
        return RsiResult::neutral();
    };

    let history: Vec<f64> = series.iter().flatten().copied().collect();
    RsiResult {
        value,
        signal: RsiSignal::classify(value),
        divergence: detect_divergence(closes, &history, DIVERGENCE_LOOKBACK),
    }
}

/// Compare the two halves of the last `lookback` points: a lower price low
/// with a higher RSI low below 40 is bullish; a higher price high with a
/// lower RSI high above 60 is bearish.
pub fn detect_divergence(
    prices: &[f64],
    rsi_history: &[f64],
    lookback: usize,
) -> Option<RsiDivergence> {
    if lookback < 2 || prices.len() < lookback || rsi_history.len() < lookback {
        return None;
    }

    let recent_prices = &prices[prices.len() - lookback..];
    let recent_rsi = &rsi_history[rsi_history.len() - lookback..];
    let half = lookback / 2;

    let (p1, p2) = recent_prices.split_at(half);
    let (r1, r2) = recent_rsi.split_at(half);

    if min(p2) < min(p1) && min(r2) > min(r1) && min(r2) < 40.0 {
        return Some(RsiDivergence::Bullish);
    }
    if max(p2) > max(p1) && max(r2) < max(r1) && max(r2) > 60.0 {
        return Some(RsiDivergence::Bearish);
    }
    None
}

fn min(values: &[f64]) -> f64 {
    values.iter().copied().fold(f64::INFINITY, f64::min)
}

fn max(values: &[f64]) -> f64 {
    values.iter().copied().fold(f64::NEG_INFINITY, f64::max)
}

fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}
