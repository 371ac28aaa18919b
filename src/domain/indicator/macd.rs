//! MACD (Moving Average Convergence Divergence).
//!
//! MACD line = EMA(fast) - EMA(slow)
//! Signal line = EMA(signal) of the MACD line
//! Histogram = MACD line - signal line
//!
//! Warmup: slow - 1 + signal - 1 points.

use crate::domain::candle::Candle;
use crate::domain::indicator::{
    IndicatorPoint, IndicatorSeries, IndicatorType, IndicatorValue, ema_values,
};
use serde::{Deserialize, Serialize};
use std::fmt;

pub const DEFAULT_FAST: usize = 12;
pub const DEFAULT_SLOW: usize = 26;
pub const DEFAULT_SIGNAL: usize = 9;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MacdTrend {
    Bullish,
    Bearish,
    Neutral,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MacdCrossover {
    BullishCross,
    BearishCross,
}

impl MacdCrossover {
    /// Sign flip of the histogram between two consecutive points.
    pub fn between(prev_histogram: f64, histogram: f64) -> Option<Self> {
        if prev_histogram < 0.0 && histogram > 0.0 {
            Some(MacdCrossover::BullishCross)
        } else if prev_histogram > 0.0 && histogram < 0.0 {
            Some(MacdCrossover::BearishCross)
        } else {
            None
        }
    }
}

impl fmt::Display for MacdCrossover {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MacdCrossover::BullishCross => f.write_str("BULLISH_CROSS"),
            MacdCrossover::BearishCross => f.write_str("BEARISH_CROSS"),
        }
    }
}

impl MacdTrend {
    pub fn between(prev_histogram: f64, histogram: f64) -> Self {
        if histogram > 0.0 && histogram > prev_histogram {
            MacdTrend::Bullish
        } else if histogram < 0.0 && histogram < prev_histogram {
            MacdTrend::Bearish
        } else {
            MacdTrend::Neutral
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MacdResult {
    pub macd: f64,
    pub signal: f64,
    pub histogram: f64,
    pub trend: MacdTrend,
    pub crossover: Option<MacdCrossover>,
}

impl MacdResult {
    pub fn neutral() -> Self {
        MacdResult {
            macd: 0.0,
            signal: 0.0,
            histogram: 0.0,
            trend: MacdTrend::Neutral,
            crossover: None,
        }
    }

    pub fn description(&self) -> String {
        match (self.crossover, self.trend) {
            (Some(MacdCrossover::BullishCross), _) => {
                "MACD bullish crossover detected, potential buy signal".to_string()
            }
            (Some(MacdCrossover::BearishCross), _) => {
                "MACD bearish crossover detected, potential sell signal".to_string()
            }
            (None, MacdTrend::Bullish) => format!(
                "MACD bullish with histogram at {:.4}, momentum increasing",
                self.histogram
            ),
            (None, MacdTrend::Bearish) => format!(
                "MACD bearish with histogram at {:.4}, momentum decreasing",
                self.histogram
            ),
            (None, MacdTrend::Neutral) => {
                "MACD neutral, no clear momentum direction".to_string()
            }
        }
    }
}

/// Aligned (line, signal, histogram) triples; `None` during warmup.
pub fn macd_values(
    closes: &[f64],
    fast: usize,
    slow: usize,
    signal_period: usize,
) -> Vec<Option<(f64, f64, f64)>> {
    let mut out = vec![None; closes.len()];
    if fast == 0 || slow == 0 || signal_period == 0 {
        return out;
    }

    let ema_fast = ema_values(closes, fast);
    let ema_slow = ema_values(closes, slow);

    let line: Vec<Option<f64>> = ema_fast
        .iter()
        .zip(&ema_slow)
        .map(|(f, s)| Some((*f)? - (*s)?))
        .collect();

    let Some(line_start) = line.iter().position(Option::is_some) else {
        return out;
    };
    let defined: Vec<f64> = line[line_start..].iter().flatten().copied().collect();
    let signal = ema_values(&defined, signal_period);

    for (offset, sig) in signal.iter().enumerate() {
        if let Some(sig) = sig {
            let l = defined[offset];
            out[line_start + offset] = Some((l, *sig, l - sig));
        }
    }
    out
}

pub fn calculate_macd(
    candles: &[Candle],
    fast: usize,
    slow: usize,
    signal_period: usize,
) -> IndicatorSeries {
    let closes: Vec<f64> = candles.iter().map(|c| c.close).collect();
    let values = macd_values(&closes, fast, slow, signal_period)
        .into_iter()
        .zip(candles)
        .map(|(v, c)| {
            let (line, signal, histogram) = v.unwrap_or((0.0, 0.0, 0.0));
            IndicatorPoint {
                timestamp: c.timestamp,
                valid: v.is_some(),
                value: IndicatorValue::Macd {
                    line,
                    signal,
                    histogram,
                },
            }
        })
        .collect();

    IndicatorSeries {
        indicator_type: IndicatorType::Macd {
            fast,
            slow,
            signal: signal_period,
        },
        values,
    }
}

pub fn calculate_macd_default(candles: &[Candle]) -> IndicatorSeries {
    calculate_macd(candles, DEFAULT_FAST, DEFAULT_SLOW, DEFAULT_SIGNAL)
}

/// Latest MACD reading with trend and crossover. Zero periods, or fewer than
/// slow + signal closes (and never fewer than two), yield the all-zero
/// neutral sentinel.
pub fn analyze_macd(closes: &[f64], fast: usize, slow: usize, signal_period: usize) -> MacdResult {
    if fast == 0
        || slow == 0
        || signal_period == 0
        || closes.len() < 2
        || closes.len() < slow + signal_period
    {
        return MacdResult::neutral();
    }

    let values = macd_values(closes, fast, slow, signal_period);
    let n = values.len();
    let (Some((macd, signal, histogram)), Some((_, _, prev))) = (values[n - 1], values[n - 2])
    else {
        return MacdResult::neutral();
    };

    MacdResult {
        macd,
        signal,
        histogram,
        trend: MacdTrend::between(prev, histogram),
        crossover: MacdCrossover::between(prev, histogram),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::candle::fixtures::from_closes;

    #[test]
    fn warmup_boundary() {
        let closes: Vec<f64> = (0..40).map(|i| 100.0 + i as f64).collect();
        let series = calculate_macd_default(&from_closes(&closes));
        assert_eq!(series.values.len(), 40);
        assert_eq!(series.first_valid_index(), Some(26 - 1 + 9 - 1));
    }

    #[test]
    fn constant_prices_give_zero_histogram() {
        let closes = vec![50.0; 60];
        let macd = analyze_macd(&closes, 12, 26, 9);
        assert!(macd.macd.abs() < 1e-12);
        assert!(macd.histogram.abs() < 1e-12);
        assert_eq!(macd.trend, MacdTrend::Neutral);
        assert_eq!(macd.crossover, None);
    }

    #[test]
    fn insufficient_data_is_sentinel() {
        let closes = vec![1.0; 34];
        assert_eq!(analyze_macd(&closes, 12, 26, 9), MacdResult::neutral());
    }

    #[test]
    fn zero_periods_are_sentinel() {
        let neutral = MacdResult::neutral();
        assert_eq!(analyze_macd(&[], 0, 0, 0), neutral);
        assert_eq!(analyze_macd(&[100.0], 12, 0, 0), neutral);
        assert_eq!(analyze_macd(&[100.0], 1, 1, 0), neutral);
        assert_eq!(analyze_macd(&[100.0, 101.0], 0, 1, 1), neutral);
        assert_eq!(analyze_macd(&[100.0], 1, 1, 1), neutral);
    }

    #[test]
    fn line_matches_ema_difference() {
        let closes: Vec<f64> = (0..50).map(|i| 100.0 + (i as f64 * 0.3).sin() * 4.0).collect();
        let fast = ema_values(&closes, 12);
        let slow = ema_values(&closes, 26);
        let values = macd_values(&closes, 12, 26, 9);
        let (line, signal, hist) = values[49].unwrap();
        assert!((line - (fast[49].unwrap() - slow[49].unwrap())).abs() < 1e-12);
        assert!((hist - (line - signal)).abs() < 1e-12);
    }

    #[test]
    fn rally_is_bullish() {
        // flat then accelerating rally keeps the histogram positive and rising
        let mut closes = vec![100.0; 40];
        closes.extend((1..=10).map(|i| 100.0 + (i * i) as f64));
        let macd = analyze_macd(&closes, 12, 26, 9);
        assert!(macd.histogram > 0.0);
        assert_eq!(macd.trend, MacdTrend::Bullish);
    }

    #[test]
    fn crossover_is_exclusive() {
        assert_eq!(MacdCrossover::between(-0.5, 0.2), Some(MacdCrossover::BullishCross));
        assert_eq!(MacdCrossover::between(0.5, -0.2), Some(MacdCrossover::BearishCross));
        assert_eq!(MacdCrossover::between(0.0, 0.2), None);
        assert_eq!(MacdCrossover::between(0.1, 0.2), None);
    }

    #[test]
    fn trend_requires_momentum() {
        assert_eq!(MacdTrend::between(0.1, 0.2), MacdTrend::Bullish);
        assert_eq!(MacdTrend::between(0.3, 0.2), MacdTrend::Neutral);
        assert_eq!(MacdTrend::between(-0.1, -0.2), MacdTrend::Bearish);
    }

    #[test]
    fn description_prefers_crossover() {
        let mut macd = MacdResult::neutral();
        macd.crossover = Some(MacdCrossover::BullishCross);
        macd.trend = MacdTrend::Bullish;
        assert!(macd.description().starts_with("MACD bullish crossover"));
    }
}
