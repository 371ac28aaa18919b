//! Per-candle indicator snapshots for replaying history.
//!
//! [`SnapshotSeries`] computes every aligned indicator series once and then
//! answers "what did the indicators read at candle i" without recomputing
//! prefixes. A snapshot at `i` matches what the latest-value analyses would
//! report for `candles[..=i]`.

use crate::domain::candle::Candle;
use crate::domain::indicator::{
    IndicatorSeries, IndicatorType, PricePosition, TrendDirection, analyze_support_resistance,
    calculate_atr, calculate_ema, calculate_macd, calculate_rsi, classify_trend, macd, rsi,
    support_resistance, volume,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

pub const ATR_PERIOD: usize = 14;
const TREND_EMAS: [usize; 3] = [20, 50, 200];

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MacdReading {
    pub line: f64,
    pub signal: f64,
    pub histogram: f64,
}

/// Indicator readings at one candle. `None` marks an indicator still in
/// warmup; conditions over it evaluate to false.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndicatorSnapshot {
    pub timestamp: DateTime<Utc>,
    pub price: f64,
    pub volume: f64,
    pub rsi: Option<f64>,
    pub macd: Option<MacdReading>,
    pub prev_histogram: Option<f64>,
    pub trend: TrendDirection,
    /// Current volume over the trailing average excluding it.
    pub volume_ratio: Option<f64>,
    pub atr: Option<f64>,
    /// Only computed when levels were requested.
    pub price_position: Option<PricePosition>,
    pub nearest_support: Option<f64>,
    pub nearest_resistance: Option<f64>,
}

impl IndicatorSnapshot {
    /// Price and volume only, every indicator absent.
    pub fn bare(timestamp: DateTime<Utc>, price: f64, volume: f64) -> Self {
        IndicatorSnapshot {
            timestamp,
            price,
            volume,
            rsi: None,
            macd: None,
            prev_histogram: None,
            trend: TrendDirection::Sideways,
            volume_ratio: None,
            atr: None,
            price_position: None,
            nearest_support: None,
            nearest_resistance: None,
        }
    }
}

pub struct SnapshotSeries<'a> {
    candles: &'a [Candle],
    closes: Vec<f64>,
    /// Prefix sums, one longer than `candles`.
    close_sums: Vec<f64>,
    volume_sums: Vec<f64>,
    indicators: HashMap<IndicatorType, IndicatorSeries>,
    with_levels: bool,
}

fn prefix_sums(values: impl Iterator<Item = f64>) -> Vec<f64> {
    let mut sums = vec![0.0];
    let mut total = 0.0;
    for v in values {
        total += v;
        sums.push(total);
    }
    sums
}

impl<'a> SnapshotSeries<'a> {
    /// `with_levels` enables per-candle support/resistance, which rescans
    /// the prefix at every candle.
    pub fn new(candles: &'a [Candle], with_levels: bool) -> Self {
        let mut indicators = HashMap::new();
        let series = [
            calculate_rsi(candles, rsi::DEFAULT_PERIOD),
            calculate_macd(
                candles,
                macd::DEFAULT_FAST,
                macd::DEFAULT_SLOW,
                macd::DEFAULT_SIGNAL,
            ),
            calculate_atr(candles, ATR_PERIOD),
        ];
        for s in series
            .into_iter()
            .chain(TREND_EMAS.iter().map(|p| calculate_ema(candles, *p)))
        {
            indicators.insert(s.indicator_type, s);
        }

        SnapshotSeries {
            candles,
            closes: candles.iter().map(|c| c.close).collect(),
            close_sums: prefix_sums(candles.iter().map(|c| c.close)),
            volume_sums: prefix_sums(candles.iter().map(|c| c.volume)),
            indicators,
            with_levels,
        }
    }

    pub fn len(&self) -> usize {
        self.candles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candles.is_empty()
    }

    fn simple(&self, indicator_type: IndicatorType, index: usize) -> Option<f64> {
        self.indicators.get(&indicator_type)?.simple_at(index)
    }

    fn macd(&self, index: usize) -> Option<(f64, f64, f64)> {
        let key = IndicatorType::Macd {
            fast: macd::DEFAULT_FAST,
            slow: macd::DEFAULT_SLOW,
            signal: macd::DEFAULT_SIGNAL,
        };
        self.indicators.get(&key)?.macd_at(index)
    }

    /// EMA at `index`, or the mean of the prefix while it is shorter than
    /// the period.
    fn ema_at(&self, period: usize, index: usize) -> f64 {
        let prefix_mean = self.close_sums[index + 1] / (index + 1) as f64;
        if index + 1 < period {
            return prefix_mean;
        }
        self.simple(IndicatorType::Ema(period), index)
            .unwrap_or(prefix_mean)
    }

    fn volume_ratio(&self, index: usize) -> Option<f64> {
        if index == 0 {
            return None;
        }
        let start = (index + 1).saturating_sub(volume::DEFAULT_LOOKBACK);
        let average = (self.volume_sums[index] - self.volume_sums[start]) / (index - start) as f64;
        let current = self.candles[index].volume;
        Some(if average > 0.0 { current / average } else { 1.0 })
    }

    pub fn at(&self, index: usize) -> Option<IndicatorSnapshot> {
        let candle = self.candles.get(index)?;
        let mut snapshot = IndicatorSnapshot::bare(candle.timestamp, candle.close, candle.volume);

        snapshot.rsi = self.simple(IndicatorType::Rsi(rsi::DEFAULT_PERIOD), index);
        snapshot.macd = self.macd(index).map(|(line, signal, histogram)| MacdReading {
            line,
            signal,
            histogram,
        });
        snapshot.prev_histogram = index
            .checked_sub(1)
            .and_then(|prev| self.macd(prev))
            .map(|(_, _, h)| h);
        snapshot.atr = self.simple(IndicatorType::Atr(ATR_PERIOD), index);
        snapshot.volume_ratio = self.volume_ratio(index);

        let emas = TREND_EMAS.map(|p| self.ema_at(p, index));
        snapshot.trend = classify_trend(&self.closes[..=index], emas).direction;

        if self.with_levels && index + 1 > support_resistance::DEFAULT_LOOKBACK * 2 {
            let levels = analyze_support_resistance(
                &self.candles[..=index],
                support_resistance::DEFAULT_LOOKBACK,
                support_resistance::DEFAULT_CLUSTER_THRESHOLD,
            );
            snapshot.price_position = Some(levels.position);
            snapshot.nearest_support = levels.nearest_support;
            snapshot.nearest_resistance = levels.nearest_resistance;
        }

        Some(snapshot)
    }
}
