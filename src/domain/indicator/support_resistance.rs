//! Support and resistance from clustered pivot points.
//!
//! A candle is a pivot high when its high strictly exceeds every other high
//! within `lookback` candles on each side (symmetric for lows). The latest
//! 20-candle high and low are added as anchors before clustering.

use crate::domain::candle::Candle;
use serde::{Deserialize, Serialize};

pub const DEFAULT_LOOKBACK: usize = 5;
pub const DEFAULT_CLUSTER_THRESHOLD: f64 = 0.02;
pub const NEAR_LEVEL_THRESHOLD: f64 = 0.02;
const ANCHOR_WINDOW: usize = 20;
const MAX_LEVELS: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PricePosition {
    NearSupport,
    NearResistance,
    MidRange,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SupportResistance {
    /// Ascending, at most five levels below price.
    pub support: Vec<f64>,
    /// Ascending, at most five levels above price.
    pub resistance: Vec<f64>,
    pub nearest_support: Option<f64>,
    pub nearest_resistance: Option<f64>,
    pub current_price: f64,
    pub position: PricePosition,
}

impl SupportResistance {
    fn empty(current_price: f64) -> Self {
        SupportResistance {
            support: Vec::new(),
            resistance: Vec::new(),
            nearest_support: None,
            nearest_resistance: None,
            current_price,
            position: PricePosition::MidRange,
        }
    }

    pub fn description(&self) -> String {
        let price = self.current_price;
        match (self.position, self.nearest_support, self.nearest_resistance) {
            (PricePosition::NearSupport, Some(s), r) => {
                let mut text = format!("Price at ${price} is near support at ${s:.2}");
                if let Some(r) = r {
                    text.push_str(&format!(", resistance at ${r:.2}"));
                }
                text
            }
            (PricePosition::NearResistance, s, Some(r)) => {
                let mut text = format!("Price at ${price} is near resistance at ${r:.2}");
                if let Some(s) = s {
                    text.push_str(&format!(", support at ${s:.2}"));
                }
                text
            }
            (_, Some(s), Some(r)) => format!(
                "Price at ${price} is mid-range between support ${s:.2} and resistance ${r:.2}"
            ),
            _ => format!("Price at ${price} is mid-range"),
        }
    }
}

pub fn find_pivots(candles: &[Candle], lookback: usize) -> (Vec<f64>, Vec<f64>) {
    let mut highs = Vec::new();
    let mut lows = Vec::new();
    if lookback == 0 || candles.len() < lookback * 2 + 1 {
        return (highs, lows);
    }

    for i in lookback..candles.len() - lookback {
        let current = &candles[i];
        let window = (i - lookback..=i + lookback).filter(|&j| j != i);
        let mut is_high = true;
        let mut is_low = true;
        for j in window {
            if candles[j].high >= current.high {
                is_high = false;
            }
            if candles[j].low <= current.low {
                is_low = false;
            }
        }
        if is_high {
            highs.push(current.high);
        }
        if is_low {
            lows.push(current.low);
        }
    }
    (highs, lows)
}

/// Sort levels, chain each into the current cluster while it is within
/// `threshold` (fractional) of the cluster's last member, and return the
/// ascending cluster means.
pub fn cluster_levels(levels: &[f64], threshold: f64) -> Vec<f64> {
    let mut sorted: Vec<f64> = levels.iter().copied().filter(|v| v.is_finite()).collect();
    sorted.sort_by(f64::total_cmp);

    let mut clusters: Vec<Vec<f64>> = Vec::new();
    for level in sorted {
        match clusters.last_mut() {
            Some(cluster) => {
                let prev = cluster[cluster.len() - 1];
                if prev != 0.0 && (level - prev) / prev <= threshold {
                    cluster.push(level);
                } else {
                    clusters.push(vec![level]);
                }
            }
            None => clusters.push(vec![level]),
        }
    }

    clusters
        .iter()
        .map(|c| c.iter().sum::<f64>() / c.len() as f64)
        .collect()
}

pub fn analyze_support_resistance(
    candles: &[Candle],
    lookback: usize,
    cluster_threshold: f64,
) -> SupportResistance {
    let current_price = candles.last().map(|c| c.close).unwrap_or(0.0);
    if lookback == 0 || candles.len() < lookback * 2 + 1 {
        return SupportResistance::empty(current_price);
    }

    let (mut highs, lows) = find_pivots(candles, lookback);
    let recent = &candles[candles.len().saturating_sub(ANCHOR_WINDOW)..];
    highs.push(recent.iter().map(|c| c.high).fold(f64::NEG_INFINITY, f64::max));
    highs.push(recent.iter().map(|c| c.low).fold(f64::INFINITY, f64::min));
    highs.extend(lows);

    let levels = cluster_levels(&highs, cluster_threshold);
    let support: Vec<f64> = levels.iter().copied().filter(|l| *l < current_price).collect();
    let resistance: Vec<f64> = levels.iter().copied().filter(|l| *l > current_price).collect();

    let nearest_support = support.last().copied();
    let nearest_resistance = resistance.first().copied();

    let position = match (nearest_support, nearest_resistance) {
        (Some(s), Some(r)) if current_price > 0.0 => {
            if (current_price - s) / current_price < NEAR_LEVEL_THRESHOLD {
                PricePosition::NearSupport
            } else if (r - current_price) / current_price < NEAR_LEVEL_THRESHOLD {
                PricePosition::NearResistance
            } else {
                PricePosition::MidRange
            }
        }
        _ => PricePosition::MidRange,
    };

    SupportResistance {
        support: support[support.len().saturating_sub(MAX_LEVELS)..].to_vec(),
        resistance: resistance.into_iter().take(MAX_LEVELS).collect(),
        nearest_support,
        nearest_resistance,
        current_price,
        position,
    }
}
