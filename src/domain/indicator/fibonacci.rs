//! Fibonacci retracement and extension levels over a recent swing.

use crate::domain::candle::Candle;
use serde::{Deserialize, Serialize};

pub const DEFAULT_LOOKBACK: usize = 50;
pub const NEAR_LEVEL_PERCENT: f64 = 2.0;

pub const RETRACEMENT_RATIOS: [f64; 5] = [0.236, 0.382, 0.5, 0.618, 0.786];
pub const EXTENSION_RATIOS: [f64; 3] = [0.272, 0.414, 0.618];
const RETRACEMENT_LABELS: [&str; 5] = ["23.6%", "38.2%", "50%", "61.8%", "78.6%"];
const EXTENSION_LABELS: [&str; 3] = ["127.2%", "141.4%", "161.8%"];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FibonacciAnalysis {
    pub swing_high: f64,
    pub swing_low: f64,
    /// high - range * ratio, in `RETRACEMENT_RATIOS` order.
    pub retracements: [f64; 5],
    /// high + range * ratio, in `EXTENSION_RATIOS` order.
    pub extensions: [f64; 3],
    pub price: f64,
    pub nearest_level: f64,
    pub nearest_label: String,
    /// Signed distance of price from the nearest level, in percent of it.
    pub distance_percent: f64,
}

impl FibonacciAnalysis {
    pub fn range(&self) -> f64 {
        self.swing_high - self.swing_low
    }

    pub fn is_near_level(&self, threshold_percent: f64) -> bool {
        self.distance_percent.abs() <= threshold_percent
    }

    /// Highest retracement level strictly below `price`, if any.
    pub fn retracement_below(&self, price: f64) -> Option<f64> {
        self.retracements
            .iter()
            .copied()
            .filter(|l| *l < price)
            .fold(None, |acc: Option<f64>, l| Some(acc.map_or(l, |a| a.max(l))))
    }

    /// Lowest retracement level strictly above `price`, if any.
    pub fn retracement_above(&self, price: f64) -> Option<f64> {
        self.retracements
            .iter()
            .copied()
            .filter(|l| *l > price)
            .fold(None, |acc: Option<f64>, l| Some(acc.map_or(l, |a| a.min(l))))
    }

    pub fn description(&self) -> String {
        if self.is_near_level(NEAR_LEVEL_PERCENT) {
            let sign = if self.distance_percent > 0.0 { "+" } else { "" };
            return format!(
                "Near Fib {} level ({sign}{:.1}%)",
                self.nearest_label, self.distance_percent
            );
        }
        let [r236, r382, r500, r618, _] = self.retracements;
        if self.price >= r236 {
            "Above Fib 23.6% retracement, strong uptrend".to_string()
        } else if self.price >= r382 {
            "Between Fib 23.6-38.2%, healthy pullback".to_string()
        } else if self.price >= r500 {
            "At Fib 50% retracement, key decision zone".to_string()
        } else if self.price >= r618 {
            "At Fib 61.8% golden ratio, critical support".to_string()
        } else {
            "Below Fib 61.8%, deep retracement".to_string()
        }
    }
}

/// `None` when fewer than `lookback` candles are available.
pub fn analyze_fibonacci(candles: &[Candle], lookback: usize) -> Option<FibonacciAnalysis> {
    if lookback == 0 || candles.len() < lookback {
        return None;
    }

    let recent = &candles[candles.len() - lookback..];
    let swing_high = recent.iter().map(|c| c.high).fold(f64::NEG_INFINITY, f64::max);
    let swing_low = recent.iter().map(|c| c.low).fold(f64::INFINITY, f64::min);
    let range = swing_high - swing_low;
    let price = candles[candles.len() - 1].close;

    let retracements = RETRACEMENT_RATIOS.map(|r| swing_high - range * r);
    let extensions = EXTENSION_RATIOS.map(|r| swing_high + range * r);

    let candidates = retracements
        .iter()
        .zip(RETRACEMENT_LABELS)
        .chain(extensions.iter().zip(EXTENSION_LABELS))
        .map(|(l, name)| (*l, name))
        .chain([(swing_high, "0%"), (swing_low, "100%")]);

    let mut nearest_level = swing_high;
    let mut nearest_label = "0%";
    let mut min_distance = f64::INFINITY;
    for (level, label) in candidates {
        let distance = (price - level).abs();
        if distance < min_distance {
            min_distance = distance;
            nearest_level = level;
            nearest_label = label;
        }
    }

    let distance_percent = if nearest_level != 0.0 {
        (price - nearest_level) / nearest_level * 100.0
    } else {
        0.0
    };

    Some(FibonacciAnalysis {
        swing_high,
        swing_low,
        retracements,
        extensions,
        price,
        nearest_level,
        nearest_label: nearest_label.to_string(),
        distance_percent,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::candle::fixtures::candle;
    use approx::assert_relative_eq;

    /// 50 candles spanning low 100 to high 200, closing at `last_close`.
    fn swing(last_close: f64) -> Vec<Candle> {
        let mut candles: Vec<Candle> = (0..50)
            .map(|i| candle(i, 150.0, 160.0, 140.0, 150.0, 1000.0))
            .collect();
        candles[10].low = 100.0;
        candles[30].high = 200.0;
        candles[49].close = last_close;
        candles
    }

    #[test]
    fn levels() {
        let fib = analyze_fibonacci(&swing(150.0), 50).unwrap();
        assert_relative_eq!(fib.range(), 100.0);
        assert_relative_eq!(fib.retracements[0], 176.4, epsilon = 1e-9);
        assert_relative_eq!(fib.retracements[2], 150.0, epsilon = 1e-9);
        assert_relative_eq!(fib.retracements[4], 121.4, epsilon = 1e-9);
        assert_relative_eq!(fib.extensions[0], 227.2, epsilon = 1e-9);
        assert_relative_eq!(fib.extensions[2], 261.8, epsilon = 1e-9);
    }

    #[test]
    fn nearest_level_and_distance() {
        let fib = analyze_fibonacci(&swing(139.0), 50).unwrap();
        // 61.8% level is 138.2
        assert_eq!(fib.nearest_label, "61.8%");
        assert_relative_eq!(fib.nearest_level, 138.2, epsilon = 1e-9);
        assert_relative_eq!(fib.distance_percent, 0.8 / 138.2 * 100.0, epsilon = 1e-9);
        assert!(fib.is_near_level(2.0));
        assert_eq!(fib.description(), "Near Fib 61.8% level (+0.6%)");
    }

    #[test]
    fn endpoints_are_candidates() {
        let fib = analyze_fibonacci(&swing(101.0), 50).unwrap();
        assert_eq!(fib.nearest_label, "100%");
    }

    #[test]
    fn retracement_neighbours() {
        let fib = analyze_fibonacci(&swing(145.0), 50).unwrap();
        assert_relative_eq!(fib.retracement_below(145.0).unwrap(), 138.2, epsilon = 1e-9);
        assert_relative_eq!(fib.retracement_above(145.0).unwrap(), 150.0, epsilon = 1e-9);
        assert_eq!(fib.retracement_below(110.0), None);
    }

    #[test]
    fn insufficient_history() {
        let candles = swing(150.0);
        assert!(analyze_fibonacci(&candles[..49], 50).is_none());
    }
}
