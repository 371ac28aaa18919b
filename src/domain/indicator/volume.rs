//! Volume confirmation of the latest price move.
//!
//! The current candle's volume is compared with the trailing average of the
//! window excluding it. Price up on rising volume confirms a rally, price
//! down on rising volume confirms a sell-off, and a rally on falling volume
//! is a divergence.

use crate::domain::candle::Candle;
use serde::{Deserialize, Serialize};

pub const DEFAULT_LOOKBACK: usize = 20;
const STRONG_RATIO: f64 = 1.5;
const SPIKE_RATIO: f64 = 2.0;
const THIN_RATIO: f64 = 0.5;
const TREND_BAND: f64 = 0.2;
const TREND_WINDOW: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VolumeConfirmation {
    Strong,
    Moderate,
    Weak,
    Divergence,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VolumeTrend {
    Increasing,
    Decreasing,
    Stable,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VolumeAnalysis {
    pub average_volume: f64,
    pub current_volume: f64,
    /// current / trailing average; 1 when the average is zero.
    pub ratio: f64,
    pub trend: VolumeTrend,
    pub confirmation: VolumeConfirmation,
    pub price_up: bool,
}

impl VolumeAnalysis {
    pub fn insufficient() -> Self {
        VolumeAnalysis {
            average_volume: 0.0,
            current_volume: 0.0,
            ratio: 1.0,
            trend: VolumeTrend::Stable,
            confirmation: VolumeConfirmation::Weak,
            price_up: false,
        }
    }

    pub fn is_divergent(&self) -> bool {
        self.confirmation == VolumeConfirmation::Divergence
    }

    /// Confidence adjustment in [-20, 20] for a trade on the given side.
    pub fn score(&self, long: bool) -> f64 {
        let mut score: f64 = match self.confirmation {
            VolumeConfirmation::Strong => 15.0,
            VolumeConfirmation::Moderate => 8.0,
            VolumeConfirmation::Weak => 2.0,
            VolumeConfirmation::Divergence => -10.0,
        };
        if self.ratio > SPIKE_RATIO {
            score += 5.0;
        } else if self.ratio < THIN_RATIO {
            score -= 5.0;
        }
        match (self.trend, long) {
            (VolumeTrend::Increasing, true) | (VolumeTrend::Decreasing, false) => score += 3.0,
            _ => {}
        }
        score.clamp(-20.0, 20.0)
    }

    pub fn description(&self) -> String {
        let (side, title) = if self.price_up {
            ("bullish", "Bullish")
        } else {
            ("bearish", "Bearish")
        };
        match self.confirmation {
            VolumeConfirmation::Strong if self.ratio > SPIKE_RATIO => format!(
                "Strong {side} confirmation, volume spike {:.1}x average",
                self.ratio
            ),
            VolumeConfirmation::Strong => {
                format!("{title} confirmation, volume {:.1}x average", self.ratio)
            }
            VolumeConfirmation::Moderate => format!("Moderate {side} confirmation"),
            VolumeConfirmation::Divergence => {
                "Bearish divergence, price up but volume declining".to_string()
            }
            VolumeConfirmation::Weak if self.average_volume == 0.0 => {
                "Insufficient volume data".to_string()
            }
            VolumeConfirmation::Weak => "Weak signal, low volume decline".to_string(),
        }
    }
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        0.0
    } else {
        values.iter().sum::<f64>() / values.len() as f64
    }
}

pub fn analyze_volume(candles: &[Candle], lookback: usize) -> VolumeAnalysis {
    if candles.len() < 2 || lookback < 2 {
        return VolumeAnalysis::insufficient();
    }

    let window = &candles[candles.len().saturating_sub(lookback)..];
    let volumes: Vec<f64> = window.iter().map(|c| c.volume).collect();
    let current_volume = volumes[volumes.len() - 1];
    let average_volume = mean(&volumes[..volumes.len() - 1]);
    let ratio = if average_volume > 0.0 {
        current_volume / average_volume
    } else {
        1.0
    };

    let recent = &volumes[volumes.len().saturating_sub(TREND_WINDOW)..];
    let older_end = volumes.len().saturating_sub(TREND_WINDOW);
    let older = &volumes[older_end.saturating_sub(TREND_WINDOW)..older_end];
    let (recent_avg, older_avg) = (mean(recent), mean(older));
    let trend = if older.is_empty() {
        VolumeTrend::Stable
    } else if recent_avg > older_avg * (1.0 + TREND_BAND) {
        VolumeTrend::Increasing
    } else if recent_avg < older_avg * (1.0 - TREND_BAND) {
        VolumeTrend::Decreasing
    } else {
        VolumeTrend::Stable
    };

    let last = candles[candles.len() - 1].close;
    let prev = candles[candles.len() - 2].close;
    let price_up = last > prev;
    let volume_up = ratio > 1.0;

    let confirmation = match (price_up, volume_up) {
        (_, true) if ratio > STRONG_RATIO => VolumeConfirmation::Strong,
        (_, true) => VolumeConfirmation::Moderate,
        (true, false) => VolumeConfirmation::Divergence,
        (false, false) => VolumeConfirmation::Weak,
    };

    VolumeAnalysis {
        average_volume,
        current_volume,
        ratio,
        trend,
        confirmation,
        price_up,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::candle::fixtures::candle;

    /// 20 candles at volume 1000 with the final candle's close and volume set.
    fn with_last(close: f64, volume: f64) -> Vec<Candle> {
        let mut candles: Vec<Candle> = (0..20)
            .map(|i| candle(i, 100.0, 101.0, 99.0, 100.0, 1000.0))
            .collect();
        candles[19].close = close;
        candles[19].volume = volume;
        candles
    }

    #[test]
    fn spike_on_rally_is_strong() {
        let v = analyze_volume(&with_last(102.0, 2500.0), 20);
        assert!((v.ratio - 2.5).abs() < 1e-12);
        assert_eq!(v.confirmation, VolumeConfirmation::Strong);
        assert!(v.price_up);
        assert!(v.description().contains("spike 2.5x"));
    }

    #[test]
    fn mild_volume_on_rally_is_moderate() {
        let v = analyze_volume(&with_last(102.0, 1200.0), 20);
        assert_eq!(v.confirmation, VolumeConfirmation::Moderate);
    }

    #[test]
    fn rally_on_thin_volume_is_divergence() {
        let v = analyze_volume(&with_last(102.0, 400.0), 20);
        assert_eq!(v.confirmation, VolumeConfirmation::Divergence);
        assert!(v.is_divergent());
    }

    #[test]
    fn sell_off_on_heavy_volume_confirms() {
        let v = analyze_volume(&with_last(97.0, 1800.0), 20);
        assert_eq!(v.confirmation, VolumeConfirmation::Strong);
        assert!(!v.price_up);
    }

    #[test]
    fn quiet_decline_is_weak() {
        let v = analyze_volume(&with_last(97.0, 800.0), 20);
        assert_eq!(v.confirmation, VolumeConfirmation::Weak);
    }

    #[test]
    fn volume_trend() {
        let mut candles = with_last(100.0, 3000.0);
        for c in candles.iter_mut().skip(15) {
            c.volume = 3000.0;
        }
        assert_eq!(analyze_volume(&candles, 20).trend, VolumeTrend::Increasing);
        for c in candles.iter_mut().skip(15) {
            c.volume = 500.0;
        }
        assert_eq!(analyze_volume(&candles, 20).trend, VolumeTrend::Decreasing);
    }

    #[test]
    fn insufficient_data() {
        let candles = with_last(100.0, 1000.0);
        assert_eq!(analyze_volume(&candles[..1], 20), VolumeAnalysis::insufficient());
    }

    #[test]
    fn score_components() {
        let mut v = analyze_volume(&with_last(102.0, 2500.0), 20);
        v.trend = VolumeTrend::Increasing;
        // 15 + 5 + 3 clamps to 20
        assert_eq!(v.score(true), 20.0);
        // short side gets no trend bonus
        assert_eq!(v.score(false), 20.0);

        let thin = analyze_volume(&with_last(102.0, 400.0), 20);
        // divergence -10, thin volume -5
        assert_eq!(thin.score(true), -15.0);
    }
}
