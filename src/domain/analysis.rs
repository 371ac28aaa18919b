//! Technical analysis aggregator.
//!
//! Runs every indicator over one candle series and assembles a single
//! immutable [`TechnicalAnalysis`] plus an ordered human-readable summary.

use crate::domain::candle::Candle;
use crate::domain::indicator::{
    FibonacciAnalysis, MacdResult, MacdTrend, PricePosition, RsiResult, RsiSignal,
    TrendDirection, TrendResult, VolumeAnalysis, analyze_fibonacci, analyze_macd, analyze_rsi,
    analyze_support_resistance, analyze_trend, analyze_volume, fibonacci, macd, rsi,
    support_resistance, volume,
};
use serde::{Deserialize, Serialize};

/// Indicator parameters used by the aggregator.
#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisParams {
    pub rsi_period: usize,
    pub macd_fast: usize,
    pub macd_slow: usize,
    pub macd_signal: usize,
    pub pivot_lookback: usize,
    pub cluster_threshold: f64,
    pub fibonacci_lookback: usize,
    pub volume_lookback: usize,
}

impl Default for AnalysisParams {
    fn default() -> Self {
        AnalysisParams {
            rsi_period: rsi::DEFAULT_PERIOD,
            macd_fast: macd::DEFAULT_FAST,
            macd_slow: macd::DEFAULT_SLOW,
            macd_signal: macd::DEFAULT_SIGNAL,
            pivot_lookback: support_resistance::DEFAULT_LOOKBACK,
            cluster_threshold: support_resistance::DEFAULT_CLUSTER_THRESHOLD,
            fibonacci_lookback: fibonacci::DEFAULT_LOOKBACK,
            volume_lookback: volume::DEFAULT_LOOKBACK,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Momentum {
    pub value: f64,
    pub increasing: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TechnicalAnalysis {
    pub price: f64,
    pub rsi: RsiResult,
    pub macd: MacdResult,
    pub trend: TrendResult,
    /// Ascending, at most five.
    pub support: Vec<f64>,
    /// Ascending, at most five.
    pub resistance: Vec<f64>,
    pub price_position: PricePosition,
    pub momentum: Momentum,
    pub volume: VolumeAnalysis,
    pub fibonacci: Option<FibonacciAnalysis>,
}

impl TechnicalAnalysis {
    pub fn nearest_support(&self) -> Option<f64> {
        self.support.last().copied()
    }

    pub fn nearest_resistance(&self) -> Option<f64> {
        self.resistance.first().copied()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisReport {
    pub analysis: TechnicalAnalysis,
    pub summary: String,
}

pub fn run_technical_analysis(candles: &[Candle]) -> AnalysisReport {
    run_technical_analysis_with(candles, &AnalysisParams::default())
}

pub fn run_technical_analysis_with(candles: &[Candle], params: &AnalysisParams) -> AnalysisReport {
    let closes: Vec<f64> = candles.iter().map(|c| c.close).collect();

    let rsi = analyze_rsi(&closes, params.rsi_period);
    let macd = analyze_macd(
        &closes,
        params.macd_fast,
        params.macd_slow,
        params.macd_signal,
    );
    let trend = analyze_trend(candles);
    let levels =
        analyze_support_resistance(candles, params.pivot_lookback, params.cluster_threshold);
    let volume = analyze_volume(candles, params.volume_lookback);
    let fibonacci = analyze_fibonacci(candles, params.fibonacci_lookback);

    let mut parts = vec![rsi.description(), trend.description()];
    if macd.crossover.is_some() {
        parts.push(macd.description());
    }
    parts.push(levels.description());

    let momentum = Momentum {
        value: macd.histogram,
        increasing: macd.histogram > 0.0,
    };

    AnalysisReport {
        analysis: TechnicalAnalysis {
            price: levels.current_price,
            rsi,
            macd,
            trend,
            support: levels.support,
            resistance: levels.resistance,
            price_position: levels.position,
            momentum,
            volume,
            fibonacci,
        },
        summary: parts.join(". "),
    }
}

/// Directional read of one analysis in [-100, 100].
pub fn technical_sentiment(analysis: &TechnicalAnalysis) -> f64 {
    let mut score: f64 = 0.0;

    // oversold reads as a likely bounce
    score += match analysis.rsi.signal {
        RsiSignal::Oversold => 20.0,
        RsiSignal::Overbought => -20.0,
        RsiSignal::Neutral => 0.0,
    };
    score += (analysis.rsi.value - 50.0) * 0.2;

    score += match analysis.macd.trend {
        MacdTrend::Bullish => 20.0,
        MacdTrend::Bearish => -20.0,
        MacdTrend::Neutral => 0.0,
    };
    score += (analysis.macd.histogram * 100.0).clamp(-10.0, 10.0);

    score += match analysis.trend.direction {
        TrendDirection::Up => analysis.trend.strength * 0.4,
        TrendDirection::Down => -analysis.trend.strength * 0.4,
        TrendDirection::Sideways => 0.0,
    };

    score.round().clamp(-100.0, 100.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::candle::fixtures::{candle, from_closes};

    fn wavy(n: usize) -> Vec<Candle> {
        (0..n)
            .map(|i| {
                let c = 100.0 + (i as f64 * 0.4).sin() * 8.0 + i as f64 * 0.05;
                candle(i, c, c + 1.5, c - 1.5, c, 1000.0 + (i % 7) as f64 * 50.0)
            })
            .collect()
    }

    #[test]
    fn empty_series_degrades_to_neutral() {
        let report = run_technical_analysis(&[]);
        let a = &report.analysis;
        assert_eq!(a.rsi, RsiResult::neutral());
        assert_eq!(a.macd, MacdResult::neutral());
        assert_eq!(a.trend, TrendResult::sideways());
        assert!(a.support.is_empty() && a.resistance.is_empty());
        assert_eq!(a.price, 0.0);
        assert!(a.fibonacci.is_none());
        assert_eq!(technical_sentiment(a), 0.0);
    }

    #[test]
    fn summary_order_without_crossover() {
        let report = run_technical_analysis(&wavy(120));
        let a = &report.analysis;
        let mut expected = vec![a.rsi.description(), a.trend.description()];
        if a.macd.crossover.is_some() {
            expected.push(a.macd.description());
        }
        assert!(report.summary.starts_with(&expected.join(". ")));
        assert!(report.summary.contains("Price at $"));
    }

    #[test]
    fn momentum_mirrors_histogram() {
        let a = run_technical_analysis(&wavy(120)).analysis;
        assert_eq!(a.momentum.value, a.macd.histogram);
        assert_eq!(a.momentum.increasing, a.macd.histogram > 0.0);
    }

    #[test]
    fn analysis_is_deterministic() {
        let candles = wavy(150);
        assert_eq!(run_technical_analysis(&candles), run_technical_analysis(&candles));
    }

    #[test]
    fn sentiment_components() {
        let mut a = run_technical_analysis(&from_closes(&[100.0; 10])).analysis;
        a.rsi.value = 25.0;
        a.rsi.signal = RsiSignal::Oversold;
        a.macd.trend = MacdTrend::Bullish;
        a.macd.histogram = 0.5;
        a.trend.direction = TrendDirection::Up;
        a.trend.strength = 50.0;
        // 20 - 5 + 20 + 10 + 20
        assert_eq!(technical_sentiment(&a), 65.0);
    }

    #[test]
    fn sentiment_is_clamped() {
        let mut a = run_technical_analysis(&from_closes(&[100.0; 10])).analysis;
        a.rsi.value = 100.0;
        a.rsi.signal = RsiSignal::Oversold;
        a.macd.trend = MacdTrend::Bullish;
        a.macd.histogram = 10.0;
        a.trend.direction = TrendDirection::Up;
        a.trend.strength = 100.0;
        // 20 + 10 + 20 + 10 + 40 = 100
        assert_eq!(technical_sentiment(&a), 100.0);
        a.trend.strength = 1000.0;
        assert_eq!(technical_sentiment(&a), 100.0);
    }

    #[test]
    fn zero_periods_never_panic() {
        let params = AnalysisParams {
            rsi_period: 0,
            macd_fast: 0,
            macd_slow: 0,
            macd_signal: 0,
            pivot_lookback: 0,
            fibonacci_lookback: 0,
            volume_lookback: 0,
            ..AnalysisParams::default()
        };
        for n in 0..3 {
            let report = run_technical_analysis_with(&wavy(n), &params);
            assert_eq!(report.analysis.macd, MacdResult::neutral());
            assert_eq!(report.analysis.rsi, RsiResult::neutral());
            assert!(report.analysis.fibonacci.is_none());
        }

        let short_signal = AnalysisParams {
            macd_slow: 1,
            macd_signal: 0,
            ..AnalysisParams::default()
        };
        let report = run_technical_analysis_with(&wavy(1), &short_signal);
        assert_eq!(report.analysis.macd, MacdResult::neutral());
    }
}
