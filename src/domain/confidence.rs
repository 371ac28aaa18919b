//! Weighted, explainable confidence scoring across two timeframes.
//!
//! Each rule that fires adds a [`ConfidenceFactor`]; the total is
//! `clamp(50 + sum(contribution), 25, 95)`, rounded. Identical inputs always
//! produce the identical factor list and total.

use crate::domain::analysis::TechnicalAnalysis;
use crate::domain::indicator::{MacdTrend, RsiSignal, TrendDirection};
use serde::{Deserialize, Serialize};

pub const BASE_CONFIDENCE: f64 = 50.0;
pub const MIN_CONFIDENCE: f64 = 25.0;
pub const MAX_CONFIDENCE: f64 = 95.0;
/// Historical statistics below this sample size are ignored.
pub const MIN_HISTORICAL_SAMPLE: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FactorCategory {
    Technical,
    Fundamental,
    Sentiment,
    Historical,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfidenceFactor {
    pub name: String,
    pub category: FactorCategory,
    pub weight: f64,
    /// 0..=100
    pub value: f64,
    pub contribution: f64,
    pub description: String,
}

impl ConfidenceFactor {
    /// Contribution = weight * value / 100.
    fn weighted(
        name: &str,
        category: FactorCategory,
        weight: f64,
        value: f64,
        description: String,
    ) -> Self {
        ConfidenceFactor {
            name: name.to_string(),
            category,
            weight,
            value,
            contribution: weight * value / 100.0,
            description,
        }
    }

    /// Extremity bonus: the full weight regardless of value.
    fn flat(name: &str, weight: f64, description: String) -> Self {
        ConfidenceFactor {
            name: name.to_string(),
            category: FactorCategory::Technical,
            weight,
            value: 100.0,
            contribution: weight,
            description,
        }
    }
}

/// Win-rate statistics for setups similar to the one being scored.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HistoricalStats {
    /// Percent, 0..=100.
    pub win_rate: f64,
    pub sample_size: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfidenceBreakdown {
    pub total_confidence: f64,
    /// Sorted by contribution, largest first.
    pub factors: Vec<ConfidenceFactor>,
    pub historical_win_rate: f64,
    pub similar_setups: usize,
    pub reasoning: String,
}

fn signal_word(signal: RsiSignal) -> &'static str {
    match signal {
        RsiSignal::Oversold => "oversold",
        RsiSignal::Overbought => "overbought",
        RsiSignal::Neutral => "neutral",
    }
}

fn rsi_factors(
    primary: &TechnicalAnalysis,
    higher: &TechnicalAnalysis,
    out: &mut Vec<ConfidenceFactor>,
) {
    let rsi = primary.rsi.value;
    let signal = primary.rsi.signal;

    if rsi <= 20.0 {
        out.push(ConfidenceFactor::flat(
            "Extreme Oversold RSI",
            20.0,
            format!("RSI(4H) = {rsi:.1}, extreme oversold bounce zone"),
        ));
    } else if rsi >= 80.0 {
        out.push(ConfidenceFactor::flat(
            "Extreme Overbought RSI",
            20.0,
            format!("RSI(4H) = {rsi:.1}, extreme overbought reversal zone"),
        ));
    } else if signal != RsiSignal::Neutral {
        let name = if signal == RsiSignal::Oversold {
            "Oversold RSI"
        } else {
            "Overbought RSI"
        };
        out.push(ConfidenceFactor::weighted(
            name,
            FactorCategory::Technical,
            10.0,
            75.0,
            format!("RSI(4H) = {rsi:.1}, {} territory", signal_word(signal)),
        ));
    }

    let higher_rsi = higher.rsi.value;
    let fully_aligned = signal != RsiSignal::Neutral && signal == higher.rsi.signal;
    let partially_aligned = (signal == RsiSignal::Oversold && higher_rsi < 40.0)
        || (signal == RsiSignal::Overbought && higher_rsi > 60.0);

    if fully_aligned {
        out.push(ConfidenceFactor::flat(
            "RSI Alignment",
            15.0,
            format!("Both 4H and 1D RSI showing {}", signal_word(signal)),
        ));
    } else if partially_aligned {
        out.push(ConfidenceFactor::weighted(
            "Partial RSI Alignment",
            FactorCategory::Technical,
            5.0,
            50.0,
            format!("4H RSI {}, 1D supportive", signal_word(signal)),
        ));
    }
}

fn macd_factors(
    primary: &TechnicalAnalysis,
    higher: &TechnicalAnalysis,
    out: &mut Vec<ConfidenceFactor>,
) {
    if let Some(cross) = primary.macd.crossover {
        out.push(ConfidenceFactor::weighted(
            "MACD Crossover",
            FactorCategory::Technical,
            10.0,
            80.0,
            format!("{cross} on 4H chart"),
        ));
    }

    let trend = primary.macd.trend;
    if trend != MacdTrend::Neutral && trend == higher.macd.trend {
        let word = if trend == MacdTrend::Bullish {
            "bullish"
        } else {
            "bearish"
        };
        out.push(ConfidenceFactor::weighted(
            "MACD Alignment",
            FactorCategory::Technical,
            10.0,
            75.0,
            format!("Both timeframes showing {word} MACD"),
        ));
    }
}

fn trend_factors(
    primary: &TechnicalAnalysis,
    higher: &TechnicalAnalysis,
    out: &mut Vec<ConfidenceFactor>,
) {
    let direction = primary.trend.direction;
    if direction != TrendDirection::Sideways && direction == higher.trend.direction {
        let word = if direction == TrendDirection::Up {
            "up"
        } else {
            "down"
        };
        out.push(ConfidenceFactor::weighted(
            "Trend Alignment",
            FactorCategory::Technical,
            15.0,
            85.0,
            format!("Strong {word} trend on both timeframes"),
        ));
    }

    let strength = primary.trend.strength;
    if strength > 60.0 {
        out.push(ConfidenceFactor::weighted(
            "Strong Trend",
            FactorCategory::Technical,
            8.0,
            strength,
            format!("Trend strength: {strength:.0}%"),
        ));
    }
}

/// Score a setup from a primary (typically 4H) and a higher (typically 1D)
/// timeframe analysis. A fundamental score of `None` or zero contributes
/// nothing. Historical statistics with fewer than ten samples add no factor
/// but are still reported; a non-finite win rate is ignored entirely.
pub fn confidence_breakdown(
    primary: &TechnicalAnalysis,
    higher: &TechnicalAnalysis,
    sentiment: f64,
    fundamental: Option<f64>,
    historical: Option<&HistoricalStats>,
) -> ConfidenceBreakdown {
    let mut factors = Vec::new();

    rsi_factors(primary, higher, &mut factors);
    macd_factors(primary, higher, &mut factors);
    trend_factors(primary, higher, &mut factors);

    if sentiment.abs() > 20.0 {
        let value = (sentiment.abs() * 2.0).min(100.0);
        let mood = if sentiment > 0.0 { "Bullish" } else { "Bearish" };
        factors.push(ConfidenceFactor::weighted(
            "Market Sentiment",
            FactorCategory::Sentiment,
            10.0,
            value,
            format!("{mood} sentiment ({sentiment:.0})"),
        ));
    }

    if let Some(score) = fundamental.filter(|s| *s != 0.0 && s.is_finite()) {
        let description = if score > 0.0 {
            format!("Positive fundamentals (+{score:.0})")
        } else {
            format!("Negative fundamentals ({score:.0})")
        };
        factors.push(ConfidenceFactor::weighted(
            "Fundamental Analysis",
            FactorCategory::Fundamental,
            15.0,
            score.abs().min(100.0),
            description,
        ));
    }

    let historical = historical.filter(|h| h.win_rate.is_finite());
    if let Some(stats) = historical.filter(|h| h.sample_size >= MIN_HISTORICAL_SAMPLE) {
        factors.push(ConfidenceFactor::weighted(
            "Historical Win Rate",
            FactorCategory::Historical,
            12.0,
            stats.win_rate.clamp(0.0, 100.0),
            format!(
                "Similar setups: {:.0}% win rate ({} trades)",
                stats.win_rate, stats.sample_size
            ),
        ));
    }

    factors.sort_by(|a, b| b.contribution.total_cmp(&a.contribution));

    let sum: f64 = factors.iter().map(|f| f.contribution).sum();
    let total_confidence = (BASE_CONFIDENCE + sum)
        .clamp(MIN_CONFIDENCE, MAX_CONFIDENCE)
        .round();

    let top: Vec<&str> = factors.iter().take(3).map(|f| f.name.as_str()).collect();
    let reasoning = format!(
        "Confidence based on: {}. Total {} factors analyzed.",
        top.join(", "),
        factors.len()
    );

    ConfidenceBreakdown {
        total_confidence,
        factors,
        historical_win_rate: historical.map_or(0.0, |h| h.win_rate),
        similar_setups: historical.map_or(0, |h| h.sample_size),
        reasoning,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::analysis::run_technical_analysis;
    use crate::domain::candle::fixtures::from_closes;
    use crate::domain::indicator::MacdCrossover;

    /// A neutral analysis to mutate field by field.
    fn neutral() -> TechnicalAnalysis {
        run_technical_analysis(&from_closes(&[100.0; 5])).analysis
    }

    fn with_rsi(value: f64) -> TechnicalAnalysis {
        let mut a = neutral();
        a.rsi.value = value;
        a.rsi.signal = RsiSignal::classify(value);
        a
    }

    fn names(b: &ConfidenceBreakdown) -> Vec<&str> {
        b.factors.iter().map(|f| f.name.as_str()).collect()
    }

    #[test]
    fn no_factors_is_fifty() {
        let b = confidence_breakdown(&neutral(), &neutral(), 0.0, None, None);
        assert!(b.factors.is_empty());
        assert_eq!(b.total_confidence, 50.0);
        assert_eq!(b.reasoning, "Confidence based on: . Total 0 factors analyzed.");
    }

    #[test]
    fn extreme_oversold_with_aligned_daily() {
        let b = confidence_breakdown(&with_rsi(18.0), &with_rsi(32.0), 0.0, None, None);
        // 32 is not oversold on its own, so only partial alignment applies
        assert_eq!(names(&b), vec!["Extreme Oversold RSI", "Partial RSI Alignment"]);

        let b = confidence_breakdown(&with_rsi(18.0), &with_rsi(28.0), 0.0, None, None);
        assert_eq!(names(&b), vec!["Extreme Oversold RSI", "RSI Alignment"]);
        assert_eq!(b.factors[0].contribution, 20.0);
        assert_eq!(b.factors[1].contribution, 15.0);
        assert_eq!(b.total_confidence, 85.0);
    }

    #[test]
    fn extreme_oversold_with_oversold_daily_ranks_first() {
        // daily flagged oversold at 32, e.g. by a source with a looser band
        let mut daily = with_rsi(32.0);
        daily.rsi.signal = RsiSignal::Oversold;
        let mut primary = with_rsi(18.0);
        primary.trend.strength = 70.0;

        let b = confidence_breakdown(&primary, &daily, 0.0, None, None);
        assert_eq!(names(&b), vec!["Extreme Oversold RSI", "RSI Alignment", "Strong Trend"]);
        assert_eq!(b.factors[0].contribution, 20.0);
        assert_eq!(b.factors[1].contribution, 15.0);
        assert!(b.reasoning.starts_with("Confidence based on: Extreme Oversold RSI, RSI Alignment"));
    }

    #[test]
    fn plain_overbought_factor() {
        let b = confidence_breakdown(&with_rsi(72.0), &with_rsi(65.0), 0.0, None, None);
        assert_eq!(names(&b), vec!["Overbought RSI", "Partial RSI Alignment"]);
        assert_eq!(b.factors[0].contribution, 7.5);
        assert_eq!(b.factors[1].contribution, 2.5);
        assert_eq!(b.total_confidence, 60.0);
    }

    #[test]
    fn macd_and_trend_factors() {
        let mut p = neutral();
        p.macd.crossover = Some(MacdCrossover::BullishCross);
        p.macd.trend = MacdTrend::Bullish;
        p.trend.direction = TrendDirection::Up;
        p.trend.strength = 80.0;
        let mut h = neutral();
        h.macd.trend = MacdTrend::Bullish;
        h.trend.direction = TrendDirection::Up;

        let b = confidence_breakdown(&p, &h, 0.0, None, None);
        assert_eq!(
            names(&b),
            vec!["Trend Alignment", "MACD Crossover", "MACD Alignment", "Strong Trend"]
        );
        let crossover = &b.factors[1];
        assert_eq!(crossover.description, "BULLISH_CROSS on 4H chart");
        // 12.75 + 8 + 7.5 + 6.4
        assert_eq!(b.total_confidence, 85.0);
        assert_eq!(
            b.reasoning,
            "Confidence based on: Trend Alignment, MACD Crossover, MACD Alignment. Total 4 factors analyzed."
        );
    }

    #[test]
    fn sentiment_fundamental_historical() {
        let stats = HistoricalStats {
            win_rate: 64.0,
            sample_size: 25,
        };
        let b = confidence_breakdown(&neutral(), &neutral(), -30.0, Some(60.0), Some(&stats));
        // 9 + 7.68 + 6
        assert_eq!(
            names(&b),
            vec!["Fundamental Analysis", "Historical Win Rate", "Market Sentiment"]
        );
        assert_eq!(b.total_confidence, 73.0);
        assert_eq!(b.factors[2].category, FactorCategory::Sentiment);
        assert_eq!(b.factors[2].description, "Bearish sentiment (-30)");
        assert_eq!(b.historical_win_rate, 64.0);
        assert_eq!(b.similar_setups, 25);
    }

    #[test]
    fn small_historical_sample_is_skipped() {
        let stats = HistoricalStats {
            win_rate: 90.0,
            sample_size: 9,
        };
        let b = confidence_breakdown(&neutral(), &neutral(), 0.0, Some(0.0), Some(&stats));
        assert!(b.factors.is_empty());
        assert_eq!(b.total_confidence, 50.0);
        // still reported, only the factor is dropped
        assert_eq!(b.historical_win_rate, 90.0);
        assert_eq!(b.similar_setups, 9);
    }

    #[test]
    fn non_finite_win_rate_is_ignored() {
        for win_rate in [f64::NAN, f64::INFINITY, f64::NEG_INFINITY] {
            let stats = HistoricalStats {
                win_rate,
                sample_size: 20,
            };
            let b = confidence_breakdown(&with_rsi(18.0), &with_rsi(28.0), 0.0, None, Some(&stats));
            assert!(b.factors.iter().all(|f| f.category != FactorCategory::Historical));
            assert_eq!(b.total_confidence, 85.0);
            assert_eq!(b.historical_win_rate, 0.0);
            assert_eq!(b.similar_setups, 0);
        }
    }

    #[test]
    fn total_is_capped() {
        let mut p = with_rsi(10.0);
        p.macd.crossover = Some(MacdCrossover::BullishCross);
        p.macd.trend = MacdTrend::Bullish;
        p.trend.direction = TrendDirection::Up;
        p.trend.strength = 100.0;
        let mut h = with_rsi(10.0);
        h.macd.trend = MacdTrend::Bullish;
        h.trend.direction = TrendDirection::Up;
        let stats = HistoricalStats {
            win_rate: 100.0,
            sample_size: 50,
        };
        let b = confidence_breakdown(&p, &h, 100.0, Some(100.0), Some(&stats));
        assert_eq!(b.total_confidence, 95.0);
    }
}
