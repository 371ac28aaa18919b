//! Trading signal generation from multi-timeframe analysis.
//!
//! The 4H analysis drives the decision, the 1D analysis confirms it and the
//! latest 1H close (or 4H close) is the entry. A setup that passes the
//! action ladder gets risk-multiple targets and a stop anchored on
//! support/resistance, refined by Fibonacci levels when the daily swing is
//! known.

use crate::domain::analysis::{
    AnalysisReport, TechnicalAnalysis, run_technical_analysis, technical_sentiment,
};
use crate::domain::candle::Candle;
use crate::domain::confidence::{ConfidenceBreakdown, confidence_breakdown};
use crate::domain::indicator::{
    FibonacciAnalysis, MacdCrossover, MacdTrend, RsiSignal, TrendDirection, VolumeConfirmation,
};
use crate::domain::timeframe::Timeframe;
use crate::domain::token::Token;
use crate::domain::trade::Side;
use crate::ports::win_rate_port::{WinRateProvider, WinRateQuery};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// 4H candles needed before a token is evaluated.
pub const MIN_CANDLES: usize = 30;
/// Target distances in multiples of the entry-to-stop risk.
pub const TARGET_MULTIPLES: [f64; 3] = [1.5, 2.5, 4.0];
pub const DEFAULT_STOP_PERCENT: f64 = 5.0;
/// Fallback distance to a missing support or resistance level.
const LEVEL_FALLBACK: f64 = 0.05;
const LEVEL_BUFFER: f64 = 0.02;
const FIB_BUFFER: f64 = 0.01;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct MultiTimeframeCandles {
    pub one_hour: Vec<Candle>,
    pub four_hours: Vec<Candle>,
    pub one_day: Vec<Candle>,
}

impl MultiTimeframeCandles {
    /// Latest 1H close, else latest 4H close. Non-positive closes count as
    /// missing.
    pub fn latest_price(&self) -> Option<f64> {
        let last_close = |candles: &[Candle]| candles.last().map(|c| c.close).filter(|p| *p > 0.0);
        last_close(&self.one_hour).or_else(|| last_close(&self.four_hours))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SignalAction {
    Long,
    Short,
    Hold,
    Avoid,
}

impl From<Side> for SignalAction {
    fn from(side: Side) -> Self {
        match side {
            Side::Long => SignalAction::Long,
            Side::Short => SignalAction::Short,
        }
    }
}

impl fmt::Display for SignalAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SignalAction::Long => "LONG",
            SignalAction::Short => "SHORT",
            SignalAction::Hold => "HOLD",
            SignalAction::Avoid => "AVOID",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RiskLevel::Low => "LOW",
            RiskLevel::Medium => "MEDIUM",
            RiskLevel::High => "HIGH",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum StopMode {
    /// Beyond the nearest support (long) or resistance (short), at least 5%
    /// from entry, tightened to a Fibonacci retracement when one lies
    /// between entry and stop.
    SupportResistance,
    /// A fixed percent from entry.
    Percent(f64),
}

#[derive(Debug, Clone, PartialEq)]
pub struct SignalConfig {
    pub stop_mode: StopMode,
    /// Directional setups scoring below this become AVOID. 0 disables.
    pub min_confidence: f64,
    /// External fundamental score in [-100, 100], if any.
    pub fundamental_score: Option<f64>,
}

impl Default for SignalConfig {
    fn default() -> Self {
        SignalConfig {
            stop_mode: StopMode::SupportResistance,
            min_confidence: 0.0,
            fundamental_score: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SignalLevels {
    pub entry: f64,
    /// Ordered by increasing distance from entry.
    pub targets: [f64; 3],
    pub stop_loss: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reasoning {
    pub technical: String,
    pub fundamental: String,
    pub sentiment: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradingSignal {
    pub id: String,
    pub timestamp: DateTime<Utc>,
    pub token: Token,
    pub action: SignalAction,
    pub entry: f64,
    pub targets: Vec<f64>,
    pub stop_loss: f64,
    pub confidence: f64,
    pub breakdown: ConfidenceBreakdown,
    pub timeframe: Timeframe,
    pub reasoning: Reasoning,
    pub risk_level: RiskLevel,
    pub technical_analysis: TechnicalAnalysis,
    pub indicators: BTreeMap<String, f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SignalDecision {
    Signal(Box<TradingSignal>),
    /// No directional setup, or not enough data to look for one.
    Hold { reason: String },
    /// A setup exists but should not be traded.
    Avoid { reason: String },
}

impl SignalDecision {
    pub fn action(&self) -> SignalAction {
        match self {
            SignalDecision::Signal(s) => s.action,
            SignalDecision::Hold { .. } => SignalAction::Hold,
            SignalDecision::Avoid { .. } => SignalAction::Avoid,
        }
    }

    pub fn signal(&self) -> Option<&TradingSignal> {
        match self {
            SignalDecision::Signal(s) => Some(s.as_ref()),
            _ => None,
        }
    }

    pub fn into_signal(self) -> Option<TradingSignal> {
        match self {
            SignalDecision::Signal(s) => Some(*s),
            _ => None,
        }
    }
}

/// Walk the rule ladder from extreme RSI down to momentum plays. The first
/// matching rule decides; `None` means no directional setup.
pub fn determine_action(
    a4: &TechnicalAnalysis,
    a1: &TechnicalAnalysis,
    sentiment: f64,
) -> Option<Side> {
    let rsi = a4.rsi.value;
    let rsi_1d = a1.rsi.value;
    let signal = a4.rsi.signal;
    let hist = a4.macd.histogram;
    let cross = a4.macd.crossover;
    let direction = a4.trend.direction;
    let strength = a4.trend.strength;

    if rsi <= 20.0 {
        return Some(Side::Long);
    }
    if rsi >= 80.0 {
        return Some(Side::Short);
    }

    if signal == RsiSignal::Oversold
        && (sentiment > 0.0
            || hist > 0.0
            || cross == Some(MacdCrossover::BullishCross)
            || rsi_1d < 40.0)
    {
        return Some(Side::Long);
    }
    if signal == RsiSignal::Overbought
        && (sentiment < 0.0
            || hist < 0.0
            || cross == Some(MacdCrossover::BearishCross)
            || rsi_1d > 60.0)
    {
        return Some(Side::Short);
    }

    if sentiment > 25.0 && signal == RsiSignal::Oversold && direction != TrendDirection::Down {
        return Some(Side::Long);
    }
    if sentiment < -25.0 && signal == RsiSignal::Overbought && direction != TrendDirection::Up {
        return Some(Side::Short);
    }

    if direction == TrendDirection::Up
        && strength > 35.0
        && a4.macd.trend == MacdTrend::Bullish
        && sentiment > 10.0
    {
        return Some(Side::Long);
    }
    if direction == TrendDirection::Down
        && strength > 35.0
        && a4.macd.trend == MacdTrend::Bearish
        && sentiment < -10.0
    {
        return Some(Side::Short);
    }

    if cross == Some(MacdCrossover::BullishCross) && rsi < 60.0 && direction != TrendDirection::Down
    {
        return Some(Side::Long);
    }
    if cross == Some(MacdCrossover::BearishCross) && rsi > 40.0 && direction != TrendDirection::Up {
        return Some(Side::Short);
    }

    if rsi < 35.0 && rsi_1d < 45.0 && (cross == Some(MacdCrossover::BullishCross) || hist > 0.0) {
        return Some(Side::Long);
    }
    if rsi > 65.0 && rsi_1d > 55.0 && (cross == Some(MacdCrossover::BearishCross) || hist < 0.0) {
        return Some(Side::Short);
    }

    if sentiment > 30.0 && direction == TrendDirection::Up && rsi > 50.0 && rsi < 70.0 {
        return Some(Side::Long);
    }
    if sentiment < -30.0 && direction == TrendDirection::Down && rsi > 30.0 && rsi < 50.0 {
        return Some(Side::Short);
    }

    None
}

fn round4(value: f64) -> f64 {
    (value * 10_000.0).round() / 10_000.0
}

/// Entry, targets and stop for a trade on `side` at `price`. `fibonacci`
/// is normally taken from the daily analysis.
pub fn signal_levels(
    side: Side,
    price: f64,
    analysis: &TechnicalAnalysis,
    fibonacci: Option<&FibonacciAnalysis>,
    stop_mode: StopMode,
) -> SignalLevels {
    let support = analysis
        .nearest_support()
        .unwrap_or(price * (1.0 - LEVEL_FALLBACK));
    let resistance = analysis
        .nearest_resistance()
        .unwrap_or(price * (1.0 + LEVEL_FALLBACK));
    let sign = side.sign();

    let stop_loss = match (stop_mode, side) {
        (StopMode::Percent(p), _) => price * (1.0 - sign * p / 100.0),
        (StopMode::SupportResistance, Side::Long) => {
            let stop = (support * (1.0 - LEVEL_BUFFER)).min(price * (1.0 - LEVEL_FALLBACK));
            match fibonacci.and_then(|f| f.retracement_below(price)) {
                Some(level) if level > stop => level * (1.0 - FIB_BUFFER),
                _ => stop,
            }
        }
        (StopMode::SupportResistance, Side::Short) => {
            let stop = (resistance * (1.0 + LEVEL_BUFFER)).max(price * (1.0 + LEVEL_FALLBACK));
            match fibonacci.and_then(|f| f.retracement_above(price)) {
                Some(level) if level < stop => level * (1.0 + FIB_BUFFER),
                _ => stop,
            }
        }
    };

    let risk = (price - stop_loss).abs();
    let mut targets = TARGET_MULTIPLES.map(|m| price + sign * risk * m);

    match side {
        Side::Long => {
            if let Some(fib) = fibonacci {
                let above: Vec<f64> = fib.extensions.iter().copied().filter(|e| *e > price).collect();
                if let Some(first) = above.first() {
                    targets[1] = *first;
                }
                if let Some(second) = above.get(1) {
                    targets[2] = *second;
                }
            }
            if resistance > price && resistance < targets[0] {
                targets[0] = resistance;
            }
        }
        Side::Short => {
            if support < price && support > targets[0] {
                targets[0] = support;
            }
        }
    }
    // keep tiers ordered by distance from entry
    targets.sort_by(|a, b| ((a - price).abs()).total_cmp(&(b - price).abs()));

    SignalLevels {
        entry: round4(price),
        targets: targets.map(round4),
        stop_loss: round4(stop_loss),
    }
}

pub fn risk_level(confidence: f64, analysis: &TechnicalAnalysis) -> RiskLevel {
    if analysis.volume.is_divergent() {
        return RiskLevel::High;
    }
    if confidence > 75.0
        && analysis.trend.strength > 60.0
        && analysis.volume.confirmation == VolumeConfirmation::Strong
    {
        return RiskLevel::Low;
    }
    if confidence < 50.0 || analysis.trend.direction == TrendDirection::Sideways {
        return RiskLevel::High;
    }
    RiskLevel::Medium
}

/// 1D when the daily trend is strong, else 4H.
pub fn signal_timeframe(a1: &TechnicalAnalysis) -> Timeframe {
    if a1.trend.strength > 70.0 {
        Timeframe::OneDay
    } else {
        Timeframe::FourHours
    }
}

fn direction_word(direction: TrendDirection) -> &'static str {
    match direction {
        TrendDirection::Up => "up",
        TrendDirection::Down => "down",
        TrendDirection::Sideways => "sideways",
    }
}

fn rsi_reasoning(a4: &TechnicalAnalysis, a1: &TechnicalAnalysis) -> String {
    let rsi = a4.rsi.value;
    let mut text = if rsi <= 20.0 {
        format!("EXTREME OVERSOLD: RSI(4H)={rsi:.1}, high probability bounce zone. ")
    } else if rsi >= 80.0 {
        format!("EXTREME OVERBOUGHT: RSI(4H)={rsi:.1}, high probability pullback zone. ")
    } else {
        match a4.rsi.signal {
            RsiSignal::Oversold => format!("OVERSOLD: RSI(4H)={rsi:.1}, potential reversal zone. "),
            RsiSignal::Overbought => {
                format!("OVERBOUGHT: RSI(4H)={rsi:.1}, potential reversal zone. ")
            }
            RsiSignal::Neutral => String::new(),
        }
    };
    if a4.rsi.signal != RsiSignal::Neutral && a4.rsi.signal == a1.rsi.signal {
        text.push_str(&format!(
            "Multi-timeframe RSI alignment (1D RSI={:.1}). ",
            a1.rsi.value
        ));
    }
    text
}

fn build_reasoning(
    r4: &AnalysisReport,
    r1: &AnalysisReport,
    fundamental: Option<f64>,
    breakdown: &ConfidenceBreakdown,
) -> Reasoning {
    let a4 = &r4.analysis;
    let mut technical = rsi_reasoning(a4, &r1.analysis);
    technical.push_str(&r4.summary);
    technical.push_str(". ");
    technical.push_str(&a4.volume.description());
    if let Some(fib) = &r1.analysis.fibonacci {
        technical.push_str(". ");
        technical.push_str(&fib.description());
    }
    technical.push_str(&format!(
        ". Daily: trend {}",
        direction_word(r1.analysis.trend.direction)
    ));

    let fundamental = match fundamental {
        Some(score) if score < -20.0 => format!("Fundamental score {score:.0}, bearish pressure"),
        Some(score) if score != 0.0 => format!("Fundamental score {score:+.0}"),
        _ => "No significant fundamental factors".to_string(),
    };

    Reasoning {
        technical,
        fundamental,
        sentiment: breakdown.reasoning.clone(),
    }
}

fn indicator_map(a4: &TechnicalAnalysis, a1: &TechnicalAnalysis) -> BTreeMap<String, f64> {
    let mut map = BTreeMap::new();
    map.insert("rsi_4h".to_string(), a4.rsi.value);
    map.insert("rsi_1d".to_string(), a1.rsi.value);
    map.insert("trend_strength".to_string(), a4.trend.strength);
    map.insert("macd_histogram".to_string(), a4.macd.histogram);
    map.insert("volume_ratio".to_string(), a4.volume.ratio);
    if let Some(fib) = &a1.fibonacci {
        map.insert("fib_distance".to_string(), fib.distance_percent);
    }
    map
}

/// Decide on a signal from already computed 4H and 1D analyses.
pub fn evaluate_signal(
    token: &Token,
    price: f64,
    r4: &AnalysisReport,
    r1: &AnalysisReport,
    config: &SignalConfig,
    win_rates: Option<&dyn WinRateProvider>,
    now: DateTime<Utc>,
) -> SignalDecision {
    if token.is_stablecoin() {
        return SignalDecision::Avoid {
            reason: format!("{} is a stablecoin", token.symbol),
        };
    }
    if !(price.is_finite() && price > 0.0) {
        return SignalDecision::Hold {
            reason: format!("no current price for {}", token.symbol),
        };
    }

    let a4 = &r4.analysis;
    let a1 = &r1.analysis;
    let sentiment = (technical_sentiment(a4) + technical_sentiment(a1)) / 2.0;

    let Some(side) = determine_action(a4, a1, sentiment) else {
        return SignalDecision::Hold {
            reason: format!("no directional setup (sentiment {sentiment:.0})"),
        };
    };
    if a4.volume.is_divergent() {
        return SignalDecision::Avoid {
            reason: format!("{side} setup with volume divergence"),
        };
    }

    let levels = signal_levels(side, price, a4, a1.fibonacci.as_ref(), config.stop_mode);

    let fundamental = config.fundamental_score.unwrap_or(0.0) + a4.volume.score(side == Side::Long);
    let query = WinRateQuery {
        side,
        rsi: a4.rsi.value,
        trend: a4.trend.direction,
        timeframe: Timeframe::FourHours,
    };
    let historical = win_rates.and_then(|p| p.win_rate(&query));
    let breakdown = confidence_breakdown(a4, a1, sentiment, Some(fundamental), historical.as_ref());
    let confidence = breakdown.total_confidence;

    if confidence < config.min_confidence {
        return SignalDecision::Avoid {
            reason: format!(
                "{side} confidence {confidence:.0} below minimum {:.0}",
                config.min_confidence
            ),
        };
    }

    let reasoning = build_reasoning(r4, r1, config.fundamental_score, &breakdown);
    SignalDecision::Signal(Box::new(TradingSignal {
        id: format!("sig_{}_{}", token.symbol, now.format("%Y%m%d%H%M%S")),
        timestamp: now,
        token: token.clone(),
        action: side.into(),
        entry: levels.entry,
        targets: levels.targets.to_vec(),
        stop_loss: levels.stop_loss,
        confidence,
        timeframe: signal_timeframe(a1),
        reasoning,
        risk_level: risk_level(confidence, a4),
        technical_analysis: a4.clone(),
        indicators: indicator_map(a4, a1),
        breakdown,
    }))
}

/// Analyze the 4H and 1D series of one token and decide on a signal.
pub fn generate_signal(
    token: &Token,
    candles: &MultiTimeframeCandles,
    config: &SignalConfig,
    win_rates: Option<&dyn WinRateProvider>,
    now: DateTime<Utc>,
) -> SignalDecision {
    if token.is_stablecoin() {
        return SignalDecision::Avoid {
            reason: format!("{} is a stablecoin", token.symbol),
        };
    }
    if candles.four_hours.len() < MIN_CANDLES {
        return SignalDecision::Hold {
            reason: format!(
                "insufficient 4H history: {} candles, need {MIN_CANDLES}",
                candles.four_hours.len()
            ),
        };
    }
    let Some(price) = candles.latest_price() else {
        return SignalDecision::Hold {
            reason: format!("no current price for {}", token.symbol),
        };
    };

    let r4 = run_technical_analysis(&candles.four_hours);
    let r1 = run_technical_analysis(&candles.one_day);
    evaluate_signal(token, price, &r4, &r1, config, win_rates, now)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::candle::fixtures::{candle, from_closes};
    use crate::domain::confidence::HistoricalStats;
    use crate::domain::indicator::{RsiResult, VolumeAnalysis};
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 1, 8, 0, 0).unwrap()
    }

    /// Flat market with a neutral RSI of 50.
    fn flat_analysis() -> TechnicalAnalysis {
        with_rsi(run_technical_analysis(&from_closes(&[100.0; 60])).analysis, 50.0)
    }

    fn with_rsi(mut a: TechnicalAnalysis, value: f64) -> TechnicalAnalysis {
        a.rsi = RsiResult {
            value,
            signal: RsiSignal::classify(value),
            divergence: None,
        };
        a
    }

    fn report(analysis: TechnicalAnalysis) -> AnalysisReport {
        AnalysisReport {
            analysis,
            summary: "summary".to_string(),
        }
    }

    fn sol() -> Token {
        Token::new("SOL", "So11111111111111111111111111111111111111112")
    }

    #[test]
    fn extreme_rsi_decides_first() {
        let a1 = flat_analysis();
        let a4 = with_rsi(flat_analysis(), 18.0);
        assert_eq!(determine_action(&a4, &a1, -50.0), Some(Side::Long));
        let a4 = with_rsi(flat_analysis(), 85.0);
        assert_eq!(determine_action(&a4, &a1, 50.0), Some(Side::Short));
    }

    #[test]
    fn oversold_needs_a_confirmation() {
        let a4 = with_rsi(flat_analysis(), 28.0);
        let a1 = with_rsi(flat_analysis(), 50.0);
        assert_eq!(determine_action(&a4, &a1, -5.0), None);
        assert_eq!(determine_action(&a4, &a1, 5.0), Some(Side::Long));
        let a1 = with_rsi(flat_analysis(), 35.0);
        assert_eq!(determine_action(&a4, &a1, -5.0), Some(Side::Long));
    }

    #[test]
    fn macd_cross_and_momentum_rules() {
        let mut a4 = with_rsi(flat_analysis(), 55.0);
        let a1 = flat_analysis();
        a4.macd.crossover = Some(MacdCrossover::BearishCross);
        a4.trend.direction = TrendDirection::Sideways;
        assert_eq!(determine_action(&a4, &a1, 0.0), Some(Side::Short));

        let mut a4 = with_rsi(flat_analysis(), 60.0);
        a4.trend.direction = TrendDirection::Up;
        a4.trend.strength = 20.0;
        assert_eq!(determine_action(&a4, &a1, 35.0), Some(Side::Long));
        assert_eq!(determine_action(&a4, &a1, 5.0), None);
    }

    #[test]
    fn long_levels_from_support() {
        let mut a = flat_analysis();
        a.support = vec![90.0, 96.0];
        a.resistance = vec![104.0, 120.0];
        let levels = signal_levels(Side::Long, 100.0, &a, None, StopMode::SupportResistance);
        // min(96 * 0.98, 95) = 94.08, risk 5.92
        assert_eq!(levels.stop_loss, 94.08);
        assert_eq!(levels.targets, [104.0, 114.8, 123.68]);
        assert_eq!(levels.entry, 100.0);
    }

    #[test]
    fn short_levels_mirror() {
        let mut a = flat_analysis();
        a.support = vec![];
        a.resistance = vec![];
        let levels = signal_levels(Side::Short, 100.0, &a, None, StopMode::SupportResistance);
        // max(105 * 1.02, 105) = 107.1; the first target stops at the 95 fallback support
        assert_eq!(levels.stop_loss, 107.1);
        assert_eq!(levels.targets, [95.0, 82.25, 71.6]);
    }

    #[test]
    fn percent_stop_mode() {
        let a = flat_analysis();
        let levels = signal_levels(Side::Long, 200.0, &a, None, StopMode::Percent(2.0));
        assert_eq!(levels.stop_loss, 196.0);
        assert_eq!(levels.targets, [206.0, 210.0, 216.0]);
    }

    #[test]
    fn fibonacci_tightens_stop_and_sets_targets() {
        let mut a = flat_analysis();
        a.support = vec![];
        a.resistance = vec![];
        let fib = FibonacciAnalysis {
            swing_high: 110.0,
            swing_low: 90.0,
            retracements: [105.28, 102.36, 100.0, 97.64, 94.28],
            extensions: [115.44, 118.28, 122.36],
            price: 99.0,
            nearest_level: 100.0,
            nearest_label: "50%".into(),
            distance_percent: -1.0,
        };
        let levels = signal_levels(Side::Long, 99.0, &a, Some(&fib), StopMode::SupportResistance);
        // 97.64 lies between the 92.17 stop and entry
        assert_eq!(levels.stop_loss, round4(97.64 * 0.99));
        assert_eq!(levels.targets[1], 115.44);
        assert_eq!(levels.targets[2], 118.28);
        let distances: Vec<f64> = levels.targets.iter().map(|t| (t - 99.0).abs()).collect();
        assert!(distances.windows(2).all(|w| w[0] <= w[1]));
    }

    #[test]
    fn risk_levels() {
        let mut a = flat_analysis();
        a.trend.direction = TrendDirection::Up;
        a.trend.strength = 70.0;
        a.volume.confirmation = VolumeConfirmation::Strong;
        assert_eq!(risk_level(80.0, &a), RiskLevel::Low);
        assert_eq!(risk_level(60.0, &a), RiskLevel::Medium);
        assert_eq!(risk_level(45.0, &a), RiskLevel::High);
        a.volume.confirmation = VolumeConfirmation::Divergence;
        assert_eq!(risk_level(90.0, &a), RiskLevel::High);
    }

    #[test]
    fn stablecoins_are_avoided() {
        let usdc = Token::new("usdc", "addr");
        let r = report(with_rsi(flat_analysis(), 15.0));
        let decision = evaluate_signal(&usdc, 1.0, &r, &r, &SignalConfig::default(), None, now());
        assert_eq!(decision.action(), SignalAction::Avoid);
    }

    #[test]
    fn no_setup_holds() {
        let r = report(flat_analysis());
        let decision = evaluate_signal(&sol(), 100.0, &r, &r, &SignalConfig::default(), None, now());
        assert!(matches!(decision, SignalDecision::Hold { .. }));
    }

    #[test]
    fn divergence_avoids() {
        let mut a4 = with_rsi(flat_analysis(), 15.0);
        a4.volume = VolumeAnalysis {
            confirmation: VolumeConfirmation::Divergence,
            ..VolumeAnalysis::insufficient()
        };
        let decision = evaluate_signal(
            &sol(),
            100.0,
            &report(a4),
            &report(flat_analysis()),
            &SignalConfig::default(),
            None,
            now(),
        );
        assert!(matches!(decision, SignalDecision::Avoid { reason } if reason.contains("divergence")));
    }

    #[test]
    fn extreme_oversold_signal() {
        let a4 = with_rsi(flat_analysis(), 18.0);
        let a1 = with_rsi(flat_analysis(), 28.0);
        let decision = evaluate_signal(
            &sol(),
            100.0,
            &report(a4),
            &report(a1),
            &SignalConfig::default(),
            None,
            now(),
        );
        let signal = decision.signal().unwrap();
        assert_eq!(signal.action, SignalAction::Long);
        assert_eq!(signal.targets.len(), 3);
        assert!(signal.stop_loss < signal.entry);
        assert!(signal.targets.iter().all(|t| *t > signal.entry));
        assert!(signal.reasoning.technical.starts_with("EXTREME OVERSOLD: RSI(4H)=18.0"));
        assert!(signal.reasoning.technical.contains("Multi-timeframe RSI alignment"));
        assert!(signal.reasoning.technical.ends_with("Daily: trend sideways"));
        assert_eq!(signal.indicators["rsi_4h"], 18.0);
        assert_eq!(signal.id, "sig_SOL_20250301080000");
        let names: Vec<&str> = signal.breakdown.factors.iter().map(|f| f.name.as_str()).collect();
        assert!(names.contains(&"Extreme Oversold RSI"));
    }

    #[test]
    fn min_confidence_turns_setup_into_avoid() {
        let r4 = report(with_rsi(flat_analysis(), 18.0));
        let r1 = report(flat_analysis());
        let config = SignalConfig {
            min_confidence: 96.0,
            ..SignalConfig::default()
        };
        let decision = evaluate_signal(&sol(), 100.0, &r4, &r1, &config, None, now());
        assert_eq!(decision.action(), SignalAction::Avoid);
    }

    struct Always(f64);

    impl WinRateProvider for Always {
        fn win_rate(&self, query: &WinRateQuery) -> Option<HistoricalStats> {
            assert_eq!(query.timeframe, Timeframe::FourHours);
            Some(HistoricalStats {
                win_rate: self.0,
                sample_size: 40,
            })
        }
    }

    #[test]
    fn historical_provider_feeds_confidence() {
        let r4 = report(with_rsi(flat_analysis(), 18.0));
        let r1 = report(flat_analysis());
        let config = SignalConfig::default();
        let with = evaluate_signal(&sol(), 100.0, &r4, &r1, &config, Some(&Always(80.0)), now());
        let with = with.signal().unwrap();
        assert_eq!(with.breakdown.similar_setups, 40);
        assert_eq!(with.breakdown.historical_win_rate, 80.0);
    }

    #[test]
    fn generate_needs_history_and_price() {
        let short = MultiTimeframeCandles {
            four_hours: from_closes(&[100.0; 10]),
            ..Default::default()
        };
        let decision = generate_signal(&sol(), &short, &SignalConfig::default(), None, now());
        assert!(matches!(decision, SignalDecision::Hold { reason } if reason.contains("insufficient")));

        let mut candles = MultiTimeframeCandles {
            four_hours: from_closes(&[100.0; 40]),
            one_day: from_closes(&[100.0; 40]),
            ..Default::default()
        };
        assert_eq!(candles.latest_price(), Some(100.0));
        candles.one_hour = vec![candle(0, 101.0, 101.0, 101.0, 101.5, 10.0)];
        assert_eq!(candles.latest_price(), Some(101.5));
    }

    #[test]
    fn falling_market_generates_long() {
        let closes: Vec<f64> = (0..60).map(|i| 200.0 - i as f64 * 2.0).collect();
        let candles = MultiTimeframeCandles {
            one_hour: Vec::new(),
            four_hours: from_closes(&closes),
            one_day: from_closes(&closes),
        };
        let decision = generate_signal(&sol(), &candles, &SignalConfig::default(), None, now());
        let signal = decision.signal().unwrap();
        assert_eq!(signal.action, SignalAction::Long);
        assert_eq!(signal.entry, 82.0);
    }
}
