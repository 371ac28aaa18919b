//! Trend direction and strength from EMA structure and recent price action.
//!
//! Direction compares the 20-candle fractional price change against twice
//! the population stddev of the single-step returns over the same window.

use crate::domain::candle::Candle;
use crate::domain::indicator::ema_latest;
use crate::domain::indicator::stddev::{population_stddev, step_returns};
use serde::{Deserialize, Serialize};

pub const WINDOW: usize = 20;
const VOLATILITY_MULTIPLIER: f64 = 2.0;
const CHANGE_SCALE: f64 = 500.0;
const ALIGNMENT_BONUS: f64 = 20.0;
const POSITION_BONUS: f64 = 15.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TrendDirection {
    Up,
    Down,
    Sideways,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EmaAlignment {
    Bullish,
    Bearish,
    Mixed,
}

impl EmaAlignment {
    pub fn of(ema20: f64, ema50: f64, ema200: f64) -> Self {
        if ema20 > ema50 && ema50 > ema200 {
            EmaAlignment::Bullish
        } else if ema20 < ema50 && ema50 < ema200 {
            EmaAlignment::Bearish
        } else {
            EmaAlignment::Mixed
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendResult {
    pub direction: TrendDirection,
    /// 0..=100, always 0 when sideways.
    pub strength: f64,
    pub ema20: f64,
    pub ema50: f64,
    pub ema200: f64,
    pub above_ema20: bool,
    pub above_ema50: bool,
    pub above_ema200: bool,
    pub alignment: EmaAlignment,
}

impl TrendResult {
    pub fn sideways() -> Self {
        TrendResult {
            direction: TrendDirection::Sideways,
            strength: 0.0,
            ema20: 0.0,
            ema50: 0.0,
            ema200: 0.0,
            above_ema20: false,
            above_ema50: false,
            above_ema200: false,
            alignment: EmaAlignment::Mixed,
        }
    }

    pub fn emas_above(&self) -> usize {
        [self.above_ema20, self.above_ema50, self.above_ema200]
            .iter()
            .filter(|b| **b)
            .count()
    }

    pub fn description(&self) -> String {
        let mut text = match self.direction {
            TrendDirection::Up => format!("Uptrend detected (strength {}/100)", self.strength),
            TrendDirection::Down => {
                format!("Downtrend detected (strength {}/100)", self.strength)
            }
            TrendDirection::Sideways => "Sideways/consolidation phase".to_string(),
        };
        match self.alignment {
            EmaAlignment::Bullish => text.push_str(". EMAs bullishly aligned (20 > 50 > 200)"),
            EmaAlignment::Bearish => text.push_str(". EMAs bearishly aligned (20 < 50 < 200)"),
            EmaAlignment::Mixed => {}
        }
        text.push_str(&format!(". Price above {}/3 key EMAs", self.emas_above()));
        text
    }
}

pub fn analyze_trend(candles: &[Candle]) -> TrendResult {
    if candles.len() < WINDOW {
        return TrendResult::sideways();
    }

    let closes: Vec<f64> = candles.iter().map(|c| c.close).collect();
    let ema20 = ema_latest(&closes, 20);
    let ema50 = ema_latest(&closes, 50);
    let ema200 = ema_latest(&closes, 200);
    classify_trend(&closes[closes.len() - WINDOW..], [ema20, ema50, ema200])
}

/// Trend from the last [`WINDOW`] closes and the EMA20/50/200 values at the
/// final close. Fewer than `WINDOW` closes yields the sideways sentinel.
pub fn classify_trend(recent: &[f64], emas: [f64; 3]) -> TrendResult {
    if recent.len() < WINDOW {
        return TrendResult::sideways();
    }
    let recent = &recent[recent.len() - WINDOW..];
    let [ema20, ema50, ema200] = emas;
    let price = recent[WINDOW - 1];

    let above_ema20 = price > ema20;
    let above_ema50 = price > ema50;
    let above_ema200 = price > ema200;
    let alignment = EmaAlignment::of(ema20, ema50, ema200);

    let price_change = if recent[0] != 0.0 {
        (recent[WINDOW - 1] - recent[0]) / recent[0]
    } else {
        0.0
    };
    let threshold = population_stddev(&step_returns(recent)) * VOLATILITY_MULTIPLIER;

    let direction = if price_change > threshold {
        TrendDirection::Up
    } else if price_change < -threshold {
        TrendDirection::Down
    } else {
        TrendDirection::Sideways
    };

    let strength = match direction {
        TrendDirection::Sideways => 0.0,
        _ => {
            let mut strength = (price_change.abs() * CHANGE_SCALE).round().min(100.0);
            let aligned = matches!(
                (direction, alignment),
                (TrendDirection::Up, EmaAlignment::Bullish)
                    | (TrendDirection::Down, EmaAlignment::Bearish)
            );
            if aligned {
                strength = (strength + ALIGNMENT_BONUS).min(100.0);
            }
            let all_above = above_ema20 && above_ema50 && above_ema200;
            let all_below = !above_ema20 && !above_ema50 && !above_ema200;
            if (direction == TrendDirection::Up && all_above)
                || (direction == TrendDirection::Down && all_below)
            {
                strength = (strength + POSITION_BONUS).min(100.0);
            }
            strength
        }
    };

    TrendResult {
        direction,
        strength,
        ema20,
        ema50,
        ema200,
        above_ema20,
        above_ema50,
        above_ema200,
        alignment,
    }
}
