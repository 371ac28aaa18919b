//! Typed strategy conditions.
//!
//! A condition names an indicator, a comparator and a threshold (or one of a
//! few structural checks) and is evaluated against an [`IndicatorSnapshot`].
//!
//! # Evaluation Semantics
//!
//! - An indicator still in warmup resolves to NaN, so every comparison on it
//!   is false
//! - `MacdCross` needs both the current and the previous histogram
//! - `PriceAt` is false when levels were not computed
//! - `All` is true only when every child is true

use crate::domain::indicator::{MacdCrossover, PricePosition, TrendDirection};
use crate::domain::snapshot::IndicatorSnapshot;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Indicator {
    Rsi,
    /// MACD line minus signal line.
    MacdHistogram,
    MacdLine,
    Price,
    VolumeRatio,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparator {
    Below,
    Above,
    AtMost,
    AtLeast,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CrossDirection {
    Above,
    Below,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    Threshold {
        indicator: Indicator,
        comparator: Comparator,
        value: f64,
    },
    MacdCross(CrossDirection),
    Trend(TrendDirection),
    PriceAt(PricePosition),
    All(Vec<Condition>),
}

impl Condition {
    pub fn below(indicator: Indicator, value: f64) -> Self {
        Condition::Threshold {
            indicator,
            comparator: Comparator::Below,
            value,
        }
    }

    pub fn above(indicator: Indicator, value: f64) -> Self {
        Condition::Threshold {
            indicator,
            comparator: Comparator::Above,
            value,
        }
    }

    pub fn evaluate(&self, snapshot: &IndicatorSnapshot) -> bool {
        match self {
            Condition::Threshold {
                indicator,
                comparator,
                value,
            } => {
                let v = resolve(*indicator, snapshot);
                match comparator {
                    Comparator::Below => v < *value,
                    Comparator::Above => v > *value,
                    Comparator::AtMost => v <= *value,
                    Comparator::AtLeast => v >= *value,
                }
            }
            Condition::MacdCross(direction) => {
                let (Some(macd), Some(prev)) = (snapshot.macd, snapshot.prev_histogram) else {
                    return false;
                };
                matches!(
                    (direction, MacdCrossover::between(prev, macd.histogram)),
                    (CrossDirection::Above, Some(MacdCrossover::BullishCross))
                        | (CrossDirection::Below, Some(MacdCrossover::BearishCross))
                )
            }
            Condition::Trend(direction) => snapshot.trend == *direction,
            Condition::PriceAt(position) => snapshot.price_position == Some(*position),
            Condition::All(conditions) => {
                !conditions.is_empty() && conditions.iter().all(|c| c.evaluate(snapshot))
            }
        }
    }

    /// Whether evaluation needs support/resistance levels in the snapshot.
    pub fn needs_levels(&self) -> bool {
        match self {
            Condition::PriceAt(_) => true,
            Condition::All(conditions) => conditions.iter().any(Condition::needs_levels),
            _ => false,
        }
    }

    /// Leaf conditions in order.
    pub fn leaves(&self) -> Vec<&Condition> {
        match self {
            Condition::All(conditions) => conditions.iter().flat_map(|c| c.leaves()).collect(),
            leaf => vec![leaf],
        }
    }
}

fn resolve(indicator: Indicator, snapshot: &IndicatorSnapshot) -> f64 {
    let value = match indicator {
        Indicator::Rsi => snapshot.rsi,
        Indicator::MacdHistogram => snapshot.macd.map(|m| m.histogram),
        Indicator::MacdLine => snapshot.macd.map(|m| m.line),
        Indicator::Price => Some(snapshot.price),
        Indicator::VolumeRatio => snapshot.volume_ratio,
    };
    value.unwrap_or(f64::NAN)
}

impl fmt::Display for Indicator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Indicator::Rsi => "RSI",
            Indicator::MacdHistogram => "MACD",
            Indicator::MacdLine => "MACD_LINE",
            Indicator::Price => "PRICE",
            Indicator::VolumeRatio => "VOLUME_RATIO",
        };
        f.write_str(s)
    }
}

impl fmt::Display for Comparator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Comparator::Below => "<",
            Comparator::Above => ">",
            Comparator::AtMost => "<=",
            Comparator::AtLeast => ">=",
        };
        f.write_str(s)
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Condition::Threshold {
                indicator,
                comparator,
                value,
            } => write!(f, "{indicator} {comparator} {value}"),
            Condition::MacdCross(CrossDirection::Above) => f.write_str("MACD CROSS_ABOVE"),
            Condition::MacdCross(CrossDirection::Below) => f.write_str("MACD CROSS_BELOW"),
            Condition::Trend(TrendDirection::Up) => f.write_str("UPTREND"),
            Condition::Trend(TrendDirection::Down) => f.write_str("DOWNTREND"),
            Condition::Trend(TrendDirection::Sideways) => f.write_str("SIDEWAYS"),
            Condition::PriceAt(PricePosition::NearSupport) => f.write_str("NEAR_SUPPORT"),
            Condition::PriceAt(PricePosition::NearResistance) => f.write_str("NEAR_RESISTANCE"),
            Condition::PriceAt(PricePosition::MidRange) => f.write_str("MID_RANGE"),
            Condition::All(conditions) => {
                let parts: Vec<String> = conditions.iter().map(|c| c.to_string()).collect();
                write!(f, "{}", parts.join(" AND "))
            }
        }
    }
}
