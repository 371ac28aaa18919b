//! Technical indicator implementations.
//!
//! Two shapes of output live here:
//! - aligned series (`IndicatorSeries`), one point per candle with a validity
//!   flag, used when replaying history candle by candle;
//! - latest-value analyses (`RsiResult`, `MacdResult`, `TrendResult`, ...)
//!   that summarise the end of a series and fall back to neutral sentinels
//!   when there is not enough history.
//!
//! Every function here is pure.

pub mod atr;
pub mod ema;
pub mod fibonacci;
pub mod macd;
pub mod rsi;
pub mod stddev;
pub mod support_resistance;
pub mod trend;
pub mod volume;

pub use atr::calculate_atr;
pub use ema::{calculate_ema, ema_latest, ema_values};
pub use fibonacci::{FibonacciAnalysis, analyze_fibonacci};
pub use macd::{MacdCrossover, MacdResult, MacdTrend, analyze_macd, calculate_macd};
pub use rsi::{RsiDivergence, RsiResult, RsiSignal, analyze_rsi, calculate_rsi, rsi_values};
pub use support_resistance::{PricePosition, SupportResistance, analyze_support_resistance};
pub use trend::{EmaAlignment, TrendDirection, TrendResult, analyze_trend, classify_trend};
pub use volume::{VolumeAnalysis, VolumeConfirmation, VolumeTrend, analyze_volume};

use chrono::{DateTime, Utc};
use std::fmt;

#[derive(Debug, Clone)]
pub struct IndicatorPoint {
    pub timestamp: DateTime<Utc>,
    pub valid: bool,
    pub value: IndicatorValue,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum IndicatorValue {
    Simple(f64),
    Macd {
        line: f64,
        signal: f64,
        histogram: f64,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IndicatorType {
    Ema(usize),
    Rsi(usize),
    Atr(usize),
    Macd {
        fast: usize,
        slow: usize,
        signal: usize,
    },
}

#[derive(Debug, Clone)]
pub struct IndicatorSeries {
    pub indicator_type: IndicatorType,
    pub values: Vec<IndicatorPoint>,
}

impl IndicatorSeries {
    /// Value at `index` for single-valued indicators, `None` during warmup.
    pub fn simple_at(&self, index: usize) -> Option<f64> {
        match self.values.get(index) {
            Some(IndicatorPoint {
                valid: true,
                value: IndicatorValue::Simple(v),
                ..
            }) => Some(*v),
            _ => None,
        }
    }

    /// (line, signal, histogram) at `index`, `None` during warmup.
    pub fn macd_at(&self, index: usize) -> Option<(f64, f64, f64)> {
        match self.values.get(index) {
            Some(IndicatorPoint {
                valid: true,
                value:
                    IndicatorValue::Macd {
                        line,
                        signal,
                        histogram,
                    },
                ..
            }) => Some((*line, *signal, *histogram)),
            _ => None,
        }
    }

    pub fn first_valid_index(&self) -> Option<usize> {
        self.values.iter().position(|p| p.valid)
    }
}

impl fmt::Display for IndicatorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IndicatorType::Ema(period) => write!(f, "EMA({})", period),
            IndicatorType::Rsi(period) => write!(f, "RSI({})", period),
            IndicatorType::Atr(period) => write!(f, "ATR({})", period),
            IndicatorType::Macd { fast, slow, signal } => {
                write!(f, "MACD({},{},{})", fast, slow, signal)
            }
        }
    }
}

/// Wrap aligned optional values as a series stamped with candle timestamps.
pub(crate) fn series_from_values(
    indicator_type: IndicatorType,
    timestamps: impl Iterator<Item = DateTime<Utc>>,
    values: &[Option<f64>],
) -> IndicatorSeries {
    let values = timestamps
        .zip(values)
        .map(|(timestamp, v)| IndicatorPoint {
            timestamp,
            valid: v.is_some(),
            value: IndicatorValue::Simple(v.unwrap_or(0.0)),
        })
        .collect();

    IndicatorSeries {
        indicator_type,
        values,
    }
}
