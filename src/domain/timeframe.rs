//! Candle bucket sizes.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Timeframe {
    #[serde(rename = "1H")]
    OneHour,
    #[serde(rename = "4H")]
    FourHours,
    #[serde(rename = "1D")]
    OneDay,
    #[serde(rename = "1W")]
    OneWeek,
}

impl Timeframe {
    pub const ALL: [Timeframe; 4] = [
        Timeframe::OneHour,
        Timeframe::FourHours,
        Timeframe::OneDay,
        Timeframe::OneWeek,
    ];

    pub fn hours(&self) -> i64 {
        match self {
            Timeframe::OneHour => 1,
            Timeframe::FourHours => 4,
            Timeframe::OneDay => 24,
            Timeframe::OneWeek => 168,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Timeframe::OneHour => "1H",
            Timeframe::FourHours => "4H",
            Timeframe::OneDay => "1D",
            Timeframe::OneWeek => "1W",
        }
    }
}

impl fmt::Display for Timeframe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown timeframe '{0}' (expected 1H, 4H, 1D or 1W)")]
pub struct ParseTimeframeError(pub String);

impl FromStr for Timeframe {
    type Err = ParseTimeframeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "1H" => Ok(Timeframe::OneHour),
            "4H" => Ok(Timeframe::FourHours),
            "1D" => Ok(Timeframe::OneDay),
            "1W" => Ok(Timeframe::OneWeek),
            other => Err(ParseTimeframeError(other.to_string())),
        }
    }
}
