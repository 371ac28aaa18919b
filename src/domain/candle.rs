//! OHLCV candle representation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    pub timestamp: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

impl Candle {
    /// max(high - low, |high - prev_close|, |low - prev_close|)
    pub fn true_range(&self, prev_close: f64) -> f64 {
        let hl = self.high - self.low;
        let hc = (self.high - prev_close).abs();
        let lc = (self.low - prev_close).abs();
        hl.max(hc).max(lc)
    }
}

pub fn closes(candles: &[Candle]) -> Vec<f64> {
    candles.iter().map(|c| c.close).collect()
}

/// Whether timestamps strictly increase. Gaps between candles are tolerated.
pub fn is_chronological(candles: &[Candle]) -> bool {
    candles.windows(2).all(|w| w[0].timestamp < w[1].timestamp)
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::Candle;
    use chrono::{Duration, TimeZone, Utc};

    /// Candle `index` hours after 2024-01-01T00:00Z.
    pub fn candle(index: usize, open: f64, high: f64, low: f64, close: f64, volume: f64) -> Candle {
        Candle {
            timestamp: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
                + Duration::hours(index as i64),
            open,
            high,
            low,
            close,
            volume,
        }
    }

    /// Flat candles (open = high = low = close) with constant volume.
    pub fn from_closes(closes: &[f64]) -> Vec<Candle> {
        closes
            .iter()
            .enumerate()
            .map(|(i, &c)| candle(i, c, c, c, c, 1000.0))
            .collect()
    }
}
