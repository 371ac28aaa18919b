#![allow(dead_code)]

use chrono::{DateTime, Duration, TimeZone, Utc};
use std::collections::HashMap;
use tradecaller::domain::candle::Candle;
use tradecaller::domain::error::CallerError;
use tradecaller::domain::timeframe::Timeframe;
use tradecaller::ports::candle_port::CandlePort;
use tradecaller::ports::clock_port::Clock;

pub struct MockCandlePort {
    pub data: HashMap<(String, Timeframe), Vec<Candle>>,
    pub errors: HashMap<String, String>,
}

impl MockCandlePort {
    pub fn new() -> Self {
        Self {
            data: HashMap::new(),
            errors: HashMap::new(),
        }
    }

    pub fn with_candles(mut self, symbol: &str, timeframe: Timeframe, candles: Vec<Candle>) -> Self {
        self.data.insert((symbol.to_string(), timeframe), candles);
        self
    }

    pub fn with_error(mut self, symbol: &str, reason: &str) -> Self {
        self.errors.insert(symbol.to_string(), reason.to_string());
        self
    }
}

impl CandlePort for MockCandlePort {
    fn fetch_candles(
        &self,
        symbol: &str,
        timeframe: Timeframe,
    ) -> Result<Vec<Candle>, CallerError> {
        if let Some(reason) = self.errors.get(symbol) {
            return Err(CallerError::DataSource {
                reason: reason.clone(),
            });
        }
        self.data
            .get(&(symbol.to_string(), timeframe))
            .cloned()
            .ok_or_else(|| CallerError::NoData {
                symbol: symbol.to_string(),
                timeframe: timeframe.to_string(),
            })
    }

    fn list_symbols(&self, timeframe: Timeframe) -> Result<Vec<String>, CallerError> {
        let mut symbols: Vec<String> = self
            .data
            .keys()
            .filter(|(_, tf)| *tf == timeframe)
            .map(|(s, _)| s.clone())
            .collect();
        symbols.sort();
        Ok(symbols)
    }
}

pub struct FixedClock(pub DateTime<Utc>);

impl FixedClock {
    pub fn default_time() -> Self {
        FixedClock(Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap())
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

/// Candle `index` periods of `timeframe` after 2024-01-01T00:00Z.
pub fn candle_at(
    timeframe: Timeframe,
    index: usize,
    open: f64,
    high: f64,
    low: f64,
    close: f64,
) -> Candle {
    Candle {
        timestamp: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
            + Duration::hours(timeframe.hours() * index as i64),
        open,
        high,
        low,
        close,
        volume: 1000.0,
    }
}

/// Flat 4H candles, one per close.
pub fn flat(closes: &[f64]) -> Vec<Candle> {
    closes
        .iter()
        .enumerate()
        .map(|(i, &c)| candle_at(Timeframe::FourHours, i, c, c, c, c))
        .collect()
}

/// Fifteen closes falling 100 -> 86 (RSI 0 from the 15th), then `last`.
pub fn dip_then(last: Candle) -> Vec<Candle> {
    let closes: Vec<f64> = (0..15).map(|i| 100.0 - i as f64).collect();
    let mut candles = flat(&closes);
    candles.push(last);
    candles
}

pub fn write_temp_ini(content: &str) -> tempfile::NamedTempFile {
    use std::io::Write;
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file.flush().unwrap();
    file
}
