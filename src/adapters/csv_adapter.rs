//! CSV candle store: one `{SYMBOL}_{TF}.csv` file per symbol and timeframe.
//!
//! Files carry a `timestamp,open,high,low,close,volume` header with RFC3339
//! timestamps.

use crate::domain::candle::Candle;
use crate::domain::error::CallerError;
use crate::domain::timeframe::Timeframe;
use crate::ports::candle_port::CandlePort;
use std::fs;
use std::path::PathBuf;

pub struct CsvCandleAdapter {
    base_path: PathBuf,
}

impl CsvCandleAdapter {
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        Self {
            base_path: base_path.into(),
        }
    }

    fn csv_path(&self, symbol: &str, timeframe: Timeframe) -> PathBuf {
        self.base_path
            .join(format!("{}_{}.csv", symbol.to_ascii_uppercase(), timeframe))
    }

    /// Write `candles` to the file for `symbol`, replacing any existing one.
    pub fn write_candles(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        candles: &[Candle],
    ) -> Result<(), CallerError> {
        fs::create_dir_all(&self.base_path)?;
        let path = self.csv_path(symbol, timeframe);
        let mut writer = csv::Writer::from_path(&path).map_err(|e| CallerError::DataSource {
            reason: format!("failed to create {}: {}", path.display(), e),
        })?;
        for candle in candles {
            writer.serialize(candle).map_err(|e| CallerError::DataSource {
                reason: format!("failed to write {}: {}", path.display(), e),
            })?;
        }
        writer.flush()?;
        Ok(())
    }
}

impl CandlePort for CsvCandleAdapter {
    fn fetch_candles(
        &self,
        symbol: &str,
        timeframe: Timeframe,
    ) -> Result<Vec<Candle>, CallerError> {
        let path = self.csv_path(symbol, timeframe);
        if !path.exists() {
            return Err(CallerError::NoData {
                symbol: symbol.to_ascii_uppercase(),
                timeframe: timeframe.to_string(),
            });
        }

        let mut rdr = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_path(&path)
            .map_err(|e| CallerError::DataSource {
                reason: format!("failed to read {}: {}", path.display(), e),
            })?;

        let mut candles = Vec::new();
        for (row, result) in rdr.deserialize::<Candle>().enumerate() {
            let candle = result.map_err(|e| CallerError::DataSource {
                reason: format!("{} row {}: {}", path.display(), row + 1, e),
            })?;
            candles.push(candle);
        }

        candles.sort_by_key(|c| c.timestamp);
        tracing::debug!(
            symbol,
            %timeframe,
            candles = candles.len(),
            "loaded candles from csv"
        );
        Ok(candles)
    }

    fn list_symbols(&self, timeframe: Timeframe) -> Result<Vec<String>, CallerError> {
        let entries = fs::read_dir(&self.base_path).map_err(|e| CallerError::DataSource {
            reason: format!(
                "failed to read directory {}: {}",
                self.base_path.display(),
                e
            ),
        })?;

        let suffix = format!("_{}.csv", timeframe);
        let mut symbols = Vec::new();
        for entry in entries {
            let name = entry?.file_name();
            let name = name.to_string_lossy();
            if let Some(symbol) = name.strip_suffix(&suffix)
                && !symbol.is_empty()
            {
                symbols.push(symbol.to_string());
            }
        }

        symbols.sort();
        Ok(symbols)
    }
}
