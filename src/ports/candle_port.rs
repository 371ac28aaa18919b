//! Candle data access port trait.

use crate::domain::candle::Candle;
use crate::domain::error::CallerError;
use crate::domain::timeframe::Timeframe;

pub trait CandlePort {
    /// Chronological candles for `symbol`. An unknown symbol is an error; a
    /// known symbol with no rows yields an empty vector.
    fn fetch_candles(&self, symbol: &str, timeframe: Timeframe)
    -> Result<Vec<Candle>, CallerError>;

    fn list_symbols(&self, timeframe: Timeframe) -> Result<Vec<String>, CallerError>;
}
