//! Historical win-rate port trait.

use crate::domain::confidence::HistoricalStats;
use crate::domain::indicator::TrendDirection;
use crate::domain::timeframe::Timeframe;
use crate::domain::trade::Side;

/// Describes the setup being scored.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WinRateQuery {
    pub side: Side,
    pub rsi: f64,
    pub trend: TrendDirection,
    pub timeframe: Timeframe,
}

/// Supplies win rates of past setups similar to a query. Returning `None`
/// skips the historical confidence factor.
pub trait WinRateProvider {
    fn win_rate(&self, query: &WinRateQuery) -> Option<HistoricalStats>;
}
