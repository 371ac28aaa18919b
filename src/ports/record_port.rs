//! Backtest record persistence port trait.

use crate::domain::error::CallerError;
use crate::domain::record::BacktestRecord;

pub trait RecordPort {
    fn save(&self, record: &BacktestRecord) -> Result<(), CallerError>;

    fn load(&self, id: &str) -> Result<BacktestRecord, CallerError>;

    /// Stored record ids, sorted.
    fn list(&self) -> Result<Vec<String>, CallerError>;
}
