//! tradecaller: technical-analysis trade signals and rule-based strategy
//! backtests over crypto OHLCV candles.
//!
//! Hexagonal architecture: domain logic in [`domain`], port traits in [`ports`],
//! concrete implementations in [`adapters`].

pub mod adapters;
pub mod cli;
pub mod domain;
pub mod logging;
pub mod ports;
