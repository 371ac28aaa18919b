//! Core domain types and logic. Nothing here performs I/O; data, time and
//! history come in through the traits in [`crate::ports`].

pub mod analysis;
pub mod backtest;
pub mod batch;
pub mod cache;
pub mod candle;
pub mod catalog;
pub mod condition;
pub mod confidence;
pub mod config_validation;
pub mod error;
pub mod indicator;
pub mod insights;
pub mod metrics;
pub mod record;
pub mod scanner;
pub mod signal;
pub mod snapshot;
pub mod strategy;
pub mod timeframe;
pub mod token;
pub mod trade;
pub mod win_rates;
