//! Configuration validation and typed config construction.
//!
//! Every field is checked before a run starts; the `*_from` builders only
//! run after validation and read the same keys with the same defaults.

use crate::domain::backtest::{
    BacktestConfig, DEFAULT_ANNUALIZATION, DEFAULT_ENTRY_THRESHOLD, DEFAULT_INITIAL_CAPITAL,
    DEFAULT_POSITION_SIZE,
};
use crate::domain::cache::DEFAULT_TTL_SECS;
use crate::domain::catalog;
use crate::domain::error::CallerError;
use crate::domain::signal::{DEFAULT_STOP_PERCENT, SignalConfig, StopMode};
use crate::domain::strategy::Strategy;
use crate::domain::timeframe::Timeframe;
use crate::domain::token::parse_symbols;
use crate::ports::config_port::ConfigPort;
use chrono::{DateTime, Utc};

pub const DEFAULT_TIMEFRAME: Timeframe = Timeframe::FourHours;
/// `strategy = all` runs the whole catalog.
pub const ALL_STRATEGIES: &str = "all";

fn invalid(section: &str, key: &str, reason: impl Into<String>) -> CallerError {
    CallerError::ConfigInvalid {
        section: section.to_string(),
        key: key.to_string(),
        reason: reason.into(),
    }
}

fn missing(section: &str, key: &str) -> CallerError {
    CallerError::ConfigMissing {
        section: section.to_string(),
        key: key.to_string(),
    }
}

fn non_empty(config: &dyn ConfigPort, section: &str, key: &str) -> Option<String> {
    config
        .get_string(section, key)
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

pub fn validate_backtest_config(config: &dyn ConfigPort) -> Result<(), CallerError> {
    validate_symbols(config)?;
    validate_timeframe(config)?;
    validate_initial_capital(config)?;
    validate_position_size(config)?;
    validate_entry_threshold(config)?;
    validate_annualization(config)?;
    validate_dates(config)?;
    validate_strategy_name(config)?;
    Ok(())
}

pub fn validate_data_config(config: &dyn ConfigPort) -> Result<(), CallerError> {
    non_empty(config, "data", "directory")
        .map(|_| ())
        .ok_or_else(|| missing("data", "directory"))
}

pub fn validate_signal_config(config: &dyn ConfigPort) -> Result<(), CallerError> {
    let min_confidence = config.get_double("signal", "min_confidence", 0.0);
    if !(0.0..=100.0).contains(&min_confidence) {
        return Err(invalid(
            "signal",
            "min_confidence",
            "min_confidence must be between 0 and 100",
        ));
    }

    match non_empty(config, "signal", "stop_mode").as_deref() {
        None | Some("support") | Some("percent") => {}
        Some(other) => {
            return Err(invalid(
                "signal",
                "stop_mode",
                format!("unknown stop_mode '{other}', expected support or percent"),
            ));
        }
    }

    let stop_percent = config.get_double("signal", "stop_percent", DEFAULT_STOP_PERCENT);
    if !(stop_percent > 0.0 && stop_percent < 100.0) {
        return Err(invalid(
            "signal",
            "stop_percent",
            "stop_percent must be between 0 and 100",
        ));
    }

    if config.get_int("signal", "cache_ttl_secs", DEFAULT_TTL_SECS) < 0 {
        return Err(invalid(
            "signal",
            "cache_ttl_secs",
            "cache_ttl_secs must be non-negative",
        ));
    }
    Ok(())
}

fn validate_symbols(config: &dyn ConfigPort) -> Result<(), CallerError> {
    if let Some(list) = non_empty(config, "backtest", "symbols") {
        return parse_symbols(&list)
            .map(|_| ())
            .map_err(|e| invalid("backtest", "symbols", e.to_string()));
    }
    non_empty(config, "backtest", "symbol")
        .map(|_| ())
        .ok_or_else(|| missing("backtest", "symbol"))
}

fn validate_timeframe(config: &dyn ConfigPort) -> Result<(), CallerError> {
    timeframe_from(config).map(|_| ())
}

fn validate_initial_capital(config: &dyn ConfigPort) -> Result<(), CallerError> {
    let value = config.get_double("backtest", "initial_capital", DEFAULT_INITIAL_CAPITAL);
    if value <= 0.0 {
        return Err(invalid(
            "backtest",
            "initial_capital",
            "initial_capital must be positive",
        ));
    }
    Ok(())
}

fn validate_position_size(config: &dyn ConfigPort) -> Result<(), CallerError> {
    let value = config.get_double("backtest", "position_size", DEFAULT_POSITION_SIZE);
    if value <= 0.0 || value > 100.0 {
        return Err(invalid(
            "backtest",
            "position_size",
            "position_size must be a percent in (0, 100]",
        ));
    }
    Ok(())
}

fn validate_entry_threshold(config: &dyn ConfigPort) -> Result<(), CallerError> {
    let value = config.get_double("backtest", "entry_threshold", DEFAULT_ENTRY_THRESHOLD);
    if value <= 0.0 {
        return Err(invalid(
            "backtest",
            "entry_threshold",
            "entry_threshold must be positive",
        ));
    }
    Ok(())
}

fn validate_annualization(config: &dyn ConfigPort) -> Result<(), CallerError> {
    let value = config.get_double("backtest", "annualization", DEFAULT_ANNUALIZATION);
    if value <= 0.0 {
        return Err(invalid(
            "backtest",
            "annualization",
            "annualization must be positive",
        ));
    }
    Ok(())
}

fn parse_time(config: &dyn ConfigPort, key: &str) -> Result<Option<DateTime<Utc>>, CallerError> {
    match non_empty(config, "backtest", key) {
        None => Ok(None),
        Some(s) => DateTime::parse_from_rfc3339(&s)
            .map(|t| Some(t.with_timezone(&Utc)))
            .map_err(|_| invalid("backtest", key, format!("invalid {key}, expected RFC3339"))),
    }
}

fn validate_dates(config: &dyn ConfigPort) -> Result<(), CallerError> {
    let start = parse_time(config, "start")?;
    let end = parse_time(config, "end")?;
    if let (Some(start), Some(end)) = (start, end)
        && start >= end
    {
        return Err(invalid("backtest", "start", "start must be before end"));
    }
    Ok(())
}

fn validate_strategy_name(config: &dyn ConfigPort) -> Result<(), CallerError> {
    strategies_from(config).map(|_| ())
}

pub fn timeframe_from(config: &dyn ConfigPort) -> Result<Timeframe, CallerError> {
    match non_empty(config, "backtest", "timeframe") {
        None => Ok(DEFAULT_TIMEFRAME),
        Some(s) => s
            .parse()
            .map_err(|e: crate::domain::timeframe::ParseTimeframeError| {
                invalid("backtest", "timeframe", e.to_string())
            }),
    }
}

/// `symbols` when set, else the single `symbol`.
pub fn symbols_from(config: &dyn ConfigPort) -> Result<Vec<String>, CallerError> {
    if let Some(list) = non_empty(config, "backtest", "symbols") {
        return parse_symbols(&list).map_err(|e| invalid("backtest", "symbols", e.to_string()));
    }
    non_empty(config, "backtest", "symbol")
        .map(|s| vec![s.to_ascii_uppercase()])
        .ok_or_else(|| missing("backtest", "symbol"))
}

/// Catalog strategies named by `strategy`; defaults to the first entry.
pub fn strategies_from(config: &dyn ConfigPort) -> Result<Vec<Strategy>, CallerError> {
    match non_empty(config, "backtest", "strategy") {
        Some(name) if name.eq_ignore_ascii_case(ALL_STRATEGIES) => Ok(catalog::all()),
        Some(name) => catalog::find(&name).map(|s| vec![s]),
        None => Ok(vec![catalog::rsi_oversold_long()]),
    }
}

/// Validated [`BacktestConfig`] for the first configured symbol.
pub fn backtest_config_from(config: &dyn ConfigPort) -> Result<BacktestConfig, CallerError> {
    validate_backtest_config(config)?;
    let symbols = symbols_from(config)?;
    let symbol = symbols
        .into_iter()
        .next()
        .ok_or_else(|| missing("backtest", "symbol"))?;
    Ok(BacktestConfig {
        symbol,
        timeframe: timeframe_from(config)?,
        initial_capital: config.get_double("backtest", "initial_capital", DEFAULT_INITIAL_CAPITAL),
        position_size: config.get_double("backtest", "position_size", DEFAULT_POSITION_SIZE),
        entry_threshold: config.get_double("backtest", "entry_threshold", DEFAULT_ENTRY_THRESHOLD),
        annualization: config.get_double("backtest", "annualization", DEFAULT_ANNUALIZATION),
        start: parse_time(config, "start")?,
        end: parse_time(config, "end")?,
    })
}

pub fn signal_config_from(config: &dyn ConfigPort) -> Result<SignalConfig, CallerError> {
    validate_signal_config(config)?;
    let stop_mode = match non_empty(config, "signal", "stop_mode").as_deref() {
        Some("percent") => StopMode::Percent(config.get_double(
            "signal",
            "stop_percent",
            DEFAULT_STOP_PERCENT,
        )),
        _ => StopMode::SupportResistance,
    };
    Ok(SignalConfig {
        stop_mode,
        min_confidence: config.get_double("signal", "min_confidence", 0.0),
        fundamental_score: None,
    })
}

pub fn cache_ttl_from(config: &dyn ConfigPort) -> chrono::Duration {
    chrono::Duration::seconds(config.get_int("signal", "cache_ttl_secs", DEFAULT_TTL_SECS).max(0))
}
