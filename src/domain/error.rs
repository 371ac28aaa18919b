//! Domain error types.
//!
//! Indicator and analysis code never produces these: short or degenerate
//! series degrade to sentinel results instead. Errors are reserved for
//! configuration, data access, malformed strategies and stored records.

/// Top-level error type for tradecaller.
#[derive(Debug, thiserror::Error)]
pub enum CallerError {
    #[error("config parse error in {file}: {reason}")]
    ConfigParse { file: String, reason: String },

    #[error("missing config key [{section}] {key}")]
    ConfigMissing { section: String, key: String },

    #[error("invalid config value [{section}] {key}: {reason}")]
    ConfigInvalid {
        section: String,
        key: String,
        reason: String,
    },

    #[error("invalid strategy '{strategy}': {reason}")]
    StrategyInvalid { strategy: String, reason: String },

    #[error("unknown strategy '{0}'")]
    UnknownStrategy(String),

    #[error("no data for {symbol} on {timeframe}")]
    NoData { symbol: String, timeframe: String },

    #[error(
        "insufficient data for {symbol} on {timeframe}: have {candles} candles, need {minimum}"
    )]
    InsufficientData {
        symbol: String,
        timeframe: String,
        candles: usize,
        minimum: usize,
    },

    #[error("data source error: {reason}")]
    DataSource { reason: String },

    #[error("record error: {reason}")]
    Record { reason: String },

    #[error("unsupported record schema version {found} (supported: {supported})")]
    UnsupportedSchema { found: u32, supported: u32 },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl From<&CallerError> for std::process::ExitCode {
    fn from(err: &CallerError) -> Self {
        let code: u8 = match err {
            CallerError::Io(_) => 1,
            CallerError::ConfigParse { .. }
            | CallerError::ConfigMissing { .. }
            | CallerError::ConfigInvalid { .. } => 2,
            CallerError::NoData { .. }
            | CallerError::InsufficientData { .. }
            | CallerError::DataSource { .. } => 3,
            CallerError::StrategyInvalid { .. } | CallerError::UnknownStrategy(_) => 4,
            CallerError::Record { .. } | CallerError::UnsupportedSchema { .. } => 5,
        };
        std::process::ExitCode::from(code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_includes_context() {
        let err = CallerError::InsufficientData {
            symbol: "SOL".into(),
            timeframe: "4H".into(),
            candles: 12,
            minimum: 30,
        };
        assert_eq!(
            err.to_string(),
            "insufficient data for SOL on 4H: have 12 candles, need 30"
        );
    }

    #[test]
    fn strategy_errors_display() {
        let err = CallerError::UnknownStrategy("Moon Shot".into());
        assert_eq!(err.to_string(), "unknown strategy 'Moon Shot'");

        let err = CallerError::StrategyInvalid {
            strategy: "Empty".into(),
            reason: "no entry rules".into(),
        };
        assert_eq!(err.to_string(), "invalid strategy 'Empty': no entry rules");
    }

    #[test]
    fn io_error_converts() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let err: CallerError = io.into();
        assert!(matches!(err, CallerError::Io(_)));
    }
}
