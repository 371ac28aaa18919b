//! Batch backtests over (symbol x strategy) pairs.
//!
//! Each pair runs on its own immutable candle slice. A pair that fails is
//! recorded and the batch moves on.

use crate::domain::backtest::{BacktestConfig, BacktestResult, run_backtest};
use crate::domain::strategy::Strategy;
use crate::domain::win_rates::WinRateLedger;
use crate::ports::candle_port::CandlePort;
use crate::ports::clock_port::Clock;

#[derive(Debug, Clone, PartialEq)]
pub struct RunFailure {
    pub symbol: String,
    pub strategy: String,
    pub error: String,
}

#[derive(Debug, Default)]
pub struct BatchReport {
    /// Best total return first.
    pub results: Vec<BacktestResult>,
    pub failures: Vec<RunFailure>,
}

impl BatchReport {
    pub fn best(&self) -> Option<&BacktestResult> {
        self.results.first()
    }

    /// Win rates of every simulated trade, for scoring live signals.
    pub fn win_rate_ledger(&self) -> WinRateLedger {
        let mut ledger = WinRateLedger::new();
        for result in &self.results {
            ledger.record(result.config.timeframe, &result.trades);
        }
        ledger
    }
}

/// Run every strategy against every symbol. `base` supplies everything but
/// the symbol.
pub fn run_batch(
    base: &BacktestConfig,
    symbols: &[String],
    strategies: &[Strategy],
    candles: &dyn CandlePort,
    clock: &dyn Clock,
) -> BatchReport {
    let mut report = BatchReport::default();

    for symbol in symbols {
        let series = match candles.fetch_candles(symbol, base.timeframe) {
            Ok(series) => series,
            Err(e) => {
                tracing::warn!(symbol = %symbol, error = %e, "cannot load candles");
                report
                    .failures
                    .extend(strategies.iter().map(|s| RunFailure {
                        symbol: symbol.clone(),
                        strategy: s.name.clone(),
                        error: e.to_string(),
                    }));
                continue;
            }
        };

        let config = BacktestConfig {
            symbol: symbol.clone(),
            ..base.clone()
        };
        for strategy in strategies {
            match run_backtest(&config, strategy, &series, clock) {
                Ok(result) => report.results.push(result),
                Err(e) => {
                    tracing::warn!(
                        symbol = %symbol,
                        strategy = %strategy.name,
                        error = %e,
                        "backtest failed"
                    );
                    report.failures.push(RunFailure {
                        symbol: symbol.clone(),
                        strategy: strategy.name.clone(),
                        error: e.to_string(),
                    });
                }
            }
        }
    }

    report.results.sort_by(|a, b| {
        b.metrics
            .total_return
            .total_cmp(&a.metrics.total_return)
    });

    tracing::info!(
        symbols = symbols.len(),
        strategies = strategies.len(),
        completed = report.results.len(),
        failed = report.failures.len(),
        "batch complete"
    );
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::candle::Candle;
    use crate::domain::candle::fixtures::{candle, from_closes};
    use crate::domain::catalog;
    use crate::domain::error::CallerError;
    use crate::domain::timeframe::Timeframe;
    use chrono::{DateTime, TimeZone, Utc};

    struct FixedClock;

    impl Clock for FixedClock {
        fn now(&self) -> DateTime<Utc> {
            Utc.with_ymd_and_hms(2025, 3, 1, 0, 0, 0).unwrap()
        }
    }

    struct OnePort;

    impl CandlePort for OnePort {
        fn fetch_candles(
            &self,
            symbol: &str,
            timeframe: Timeframe,
        ) -> Result<Vec<Candle>, CallerError> {
            if symbol != "SOL" {
                return Err(CallerError::NoData {
                    symbol: symbol.to_string(),
                    timeframe: timeframe.to_string(),
                });
            }
            let mut candles = from_closes(&(0..15).map(|i| 100.0 - i as f64).collect::<Vec<_>>());
            candles.push(candle(15, 86.0, 97.0, 85.5, 96.0, 1000.0));
            Ok(candles)
        }

        fn list_symbols(&self, _timeframe: Timeframe) -> Result<Vec<String>, CallerError> {
            Ok(vec!["SOL".to_string()])
        }
    }

    #[test]
    fn failures_never_abort_the_batch() {
        let mut broken = catalog::rsi_oversold_long();
        broken.name = "Broken".into();
        broken.signals.clear();
        let strategies = vec![catalog::rsi_oversold_long(), broken, catalog::rsi_aggressive()];
        let symbols = vec!["SOL".to_string(), "NOPE".to_string()];
        let base = BacktestConfig::new("", Timeframe::FourHours);

        let report = run_batch(&base, &symbols, &strategies, &OnePort, &FixedClock);

        assert_eq!(report.results.len(), 2);
        assert_eq!(report.failures.len(), 4);
        assert_eq!(report.failures[0].strategy, "Broken");
        assert!(report.failures[1..].iter().all(|f| f.symbol == "NOPE"));

        // the aggressive trade is still open at 96 and closes +11.6%, above the 10% target
        let best = report.best().unwrap();
        assert_eq!(best.strategy_name, "Aggressive RSI");
        assert_eq!(best.config.symbol, "SOL");
        assert_eq!(report.win_rate_ledger().len(), 2);
    }
}
