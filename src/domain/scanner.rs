//! Signal scan over many tokens.
//!
//! Analyses are cached per (symbol, timeframe) so repeated scans inside the
//! cache TTL skip both the fetch and the indicator pass. A token whose data
//! cannot be fetched is logged and skipped; it never stops the scan.

use crate::domain::analysis::{AnalysisReport, run_technical_analysis};
use crate::domain::cache::AnalysisCache;
use crate::domain::error::CallerError;
use crate::domain::signal::{MIN_CANDLES, SignalConfig, SignalDecision, TradingSignal, evaluate_signal};
use crate::domain::timeframe::Timeframe;
use crate::domain::token::Token;
use crate::ports::candle_port::CandlePort;
use crate::ports::clock_port::Clock;
use crate::ports::win_rate_port::WinRateProvider;
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq)]
pub struct SkippedToken {
    pub symbol: String,
    pub reason: String,
}

#[derive(Debug, Default)]
pub struct ScanReport {
    /// Highest confidence first.
    pub signals: Vec<TradingSignal>,
    pub held: Vec<SkippedToken>,
    pub avoided: Vec<SkippedToken>,
    /// Tokens whose data could not be fetched or analyzed.
    pub skipped: Vec<SkippedToken>,
}

pub struct SignalScanner<'a> {
    candles: &'a dyn CandlePort,
    win_rates: Option<&'a dyn WinRateProvider>,
    clock: Arc<dyn Clock>,
    cache: AnalysisCache,
    config: SignalConfig,
}

impl<'a> SignalScanner<'a> {
    pub fn new(
        candles: &'a dyn CandlePort,
        clock: Arc<dyn Clock>,
        cache_ttl: chrono::Duration,
        config: SignalConfig,
    ) -> Self {
        SignalScanner {
            candles,
            win_rates: None,
            cache: AnalysisCache::new(cache_ttl, clock.clone()),
            clock,
            config,
        }
    }

    pub fn with_win_rates(mut self, provider: &'a dyn WinRateProvider) -> Self {
        self.win_rates = Some(provider);
        self
    }

    fn analysis(
        &mut self,
        symbol: &str,
        timeframe: Timeframe,
        minimum: usize,
    ) -> Result<AnalysisReport, CallerError> {
        let port = self.candles;
        self.cache.get_or_try_insert(symbol, timeframe, || {
            let candles = port.fetch_candles(symbol, timeframe)?;
            if candles.len() < minimum {
                return Err(CallerError::InsufficientData {
                    symbol: symbol.to_string(),
                    timeframe: timeframe.to_string(),
                    candles: candles.len(),
                    minimum,
                });
            }
            Ok(run_technical_analysis(&candles))
        })
    }

    /// Latest 1H close; falls back to the 4H close when 1H data is missing.
    fn current_price(&self, symbol: &str, fallback: f64) -> f64 {
        match self.candles.fetch_candles(symbol, Timeframe::OneHour) {
            Ok(candles) => candles
                .last()
                .map(|c| c.close)
                .filter(|p| *p > 0.0)
                .unwrap_or(fallback),
            Err(_) => fallback,
        }
    }

    pub fn scan_token(&mut self, token: &Token) -> Result<SignalDecision, CallerError> {
        if token.is_stablecoin() {
            return Ok(SignalDecision::Avoid {
                reason: format!("{} is a stablecoin", token.symbol),
            });
        }
        let r4 = self.analysis(&token.symbol, Timeframe::FourHours, MIN_CANDLES)?;
        let r1 = self.analysis(&token.symbol, Timeframe::OneDay, 1)?;
        let price = self.current_price(&token.symbol, r4.analysis.price);
        Ok(evaluate_signal(
            token,
            price,
            &r4,
            &r1,
            &self.config,
            self.win_rates,
            self.clock.now(),
        ))
    }

    pub fn scan(&mut self, tokens: &[Token]) -> ScanReport {
        let mut report = ScanReport::default();
        for token in tokens {
            let entry = |reason: String| SkippedToken {
                symbol: token.symbol.clone(),
                reason,
            };
            match self.scan_token(token) {
                Ok(SignalDecision::Signal(signal)) => report.signals.push(*signal),
                Ok(SignalDecision::Hold { reason }) => report.held.push(entry(reason)),
                Ok(SignalDecision::Avoid { reason }) => report.avoided.push(entry(reason)),
                Err(e) => {
                    tracing::warn!(symbol = %token.symbol, error = %e, "skipping token");
                    report.skipped.push(entry(e.to_string()));
                }
            }
        }
        report
            .signals
            .sort_by(|a, b| b.confidence.total_cmp(&a.confidence));

        tracing::info!(
            tokens = tokens.len(),
            signals = report.signals.len(),
            held = report.held.len(),
            avoided = report.avoided.len(),
            skipped = report.skipped.len(),
            "signal scan complete"
        );
        report
    }
}
