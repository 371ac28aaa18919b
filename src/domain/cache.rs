//! Time-bounded cache of technical analyses keyed by symbol and timeframe.
//!
//! Expiry is measured with an injected [`Clock`], so tests control it
//! without sleeping.

use crate::domain::analysis::AnalysisReport;
use crate::domain::error::CallerError;
use crate::domain::timeframe::Timeframe;
use crate::ports::clock_port::Clock;
use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::sync::Arc;

pub const DEFAULT_TTL_SECS: i64 = 300;

struct Entry {
    report: AnalysisReport,
    stored_at: DateTime<Utc>,
}

pub struct AnalysisCache {
    ttl: Duration,
    clock: Arc<dyn Clock>,
    entries: HashMap<(String, Timeframe), Entry>,
}

impl AnalysisCache {
    /// A zero `ttl` disables caching: every lookup misses.
    pub fn new(ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        AnalysisCache {
            ttl,
            clock,
            entries: HashMap::new(),
        }
    }

    fn key(symbol: &str, timeframe: Timeframe) -> (String, Timeframe) {
        (symbol.trim().to_ascii_uppercase(), timeframe)
    }

    fn is_fresh(&self, entry: &Entry) -> bool {
        self.clock.now() - entry.stored_at < self.ttl
    }

    pub fn get(&self, symbol: &str, timeframe: Timeframe) -> Option<&AnalysisReport> {
        self.entries
            .get(&Self::key(symbol, timeframe))
            .filter(|e| self.is_fresh(e))
            .map(|e| &e.report)
    }

    pub fn insert(&mut self, symbol: &str, timeframe: Timeframe, report: AnalysisReport) {
        let stored_at = self.clock.now();
        self.entries
            .insert(Self::key(symbol, timeframe), Entry { report, stored_at });
    }

    /// Cached report, or the result of `compute` stored for later lookups.
    /// Errors from `compute` are returned and nothing is stored.
    pub fn get_or_try_insert<F>(
        &mut self,
        symbol: &str,
        timeframe: Timeframe,
        compute: F,
    ) -> Result<AnalysisReport, CallerError>
    where
        F: FnOnce() -> Result<AnalysisReport, CallerError>,
    {
        if let Some(report) = self.get(symbol, timeframe) {
            tracing::trace!(symbol, %timeframe, "analysis cache hit");
            return Ok(report.clone());
        }
        let report = compute()?;
        self.insert(symbol, timeframe, report.clone());
        Ok(report)
    }

    /// Drop expired entries, returning how many were removed.
    pub fn purge_expired(&mut self) -> usize {
        let now = self.clock.now();
        let ttl = self.ttl;
        let before = self.entries.len();
        self.entries.retain(|_, e| now - e.stored_at < ttl);
        before - self.entries.len()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
