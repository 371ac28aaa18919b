//! Average True Range with Wilder smoothing.
//!
//! Seed: mean true range over the first n candles (the first candle's true
//! range is high - low). Then ATR[i] = (ATR[i-1] * (n-1) + TR[i]) / n.

use crate::domain::candle::Candle;
use crate::domain::indicator::{IndicatorSeries, IndicatorType, series_from_values};

pub fn atr_values(candles: &[Candle], period: usize) -> Vec<Option<f64>> {
    let mut out = vec![None; candles.len()];
    if period == 0 || candles.len() < period {
        return out;
    }

    let tr: Vec<f64> = candles
        .iter()
        .enumerate()
        .map(|(i, c)| {
            if i == 0 {
                c.high - c.low
            } else {
                c.true_range(candles[i - 1].close)
            }
        })
        .collect();

    let mut atr = tr[..period].iter().sum::<f64>() / period as f64;
    out[period - 1] = Some(atr);
    for i in period..candles.len() {
        atr = (atr * (period - 1) as f64 + tr[i]) / period as f64;
        out[i] = Some(atr);
    }
    out
}

pub fn calculate_atr(candles: &[Candle], period: usize) -> IndicatorSeries {
    series_from_values(
        IndicatorType::Atr(period),
        candles.iter().map(|c| c.timestamp),
        &atr_values(candles, period),
    )
}
