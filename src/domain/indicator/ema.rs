//! Exponential Moving Average.
//!
//! k = 2/(n+1), seed with the SMA of the first n values, then
//! EMA[i] = x[i]*k + EMA[i-1]*(1-k). The first (n-1) points are warmup.

use crate::domain::candle::Candle;
use crate::domain::indicator::{IndicatorSeries, IndicatorType, series_from_values};

/// Aligned EMA of `values`; `None` for the warmup points.
pub fn ema_values(values: &[f64], period: usize) -> Vec<Option<f64>> {
    let mut out = vec![None; values.len()];
    if period == 0 || values.len() < period {
        return out;
    }

    let k = 2.0 / (period as f64 + 1.0);
    let mut ema = values[..period].iter().sum::<f64>() / period as f64;
    out[period - 1] = Some(ema);

    for i in period..values.len() {
        ema = values[i] * k + ema * (1.0 - k);
        out[i] = Some(ema);
    }
    out
}

pub fn calculate_ema(candles: &[Candle], period: usize) -> IndicatorSeries {
    let closes: Vec<f64> = candles.iter().map(|c| c.close).collect();
    series_from_values(
        IndicatorType::Ema(period),
        candles.iter().map(|c| c.timestamp),
        &ema_values(&closes, period),
    )
}

/// Final EMA value. With fewer values than `period` this degrades to the
/// simple average of what is there, and to 0 for an empty input.
pub fn ema_latest(values: &[f64], period: usize) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    if period == 0 || values.len() < period {
        return values.iter().sum::<f64>() / values.len() as f64;
    }
    ema_values(values, period)
        .last()
        .copied()
        .flatten()
        .unwrap_or(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::candle::fixtures::from_closes;

    #[test]
    fn ema_warmup() {
        let candles = from_closes(&[10.0, 20.0, 30.0, 40.0, 50.0]);
        let series = calculate_ema(&candles, 3);

        assert_eq!(series.values.len(), 5);
        assert!(!series.values[0].valid);
        assert!(!series.values[1].valid);
        assert!(series.values[2].valid);
    }

    #[test]
    fn ema_seed_is_sma() {
        let values = ema_values(&[10.0, 20.0, 30.0, 40.0], 3);
        assert!((values[2].unwrap() - 20.0).abs() < f64::EPSILON);
    }

    #[test]
    fn ema_recursive_step() {
        // k = 0.5, seed 20, next = 40*0.5 + 20*0.5 = 30, then 50*0.5 + 30*0.5 = 40
        let values = ema_values(&[10.0, 20.0, 30.0, 40.0, 50.0], 3);
        assert!((values[3].unwrap() - 30.0).abs() < f64::EPSILON);
        assert!((values[4].unwrap() - 40.0).abs() < f64::EPSILON);
    }

    #[test]
    fn ema_constant_series() {
        let values = ema_values(&[7.0; 30], 10);
        for v in values.iter().skip(9) {
            assert!((v.unwrap() - 7.0).abs() < 1e-12);
        }
    }

    #[test]
    fn ema_zero_period() {
        assert!(ema_values(&[1.0, 2.0], 0).iter().all(Option::is_none));
    }

    #[test]
    fn latest_falls_back_to_average() {
        assert!((ema_latest(&[1.0, 2.0, 3.0], 20) - 2.0).abs() < f64::EPSILON);
        assert_eq!(ema_latest(&[], 20), 0.0);
    }

    #[test]
    fn latest_matches_series_tail() {
        let closes: Vec<f64> = (0..40).map(|i| 100.0 + (i as f64 * 0.7).sin() * 5.0).collect();
        let series = ema_values(&closes, 20);
        assert_eq!(ema_latest(&closes, 20), series[39].unwrap());
    }
}
