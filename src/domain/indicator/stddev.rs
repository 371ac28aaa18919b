//! Population standard deviation helpers.
//!
//! sigma = sqrt(sum((x - mean)^2) / n)

/// Population standard deviation; 0 for an empty slice.
pub fn population_stddev(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
    variance.sqrt()
}

/// Single-step fractional returns (p[i] - p[i-1]) / p[i-1]. A zero previous
/// price contributes a zero return.
pub fn step_returns(prices: &[f64]) -> Vec<f64> {
    prices
        .windows(2)
        .map(|w| if w[0] != 0.0 { (w[1] - w[0]) / w[0] } else { 0.0 })
        .collect()
}
