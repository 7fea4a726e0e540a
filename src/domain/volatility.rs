//! Rolling annualized volatility of log returns.
//!
//! VOL(w)[i] = sample stddev of ln(P[j]/P[j-1]) over the last w returns,
//! scaled by sqrt(365). A value needs at least min(5, w) returns in its
//! window (and never fewer than two). Gaps are back-filled from the next
//! valid value; whatever is still missing becomes 0.

use super::price_matrix::PriceMatrix;

pub const PERIODS_PER_YEAR: f64 = 365.0;

pub fn log_returns(prices: &[f64]) -> Vec<f64> {
    let valid = |p: f64| p.is_finite() && p > 0.0;
    (0..prices.len())
        .map(|i| {
            if i == 0 || !valid(prices[i]) || !valid(prices[i - 1]) {
                f64::NAN
            } else {
                prices[i].ln() - prices[i - 1].ln()
            }
        })
        .collect()
}

pub fn rolling_volatility(prices: &[f64], window: usize) -> Vec<f64> {
    let window = window.max(1);
    let min_periods = window.min(5).max(2);
    let returns = log_returns(prices);

    let mut vol: Vec<f64> = (0..returns.len())
        .map(|i| {
            let start = (i + 1).saturating_sub(window);
            let sample: Vec<f64> = returns[start..=i]
                .iter()
                .copied()
                .filter(|r| !r.is_nan())
                .collect();
            if sample.len() < min_periods {
                return f64::NAN;
            }
            let n = sample.len() as f64;
            let mean = sample.iter().sum::<f64>() / n;
            let variance = sample.iter().map(|r| (r - mean).powi(2)).sum::<f64>() / (n - 1.0);
            variance.sqrt() * PERIODS_PER_YEAR.sqrt()
        })
        .collect();

    backfill(&mut vol);
    vol
}

/// Replace each NaN with the next non-NaN value, then zero what remains.
fn backfill(values: &mut [f64]) {
    let mut next = f64::NAN;
    for v in values.iter_mut().rev() {
        if v.is_nan() {
            *v = next;
        } else {
            next = *v;
        }
    }
    for v in values.iter_mut() {
        if v.is_nan() {
            *v = 0.0;
        }
    }
}

/// Volatility series for every asset column, indexed `[asset][t]`.
pub fn volatility_by_asset(prices: &PriceMatrix, window: usize) -> Vec<Vec<f64>> {
    (0..prices.width())
        .map(|a| rolling_volatility(&prices.column(a), window))
        .collect()
}
