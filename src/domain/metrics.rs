//! Performance metrics over a run's history.

use super::history::History;

const PERIODS_PER_YEAR: f64 = 365.0;
const DAYS_PER_YEAR: f64 = 365.25;

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Metrics {
    pub initial_value: f64,
    pub final_value: f64,
    pub total_return: f64,
    /// CAGR over the calendar span of the history.
    pub annualized_return: f64,
    pub volatility: f64,
    pub sharpe_ratio: f64,
    pub sortino_ratio: f64,
    pub max_drawdown: f64,
    /// Longest run of rows spent below a previous peak.
    pub max_drawdown_duration: usize,
    pub total_cost: f64,
    pub rebalance_count: usize,
}

impl Metrics {
    pub fn compute(history: &History, risk_free_rate: f64) -> Self {
        let values = history.values();
        let initial_value = values.first().copied().unwrap_or(0.0);
        let final_value = values.last().copied().unwrap_or(initial_value);

        let total_return = if initial_value > 0.0 {
            (final_value - initial_value) / initial_value
        } else {
            0.0
        };

        let (max_drawdown, max_drawdown_duration) = compute_drawdown(&values);
        let returns = log_returns(&values);
        let (volatility, sharpe_ratio, sortino_ratio) =
            compute_risk_adjusted(&returns, risk_free_rate / PERIODS_PER_YEAR);

        Metrics {
            initial_value,
            final_value,
            total_return,
            annualized_return: compute_cagr(history),
            volatility,
            sharpe_ratio,
            sortino_ratio,
            max_drawdown,
            max_drawdown_duration,
            total_cost: history.total_cost(),
            rebalance_count: history.rebalance_count(),
        }
    }
}

/// (final / initial)^(1 / years) - 1 with years = calendar days / 365.25.
/// Zero when the span is empty or either endpoint is not positive.
pub fn compute_cagr(history: &History) -> f64 {
    let (Some(first), Some(last)) = (history.first(), history.last()) else {
        return 0.0;
    };
    let (v0, vf) = (first.value, last.value);
    if !v0.is_finite() || !vf.is_finite() || v0 <= 0.0 || vf <= 0.0 {
        return 0.0;
    }
    let days = (last.date - first.date).num_days();
    if days <= 0 {
        return 0.0;
    }
    (vf / v0).powf(DAYS_PER_YEAR / days as f64) - 1.0
}

fn log_returns(values: &[f64]) -> Vec<f64> {
    values
        .windows(2)
        .filter(|w| w[0] > 0.0 && w[1] > 0.0)
        .map(|w| (w[1] / w[0]).ln())
        .collect()
}

fn compute_drawdown(values: &[f64]) -> (f64, usize) {
    let Some(&first) = values.first() else {
        return (0.0, 0);
    };

    let mut peak = first;
    let mut max_dd = 0.0_f64;
    let mut max_dd_duration = 0usize;
    let mut current_dd_duration = 0usize;

    for &value in values {
        if value >= peak {
            peak = value;
            current_dd_duration = 0;
        } else if peak > 0.0 {
            let dd = (peak - value) / peak;
            max_dd = max_dd.max(dd);
            current_dd_duration += 1;
            max_dd_duration = max_dd_duration.max(current_dd_duration);
        }
    }

    (max_dd, max_dd_duration)
}

/// (annualized volatility, Sharpe, Sortino) of per-period log returns.
fn compute_risk_adjusted(returns: &[f64], period_rf: f64) -> (f64, f64, f64) {
    if returns.len() < 2 {
        return (0.0, 0.0, 0.0);
    }

    let n = returns.len() as f64;
    let mean = returns.iter().sum::<f64>() / n;
    let variance = returns.iter().map(|r| (r - mean).powi(2)).sum::<f64>() / (n - 1.0);
    let stddev = variance.sqrt();
    let excess_return = mean - period_rf;
    let annualize = PERIODS_PER_YEAR.sqrt();

    let sharpe = if stddev > 0.0 && stddev.is_finite() {
        excess_return / stddev * annualize
    } else {
        0.0
    };

    let downside: f64 = returns
        .iter()
        .filter(|&&r| r < period_rf)
        .map(|&r| (r - period_rf).powi(2))
        .sum();
    let downside_stddev = (downside / n).sqrt();

    let sortino = if downside_stddev > 0.0 {
        excess_return / downside_stddev * annualize
    } else {
        0.0
    };

    (stddev * annualize, sharpe, sortino)
}
