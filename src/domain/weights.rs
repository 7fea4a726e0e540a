//! Target weight normalization, resolution and drift helpers.

use std::collections::{BTreeMap, BTreeSet};

use super::error::BalanceBotError;

/// Mapping from asset symbol to a portfolio weight.
pub type Weights = BTreeMap<String, f64>;

const ZERO_TOTAL: f64 = 1e-12;

/// Rescale `weights` so the values sum to 1.
///
/// Total function: a sum whose magnitude is below `1e-12` yields the same
/// keys mapped to zero.
pub fn normalize_weights(weights: &Weights) -> Weights {
    let total: f64 = weights.values().sum();
    if !total.is_finite() || total.abs() < ZERO_TOTAL {
        return weights.keys().map(|k| (k.clone(), 0.0)).collect();
    }
    weights
        .iter()
        .map(|(k, &v)| (k.clone(), v / total))
        .collect()
}

/// Drop every entry whose weight is not strictly positive.
pub fn positive_only(weights: &Weights) -> Weights {
    weights
        .iter()
        .filter(|(_, w)| **w > 0.0)
        .map(|(k, &w)| (k.clone(), w))
        .collect()
}

/// Restrict raw targets to the assets present in the price matrix and
/// renormalize what remains.
pub fn resolve_targets(raw: &Weights, assets: &[String]) -> Weights {
    let kept: Weights = positive_only(raw)
        .into_iter()
        .filter(|(k, _)| assets.iter().any(|a| a == k))
        .collect();
    normalize_weights(&kept)
}

/// Move `current` a fraction `frac` of the way toward `target`, then
/// renormalize.
///
/// new_w = current + frac * (target - current), over the union of keys.
pub fn partial_rebalance_weights(current: &Weights, target: &Weights, frac: f64) -> Weights {
    let keys: BTreeSet<&String> = current.keys().chain(target.keys()).collect();
    let blended: Weights = keys
        .into_iter()
        .map(|k| {
            let c = current.get(k).copied().unwrap_or(0.0);
            let t = target.get(k).copied().unwrap_or(0.0);
            (k.clone(), c + frac * (t - c))
        })
        .collect();
    normalize_weights(&blended)
}

/// Per-asset absolute drift between two weight vectors, over the union of keys.
pub fn drifts(current: &Weights, target: &Weights) -> Weights {
    let keys: BTreeSet<&String> = current.keys().chain(target.keys()).collect();
    keys.into_iter()
        .map(|k| {
            let c = current.get(k).copied().unwrap_or(0.0);
            let t = target.get(k).copied().unwrap_or(0.0);
            (k.clone(), (c - t).abs())
        })
        .collect()
}

/// (max drift, L1 drift). Both are zero for empty inputs.
pub fn drift_summary(current: &Weights, target: &Weights) -> (f64, f64) {
    drifts(current, target)
        .values()
        .fold((0.0_f64, 0.0_f64), |(max, l1), &d| (max.max(d), l1 + d))
}

/// Parse `SYM:value, SYM:value` lists used for weights and wallets.
///
/// Symbols are upper-cased; repeated symbols are summed.
pub fn parse_symbol_values(input: &str, name: &str) -> Result<Weights, BalanceBotError> {
    let mut out = Weights::new();
    for token in input.split(',') {
        let trimmed = token.trim();
        if trimmed.is_empty() {
            return Err(BalanceBotError::invalid_parameter(
                name,
                "empty token in symbol list",
            ));
        }
        let (sym, value) = trimmed.split_once(':').ok_or_else(|| {
            BalanceBotError::invalid_parameter(name, format!("expected SYMBOL:VALUE, got '{trimmed}'"))
        })?;
        let sym = sym.trim().to_uppercase();
        if sym.is_empty() {
            return Err(BalanceBotError::invalid_parameter(name, "empty symbol"));
        }
        let value: f64 = value.trim().parse().map_err(|_| {
            BalanceBotError::invalid_parameter(name, format!("invalid number for {sym}: '{}'", value.trim()))
        })?;
        if !value.is_finite() {
            return Err(BalanceBotError::invalid_parameter(
                name,
                format!("non-finite value for {sym}"),
            ));
        }
        *out.entry(sym).or_insert(0.0) += value;
    }
    Ok(out)
}
