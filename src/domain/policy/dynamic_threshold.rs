//! Dynamic-Threshold: each asset gets a drift threshold that widens with
//! its own rolling volatility.
//!
//! threshold(a, t) = clamp(min_th + k * vol(a, t), min_th, max_th), or
//! `stable_threshold` for assets flagged stable. A trade fires when some
//! asset's drift reaches its threshold and at least `cooldown_days` rows
//! have passed since the last trade. The run starts with a deployment into
//! the targets at row 0.

use tracing::{debug, info};

use super::Decision;
use crate::domain::error::BalanceBotError;
use crate::domain::ledger::Ledger;
use crate::domain::price_matrix::PriceMatrix;
use crate::domain::strategy::DynamicThresholdParams;
use crate::domain::volatility::volatility_by_asset;
use crate::domain::weights::{
    normalize_weights, partial_rebalance_weights, positive_only, resolve_targets, Weights,
};

#[derive(Debug, Clone)]
pub struct DynamicThresholdPolicy {
    params: DynamicThresholdParams,
    weights: Weights,
    targets: Weights,
    stable: Vec<bool>,
    /// `[asset][t]`, computed once in [`start`](Self::start).
    volatility: Vec<Vec<f64>>,
    last_rebalance: usize,
}

impl DynamicThresholdPolicy {
    pub fn new(params: &DynamicThresholdParams) -> Self {
        Self {
            params: params.clone(),
            weights: normalize_weights(&positive_only(&params.target_weights)),
            targets: Weights::new(),
            stable: Vec::new(),
            volatility: Vec::new(),
            last_rebalance: 0,
        }
    }

    pub fn targets(&self) -> &Weights {
        &self.targets
    }

    pub fn last_rebalance(&self) -> usize {
        self.last_rebalance
    }

    /// Fails with `InvalidParameter` before any step when the parameters
    /// are out of range.
    pub fn start(&mut self, prices: &PriceMatrix) -> Result<(), BalanceBotError> {
        self.params.validate()?;
        self.targets = resolve_targets(&self.weights, prices.assets());
        if self.targets.is_empty() {
            return Err(BalanceBotError::invalid_parameter(
                "weights",
                "no target asset is present in the price data",
            ));
        }
        self.stable = prices
            .assets()
            .iter()
            .map(|a| self.is_stable(a))
            .collect();
        self.volatility = volatility_by_asset(prices, self.params.vol_window);
        self.last_rebalance = 0;
        Ok(())
    }

    fn is_stable(&self, symbol: &str) -> bool {
        let upper = symbol.to_uppercase();
        self.params
            .stable_assets
            .iter()
            .any(|s| !s.is_empty() && upper.starts_with(&s.to_uppercase()))
    }

    /// Drift threshold for asset column `a` at row `t`.
    pub fn threshold(&self, a: usize, t: usize) -> f64 {
        let p = &self.params;
        if self.stable.get(a).copied().unwrap_or(false) {
            return p.stable_threshold;
        }
        let vol = self
            .volatility
            .get(a)
            .and_then(|series| series.get(t))
            .copied()
            .unwrap_or(0.0);
        // Lower bound first; max_th wins if the bounds were never validated.
        (p.min_th + p.k * vol).max(p.min_th).min(p.max_th)
    }

    pub fn decide(&mut self, t: usize, ledger: &Ledger<'_>) -> Decision {
        let prices = ledger.prices();
        let date = prices.date(t);
        if t == 0 {
            self.last_rebalance = 0;
            debug!(%date, "initial deployment");
            return Decision::Trade(self.targets.clone());
        }

        let current = ledger.current_weights(t);
        let mut max_drift = 0.0_f64;
        let mut breached = false;
        for (a, symbol) in prices.assets().iter().enumerate() {
            let cw = current.get(symbol).copied().unwrap_or(0.0);
            let tw = self.targets.get(symbol).copied().unwrap_or(0.0);
            let drift = (cw - tw).abs();
            max_drift = max_drift.max(drift);
            if drift >= self.threshold(a, t) {
                breached = true;
            }
        }

        let since = t - self.last_rebalance;
        let cooldown_met = since >= self.params.cooldown_days;

        if ledger.is_verbose() && t % 10 == 0 {
            info!(
                %date,
                "max drift {:.4}, stable threshold {:.4}, cooldown {}/{}",
                max_drift, self.params.stable_threshold, since, self.params.cooldown_days
            );
        }

        if !(breached && cooldown_met) {
            if breached {
                debug!(%date, since, "drift breach inside cooldown");
            }
            return Decision::Hold;
        }

        debug!(%date, max_drift, "dynamic threshold breached");
        self.last_rebalance = t;
        if self.params.rebal_frac < 1.0 {
            Decision::Trade(partial_rebalance_weights(
                &current,
                &self.targets,
                self.params.rebal_frac,
            ))
        } else {
            Decision::Trade(self.targets.clone())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::cost::TradeCost;
    use chrono::NaiveDate;

    fn w(pairs: &[(&str, f64)]) -> Weights {
        pairs.iter().map(|(k, v)| (k.to_string(), *v)).collect()
    }

    fn matrix(assets: &[&str], rows: Vec<Vec<f64>>) -> PriceMatrix {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let dates = (0..rows.len())
            .map(|i| start + chrono::Duration::days(i as i64))
            .collect();
        PriceMatrix::new(dates, assets.iter().map(|s| s.to_string()).collect(), rows).unwrap()
    }

    fn params(weights: Weights) -> DynamicThresholdParams {
        DynamicThresholdParams {
            target_weights: weights,
            ..Default::default()
        }
    }

    #[test]
    fn deploys_at_first_row() {
        let prices = matrix(&["BTC", "ETH"], vec![vec![100.0, 50.0]; 3]);
        let ledger = Ledger::new(&prices, TradeCost::free());
        let mut p = DynamicThresholdPolicy::new(&params(w(&[("BTC", 0.5), ("ETH", 0.5)])));
        p.start(&prices).unwrap();
        assert_eq!(
            p.decide(0, &ledger),
            Decision::Trade(w(&[("BTC", 0.5), ("ETH", 0.5)]))
        );
        assert_eq!(p.last_rebalance(), 0);
    }

    #[test]
    fn constant_prices_use_min_threshold() {
        let prices = matrix(&["BTC", "USDTEUR"], vec![vec![100.0, 1.0]; 10]);
        let mut p = DynamicThresholdPolicy::new(&params(w(&[("BTC", 0.5), ("USDTEUR", 0.5)])));
        p.start(&prices).unwrap();
        assert!((p.threshold(0, 5) - 0.03).abs() < 1e-12);
        assert!((p.threshold(1, 5) - 0.005).abs() < 1e-12);
    }

    #[test]
    fn threshold_is_clamped_to_max() {
        let rows: Vec<Vec<f64>> = (0..20)
            .map(|i| vec![if i % 2 == 0 { 100.0 } else { 200.0 }])
            .collect();
        let prices = matrix(&["DOGE"], rows);
        let mut p = DynamicThresholdPolicy::new(&params(w(&[("DOGE", 1.0)])));
        p.start(&prices).unwrap();
        assert!((p.threshold(0, 10) - 0.20).abs() < 1e-12);
    }

    #[test]
    fn cooldown_blocks_early_trades() {
        let prices = matrix(&["BTC", "ETH"], vec![vec![100.0, 50.0]; 8]);
        let mut ledger = Ledger::new(&prices, TradeCost::free());
        // Permanently 80/20 against 50/50: drift 0.3 on every row.
        ledger.load_holdings(&w(&[("BTC", 0.8), ("ETH", 0.4)]));
        let mut p = DynamicThresholdPolicy::new(&params(w(&[("BTC", 0.5), ("ETH", 0.5)])));
        p.start(&prices).unwrap();
        assert!(p.decide(0, &ledger).is_trade());
        let fired: Vec<usize> = (1..8).filter(|&t| p.decide(t, &ledger).is_trade()).collect();
        assert_eq!(fired, vec![5]);
        assert_eq!(p.last_rebalance(), 5);
    }

    #[test]
    fn partial_fraction_moves_part_way() {
        let prices = matrix(&["BTC", "ETH"], vec![vec![100.0, 50.0]; 2]);
        let mut ledger = Ledger::new(&prices, TradeCost::free());
        ledger.load_holdings(&w(&[("BTC", 0.8), ("ETH", 0.4)]));
        let mut p = DynamicThresholdPolicy::new(&DynamicThresholdParams {
            rebal_frac: 0.5,
            cooldown_days: 0,
            ..params(w(&[("BTC", 0.5), ("ETH", 0.5)]))
        });
        p.start(&prices).unwrap();
        let Decision::Trade(weights) = p.decide(1, &ledger) else {
            panic!("expected a trade");
        };
        assert!((weights["BTC"] - 0.65).abs() < 1e-12);
        assert!((weights["ETH"] - 0.35).abs() < 1e-12);
        // Drift is still measured against the full targets.
        assert!((p.targets()["BTC"] - 0.5).abs() < 1e-12);
    }

    #[test]
    fn start_rejects_inverted_bounds() {
        let prices = matrix(&["BTC", "ETH"], vec![vec![100.0, 50.0]; 3]);
        let mut p = DynamicThresholdPolicy::new(&DynamicThresholdParams {
            min_th: 0.3,
            max_th: 0.1,
            ..params(w(&[("BTC", 0.5), ("ETH", 0.5)]))
        });
        let err = p.start(&prices).unwrap_err();
        assert!(matches!(err, BalanceBotError::InvalidParameter { name, .. } if name == "min_th"));
        // Still total when queried without a successful start.
        assert!((p.threshold(0, 1) - 0.1).abs() < 1e-12);
    }

    #[test]
    fn small_drift_holds() {
        let prices = matrix(&["BTC", "ETH"], vec![vec![100.0, 50.0]; 10]);
        let mut ledger = Ledger::new(&prices, TradeCost::free());
        ledger.load_holdings(&w(&[("BTC", 0.51), ("ETH", 0.98)]));
        let mut p = DynamicThresholdPolicy::new(&params(w(&[("BTC", 0.5), ("ETH", 0.5)])));
        p.start(&prices).unwrap();
        assert!((1..10).all(|t| p.decide(t, &ledger) == Decision::Hold));
    }
}
