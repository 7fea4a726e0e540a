//! Constant-Mix: trade back to fixed weights on a calendar cadence or when
//! drift grows too large.

use tracing::{debug, info};

use super::Decision;
use crate::domain::cadence::Cadence;
use crate::domain::error::BalanceBotError;
use crate::domain::ledger::Ledger;
use crate::domain::liquidity::symbol_category;
use crate::domain::price_matrix::PriceMatrix;
use crate::domain::strategy::{ConstantMixParams, DriftThreshold};
use crate::domain::weights::{drifts, normalize_weights, positive_only, resolve_targets, Weights};

#[derive(Debug, Clone)]
pub struct ConstantMixPolicy {
    params: ConstantMixParams,
    weights: Weights,
    targets: Weights,
}

impl ConstantMixPolicy {
    /// Zero and negative weights are dropped and the rest normalized once.
    pub fn new(params: &ConstantMixParams) -> Self {
        Self {
            params: params.clone(),
            weights: normalize_weights(&positive_only(&params.target_weights)),
            targets: Weights::new(),
        }
    }

    pub fn with_cadence(mut self, cadence: Cadence) -> Self {
        self.params.rebalance = cadence;
        self
    }

    pub fn cadence(&self) -> Cadence {
        self.params.rebalance
    }

    pub fn targets(&self) -> &Weights {
        &self.targets
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
        Ok(())
    }

    fn drift_hit(&self, current: &Weights) -> Option<f64> {
        let by_asset = drifts(current, &self.targets);
        let max_drift = by_asset.values().fold(0.0_f64, |m, &d| m.max(d));
        let hit = match self.params.drift_threshold {
            DriftThreshold::Disabled => false,
            DriftThreshold::Uniform(threshold) => max_drift > threshold,
            DriftThreshold::ByLiquidity => by_asset
                .iter()
                .any(|(symbol, &d)| d > symbol_category(symbol).default_drift_threshold()),
        };
        hit.then_some(max_drift)
    }

    /// Row 0 never trades: the wallet is taken as-is until the first trigger.
    pub fn decide(&mut self, t: usize, ledger: &Ledger<'_>) -> Decision {
        if t == 0 {
            return Decision::Hold;
        }
        let prices = ledger.prices();
        let scheduled = self.cadence().is_rebalance_day(prices.dates(), t);
        let drift = self.drift_hit(&ledger.current_weights(t));
        if !scheduled && drift.is_none() {
            return Decision::Hold;
        }

        let date = prices.date(t);
        debug!(%date, cadence = %self.cadence(), scheduled, drift_hit = drift.is_some(), "constant-mix trigger");
        if ledger.is_verbose() {
            let mut why = Vec::new();
            if scheduled {
                why.push("calendar".to_string());
            }
            if let Some(d) = drift {
                why.push(format!("drift (max {:.2}%)", d * 100.0));
            }
            info!(%date, "rebalance triggered: {}", why.join(", "));
        }
        Decision::Trade(self.targets.clone())
    }
}
