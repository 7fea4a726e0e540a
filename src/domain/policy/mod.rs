//! Rebalance policies.
//!
//! A closed set of variants behind one capability: at each step the policy
//! looks at the ledger and either holds or names the weights to trade to.
//! The backtest driver loop is the same for every variant.

pub mod constant_mix;
pub mod dynamic_threshold;
pub mod hold;

use super::cost::SlippageMap;
use super::error::BalanceBotError;
use super::ledger::Ledger;
use super::price_matrix::PriceMatrix;
use super::strategy::StrategyKind;
use super::weights::Weights;

use constant_mix::ConstantMixPolicy;
use dynamic_threshold::DynamicThresholdPolicy;
use hold::BuyAndHold;

/// Outcome of one policy step.
#[derive(Debug, Clone, PartialEq)]
pub enum Decision {
    Hold,
    /// Rebalance toward these weights.
    Trade(Weights),
}

impl Decision {
    pub fn is_trade(&self) -> bool {
        matches!(self, Decision::Trade(_))
    }
}

#[derive(Debug, Clone)]
pub enum RebalancePolicy {
    Hold(BuyAndHold),
    ConstantMix(ConstantMixPolicy),
    DynamicThreshold(DynamicThresholdPolicy),
}

impl RebalancePolicy {
    pub fn kind(&self) -> StrategyKind {
        match self {
            RebalancePolicy::Hold(_) => StrategyKind::Hold,
            RebalancePolicy::ConstantMix(_) => StrategyKind::ConstantMix,
            RebalancePolicy::DynamicThreshold(_) => StrategyKind::DynamicThreshold,
        }
    }

    /// Bind the policy to the run's price universe. Must be called once
    /// before the first step.
    pub fn start(&mut self, prices: &PriceMatrix) -> Result<(), BalanceBotError> {
        match self {
            RebalancePolicy::Hold(_) => Ok(()),
            RebalancePolicy::ConstantMix(p) => p.start(prices),
            RebalancePolicy::DynamicThreshold(p) => p.start(prices),
        }
    }

    /// Resolved target weights; drift is recorded against these. `None` for
    /// buy-and-hold.
    pub fn targets(&self) -> Option<&Weights> {
        match self {
            RebalancePolicy::Hold(_) => None,
            RebalancePolicy::ConstantMix(p) => Some(p.targets()),
            RebalancePolicy::DynamicThreshold(p) => Some(p.targets()),
        }
    }

    pub fn decide(&mut self, t: usize, ledger: &Ledger<'_>) -> Decision {
        match self {
            RebalancePolicy::Hold(p) => p.decide(t),
            RebalancePolicy::ConstantMix(p) => p.decide(t, ledger),
            RebalancePolicy::DynamicThreshold(p) => p.decide(t, ledger),
        }
    }

    /// Decide for step `t` and execute the trade, if any. Returns the cost
    /// paid this step.
    pub fn decide_and_maybe_trade(
        &mut self,
        t: usize,
        ledger: &mut Ledger<'_>,
        slippage_map: Option<&SlippageMap>,
    ) -> Result<f64, BalanceBotError> {
        match self.decide(t, ledger) {
            Decision::Hold => Ok(0.0),
            Decision::Trade(weights) => ledger.rebalance(t, &weights, slippage_map),
        }
    }
}
