//! Trading cost model: proportional fee, fixed fee per traded asset and a
//! default slippage rate that a per-asset slippage map can override.

use std::collections::BTreeMap;

use super::error::BalanceBotError;
use super::weights::Weights;

/// Asset symbol -> slippage rate, overriding [`TradeCost::slippage`].
pub type SlippageMap = BTreeMap<String, f64>;

/// Trade values below this magnitude do not incur the fixed fee.
pub const FIXED_FEE_EPSILON: f64 = 1e-10;

#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TradeCost {
    pub fee_rate: f64,
    pub fixed_fee: f64,
    pub slippage: f64,
}

impl Default for TradeCost {
    fn default() -> Self {
        TradeCost {
            fee_rate: 0.001,
            fixed_fee: 1.0,
            slippage: 0.0002,
        }
    }
}

impl TradeCost {
    pub fn new(fee_rate: f64, fixed_fee: f64, slippage: f64) -> Result<Self, BalanceBotError> {
        let cost = TradeCost {
            fee_rate,
            fixed_fee,
            slippage,
        };
        cost.validate()?;
        Ok(cost)
    }

    /// A cost model that charges nothing.
    pub fn free() -> Self {
        TradeCost {
            fee_rate: 0.0,
            fixed_fee: 0.0,
            slippage: 0.0,
        }
    }

    pub fn validate(&self) -> Result<(), BalanceBotError> {
        if !self.fee_rate.is_finite() || self.fee_rate < 0.0 {
            return Err(BalanceBotError::invalid_parameter(
                "fee_rate",
                "fee_rate must be a non-negative number",
            ));
        }
        if !self.fixed_fee.is_finite() || self.fixed_fee < 0.0 {
            return Err(BalanceBotError::invalid_parameter(
                "fixed_fee",
                "fixed_fee must be a non-negative number",
            ));
        }
        validate_slippage_rate("slippage", self.slippage)
    }

    /// Fee on a set of signed trade values (quote currency):
    /// sum(|v|) * fee_rate + fixed_fee * count(|v| > 1e-10).
    ///
    /// Slippage is not included; it is priced at execution by the ledger.
    pub fn compute(&self, trade_values: &Weights) -> f64 {
        let variable: f64 = trade_values.values().map(|v| v.abs() * self.fee_rate).sum();
        let traded = trade_values
            .values()
            .filter(|v| v.abs() > FIXED_FEE_EPSILON)
            .count();
        variable + self.fixed_fee * traded as f64
    }

    /// Slippage rate for `asset`, preferring the map entry when present.
    pub fn slippage_for(&self, asset: &str, slippage_map: Option<&SlippageMap>) -> f64 {
        slippage_map
            .and_then(|m| m.get(asset).copied())
            .unwrap_or(self.slippage)
    }
}

pub fn validate_slippage_rate(name: &str, rate: f64) -> Result<(), BalanceBotError> {
    if !rate.is_finite() || !(0.0..1.0).contains(&rate) {
        return Err(BalanceBotError::invalid_parameter(
            name,
            "slippage must be in [0, 1)",
        ));
    }
    Ok(())
}

/// Apply directional slippage: buys fill higher, sells fill lower.
pub fn execution_price(market_price: f64, trade_value: f64, slippage: f64) -> f64 {
    if trade_value > 0.0 {
        market_price * (1.0 + slippage)
    } else {
        market_price * (1.0 - slippage)
    }
}
