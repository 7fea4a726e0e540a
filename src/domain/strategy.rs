//! Strategy parameters and policy selection.

use std::fmt;
use std::str::FromStr;

use super::cadence::Cadence;
use super::error::BalanceBotError;
use super::policy::constant_mix::ConstantMixPolicy;
use super::policy::dynamic_threshold::DynamicThresholdPolicy;
use super::policy::hold::BuyAndHold;
use super::policy::RebalancePolicy;
use super::weights::Weights;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum StrategyKind {
    Hold,
    ConstantMix,
    DynamicThreshold,
}

impl StrategyKind {
    pub fn as_str(self) -> &'static str {
        match self {
            StrategyKind::Hold => "hold",
            StrategyKind::ConstantMix => "constant_mix",
            StrategyKind::DynamicThreshold => "dynamic_threshold",
        }
    }
}

impl fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StrategyKind {
    type Err = BalanceBotError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "hold" => Ok(StrategyKind::Hold),
            "constant_mix" => Ok(StrategyKind::ConstantMix),
            "dynamic_threshold" => Ok(StrategyKind::DynamicThreshold),
            other => Err(BalanceBotError::invalid_parameter(
                "strategy",
                format!("unsupported strategy '{other}'"),
            )),
        }
    }
}

/// When Constant-Mix trades on drift, independently of its cadence.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum DriftThreshold {
    #[default]
    Disabled,
    /// One threshold for every asset.
    Uniform(f64),
    /// Each asset uses the default of its liquidity tier.
    ByLiquidity,
}

impl DriftThreshold {
    /// `None`/blank disables, `auto` selects per-tier thresholds, anything
    /// else must be a non-negative number.
    pub fn parse(value: Option<&str>) -> Result<Self, BalanceBotError> {
        let Some(raw) = value.map(str::trim).filter(|v| !v.is_empty()) else {
            return Ok(DriftThreshold::Disabled);
        };
        if raw.eq_ignore_ascii_case("auto") {
            return Ok(DriftThreshold::ByLiquidity);
        }
        let x: f64 = raw.parse().map_err(|_| {
            BalanceBotError::invalid_parameter("drift_threshold", format!("'{raw}' is not a number"))
        })?;
        if !x.is_finite() || x < 0.0 {
            return Err(BalanceBotError::invalid_parameter(
                "drift_threshold",
                "must be a non-negative number",
            ));
        }
        Ok(DriftThreshold::Uniform(x))
    }
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ConstantMixParams {
    pub target_weights: Weights,
    pub rebalance: Cadence,
    pub drift_threshold: DriftThreshold,
    /// Run weekly and monthly cadences and keep the better one.
    pub compare_cadences: bool,
}

impl Default for ConstantMixParams {
    fn default() -> Self {
        Self {
            target_weights: Weights::new(),
            rebalance: Cadence::Monthly,
            drift_threshold: DriftThreshold::Disabled,
            compare_cadences: false,
        }
    }
}

impl ConstantMixParams {
    pub fn validate(&self) -> Result<(), BalanceBotError> {
        validate_target_weights(&self.target_weights)?;
        if let Cadence::EveryNDays(0) = self.rebalance {
            return Err(BalanceBotError::invalid_parameter(
                "rebalance",
                "day interval must be positive",
            ));
        }
        if let DriftThreshold::Uniform(x) = self.drift_threshold
            && (!x.is_finite() || x < 0.0)
        {
            return Err(BalanceBotError::invalid_parameter(
                "drift_threshold",
                "must be a non-negative number",
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DynamicThresholdParams {
    pub target_weights: Weights,
    pub vol_window: usize,
    pub k: f64,
    pub min_th: f64,
    pub max_th: f64,
    /// Assets held to `stable_threshold` instead of a volatility threshold.
    /// A symbol matches when it starts with one of these names.
    pub stable_assets: Vec<String>,
    pub stable_threshold: f64,
    /// Fraction of the way toward target moved per rebalance, in (0, 1].
    pub rebal_frac: f64,
    pub cooldown_days: usize,
}

impl Default for DynamicThresholdParams {
    fn default() -> Self {
        Self {
            target_weights: Weights::new(),
            vol_window: 40,
            k: 0.20,
            min_th: 0.03,
            max_th: 0.20,
            stable_assets: vec!["USDT".to_string()],
            stable_threshold: 0.005,
            rebal_frac: 1.0,
            cooldown_days: 5,
        }
    }
}

impl DynamicThresholdParams {
    pub fn validate(&self) -> Result<(), BalanceBotError> {
        validate_target_weights(&self.target_weights)?;
        if self.vol_window == 0 {
            return Err(BalanceBotError::invalid_parameter("vol_window", "must be positive"));
        }
        for (name, value) in [
            ("k", self.k),
            ("min_th", self.min_th),
            ("max_th", self.max_th),
            ("stable_threshold", self.stable_threshold),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(BalanceBotError::invalid_parameter(
                    name,
                    "must be a non-negative number",
                ));
            }
        }
        if self.min_th > self.max_th {
            return Err(BalanceBotError::invalid_parameter(
                "min_th",
                format!("{} exceeds max_th {}", self.min_th, self.max_th),
            ));
        }
        if !(self.rebal_frac > 0.0 && self.rebal_frac <= 1.0) {
            return Err(BalanceBotError::invalid_parameter(
                "rebal_frac",
                "must be in (0, 1]",
            ));
        }
        Ok(())
    }
}

fn validate_target_weights(weights: &Weights) -> Result<(), BalanceBotError> {
    if weights.values().any(|w| !w.is_finite()) {
        return Err(BalanceBotError::invalid_parameter(
            "weights",
            "weights must be finite",
        ));
    }
    if !weights.values().any(|&w| w > 0.0) {
        return Err(BalanceBotError::invalid_parameter(
            "weights",
            "at least one weight must be positive",
        ));
    }
    Ok(())
}

/// Parameters for one of the supported policies.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum StrategyParams {
    Hold,
    ConstantMix(ConstantMixParams),
    DynamicThreshold(DynamicThresholdParams),
}

impl StrategyParams {
    pub fn kind(&self) -> StrategyKind {
        match self {
            StrategyParams::Hold => StrategyKind::Hold,
            StrategyParams::ConstantMix(_) => StrategyKind::ConstantMix,
            StrategyParams::DynamicThreshold(_) => StrategyKind::DynamicThreshold,
        }
    }

    pub fn validate(&self) -> Result<(), BalanceBotError> {
        match self {
            StrategyParams::Hold => Ok(()),
            StrategyParams::ConstantMix(p) => p.validate(),
            StrategyParams::DynamicThreshold(p) => p.validate(),
        }
    }

    /// Validate and build the policy for a single run.
    pub fn build_policy(&self) -> Result<RebalancePolicy, BalanceBotError> {
        self.validate()?;
        Ok(match self {
            StrategyParams::Hold => RebalancePolicy::Hold(BuyAndHold),
            StrategyParams::ConstantMix(p) => {
                RebalancePolicy::ConstantMix(ConstantMixPolicy::new(p))
            }
            StrategyParams::DynamicThreshold(p) => {
                RebalancePolicy::DynamicThreshold(DynamicThresholdPolicy::new(p))
            }
        })
    }
}
