//! Liquidity tiers for crypto pairs and the defaults derived from them.

use std::fmt;
use std::str::FromStr;

use super::cost::{validate_slippage_rate, SlippageMap};
use super::error::BalanceBotError;

const MAJORS: &[&str] = &["BTC", "ETH"];
const HIGH_LIQUIDITY: &[&str] = &["BNB", "SOL", "XRP"];

/// Longest prefixes first so `TUSD` is not read as `USD...`.
const STABLECOINS: &[&str] = &["FDUSD", "BUSD", "TUSD", "USDT", "USDC", "DAI"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum LiquidityTier {
    Majors,
    HighLiquidity,
    Others,
}

impl LiquidityTier {
    /// Drift threshold used when Constant-Mix runs with per-tier thresholds.
    pub fn default_drift_threshold(self) -> f64 {
        match self {
            LiquidityTier::Majors => 0.03,
            LiquidityTier::HighLiquidity => 0.02,
            LiquidityTier::Others => 0.01,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            LiquidityTier::Majors => "majors",
            LiquidityTier::HighLiquidity => "high_liq",
            LiquidityTier::Others => "others",
        }
    }
}

impl fmt::Display for LiquidityTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LiquidityTier {
    type Err = BalanceBotError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "majors" => Ok(LiquidityTier::Majors),
            "high_liq" => Ok(LiquidityTier::HighLiquidity),
            "others" => Ok(LiquidityTier::Others),
            other => Err(BalanceBotError::invalid_parameter(
                "liquidity tier",
                format!("unknown tier '{other}'"),
            )),
        }
    }
}

/// Classify a pair by the first three letters of its base asset.
pub fn symbol_category(symbol: &str) -> LiquidityTier {
    let upper = symbol.trim().to_uppercase();
    let base: String = upper.chars().take(3).collect();
    if MAJORS.contains(&base.as_str()) {
        LiquidityTier::Majors
    } else if HIGH_LIQUIDITY.contains(&base.as_str()) {
        LiquidityTier::HighLiquidity
    } else {
        LiquidityTier::Others
    }
}

pub fn is_stable_symbol(symbol: &str) -> bool {
    let upper = symbol.trim().to_uppercase();
    STABLECOINS.iter().any(|coin| upper.starts_with(coin))
}

/// First stablecoin pair in `assets`, in matrix order.
pub fn find_stable_asset(assets: &[String]) -> Option<String> {
    assets.iter().find(|a| is_stable_symbol(a)).cloned()
}

/// Slippage rates per liquidity tier.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TierSlippage {
    pub majors: f64,
    pub high_liq: f64,
    pub others: f64,
}

impl TierSlippage {
    pub fn new(majors: f64, high_liq: f64, others: f64) -> Result<Self, BalanceBotError> {
        validate_slippage_rate("slippage.majors", majors)?;
        validate_slippage_rate("slippage.high_liq", high_liq)?;
        validate_slippage_rate("slippage.others", others)?;
        Ok(Self {
            majors,
            high_liq,
            others,
        })
    }

    pub fn rate(&self, tier: LiquidityTier) -> f64 {
        match tier {
            LiquidityTier::Majors => self.majors,
            LiquidityTier::HighLiquidity => self.high_liq,
            LiquidityTier::Others => self.others,
        }
    }

    /// Resolve a slippage map covering every asset in the universe.
    pub fn slippage_map(&self, assets: &[String]) -> SlippageMap {
        assets
            .iter()
            .map(|a| (a.clone(), self.rate(symbol_category(a))))
            .collect()
    }
}
