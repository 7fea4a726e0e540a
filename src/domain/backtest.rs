//! Backtest driver: the time loop tying a policy to a ledger.
//!
//! Each row of the price matrix is one step. The policy decides, the ledger
//! trades if asked, and exactly one history record is written per step.

use tracing::{debug, info};

use super::cadence::Cadence;
use super::cost::{SlippageMap, TradeCost};
use super::error::BalanceBotError;
use super::history::History;
use super::ledger::{Ledger, LedgerWarning};
use super::metrics::Metrics;
use super::policy::constant_mix::ConstantMixPolicy;
use super::policy::RebalancePolicy;
use super::price_matrix::PriceMatrix;
use super::strategy::{ConstantMixParams, StrategyKind, StrategyParams};
use super::wallet::Holdings;

#[derive(Debug, Clone, Default)]
pub struct BacktestConfig {
    pub trade_cost: TradeCost,
    pub slippage_map: Option<SlippageMap>,
    /// Preferred asset for paying fees; a stablecoin in the universe is
    /// used when unset.
    pub fee_asset: Option<String>,
    pub risk_free_rate: f64,
    /// Human-readable narration only.
    pub verbose: bool,
}

#[derive(Debug, Clone)]
pub struct BacktestResult {
    pub strategy: StrategyKind,
    /// Cadence the Constant-Mix run used.
    pub cadence: Option<Cadence>,
    pub history: History,
    pub warnings: Vec<LedgerWarning>,
    pub metrics: Metrics,
}

/// Run one policy over `prices` starting from `initial`.
pub fn run_backtest(
    prices: &PriceMatrix,
    initial: &Holdings,
    policy: &mut RebalancePolicy,
    config: &BacktestConfig,
) -> Result<BacktestResult, BalanceBotError> {
    if prices.is_empty() {
        return Err(BalanceBotError::InvalidPriceMatrix {
            reason: "no price rows".into(),
        });
    }

    let mut ledger = Ledger::new(prices, config.trade_cost).with_verbose(config.verbose);
    if let Some(fee_asset) = &config.fee_asset {
        ledger = ledger.with_fee_asset(Some(fee_asset.as_str()));
    }
    ledger.load_holdings(initial);

    let capital = ledger.portfolio_value(0);
    if capital.is_nan() || capital <= 0.0 {
        return Err(BalanceBotError::EmptyOrInvalidPortfolio { capital });
    }
    if config.verbose {
        info!(date = %prices.date(0), capital, "initial wallet loaded");
    }

    policy.start(prices)?;
    debug!(strategy = %policy.kind(), rows = prices.len(), assets = prices.width(), "backtest started");

    for t in 0..prices.len() {
        let cost = policy.decide_and_maybe_trade(t, &mut ledger, config.slippage_map.as_ref())?;
        ledger.mark_to_market(t, cost, policy.targets());
    }

    let cadence = match &*policy {
        RebalancePolicy::ConstantMix(p) => Some(p.cadence()),
        _ => None,
    };
    let (history, warnings) = ledger.into_parts();
    let metrics = Metrics::compute(&history, config.risk_free_rate);
    debug!(
        final_value = metrics.final_value,
        total_cost = metrics.total_cost,
        rebalances = metrics.rebalance_count,
        "backtest finished"
    );

    Ok(BacktestResult {
        strategy: policy.kind(),
        cadence,
        history,
        warnings,
        metrics,
    })
}

/// Two Constant-Mix runs that differ only in cadence.
#[derive(Debug, Clone)]
pub struct CadenceComparison {
    pub best: Cadence,
    pub weekly: BacktestResult,
    pub monthly: BacktestResult,
}

impl CadenceComparison {
    pub fn best_result(&self) -> &BacktestResult {
        match self.best {
            Cadence::Weekly => &self.weekly,
            _ => &self.monthly,
        }
    }

    pub fn into_best(self) -> BacktestResult {
        match self.best {
            Cadence::Weekly => self.weekly,
            _ => self.monthly,
        }
    }
}

/// Run Constant-Mix with weekly and with monthly cadence and keep the one
/// with the higher annualized return. Ties go to weekly.
pub fn compare_cadences(
    prices: &PriceMatrix,
    initial: &Holdings,
    params: &ConstantMixParams,
    config: &BacktestConfig,
) -> Result<CadenceComparison, BalanceBotError> {
    params.validate()?;
    let run = |cadence: Cadence| {
        let mut policy =
            RebalancePolicy::ConstantMix(ConstantMixPolicy::new(params).with_cadence(cadence));
        run_backtest(prices, initial, &mut policy, config)
    };
    let weekly = run(Cadence::Weekly)?;
    let monthly = run(Cadence::Monthly)?;

    let best = if weekly.metrics.annualized_return >= monthly.metrics.annualized_return {
        Cadence::Weekly
    } else {
        Cadence::Monthly
    };
    info!(
        %best,
        weekly = weekly.metrics.annualized_return,
        monthly = monthly.metrics.annualized_return,
        "cadence comparison"
    );
    Ok(CadenceComparison {
        best,
        weekly,
        monthly,
    })
}

/// Result of [`run_strategy`]; carries the comparison when one was made.
#[derive(Debug, Clone)]
pub struct StrategyRun {
    pub result: BacktestResult,
    pub comparison: Option<CadenceComparison>,
}

/// Build the policy for `params` and run it. Constant-Mix with
/// `compare_cadences` set runs the weekly/monthly comparison instead.
pub fn run_strategy(
    prices: &PriceMatrix,
    initial: &Holdings,
    params: &StrategyParams,
    config: &BacktestConfig,
) -> Result<StrategyRun, BalanceBotError> {
    if let StrategyParams::ConstantMix(cm) = params
        && cm.compare_cadences
    {
        let comparison = compare_cadences(prices, initial, cm, config)?;
        return Ok(StrategyRun {
            result: comparison.best_result().clone(),
            comparison: Some(comparison),
        });
    }
    let mut policy = params.build_policy()?;
    Ok(StrategyRun {
        result: run_backtest(prices, initial, &mut policy, config)?,
        comparison: None,
    })
}
