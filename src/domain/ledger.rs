//! Ledger (broker): owns holdings for one run, executes rebalancing trades
//! with slippage and fees, and records mark-to-market history.

use chrono::NaiveDate;
use tracing::{debug, info, warn};

use super::cost::{execution_price, SlippageMap, TradeCost};
use super::error::BalanceBotError;
use super::history::{History, HistoryRecord};
use super::liquidity::find_stable_asset;
use super::price_matrix::PriceMatrix;
use super::wallet::Holdings;
use super::weights::{drift_summary, Weights};

/// Nominal trade values below this are not executed.
pub const MIN_TRADE_VALUE: f64 = 1e-12;

/// Negative holdings within this tolerance are floating-point noise.
pub const NEGATIVE_HOLDING_TOLERANCE: f64 = 1e-10;

/// Non-fatal conditions met while executing a run.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum LedgerWarning {
    /// The asset had no usable price, so its trade was skipped.
    MissingPrice { date: NaiveDate, asset: String },
    /// A holding ended below zero and was reset to zero.
    NegativeHoldingCorrected {
        date: NaiveDate,
        asset: String,
        amount: f64,
    },
}

/// Where a fee was taken from. Tried in declaration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeeSource {
    /// The designated stable asset, if it alone covers the cost.
    StableAsset,
    /// The single highest-value holding, if it alone covers the cost.
    LargestHolding,
    /// Every positive holding, proportionally to its share of value.
    ProRata,
}

impl FeeSource {
    pub const CASCADE: [FeeSource; 3] = [
        FeeSource::StableAsset,
        FeeSource::LargestHolding,
        FeeSource::ProRata,
    ];
}

#[derive(Debug, Clone)]
pub struct Ledger<'a> {
    prices: &'a PriceMatrix,
    trade_cost: TradeCost,
    fee_asset: Option<usize>,
    holdings: Vec<f64>,
    history: History,
    warnings: Vec<LedgerWarning>,
    verbose: bool,
    /// Set by `rebalance`, consumed by the next `mark_to_market`.
    traded: bool,
}

impl<'a> Ledger<'a> {
    /// A ledger with zero holdings in every asset of `prices`. The fee asset
    /// defaults to the first stablecoin pair in the matrix.
    pub fn new(prices: &'a PriceMatrix, trade_cost: TradeCost) -> Self {
        let fee_asset =
            find_stable_asset(prices.assets()).and_then(|s| prices.asset_index(&s));
        Ledger {
            prices,
            trade_cost,
            fee_asset,
            holdings: vec![0.0; prices.width()],
            history: History::new(prices.assets().to_vec()),
            warnings: Vec::new(),
            verbose: false,
            traded: false,
        }
    }

    /// Designate the asset fees are preferably paid from. Unknown symbols
    /// clear the designation.
    pub fn with_fee_asset(mut self, symbol: Option<&str>) -> Self {
        self.fee_asset = symbol.and_then(|s| self.prices.asset_index(s));
        self
    }

    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    pub fn is_verbose(&self) -> bool {
        self.verbose
    }

    pub fn prices(&self) -> &'a PriceMatrix {
        self.prices
    }

    pub fn trade_cost(&self) -> &TradeCost {
        &self.trade_cost
    }

    pub fn fee_asset(&self) -> Option<&str> {
        self.fee_asset.map(|i| self.prices.assets()[i].as_str())
    }

    /// Reset holdings to zero, then apply `initial`. Symbols missing from
    /// the price matrix are ignored.
    pub fn load_holdings(&mut self, initial: &Holdings) {
        self.holdings.iter_mut().for_each(|h| *h = 0.0);
        for (symbol, &qty) in initial {
            match self.prices.asset_index(symbol) {
                Some(a) => self.holdings[a] = qty,
                None => debug!(symbol = %symbol, "ignoring wallet asset absent from prices"),
            }
        }
    }

    pub fn holdings(&self) -> Holdings {
        self.prices
            .assets()
            .iter()
            .cloned()
            .zip(self.holdings.iter().copied())
            .collect()
    }

    pub fn holding(&self, symbol: &str) -> Option<f64> {
        self.prices.asset_index(symbol).map(|a| self.holdings[a])
    }

    fn asset_value(&self, t: usize, a: usize) -> f64 {
        self.prices
            .price(t, a)
            .map_or(0.0, |p| self.holdings[a] * p)
    }

    /// Sum of holdings x price at `t`; assets without a usable price count
    /// as zero.
    pub fn portfolio_value(&self, t: usize) -> f64 {
        (0..self.holdings.len()).map(|a| self.asset_value(t, a)).sum()
    }

    /// Each asset's share of portfolio value; all zero when the value is 0.
    pub fn current_weights(&self, t: usize) -> Weights {
        let total = self.portfolio_value(t);
        self.prices
            .assets()
            .iter()
            .enumerate()
            .map(|(a, symbol)| {
                let w = if total == 0.0 {
                    0.0
                } else {
                    self.asset_value(t, a) / total
                };
                (symbol.clone(), w)
            })
            .collect()
    }

    /// Trade toward `targets` at `t` and pay for it. Returns the cost paid
    /// in quote currency: fees on nominal trade values plus slippage priced
    /// on nominal value.
    ///
    /// Assets without a usable price at `t` are skipped and left out of the
    /// portfolio value the targets are sized against. The other assets still
    /// move to `value * weight`, and since there is no cash leg the proceeds
    /// of their sells are not reinvested: the portfolio loses that value.
    pub fn rebalance(
        &mut self,
        t: usize,
        targets: &Weights,
        slippage_map: Option<&SlippageMap>,
    ) -> Result<f64, BalanceBotError> {
        let prices = self.prices;
        let date = prices.date(t);
        let total_value = self.portfolio_value(t);

        let mut trade_values = Weights::new();
        let mut slippage_cost = 0.0;
        let mut fills: Vec<(usize, f64)> = Vec::new();

        for (a, symbol) in prices.assets().iter().enumerate() {
            let target_weight = targets.get(symbol).copied().unwrap_or(0.0);
            let Some(price) = prices.price(t, a) else {
                if target_weight > 0.0 || self.holdings[a] != 0.0 {
                    self.warn_missing_price(date, symbol);
                }
                continue;
            };

            let current_value = self.holdings[a] * price;
            let delta = total_value * target_weight - current_value;
            if delta.abs() < MIN_TRADE_VALUE {
                continue;
            }

            let slip = self.trade_cost.slippage_for(symbol, slippage_map);
            let exec = execution_price(price, delta, slip);
            // A sell never removes more than is held.
            let qty = (delta / exec).max(-self.holdings[a]);

            trade_values.insert(symbol.clone(), delta);
            slippage_cost += delta.abs() * slip;
            fills.push((a, qty));
        }

        for &(a, qty) in &fills {
            self.holdings[a] += qty;
        }

        let cost = self.trade_cost.compute(&trade_values) + slippage_cost;

        if self.verbose {
            self.narrate_rebalance(t, targets, &fills, cost);
        }

        self.pay_fees(t, cost)?;
        self.traded = true;
        Ok(cost)
    }

    /// Deduct `cost` from holdings using the first [`FeeSource`] that
    /// succeeds, then clear floating-point residue below zero.
    pub fn pay_fees(&mut self, t: usize, cost: f64) -> Result<Option<FeeSource>, BalanceBotError> {
        if cost <= 0.0 {
            return Ok(None);
        }
        let available = self.portfolio_value(t);
        if available < cost {
            return Err(BalanceBotError::FundsExhausted {
                date: self.prices.date(t),
                cost,
                available,
            });
        }

        let source = FeeSource::CASCADE
            .into_iter()
            .find(|&source| self.try_deduct(source, t, cost));

        match source {
            Some(source) => {
                debug!(date = %self.prices.date(t), cost, ?source, "fees paid");
                self.clamp_negative_holdings(t);
                Ok(Some(source))
            }
            None => Err(BalanceBotError::FundsExhausted {
                date: self.prices.date(t),
                cost,
                available,
            }),
        }
    }

    fn try_deduct(&mut self, source: FeeSource, t: usize, cost: f64) -> bool {
        match source {
            FeeSource::StableAsset => {
                let Some(a) = self.fee_asset else {
                    return false;
                };
                self.deduct_from_single(t, a, cost)
            }
            FeeSource::LargestHolding => {
                let mut largest: Option<(usize, f64)> = None;
                for a in 0..self.holdings.len() {
                    if self.prices.price(t, a).is_none() {
                        continue;
                    }
                    let value = self.asset_value(t, a);
                    if largest.is_none_or(|(_, best)| value > best) {
                        largest = Some((a, value));
                    }
                }
                match largest {
                    Some((a, _)) => self.deduct_from_single(t, a, cost),
                    None => false,
                }
            }
            FeeSource::ProRata => {
                let values: Vec<(usize, f64, f64)> = (0..self.holdings.len())
                    .filter_map(|a| {
                        let price = self.prices.price(t, a)?;
                        let value = self.holdings[a] * price;
                        (value > 0.0).then_some((a, value, price))
                    })
                    .collect();
                let total: f64 = values.iter().map(|(_, v, _)| v).sum();
                if total <= 0.0 || total < cost {
                    return false;
                }
                for (a, value, price) in values {
                    self.holdings[a] -= cost * (value / total) / price;
                }
                true
            }
        }
    }

    fn deduct_from_single(&mut self, t: usize, a: usize, cost: f64) -> bool {
        match self.prices.price(t, a) {
            Some(price) if self.holdings[a] * price >= cost => {
                self.holdings[a] -= cost / price;
                true
            }
            _ => false,
        }
    }

    fn clamp_negative_holdings(&mut self, t: usize) {
        let date = self.prices.date(t);
        for a in 0..self.holdings.len() {
            let h = self.holdings[a];
            if h >= 0.0 {
                continue;
            }
            let asset = self.prices.assets()[a].clone();
            if h < -NEGATIVE_HOLDING_TOLERANCE {
                warn!(%date, asset = %asset, amount = h, "holding below zero beyond tolerance, reset to zero");
            } else {
                debug!(%date, asset = %asset, amount = h, "holding reset to zero");
            }
            self.holdings[a] = 0.0;
            self.warnings.push(LedgerWarning::NegativeHoldingCorrected {
                date,
                asset,
                amount: h,
            });
        }
    }

    fn warn_missing_price(&mut self, date: NaiveDate, symbol: &str) {
        warn!(%date, asset = %symbol, "no usable price, trade skipped");
        self.warnings.push(LedgerWarning::MissingPrice {
            date,
            asset: symbol.to_string(),
        });
    }

    /// Append a history row for `t`. Must be called once per step,
    /// with `extra_cost` = 0 when nothing traded.
    pub fn mark_to_market(&mut self, t: usize, extra_cost: f64, targets: Option<&Weights>) {
        let (max_drift, l1_drift) = match targets {
            Some(targets) => {
                let (max, l1) = drift_summary(&self.current_weights(t), targets);
                (Some(max), Some(l1))
            }
            None => (None, None),
        };
        self.history.push(HistoryRecord {
            date: self.prices.date(t),
            value: self.portfolio_value(t),
            cost: extra_cost,
            max_drift,
            l1_drift,
            traded: std::mem::take(&mut self.traded),
            positions: self.holdings.clone(),
        });
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    /// Materialized copy of the recorded history.
    pub fn get_history(&self) -> History {
        self.history.clone()
    }

    pub fn warnings(&self) -> &[LedgerWarning] {
        &self.warnings
    }

    pub fn into_parts(self) -> (History, Vec<LedgerWarning>) {
        (self.history, self.warnings)
    }

    fn narrate_rebalance(&self, t: usize, targets: &Weights, fills: &[(usize, f64)], cost: f64) {
        let date = self.prices.date(t);
        let current = self.current_weights(t);
        let drift: Vec<String> = current
            .iter()
            .filter_map(|(symbol, &w)| {
                let d = w - targets.get(symbol).copied().unwrap_or(0.0);
                (d.abs() >= 0.001).then(|| {
                    let side = if d > 0.0 { "over" } else { "under" };
                    format!("{symbol} {side} ({:+.2}%)", d * 100.0)
                })
            })
            .collect();
        let trades: Vec<String> = fills
            .iter()
            .filter(|(_, q)| q.abs() >= 1e-8)
            .map(|&(a, q)| {
                let side = if q > 0.0 { "buy" } else { "sell" };
                format!("{side} {} {:.6}", self.prices.assets()[a], q.abs())
            })
            .collect();
        info!(%date, "rebalance");
        if !drift.is_empty() {
            info!("  weights after: {}", drift.join("; "));
        }
        if !trades.is_empty() {
            info!("  trades: {}", trades.join("; "));
        }
        info!("  total cost: {cost:.2}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, day).unwrap()
    }

    fn matrix(assets: &[&str], rows: Vec<Vec<f64>>) -> PriceMatrix {
        let dates = (0..rows.len()).map(|i| d(i as u32 + 1)).collect();
        PriceMatrix::new(dates, assets.iter().map(|s| s.to_string()).collect(), rows).unwrap()
    }

    fn holdings(pairs: &[(&str, f64)]) -> Holdings {
        pairs.iter().map(|(k, v)| (k.to_string(), *v)).collect()
    }

    fn weights(pairs: &[(&str, f64)]) -> Weights {
        pairs.iter().map(|(k, v)| (k.to_string(), *v)).collect()
    }

    #[test]
    fn new_ledger_starts_empty() {
        let prices = matrix(&["BTC", "ETH"], vec![vec![100.0, 50.0]]);
        let ledger = Ledger::new(&prices, TradeCost::free());
        assert_eq!(ledger.portfolio_value(0), 0.0);
        assert!(ledger.current_weights(0).values().all(|&w| w == 0.0));
        assert!(ledger.history().is_empty());
        assert_eq!(ledger.fee_asset(), None);
    }

    #[test]
    fn load_holdings_ignores_unknown_assets() {
        let prices = matrix(&["BTC", "ETH"], vec![vec![100.0, 50.0]]);
        let mut ledger = Ledger::new(&prices, TradeCost::free());
        ledger.load_holdings(&holdings(&[("BTC", 1.0), ("DOGE", 100.0)]));
        assert_eq!(ledger.holding("BTC"), Some(1.0));
        assert_eq!(ledger.holding("ETH"), Some(0.0));
        assert_eq!(ledger.holding("DOGE"), None);
        assert!((ledger.portfolio_value(0) - 100.0).abs() < 1e-12);
    }

    #[test]
    fn current_weights_sum_to_one() {
        let prices = matrix(&["BTC", "ETH"], vec![vec![100.0, 50.0]]);
        let mut ledger = Ledger::new(&prices, TradeCost::free());
        ledger.load_holdings(&holdings(&[("BTC", 0.5), ("ETH", 5.0)]));
        let w = ledger.current_weights(0);
        assert!((w.values().sum::<f64>() - 1.0).abs() < 1e-12);
        assert!((w["BTC"] - 50.0 / 300.0).abs() < 1e-12);
    }

    #[test]
    fn missing_price_counts_as_zero_value() {
        let prices = matrix(&["BTC", "ETH"], vec![vec![100.0, f64::NAN]]);
        let mut ledger = Ledger::new(&prices, TradeCost::free());
        ledger.load_holdings(&holdings(&[("BTC", 1.0), ("ETH", 1.0)]));
        assert!((ledger.portfolio_value(0) - 100.0).abs() < 1e-12);
        assert!((ledger.current_weights(0)["BTC"] - 1.0).abs() < 1e-12);
    }

    #[test]
    fn free_rebalance_hits_targets_exactly() {
        let prices = matrix(&["BTC", "ETH"], vec![vec![100.0, 50.0]]);
        let mut ledger = Ledger::new(&prices, TradeCost::free());
        ledger.load_holdings(&holdings(&[("BTC", 2.0)]));
        let cost = ledger
            .rebalance(0, &weights(&[("BTC", 0.5), ("ETH", 0.5)]), None)
            .unwrap();
        assert_eq!(cost, 0.0);
        assert!((ledger.holding("BTC").unwrap() - 1.0).abs() < 1e-12);
        assert!((ledger.holding("ETH").unwrap() - 2.0).abs() < 1e-12);
        assert!((ledger.portfolio_value(0) - 200.0).abs() < 1e-9);
    }

    #[test]
    fn rebalance_cost_is_fees_plus_nominal_slippage() {
        let prices = matrix(&["BTC", "ETH"], vec![vec![100.0, 50.0]]);
        let cost_model = TradeCost::new(0.001, 1.0, 0.01).unwrap();
        let mut ledger = Ledger::new(&prices, cost_model);
        ledger.load_holdings(&holdings(&[("BTC", 10.0)]));

        let cost = ledger
            .rebalance(0, &weights(&[("BTC", 0.5), ("ETH", 0.5)]), None)
            .unwrap();

        // Sell 500 of BTC, buy 500 of ETH.
        let expected = 1000.0 * 0.001 + 2.0 + 1000.0 * 0.01;
        assert!((cost - expected).abs() < 1e-9);
        // BTC sold at 99; the fee came out of the larger ETH position.
        assert!((ledger.holding("BTC").unwrap() - (10.0 - 500.0 / 99.0)).abs() < 1e-9);
        assert!((ledger.holding("ETH").unwrap() - (500.0 / 50.5 - 13.0 / 50.0)).abs() < 1e-9);
    }

    #[test]
    fn slippage_map_rate_is_used() {
        let prices = matrix(&["BTC", "ETH"], vec![vec![100.0, 50.0]]);
        let cost_model = TradeCost::new(0.0, 0.0, 0.0).unwrap();
        let mut ledger = Ledger::new(&prices, cost_model);
        ledger.load_holdings(&holdings(&[("BTC", 10.0)]));
        let mut map = SlippageMap::new();
        map.insert("ETH".into(), 0.02);

        let cost = ledger
            .rebalance(0, &weights(&[("BTC", 0.5), ("ETH", 0.5)]), Some(&map))
            .unwrap();
        assert!((cost - 500.0 * 0.02).abs() < 1e-9);
    }

    #[test]
    fn sells_never_go_below_zero() {
        let prices = matrix(&["BTC", "ETH"], vec![vec![100.0, 50.0]]);
        let cost_model = TradeCost::new(0.0, 0.0, 0.05).unwrap();
        let mut ledger = Ledger::new(&prices, cost_model);
        ledger.load_holdings(&holdings(&[("BTC", 1.0), ("ETH", 2.0)]));
        ledger.rebalance(0, &weights(&[("BTC", 1.0)]), None).unwrap();
        assert!(ledger.holding("ETH").unwrap() >= 0.0);
        assert!(ledger.holdings().values().all(|&h| h >= 0.0));
    }

    #[test]
    fn missing_price_skips_asset_and_warns() {
        let prices = matrix(&["BTC", "ETH"], vec![vec![100.0, f64::NAN]]);
        let mut ledger = Ledger::new(&prices, TradeCost::free());
        ledger.load_holdings(&holdings(&[("BTC", 1.0), ("ETH", 3.0)]));
        let cost = ledger
            .rebalance(0, &weights(&[("BTC", 0.5), ("ETH", 0.5)]), None)
            .unwrap();
        assert_eq!(cost, 0.0);
        assert_eq!(ledger.holding("ETH"), Some(3.0));
        // BTC is sized against the 100 of priced value; its sell proceeds go nowhere.
        assert!((ledger.holding("BTC").unwrap() - 0.5).abs() < 1e-12);
        assert!((ledger.portfolio_value(0) - 50.0).abs() < 1e-12);
        assert_eq!(
            ledger.warnings(),
            &[LedgerWarning::MissingPrice {
                date: d(1),
                asset: "ETH".into()
            }]
        );
    }

    #[test]
    fn fees_prefer_stable_asset() {
        let prices = matrix(&["BTCEUR", "USDTEUR"], vec![vec![100.0, 1.0]]);
        let mut ledger = Ledger::new(&prices, TradeCost::free());
        assert_eq!(ledger.fee_asset(), Some("USDTEUR"));
        ledger.load_holdings(&holdings(&[("BTCEUR", 10.0), ("USDTEUR", 50.0)]));
        let source = ledger.pay_fees(0, 5.0).unwrap();
        assert_eq!(source, Some(FeeSource::StableAsset));
        assert!((ledger.holding("USDTEUR").unwrap() - 45.0).abs() < 1e-12);
        assert_eq!(ledger.holding("BTCEUR"), Some(10.0));
    }

    #[test]
    fn fees_fall_back_to_largest_holding() {
        let prices = matrix(&["BTCEUR", "ETHEUR", "USDTEUR"], vec![vec![100.0, 50.0, 1.0]]);
        let mut ledger = Ledger::new(&prices, TradeCost::free());
        ledger.load_holdings(&holdings(&[("BTCEUR", 1.0), ("ETHEUR", 10.0), ("USDTEUR", 2.0)]));
        let source = ledger.pay_fees(0, 50.0).unwrap();
        assert_eq!(source, Some(FeeSource::LargestHolding));
        assert!((ledger.holding("ETHEUR").unwrap() - 9.0).abs() < 1e-12);
        assert_eq!(ledger.holding("USDTEUR"), Some(2.0));
    }

    #[test]
    fn fees_fall_back_to_pro_rata() {
        let prices = matrix(&["BTC", "ETH"], vec![vec![100.0, 50.0]]);
        let mut ledger = Ledger::new(&prices, TradeCost::free());
        ledger.load_holdings(&holdings(&[("BTC", 1.0), ("ETH", 2.0)]));
        let source = ledger.pay_fees(0, 150.0).unwrap();
        assert_eq!(source, Some(FeeSource::ProRata));
        assert!((ledger.portfolio_value(0) - 50.0).abs() < 1e-9);
        assert!((ledger.holding("BTC").unwrap() - 0.25).abs() < 1e-9);
        assert!((ledger.holding("ETH").unwrap() - 0.5).abs() < 1e-9);
    }

    #[test]
    fn fees_beyond_portfolio_value_exhaust_funds() {
        let prices = matrix(&["BTC"], vec![vec![100.0]]);
        let mut ledger = Ledger::new(&prices, TradeCost::free());
        ledger.load_holdings(&holdings(&[("BTC", 0.01)]));
        let err = ledger.pay_fees(0, 5.0).unwrap_err();
        assert!(matches!(err, BalanceBotError::FundsExhausted { .. }));
    }

    #[test]
    fn zero_cost_pays_nothing() {
        let prices = matrix(&["BTC"], vec![vec![100.0]]);
        let mut ledger = Ledger::new(&prices, TradeCost::free());
        assert_eq!(ledger.pay_fees(0, 0.0).unwrap(), None);
    }

    #[test]
    fn paying_entire_value_clamps_residue() {
        let prices = matrix(&["BTC", "ETH"], vec![vec![3.0, 7.0]]);
        let mut ledger = Ledger::new(&prices, TradeCost::free());
        ledger.load_holdings(&holdings(&[("BTC", 0.1), ("ETH", 0.3)]));
        let value = ledger.portfolio_value(0);
        ledger.pay_fees(0, value).unwrap();
        assert!(ledger.holdings().values().all(|&h| h >= 0.0));
        assert!(ledger.portfolio_value(0).abs() < 1e-9);
    }

    #[test]
    fn negative_residue_is_clamped_with_warning() {
        let prices = matrix(&["BTC", "ETH"], vec![vec![100.0, 50.0]]);
        let mut ledger = Ledger::new(&prices, TradeCost::free());
        ledger.load_holdings(&holdings(&[("BTC", 1.0), ("ETH", -1e-12)]));

        let source = ledger.pay_fees(0, 1.0).unwrap();
        assert_eq!(source, Some(FeeSource::LargestHolding));
        assert_eq!(ledger.holding("ETH"), Some(0.0));
        assert!((ledger.holding("BTC").unwrap() - 0.99).abs() < 1e-12);
        assert_eq!(
            ledger.warnings(),
            &[LedgerWarning::NegativeHoldingCorrected {
                date: d(1),
                asset: "ETH".into(),
                amount: -1e-12,
            }]
        );
    }

    #[test]
    fn explicit_fee_asset_overrides_detection() {
        let prices = matrix(&["BTC", "ETH"], vec![vec![100.0, 50.0]]);
        let ledger = Ledger::new(&prices, TradeCost::free()).with_fee_asset(Some("ETH"));
        assert_eq!(ledger.fee_asset(), Some("ETH"));
        let ledger = ledger.with_fee_asset(Some("XRP"));
        assert_eq!(ledger.fee_asset(), None);
    }

    #[test]
    fn free_rebalance_marks_the_step_as_traded() {
        let prices = matrix(&["BTC", "ETH"], vec![vec![100.0, 50.0], vec![100.0, 50.0]]);
        let mut ledger = Ledger::new(&prices, TradeCost::free());
        ledger.load_holdings(&holdings(&[("BTC", 2.0)]));
        let cost = ledger
            .rebalance(0, &weights(&[("BTC", 0.5), ("ETH", 0.5)]), None)
            .unwrap();
        ledger.mark_to_market(0, cost, None);
        ledger.mark_to_market(1, 0.0, None);

        let h = ledger.get_history();
        assert_eq!(h.costs(), vec![0.0, 0.0]);
        assert!(h.records()[0].traded);
        assert!(!h.records()[1].traded);
        assert_eq!(h.rebalance_count(), 1);
    }

    #[test]
    fn mark_to_market_records_drift_when_targets_given() {
        let prices = matrix(&["BTC", "ETH"], vec![vec![100.0, 50.0], vec![110.0, 50.0]]);
        let mut ledger = Ledger::new(&prices, TradeCost::free());
        ledger.load_holdings(&holdings(&[("BTC", 1.0), ("ETH", 2.0)]));
        ledger.mark_to_market(0, 0.0, None);
        ledger.mark_to_market(1, 1.25, Some(&weights(&[("BTC", 0.5), ("ETH", 0.5)])));

        let h = ledger.get_history();
        assert_eq!(h.len(), 2);
        assert_eq!(h.records()[0].max_drift, None);
        assert!((h.records()[1].value - 210.0).abs() < 1e-12);
        assert_eq!(h.records()[1].cost, 1.25);
        let max = h.records()[1].max_drift.unwrap();
        assert!((max - (110.0 / 210.0 - 0.5)).abs() < 1e-12);
        assert!((h.records()[1].l1_drift.unwrap() - 2.0 * max).abs() < 1e-12);
        assert_eq!(h.records()[1].positions, vec![1.0, 2.0]);
    }
}
