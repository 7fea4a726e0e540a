//! User wallet and its conversion into initial holdings.

use std::collections::BTreeMap;

use super::error::BalanceBotError;

/// Mapping from price-matrix symbol to quantity held.
pub type Holdings = BTreeMap<String, f64>;

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct WalletItem {
    pub symbol: String,
    pub amount: f64,
}

#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Wallet {
    pub items: Vec<WalletItem>,
}

impl Wallet {
    pub fn new(items: Vec<WalletItem>) -> Self {
        Self { items }
    }

    pub fn from_pairs(pairs: &[(&str, f64)]) -> Self {
        Self {
            items: pairs
                .iter()
                .map(|(symbol, amount)| WalletItem {
                    symbol: symbol.to_string(),
                    amount: *amount,
                })
                .collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Convert to holdings keyed by market symbol (`BTC` -> `BTCEUR` for
    /// quote `EUR`). Symbols already ending in the quote are kept as-is and
    /// repeated items are summed.
    pub fn to_holdings(&self, quote: &str) -> Result<Holdings, BalanceBotError> {
        let quote = quote.trim().to_uppercase();
        let mut holdings = Holdings::new();
        for item in &self.items {
            if !item.amount.is_finite() || item.amount < 0.0 {
                return Err(BalanceBotError::invalid_parameter(
                    "wallet",
                    format!("amount for {} must be a non-negative number", item.symbol),
                ));
            }
            let symbol = market_symbol(&item.symbol, &quote);
            *holdings.entry(symbol).or_insert(0.0) += item.amount;
        }
        Ok(holdings)
    }
}

pub fn market_symbol(symbol: &str, quote: &str) -> String {
    let symbol = symbol.trim().to_uppercase();
    let quote = quote.trim().to_uppercase();
    if quote.is_empty() || (symbol.ends_with(&quote) && symbol.len() > quote.len()) {
        symbol
    } else {
        format!("{symbol}{quote}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn appends_quote_currency() {
        let wallet = Wallet::from_pairs(&[("btc", 0.5), ("ETH", 5.0)]);
        let h = wallet.to_holdings("EUR").unwrap();
        assert_eq!(h.len(), 2);
        assert!((h["BTCEUR"] - 0.5).abs() < f64::EPSILON);
        assert!((h["ETHEUR"] - 5.0).abs() < f64::EPSILON);
    }

    #[test]
    fn keeps_symbols_already_quoted() {
        let wallet = Wallet::from_pairs(&[("BTCEUR", 1.0), ("BTC", 0.5)]);
        let h = wallet.to_holdings("eur").unwrap();
        assert_eq!(h.len(), 1);
        assert!((h["BTCEUR"] - 1.5).abs() < f64::EPSILON);
    }

    #[test]
    fn quote_symbol_itself_is_suffixed() {
        assert_eq!(market_symbol("EUR", "EUR"), "EUREUR");
    }

    #[test]
    fn empty_quote_keeps_symbols() {
        let wallet = Wallet::from_pairs(&[("BTC", 0.5)]);
        let h = wallet.to_holdings("").unwrap();
        assert!(h.contains_key("BTC"));
    }

    #[test]
    fn rejects_negative_and_nan_amounts() {
        assert!(Wallet::from_pairs(&[("BTC", -1.0)]).to_holdings("EUR").is_err());
        assert!(Wallet::from_pairs(&[("BTC", f64::NAN)]).to_holdings("EUR").is_err());
    }
}
