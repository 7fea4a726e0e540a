//! Asset universe: symbol lists from configuration and loading their price
//! history into a [`PriceMatrix`].

use crate::domain::error::BalanceBotError;
use crate::domain::price_matrix::{AssetSeries, PriceMatrix};
use crate::ports::data_port::DataPort;
use chrono::NaiveDate;
use std::collections::HashSet;
use tracing::{info, warn};

/// Series shorter than this are still loaded, with a warning.
pub const MIN_PRICE_ROWS: usize = 2;

pub fn parse_symbols(input: &str) -> Result<Vec<String>, BalanceBotError> {
    let mut symbols = Vec::new();
    let mut seen = HashSet::new();

    for token in input.split(',') {
        let trimmed = token.trim();
        if trimmed.is_empty() {
            return Err(BalanceBotError::invalid_parameter(
                "symbols",
                "empty token in symbol list",
            ));
        }
        let symbol = trimmed.to_uppercase();
        if !seen.insert(symbol.clone()) {
            return Err(BalanceBotError::invalid_parameter(
                "symbols",
                format!("duplicate symbol {symbol}"),
            ));
        }
        symbols.push(symbol);
    }

    Ok(symbols)
}

#[derive(Debug, Clone, PartialEq)]
pub enum SkipReason {
    FetchFailed(String),
    NoData,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SkippedSymbol {
    pub symbol: String,
    pub reason: SkipReason,
}

#[derive(Debug, Clone)]
pub struct LoadedUniverse {
    pub prices: PriceMatrix,
    pub skipped: Vec<SkippedSymbol>,
}

/// Fetch every symbol and align the series on one timeline. Symbols that
/// fail or return nothing are skipped; an error is returned only when none
/// is left.
pub fn load_universe(
    data_port: &dyn DataPort,
    symbols: &[String],
    start_date: NaiveDate,
    end_date: NaiveDate,
) -> Result<LoadedUniverse, BalanceBotError> {
    let mut series = Vec::new();
    let mut skipped = Vec::new();

    for symbol in symbols {
        let points = match data_port.fetch_closes(symbol, start_date, end_date) {
            Ok(points) => points,
            Err(e) => {
                warn!(symbol = %symbol, error = %e, "skipping symbol");
                skipped.push(SkippedSymbol {
                    symbol: symbol.clone(),
                    reason: SkipReason::FetchFailed(e.to_string()),
                });
                continue;
            }
        };

        if points.is_empty() {
            warn!(symbol = %symbol, "skipping symbol with no data in range");
            skipped.push(SkippedSymbol {
                symbol: symbol.clone(),
                reason: SkipReason::NoData,
            });
            continue;
        }
        if points.len() < MIN_PRICE_ROWS {
            warn!(symbol = %symbol, rows = points.len(), "very short price history");
        }

        info!(symbol = %symbol, rows = points.len(), "loaded prices");
        series.push(AssetSeries::new(symbol.clone(), points));
    }

    if series.is_empty() {
        return Err(BalanceBotError::NoData {
            symbol: symbols.join(","),
        });
    }

    Ok(LoadedUniverse {
        prices: PriceMatrix::from_series(&series)?,
        skipped,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::price_matrix::PricePoint;
    use std::collections::HashMap;

    struct FakeData {
        series: HashMap<String, Vec<PricePoint>>,
    }

    impl DataPort for FakeData {
        fn fetch_closes(
            &self,
            symbol: &str,
            _start: NaiveDate,
            _end: NaiveDate,
        ) -> Result<Vec<PricePoint>, BalanceBotError> {
            self.series.get(symbol).cloned().ok_or_else(|| BalanceBotError::NoData {
                symbol: symbol.to_string(),
            })
        }

        fn list_symbols(&self) -> Result<Vec<String>, BalanceBotError> {
            Ok(self.series.keys().cloned().collect())
        }

        fn get_data_range(
            &self,
            _symbol: &str,
        ) -> Result<Option<(NaiveDate, NaiveDate, usize)>, BalanceBotError> {
            Ok(None)
        }
    }

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, day).unwrap()
    }

    fn fake() -> FakeData {
        let mut series = HashMap::new();
        series.insert(
            "BTCEUR".to_string(),
            vec![
                PricePoint { date: d(1), close: 100.0 },
                PricePoint { date: d(2), close: 101.0 },
            ],
        );
        series.insert(
            "ETHEUR".to_string(),
            vec![PricePoint { date: d(2), close: 50.0 }],
        );
        series.insert("ADAEUR".to_string(), vec![]);
        FakeData { series }
    }

    #[test]
    fn parse_symbols_valid() {
        assert_eq!(parse_symbols("btc, ETH").unwrap(), vec!["BTC", "ETH"]);
    }

    #[test]
    fn parse_symbols_rejects_empty_and_duplicates() {
        assert!(parse_symbols("BTC,,ETH").is_err());
        assert!(parse_symbols("BTC,btc").is_err());
    }

    #[test]
    fn load_aligns_series_and_skips_missing() {
        let symbols: Vec<String> = ["BTCEUR", "ETHEUR", "ADAEUR", "XRPEUR"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        let loaded = load_universe(&fake(), &symbols, d(1), d(31)).unwrap();
        assert_eq!(loaded.prices.assets(), &["BTCEUR".to_string(), "ETHEUR".to_string()]);
        assert_eq!(loaded.prices.len(), 2);
        assert_eq!(loaded.prices.price_of(0, "ETHEUR"), None);
        assert_eq!(loaded.prices.price_of(1, "ETHEUR"), Some(50.0));
        assert_eq!(loaded.skipped.len(), 2);
        assert_eq!(loaded.skipped[0].reason, SkipReason::NoData);
        assert!(matches!(loaded.skipped[1].reason, SkipReason::FetchFailed(_)));
    }

    #[test]
    fn load_fails_when_nothing_loads() {
        let symbols = vec!["XRPEUR".to_string()];
        let err = load_universe(&fake(), &symbols, d(1), d(31)).unwrap_err();
        assert!(matches!(err, BalanceBotError::NoData { .. }));
    }
}
