//! Price matrix: ascending dates x asset symbols, plus the unified timeline
//! used to assemble one from per-asset close series.

use chrono::NaiveDate;
use std::collections::{BTreeSet, HashMap, HashSet};

use super::error::BalanceBotError;

#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PricePoint {
    pub date: NaiveDate,
    pub close: f64,
}

/// Close prices for one symbol, indexed by date.
#[derive(Debug, Clone)]
pub struct AssetSeries {
    pub symbol: String,
    pub points: Vec<PricePoint>,
    pub date_index: HashMap<NaiveDate, usize>,
}

impl AssetSeries {
    pub fn new(symbol: String, points: Vec<PricePoint>) -> Self {
        let date_index = points
            .iter()
            .enumerate()
            .map(|(i, p)| (p.date, i))
            .collect();
        Self {
            symbol,
            points,
            date_index,
        }
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn close_on(&self, date: NaiveDate) -> Option<f64> {
        self.date_index.get(&date).map(|&i| self.points[i].close)
    }
}

pub fn build_unified_timeline(series: &[AssetSeries]) -> Vec<NaiveDate> {
    let unique_dates: BTreeSet<NaiveDate> = series
        .iter()
        .flat_map(|s| s.points.iter().map(|p| p.date))
        .collect();
    unique_dates.into_iter().collect()
}

/// Row-major matrix of close prices. Missing cells are stored as NaN and
/// reported as unavailable by [`PriceMatrix::price`].
#[derive(Debug, Clone, PartialEq)]
pub struct PriceMatrix {
    dates: Vec<NaiveDate>,
    assets: Vec<String>,
    cells: Vec<f64>,
}

impl PriceMatrix {
    pub fn new(
        dates: Vec<NaiveDate>,
        assets: Vec<String>,
        rows: Vec<Vec<f64>>,
    ) -> Result<Self, BalanceBotError> {
        if dates.windows(2).any(|w| w[0] >= w[1]) {
            return Err(BalanceBotError::InvalidPriceMatrix {
                reason: "dates must be strictly ascending".into(),
            });
        }
        let mut seen = HashSet::new();
        for asset in &assets {
            if asset.trim().is_empty() {
                return Err(BalanceBotError::InvalidPriceMatrix {
                    reason: "empty asset symbol".into(),
                });
            }
            if !seen.insert(asset.as_str()) {
                return Err(BalanceBotError::InvalidPriceMatrix {
                    reason: format!("duplicate asset {asset}"),
                });
            }
        }
        if rows.len() != dates.len() {
            return Err(BalanceBotError::InvalidPriceMatrix {
                reason: format!("{} rows for {} dates", rows.len(), dates.len()),
            });
        }

        let mut cells = Vec::with_capacity(dates.len() * assets.len());
        for (t, row) in rows.into_iter().enumerate() {
            if row.len() != assets.len() {
                return Err(BalanceBotError::InvalidPriceMatrix {
                    reason: format!(
                        "row {t} has {} prices for {} assets",
                        row.len(),
                        assets.len()
                    ),
                });
            }
            cells.extend(row);
        }

        Ok(Self {
            dates,
            assets,
            cells,
        })
    }

    /// Align several close series on their unified timeline. Dates missing
    /// from a series become unavailable cells for that asset.
    pub fn from_series(series: &[AssetSeries]) -> Result<Self, BalanceBotError> {
        let dates = build_unified_timeline(series);
        let assets: Vec<String> = series.iter().map(|s| s.symbol.clone()).collect();
        let rows = dates
            .iter()
            .map(|&d| {
                series
                    .iter()
                    .map(|s| s.close_on(d).unwrap_or(f64::NAN))
                    .collect()
            })
            .collect();
        Self::new(dates, assets, rows)
    }

    pub fn len(&self) -> usize {
        self.dates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }

    pub fn width(&self) -> usize {
        self.assets.len()
    }

    pub fn dates(&self) -> &[NaiveDate] {
        &self.dates
    }

    pub fn assets(&self) -> &[String] {
        &self.assets
    }

    pub fn date(&self, t: usize) -> NaiveDate {
        self.dates[t]
    }

    pub fn asset_index(&self, symbol: &str) -> Option<usize> {
        self.assets.iter().position(|a| a == symbol)
    }

    /// The stored cell, which may be NaN, zero or negative.
    pub fn raw(&self, t: usize, asset: usize) -> f64 {
        self.cells[t * self.assets.len() + asset]
    }

    /// The price if it is finite and strictly positive.
    pub fn price(&self, t: usize, asset: usize) -> Option<f64> {
        let p = self.raw(t, asset);
        (p.is_finite() && p > 0.0).then_some(p)
    }

    pub fn price_of(&self, t: usize, symbol: &str) -> Option<f64> {
        self.asset_index(symbol).and_then(|a| self.price(t, a))
    }

    pub fn row(&self, t: usize) -> &[f64] {
        let width = self.assets.len();
        &self.cells[t * width..(t + 1) * width]
    }

    pub fn column(&self, asset: usize) -> Vec<f64> {
        (0..self.len()).map(|t| self.raw(t, asset)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn series(symbol: &str, points: &[(&str, f64)]) -> AssetSeries {
        AssetSeries::new(
            symbol.to_string(),
            points
                .iter()
                .map(|(date, close)| PricePoint {
                    date: d(date),
                    close: *close,
                })
                .collect(),
        )
    }

    #[test]
    fn unified_timeline_merges_and_sorts() {
        let btc = series("BTC", &[("2024-01-02", 100.0), ("2024-01-05", 101.0)]);
        let eth = series("ETH", &[("2024-01-01", 50.0), ("2024-01-03", 51.0)]);
        let timeline = build_unified_timeline(&[btc, eth]);
        assert_eq!(
            timeline,
            vec![d("2024-01-01"), d("2024-01-02"), d("2024-01-03"), d("2024-01-05")]
        );
    }

    #[test]
    fn unified_timeline_empty() {
        assert!(build_unified_timeline(&[]).is_empty());
    }

    #[test]
    fn from_series_marks_missing_cells() {
        let btc = series("BTC", &[("2024-01-01", 100.0), ("2024-01-02", 110.0)]);
        let eth = series("ETH", &[("2024-01-02", 55.0)]);
        let m = PriceMatrix::from_series(&[btc, eth]).unwrap();

        assert_eq!(m.len(), 2);
        assert_eq!(m.assets(), &["BTC".to_string(), "ETH".to_string()]);
        assert_eq!(m.price(0, 0), Some(100.0));
        assert_eq!(m.price(0, 1), None);
        assert!(m.raw(0, 1).is_nan());
        assert_eq!(m.price_of(1, "ETH"), Some(55.0));
    }

    #[test]
    fn zero_and_negative_prices_are_unavailable() {
        let m = PriceMatrix::new(
            vec![d("2024-01-01")],
            vec!["A".into(), "B".into(), "C".into()],
            vec![vec![0.0, -3.0, f64::INFINITY]],
        )
        .unwrap();
        assert_eq!(m.price(0, 0), None);
        assert_eq!(m.price(0, 1), None);
        assert_eq!(m.price(0, 2), None);
    }

    #[test]
    fn rejects_unsorted_dates() {
        let err = PriceMatrix::new(
            vec![d("2024-01-02"), d("2024-01-01")],
            vec!["A".into()],
            vec![vec![1.0], vec![1.0]],
        );
        assert!(matches!(err, Err(BalanceBotError::InvalidPriceMatrix { .. })));
    }

    #[test]
    fn rejects_duplicate_dates_and_assets() {
        assert!(
            PriceMatrix::new(
                vec![d("2024-01-01"), d("2024-01-01")],
                vec!["A".into()],
                vec![vec![1.0], vec![1.0]],
            )
            .is_err()
        );
        assert!(
            PriceMatrix::new(
                vec![d("2024-01-01")],
                vec!["A".into(), "A".into()],
                vec![vec![1.0, 2.0]],
            )
            .is_err()
        );
    }

    #[test]
    fn rejects_ragged_rows() {
        let err = PriceMatrix::new(
            vec![d("2024-01-01")],
            vec!["A".into(), "B".into()],
            vec![vec![1.0]],
        );
        assert!(err.is_err());
    }

    #[test]
    fn row_and_column_access() {
        let m = PriceMatrix::new(
            vec![d("2024-01-01"), d("2024-01-02")],
            vec!["A".into(), "B".into()],
            vec![vec![1.0, 2.0], vec![3.0, 4.0]],
        )
        .unwrap();
        assert_eq!(m.row(1), &[3.0, 4.0]);
        assert_eq!(m.column(1), vec![2.0, 4.0]);
        assert_eq!(m.asset_index("B"), Some(1));
        assert_eq!(m.asset_index("Z"), None);
    }
}
