#![allow(dead_code)]

use balancebot::domain::error::BalanceBotError;
use balancebot::domain::price_matrix::{AssetSeries, PriceMatrix, PricePoint};
use balancebot::domain::wallet::Holdings;
use balancebot::domain::weights::Weights;
use balancebot::ports::data_port::DataPort;
use chrono::NaiveDate;
use std::collections::HashMap;

pub struct MockDataPort {
    pub data: HashMap<String, Vec<PricePoint>>,
    pub errors: HashMap<String, String>,
}

impl MockDataPort {
    pub fn new() -> Self {
        Self {
            data: HashMap::new(),
            errors: HashMap::new(),
        }
    }

    pub fn with_closes(mut self, symbol: &str, start: NaiveDate, closes: &[f64]) -> Self {
        self.data
            .insert(symbol.to_string(), make_points(start, closes));
        self
    }

    pub fn with_error(mut self, symbol: &str, reason: &str) -> Self {
        self.errors.insert(symbol.to_string(), reason.to_string());
        self
    }
}

impl DataPort for MockDataPort {
    fn fetch_closes(
        &self,
        symbol: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<Vec<PricePoint>, BalanceBotError> {
        if let Some(reason) = self.errors.get(symbol) {
            return Err(BalanceBotError::Data {
                reason: reason.clone(),
            });
        }
        Ok(self
            .data
            .get(symbol)
            .map(|points| {
                points
                    .iter()
                    .filter(|p| p.date >= start_date && p.date <= end_date)
                    .copied()
                    .collect()
            })
            .unwrap_or_default())
    }

    fn list_symbols(&self) -> Result<Vec<String>, BalanceBotError> {
        let mut symbols: Vec<String> = self.data.keys().cloned().collect();
        symbols.sort();
        Ok(symbols)
    }

    fn get_data_range(
        &self,
        symbol: &str,
    ) -> Result<Option<(NaiveDate, NaiveDate, usize)>, BalanceBotError> {
        Ok(self.data.get(symbol).and_then(|points| {
            Some((points.first()?.date, points.last()?.date, points.len()))
        }))
    }
}

pub fn date(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).unwrap()
}

pub fn make_points(start: NaiveDate, closes: &[f64]) -> Vec<PricePoint> {
    closes
        .iter()
        .enumerate()
        .map(|(i, &close)| PricePoint {
            date: start + chrono::Duration::days(i as i64),
            close,
        })
        .collect()
}

/// Daily price matrix starting at `start`, one column per `(symbol, closes)`.
pub fn make_matrix(start: NaiveDate, columns: &[(&str, Vec<f64>)]) -> PriceMatrix {
    let series: Vec<AssetSeries> = columns
        .iter()
        .map(|(symbol, closes)| AssetSeries::new(symbol.to_string(), make_points(start, closes)))
        .collect();
    PriceMatrix::from_series(&series).unwrap()
}

pub fn holdings(pairs: &[(&str, f64)]) -> Holdings {
    pairs.iter().map(|(k, v)| (k.to_string(), *v)).collect()
}

pub fn weights(pairs: &[(&str, f64)]) -> Weights {
    pairs.iter().map(|(k, v)| (k.to_string(), *v)).collect()
}

/// The BTC/ETH four-row scenario.
pub fn btc_eth_matrix() -> PriceMatrix {
    make_matrix(
        date(2024, 1, 1),
        &[
            ("BTC", vec![100.0, 110.0, 105.0, 120.0]),
            ("ETH", vec![50.0, 55.0, 60.0, 58.0]),
        ],
    )
}

/// Deterministic zig-zag series with a drift, `n` rows long.
pub fn zigzag(n: usize, base: f64, amplitude: f64, trend: f64) -> Vec<f64> {
    (0..n)
        .map(|i| {
            let swing = if i % 2 == 0 { amplitude } else { -amplitude };
            base * (1.0 + trend * i as f64) + swing
        })
        .collect()
}
