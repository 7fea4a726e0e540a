//! Append-only, date-indexed record of a backtest run.

use chrono::NaiveDate;

pub const BASE_COLUMNS: [&str; 4] = ["value", "cost", "max_drift", "l1_drift"];

/// One mark-to-market snapshot.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct HistoryRecord {
    pub date: NaiveDate,
    pub value: f64,
    pub cost: f64,
    pub max_drift: Option<f64>,
    pub l1_drift: Option<f64>,
    /// A rebalance executed on this step, whether or not it cost anything.
    pub traded: bool,
    /// Quantities per asset, aligned with [`History::assets`].
    pub positions: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct History {
    assets: Vec<String>,
    records: Vec<HistoryRecord>,
}

impl History {
    pub fn new(assets: Vec<String>) -> Self {
        Self {
            assets,
            records: Vec::new(),
        }
    }

    pub fn push(&mut self, record: HistoryRecord) {
        debug_assert_eq!(record.positions.len(), self.assets.len());
        self.records.push(record);
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn assets(&self) -> &[String] {
        &self.assets
    }

    pub fn records(&self) -> &[HistoryRecord] {
        &self.records
    }

    pub fn first(&self) -> Option<&HistoryRecord> {
        self.records.first()
    }

    pub fn last(&self) -> Option<&HistoryRecord> {
        self.records.last()
    }

    /// Column names of the tabular view; the date is the index.
    pub fn columns(&self) -> Vec<String> {
        BASE_COLUMNS
            .iter()
            .map(|c| c.to_string())
            .chain(self.assets.iter().map(|a| format!("pos_{a}")))
            .collect()
    }

    pub fn dates(&self) -> Vec<NaiveDate> {
        self.records.iter().map(|r| r.date).collect()
    }

    pub fn values(&self) -> Vec<f64> {
        self.records.iter().map(|r| r.value).collect()
    }

    pub fn costs(&self) -> Vec<f64> {
        self.records.iter().map(|r| r.cost).collect()
    }

    pub fn total_cost(&self) -> f64 {
        self.records.iter().map(|r| r.cost).sum()
    }

    /// Steps on which the policy traded.
    pub fn rebalance_count(&self) -> usize {
        self.records.iter().filter(|r| r.traded).count()
    }

    pub fn position(&self, t: usize, symbol: &str) -> Option<f64> {
        let a = self.assets.iter().position(|s| s == symbol)?;
        self.records.get(t).map(|r| r.positions[a])
    }

    pub fn get(&self, date: NaiveDate) -> Option<&HistoryRecord> {
        self.records
            .binary_search_by_key(&date, |r| r.date)
            .ok()
            .map(|i| &self.records[i])
    }
}
