//! Historical price access port trait.

use crate::domain::error::BalanceBotError;
use crate::domain::price_matrix::PricePoint;
use chrono::NaiveDate;

pub trait DataPort {
    /// Daily closes for `symbol` within `[start_date, end_date]`, ascending.
    fn fetch_closes(
        &self,
        symbol: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<Vec<PricePoint>, BalanceBotError>;

    fn list_symbols(&self) -> Result<Vec<String>, BalanceBotError>;

    /// (first date, last date, row count), or `None` when nothing is stored.
    fn get_data_range(
        &self,
        symbol: &str,
    ) -> Result<Option<(NaiveDate, NaiveDate, usize)>, BalanceBotError>;
}
