//! Run output port trait.

use crate::domain::backtest::{BacktestResult, CadenceComparison};
use crate::domain::error::BalanceBotError;

/// Port for persisting a backtest run.
pub trait ReportPort {
    fn write(&self, result: &BacktestResult, output_path: &str) -> Result<(), BalanceBotError>;

    /// Default implementation: writes only the winning run.
    fn write_comparison(
        &self,
        comparison: &CadenceComparison,
        output_path: &str,
    ) -> Result<(), BalanceBotError> {
        self.write(comparison.best_result(), output_path)
    }
}
