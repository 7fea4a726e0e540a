//! CSV history writer: one row per step, indexed by date.

use crate::domain::backtest::BacktestResult;
use crate::domain::error::BalanceBotError;
use crate::domain::history::History;
use crate::ports::report_port::ReportPort;
use std::io::Write;

#[derive(Debug, Clone, Copy, Default)]
pub struct CsvReportAdapter;

impl CsvReportAdapter {
    pub fn new() -> Self {
        Self
    }

    /// Write `history` as CSV to any writer. Missing drift values are
    /// written as empty fields.
    pub fn write_history<W: Write>(history: &History, writer: W) -> Result<(), BalanceBotError> {
        let mut wtr = csv::Writer::from_writer(writer);
        let header: Vec<String> = std::iter::once("date".to_string())
            .chain(history.columns())
            .collect();
        wtr.write_record(&header).map_err(csv_error)?;

        for record in history.records() {
            let optional = |v: Option<f64>| v.map(|x| x.to_string()).unwrap_or_default();
            let row: Vec<String> = [
                record.date.format("%Y-%m-%d").to_string(),
                record.value.to_string(),
                record.cost.to_string(),
                optional(record.max_drift),
                optional(record.l1_drift),
            ]
            .into_iter()
            .chain(record.positions.iter().map(|q| q.to_string()))
            .collect();
            wtr.write_record(&row).map_err(csv_error)?;
        }

        wtr.flush()?;
        Ok(())
    }
}

fn csv_error(e: csv::Error) -> BalanceBotError {
    BalanceBotError::Data {
        reason: format!("CSV write error: {e}"),
    }
}

impl ReportPort for CsvReportAdapter {
    fn write(&self, result: &BacktestResult, output_path: &str) -> Result<(), BalanceBotError> {
        let file = std::fs::File::create(output_path)?;
        Self::write_history(&result.history, file)
    }
}
