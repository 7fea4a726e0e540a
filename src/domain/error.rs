//! Domain error types.

use chrono::NaiveDate;

/// Top-level error type for balancebot.
#[derive(Debug, thiserror::Error)]
pub enum BalanceBotError {
    #[error("invalid parameter {name}: {reason}")]
    InvalidParameter { name: String, reason: String },

    #[error("empty or invalid portfolio: initial capital is {capital}")]
    EmptyOrInvalidPortfolio { capital: f64 },

    #[error("funds exhausted on {date}: cost {cost:.4} exceeds portfolio value {available:.4}")]
    FundsExhausted {
        date: NaiveDate,
        cost: f64,
        available: f64,
    },

    #[error("invalid price matrix: {reason}")]
    InvalidPriceMatrix { reason: String },

    #[error("config parse error in {file}: {reason}")]
    ConfigParse { file: String, reason: String },

    #[error("missing config key [{section}] {key}")]
    ConfigMissing { section: String, key: String },

    #[error("invalid config value [{section}] {key}: {reason}")]
    ConfigInvalid {
        section: String,
        key: String,
        reason: String,
    },

    #[error("data error: {reason}")]
    Data { reason: String },

    #[error("no data for {symbol}")]
    NoData { symbol: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl BalanceBotError {
    pub fn invalid_parameter(name: impl Into<String>, reason: impl Into<String>) -> Self {
        BalanceBotError::InvalidParameter {
            name: name.into(),
            reason: reason.into(),
        }
    }

    /// True for the conditions that abort a run after it has started.
    pub fn is_fatal_to_run(&self) -> bool {
        matches!(
            self,
            BalanceBotError::EmptyOrInvalidPortfolio { .. } | BalanceBotError::FundsExhausted { .. }
        )
    }
}

impl From<&BalanceBotError> for std::process::ExitCode {
    fn from(err: &BalanceBotError) -> Self {
        let code: u8 = match err {
            BalanceBotError::Io(_) => 1,
            BalanceBotError::ConfigParse { .. }
            | BalanceBotError::ConfigMissing { .. }
            | BalanceBotError::ConfigInvalid { .. } => 2,
            BalanceBotError::Data { .. }
            | BalanceBotError::NoData { .. }
            | BalanceBotError::InvalidPriceMatrix { .. } => 3,
            BalanceBotError::InvalidParameter { .. } => 4,
            BalanceBotError::EmptyOrInvalidPortfolio { .. }
            | BalanceBotError::FundsExhausted { .. } => 5,
        };
        std::process::ExitCode::from(code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_parameter_message() {
        let err = BalanceBotError::invalid_parameter("rebalance", "N must be positive");
        assert_eq!(
            err.to_string(),
            "invalid parameter rebalance: N must be positive"
        );
    }

    #[test]
    fn funds_exhausted_message() {
        let err = BalanceBotError::FundsExhausted {
            date: NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
            cost: 12.5,
            available: 3.0,
        };
        assert_eq!(
            err.to_string(),
            "funds exhausted on 2024-03-01: cost 12.5000 exceeds portfolio value 3.0000"
        );
    }

    #[test]
    fn fatal_classification() {
        assert!(BalanceBotError::EmptyOrInvalidPortfolio { capital: 0.0 }.is_fatal_to_run());
        assert!(!BalanceBotError::NoData { symbol: "BTCEUR".into() }.is_fatal_to_run());
    }
}
