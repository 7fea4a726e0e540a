//! Core domain types and logic.

pub mod weights;
pub mod price_matrix;
pub mod wallet;
pub mod cost;
pub mod liquidity;
pub mod history;
pub mod ledger;
pub mod volatility;
pub mod cadence;
pub mod policy;
pub mod strategy;
pub mod backtest;
pub mod metrics;
pub mod universe;
pub mod config_validation;
pub mod error;
