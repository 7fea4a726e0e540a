//! Configuration validation.
//!
//! Validates every config field before a backtest runs, so that a bad
//! value is reported with its section and key instead of surfacing halfway
//! through a run.

use crate::domain::cadence::Cadence;
use crate::domain::error::BalanceBotError;
use crate::domain::strategy::{DriftThreshold, StrategyKind};
use crate::domain::universe::parse_symbols;
use crate::domain::weights::parse_symbol_values;
use crate::ports::config_port::ConfigPort;
use chrono::NaiveDate;

pub fn validate_backtest_config(config: &dyn ConfigPort) -> Result<(), BalanceBotError> {
    validate_data_dir(config)?;
    validate_symbols(config)?;
    validate_dates(config)?;
    validate_quote(config)?;
    validate_fees(config)?;
    validate_slippage(config)?;
    validate_risk_free_rate(config)?;
    Ok(())
}

pub fn validate_wallet_config(config: &dyn ConfigPort) -> Result<(), BalanceBotError> {
    let raw = required_string(config, "wallet", "holdings")?;
    let holdings = parse_symbol_values(&raw, "holdings")
        .map_err(|e| invalid("wallet", "holdings", e.to_string()))?;
    if let Some((sym, _)) = holdings.iter().find(|(_, q)| **q < 0.0) {
        return Err(invalid(
            "wallet",
            "holdings",
            format!("quantity for {sym} must be non-negative"),
        ));
    }
    Ok(())
}

pub fn validate_strategy_config(config: &dyn ConfigPort) -> Result<(), BalanceBotError> {
    let kind = validate_strategy_name(config)?;
    if kind == StrategyKind::Hold {
        return Ok(());
    }

    validate_target_weights(config)?;
    match kind {
        StrategyKind::ConstantMix => {
            validate_cadence(config)?;
            validate_drift_threshold(config)?;
        }
        StrategyKind::DynamicThreshold => validate_dynamic_threshold(config)?,
        StrategyKind::Hold => {}
    }
    Ok(())
}

/// The `[slippage]` section is optional; when present each tier rate must
/// lie in [0, 1).
pub fn validate_slippage_tiers(config: &dyn ConfigPort) -> Result<(), BalanceBotError> {
    for key in ["majors", "high_liq", "others"] {
        if let Some(rate) = read_optional_double(config, "slippage", key)? {
            check_rate(rate, "slippage", key)?;
        }
    }
    Ok(())
}

/// Run every check the `backtest` command depends on.
pub fn validate_all(config: &dyn ConfigPort) -> Result<(), BalanceBotError> {
    validate_backtest_config(config)?;
    validate_wallet_config(config)?;
    validate_strategy_config(config)?;
    validate_slippage_tiers(config)?;
    Ok(())
}

/// Read a float, falling back to `default` when the key is absent.
/// Unlike [`ConfigPort::get_double`] an unparseable value is an error.
pub fn read_double(
    config: &dyn ConfigPort,
    section: &str,
    key: &str,
    default: f64,
) -> Result<f64, BalanceBotError> {
    Ok(read_optional_double(config, section, key)?.unwrap_or(default))
}

pub fn read_optional_double(
    config: &dyn ConfigPort,
    section: &str,
    key: &str,
) -> Result<Option<f64>, BalanceBotError> {
    match non_blank(config, section, key) {
        None => Ok(None),
        Some(raw) => match raw.parse::<f64>() {
            Ok(v) if v.is_finite() => Ok(Some(v)),
            _ => Err(invalid(section, key, format!("'{raw}' is not a number"))),
        },
    }
}

/// Read a non-negative integer, falling back to `default` when absent.
pub fn read_usize(
    config: &dyn ConfigPort,
    section: &str,
    key: &str,
    default: usize,
) -> Result<usize, BalanceBotError> {
    match non_blank(config, section, key) {
        None => Ok(default),
        Some(raw) => raw
            .parse::<usize>()
            .map_err(|_| invalid(section, key, format!("'{raw}' is not a non-negative integer"))),
    }
}

/// Parse an optional `YYYY-MM-DD` date.
pub fn read_date(
    config: &dyn ConfigPort,
    section: &str,
    key: &str,
) -> Result<Option<NaiveDate>, BalanceBotError> {
    non_blank(config, section, key)
        .map(|s| {
            NaiveDate::parse_from_str(&s, "%Y-%m-%d").map_err(|_| {
                invalid(section, key, format!("invalid {key} format, expected YYYY-MM-DD"))
            })
        })
        .transpose()
}

fn non_blank(config: &dyn ConfigPort, section: &str, key: &str) -> Option<String> {
    config
        .get_string(section, key)
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

fn required_string(
    config: &dyn ConfigPort,
    section: &str,
    key: &str,
) -> Result<String, BalanceBotError> {
    non_blank(config, section, key).ok_or_else(|| BalanceBotError::ConfigMissing {
        section: section.to_string(),
        key: key.to_string(),
    })
}

fn invalid(section: &str, key: &str, reason: impl Into<String>) -> BalanceBotError {
    BalanceBotError::ConfigInvalid {
        section: section.to_string(),
        key: key.to_string(),
        reason: reason.into(),
    }
}

fn check_rate(rate: f64, section: &str, key: &str) -> Result<(), BalanceBotError> {
    if !(0.0..1.0).contains(&rate) {
        return Err(invalid(section, key, format!("{key} must be in [0, 1)")));
    }
    Ok(())
}

fn check_non_negative(value: f64, section: &str, key: &str) -> Result<(), BalanceBotError> {
    if value < 0.0 {
        return Err(invalid(section, key, format!("{key} must be non-negative")));
    }
    Ok(())
}

fn validate_data_dir(config: &dyn ConfigPort) -> Result<(), BalanceBotError> {
    required_string(config, "backtest", "data_dir").map(|_| ())
}

fn validate_symbols(config: &dyn ConfigPort) -> Result<(), BalanceBotError> {
    let raw = required_string(config, "backtest", "symbols")?;
    parse_symbols(&raw).map_err(|e| invalid("backtest", "symbols", e.to_string()))?;
    Ok(())
}

fn validate_dates(config: &dyn ConfigPort) -> Result<(), BalanceBotError> {
    let start = read_date(config, "backtest", "start_date")?;
    let end = read_date(config, "backtest", "end_date")?;
    if let (Some(start), Some(end)) = (start, end)
        && start > end
    {
        return Err(invalid(
            "backtest",
            "start_date",
            "start_date must not be after end_date",
        ));
    }
    Ok(())
}

fn validate_quote(config: &dyn ConfigPort) -> Result<(), BalanceBotError> {
    if let Some(quote) = config.get_string("backtest", "quote")
        && !quote.trim().chars().all(|c| c.is_ascii_alphanumeric())
    {
        return Err(invalid("backtest", "quote", "quote must be alphanumeric"));
    }
    Ok(())
}

fn validate_fees(config: &dyn ConfigPort) -> Result<(), BalanceBotError> {
    let fee_rate = read_double(config, "backtest", "fee_rate", 0.0)?;
    check_non_negative(fee_rate, "backtest", "fee_rate")?;
    let fixed_fee = read_double(config, "backtest", "fixed_fee", 0.0)?;
    check_non_negative(fixed_fee, "backtest", "fixed_fee")?;
    Ok(())
}

fn validate_slippage(config: &dyn ConfigPort) -> Result<(), BalanceBotError> {
    let value = read_double(config, "backtest", "slippage", 0.0)?;
    check_rate(value, "backtest", "slippage")
}

fn validate_risk_free_rate(config: &dyn ConfigPort) -> Result<(), BalanceBotError> {
    let value = read_double(config, "backtest", "risk_free_rate", 0.0)?;
    if !(0.0..1.0).contains(&value) {
        return Err(invalid(
            "backtest",
            "risk_free_rate",
            "risk_free_rate must be between 0 and 1",
        ));
    }
    Ok(())
}

fn validate_strategy_name(config: &dyn ConfigPort) -> Result<StrategyKind, BalanceBotError> {
    let name = required_string(config, "strategy", "name")?;
    name.parse()
        .map_err(|e: BalanceBotError| invalid("strategy", "name", e.to_string()))
}

fn validate_target_weights(config: &dyn ConfigPort) -> Result<(), BalanceBotError> {
    let raw = required_string(config, "strategy", "weights")?;
    let weights = parse_symbol_values(&raw, "weights")
        .map_err(|e| invalid("strategy", "weights", e.to_string()))?;
    if !weights.values().any(|w| *w > 0.0) {
        return Err(invalid(
            "strategy",
            "weights",
            "at least one weight must be positive",
        ));
    }
    Ok(())
}

fn validate_cadence(config: &dyn ConfigPort) -> Result<(), BalanceBotError> {
    if let Some(raw) = config.get_string("strategy", "rebalance") {
        raw.parse::<Cadence>()
            .map_err(|e| invalid("strategy", "rebalance", e.to_string()))?;
    }
    Ok(())
}

fn validate_drift_threshold(config: &dyn ConfigPort) -> Result<(), BalanceBotError> {
    DriftThreshold::parse(config.get_string("strategy", "drift_threshold").as_deref())
        .map_err(|e| invalid("strategy", "drift_threshold", e.to_string()))?;
    Ok(())
}

fn validate_dynamic_threshold(config: &dyn ConfigPort) -> Result<(), BalanceBotError> {
    if read_usize(config, "strategy", "vol_window", 40)? == 0 {
        return Err(invalid(
            "strategy",
            "vol_window",
            "vol_window must be positive",
        ));
    }
    read_usize(config, "strategy", "cooldown_days", 5)?;

    for (key, default) in [("k", 0.20), ("stable_threshold", 0.005)] {
        check_non_negative(read_double(config, "strategy", key, default)?, "strategy", key)?;
    }

    let min_th = read_double(config, "strategy", "min_th", 0.03)?;
    let max_th = read_double(config, "strategy", "max_th", 0.20)?;
    check_non_negative(min_th, "strategy", "min_th")?;
    check_non_negative(max_th, "strategy", "max_th")?;
    if min_th > max_th {
        return Err(invalid(
            "strategy",
            "min_th",
            "min_th must not exceed max_th",
        ));
    }

    let frac = read_double(config, "strategy", "rebal_frac", 1.0)?;
    if frac <= 0.0 || frac > 1.0 {
        return Err(invalid(
            "strategy",
            "rebal_frac",
            "rebal_frac must be in (0, 1]",
        ));
    }
    Ok(())
}
