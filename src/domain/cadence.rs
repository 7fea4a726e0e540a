//! Calendar rebalance cadences.

use chrono::{Datelike, NaiveDate};
use std::fmt;
use std::str::FromStr;
use tracing::warn;

use super::error::BalanceBotError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Cadence {
    #[default]
    Daily,
    /// New ISO week.
    Weekly,
    /// New calendar month.
    Monthly,
    /// New calendar quarter.
    Quarterly,
    /// Every N-th row of the price series.
    EveryNDays(usize),
}

impl Cadence {
    /// Whether row `t` of `dates` is a scheduled rebalance. Row 0 never is:
    /// the initial state is handled by the policy.
    pub fn is_rebalance_day(&self, dates: &[NaiveDate], t: usize) -> bool {
        if t == 0 || t >= dates.len() {
            return false;
        }
        let (prev, curr) = (dates[t - 1], dates[t]);
        match self {
            Cadence::Daily => true,
            Cadence::Weekly => prev.iso_week() != curr.iso_week(),
            Cadence::Monthly => (prev.year(), prev.month()) != (curr.year(), curr.month()),
            Cadence::Quarterly => {
                (prev.year(), prev.month0() / 3) != (curr.year(), curr.month0() / 3)
            }
            Cadence::EveryNDays(n) => *n > 0 && t % n == 0,
        }
    }
}

impl FromStr for Cadence {
    type Err = BalanceBotError;

    /// `D`, `W`, `M`, `Q`/`3M`, or `<N>D`. Blank strings and `0D` are
    /// rejected; anything else unrecognized falls back to daily.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mode = s.trim().to_uppercase();
        match mode.as_str() {
            "" => Err(BalanceBotError::invalid_parameter(
                "rebalance",
                "cadence must not be empty",
            )),
            "D" => Ok(Cadence::Daily),
            "W" => Ok(Cadence::Weekly),
            "M" => Ok(Cadence::Monthly),
            "Q" | "3M" => Ok(Cadence::Quarterly),
            _ => {
                if let Some(digits) = mode.strip_suffix('D')
                    && !digits.is_empty()
                    && digits.bytes().all(|b| b.is_ascii_digit())
                {
                    let n: usize = digits.parse().map_err(|_| {
                        BalanceBotError::invalid_parameter("rebalance", format!("'{s}' is out of range"))
                    })?;
                    if n == 0 {
                        return Err(BalanceBotError::invalid_parameter(
                            "rebalance",
                            "day interval must be positive",
                        ));
                    }
                    return Ok(Cadence::EveryNDays(n));
                }
                warn!(cadence = %s, "unrecognized rebalance cadence, using daily");
                Ok(Cadence::Daily)
            }
        }
    }
}

impl fmt::Display for Cadence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cadence::Daily => f.write_str("D"),
            Cadence::Weekly => f.write_str("W"),
            Cadence::Monthly => f.write_str("M"),
            Cadence::Quarterly => f.write_str("Q"),
            Cadence::EveryNDays(n) => write!(f, "{n}D"),
        }
    }
}
