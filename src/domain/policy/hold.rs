//! Buy-and-hold: the initial wallet is never traded.

use super::Decision;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BuyAndHold;

impl BuyAndHold {
    pub fn decide(&self, _t: usize) -> Decision {
        Decision::Hold
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn never_trades() {
        let policy = BuyAndHold;
        assert!((0..100).all(|t| policy.decide(t) == Decision::Hold));
    }
}
