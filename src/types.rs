//! Core types: Security, Money, Portfolio, PurchasePlan

use std::collections::BTreeMap;
use std::fmt;

/// Identifier of a tradable instrument (ticker symbol, ISIN, ...).
///
/// Case is preserved and comparison is by value, so `Security::new("spy")`
/// and `Security::new("SPY")` are different securities.
#[derive(Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct Security(String);

impl Security {
    pub fn new(id: impl Into<String>) -> Self {
        Security(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Security {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Security {
    fn from(id: &str) -> Self {
        Security::new(id)
    }
}

impl From<String> for Security {
    fn from(id: String) -> Self {
        Security(id)
    }
}

/// Currency-agnostic amount of money.
pub type Money = f64;

/// Current market value held per security. Absent keys hold nothing.
pub type Portfolio = BTreeMap<Security, Money>;

/// Recommended amount to spend per security in one investment round.
pub type PurchasePlan = BTreeMap<Security, Money>;

/// Root of the summed squared fractional deviations from target.
pub type DeviationScore = f64;

/// Sum of all holdings.
pub fn total_value(portfolio: &Portfolio) -> Money {
    portfolio.values().sum()
}
