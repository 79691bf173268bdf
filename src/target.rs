//! Target allocation: the fraction of total value each security should hold.

use std::collections::BTreeMap;
use std::collections::btree_map;

use crate::error::{Error, Result};
use crate::types::Security;

/// Validated mapping `Security -> fraction` with every fraction in `[0, 1]`.
///
/// Fractions are not required to sum to 1. The algorithms never renormalize
/// on their own; see [`AllocationTarget::sum`] and [`AllocationTarget::normalized`].
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(
    feature = "serde",
    serde(
        try_from = "BTreeMap<Security, f64>",
        into = "BTreeMap<Security, f64>"
    )
)]
pub struct AllocationTarget {
    fractions: BTreeMap<Security, f64>,
}

impl AllocationTarget {
    /// Build a target from `(security, fraction)` pairs.
    ///
    /// Fails with [`Error::InvalidArgument`] on a fraction outside `[0, 1]`
    /// or a security listed twice.
    pub fn new<I, S>(pairs: I) -> Result<Self>
    where
        I: IntoIterator<Item = (S, f64)>,
        S: Into<Security>,
    {
        let mut fractions = BTreeMap::new();
        for (security, fraction) in pairs {
            let security = security.into();
            check_fraction(&security, fraction)?;
            if fractions.insert(security.clone(), fraction).is_some() {
                return Err(Error::InvalidArgument(format!(
                    "duplicate security in target: {security}"
                )));
            }
        }
        Ok(Self { fractions })
    }

    /// Target fraction for `security`, zero when it is not targeted.
    pub fn get(&self, security: &Security) -> f64 {
        self.fractions.get(security).copied().unwrap_or(0.0)
    }

    pub fn contains(&self, security: &Security) -> bool {
        self.fractions.contains_key(security)
    }

    pub fn iter(&self) -> btree_map::Iter<'_, Security, f64> {
        self.fractions.iter()
    }

    pub fn keys(&self) -> btree_map::Keys<'_, Security, f64> {
        self.fractions.keys()
    }

    pub fn len(&self) -> usize {
        self.fractions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fractions.is_empty()
    }

    /// Sum of all fractions. Anything other than 1 under- or over-invests.
    pub fn sum(&self) -> f64 {
        self.fractions.values().sum()
    }

    /// Scale all fractions so they sum to 1.
    pub fn normalized(&self) -> Result<Self> {
        let sum = self.sum();
        if sum <= 0.0 {
            return Err(Error::DegenerateInput(
                "cannot normalize a target whose fractions sum to zero".into(),
            ));
        }
        Ok(self.scaled_to(sum, 1.0))
    }

    /// Pin `security` to `fraction` and rescale every other entry so the
    /// whole target sums to 1.
    ///
    /// Other entries keep their relative weights. If they are all zero they
    /// stay zero.
    pub fn with_allocation(&self, security: impl Into<Security>, fraction: f64) -> Result<Self> {
        let security = security.into();
        check_fraction(&security, fraction)?;

        let others = Self {
            fractions: self
                .fractions
                .iter()
                .filter(|(s, _)| **s != security)
                .map(|(s, f)| (s.clone(), *f))
                .collect(),
        };
        let others_sum = others.sum();
        let mut result = if others_sum > 0.0 {
            others.scaled_to(others_sum, 1.0 - fraction)
        } else {
            others
        };
        result.fractions.insert(security, fraction);
        Ok(result)
    }

    fn scaled_to(&self, current_sum: f64, new_sum: f64) -> Self {
        Self {
            fractions: self
                .fractions
                .iter()
                .map(|(s, f)| (s.clone(), f * new_sum / current_sum))
                .collect(),
        }
    }
}

fn check_fraction(security: &Security, fraction: f64) -> Result<()> {
    if !fraction.is_finite() || !(0.0..=1.0).contains(&fraction) {
        return Err(Error::InvalidArgument(format!(
            "target fraction for {security} must be in [0, 1], got {fraction}"
        )));
    }
    Ok(())
}

impl TryFrom<BTreeMap<Security, f64>> for AllocationTarget {
    type Error = Error;

    fn try_from(map: BTreeMap<Security, f64>) -> Result<Self> {
        AllocationTarget::new(map)
    }
}

impl From<AllocationTarget> for BTreeMap<Security, f64> {
    fn from(target: AllocationTarget) -> Self {
        target.fractions
    }
}

impl<'a> IntoIterator for &'a AllocationTarget {
    type Item = (&'a Security, &'a f64);
    type IntoIter = btree_map::Iter<'a, Security, f64>;

    fn into_iter(self) -> Self::IntoIter {
        self.fractions.iter()
    }
}
