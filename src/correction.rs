//! Unconstrained rebalancing: fix the existing imbalance and spread the new
//! money by target.

use std::collections::BTreeMap;

use crate::error::Result;
use crate::target::AllocationTarget;
use crate::types::{Money, Portfolio, PurchasePlan, Security};
use crate::validate;

/// Per-security gap `target - current_fraction` for a set of holdings.
///
/// With a positive total the gap covers every security held or targeted.
/// With a zero total (cold start) there is no imbalance to measure and every
/// targeted security gets a gap of zero.
pub fn fractional_gaps(values: &Portfolio, target: &AllocationTarget) -> BTreeMap<Security, f64> {
    let total: Money = values.values().sum();
    if total > 0.0 {
        let mut gaps: BTreeMap<Security, f64> = values
            .iter()
            .map(|(s, v)| (s.clone(), target.get(s) - v / total))
            .collect();
        for (s, &fraction) in target {
            gaps.entry(s.clone()).or_insert(fraction);
        }
        gaps
    } else {
        target.keys().map(|s| (s.clone(), 0.0)).collect()
    }
}

/// Compute the purchase plan that brings `portfolio` onto `target` after
/// investing `investment`.
///
/// The plan for each security is the money needed to close its current gap
/// plus its target share of the new money. Entries can be negative, meaning
/// the position is over target by more than the new money can dilute.
///
/// The plan sums to `investment` whenever the target fractions sum to 1.
///
/// # Example
///
/// ```
/// use stockbalancer::{correct, AllocationTarget, Portfolio, Security};
///
/// let target = AllocationTarget::new([("A", 0.3), ("B", 0.4), ("C", 0.3)]).unwrap();
/// let plan = correct(&Portfolio::new(), &target, 1_000.0).unwrap();
/// assert!((plan[&Security::new("B")] - 400.0).abs() < 1e-9);
/// ```
pub fn correct(
    portfolio: &Portfolio,
    target: &AllocationTarget,
    investment: Money,
) -> Result<PurchasePlan> {
    validate::portfolio(portfolio)?;
    validate::investment(investment)?;

    let total: Money = portfolio.values().sum();
    let plan = fractional_gaps(portfolio, target)
        .into_iter()
        .map(|(s, gap)| {
            let correction = gap * total;
            let share = target.get(&s) * investment;
            (s, correction + share)
        })
        .collect();
    Ok(plan)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sec(s: &str) -> Security {
        Security::new(s)
    }

    fn portfolio(entries: &[(&str, f64)]) -> Portfolio {
        entries.iter().map(|(s, v)| (sec(s), *v)).collect()
    }

    #[test]
    fn gaps_cover_held_and_targeted() {
        let p = portfolio(&[("A", 600.0), ("B", 400.0)]);
        let t = AllocationTarget::new([("B", 0.5), ("C", 0.5)]).unwrap();
        let gaps = fractional_gaps(&p, &t);
        assert_eq!(gaps.len(), 3);
        assert!((gaps[&sec("A")] + 0.6).abs() < 1e-12);
        assert!((gaps[&sec("B")] - 0.1).abs() < 1e-12);
        assert!((gaps[&sec("C")] - 0.5).abs() < 1e-12);
    }

    #[test]
    fn gaps_on_cold_start_are_zero() {
        let t = AllocationTarget::new([("A", 0.5), ("B", 0.5)]).unwrap();
        let gaps = fractional_gaps(&Portfolio::new(), &t);
        assert_eq!(gaps.len(), 2);
        assert!(gaps.values().all(|g| *g == 0.0));
    }

    #[test]
    fn corrects_existing_imbalance() {
        let p = portfolio(&[("A", 3_000.0), ("B", 4_000.0), ("C", 3_000.0)]);
        let t = AllocationTarget::new([("A", 0.25), ("B", 0.5), ("C", 0.1), ("D", 0.15)]).unwrap();
        let plan = correct(&p, &t, 1_000.0).unwrap();

        // New total 11_000: A 2750, B 5500, C 1100, D 1650
        assert!((plan[&sec("A")] + 250.0).abs() < 1e-9);
        assert!((plan[&sec("B")] - 1_500.0).abs() < 1e-9);
        assert!((plan[&sec("C")] + 1_900.0).abs() < 1e-9);
        assert!((plan[&sec("D")] - 1_650.0).abs() < 1e-9);
    }

    #[test]
    fn untargeted_holding_is_sold_off() {
        let p = portfolio(&[("A", 500.0), ("Z", 500.0)]);
        let t = AllocationTarget::new([("A", 1.0)]).unwrap();
        let plan = correct(&p, &t, 0.0).unwrap();
        assert!((plan[&sec("Z")] + 500.0).abs() < 1e-9);
        assert!((plan[&sec("A")] - 500.0).abs() < 1e-9);
    }

    #[test]
    fn empty_target_on_cold_start_gives_empty_plan() {
        let plan = correct(&Portfolio::new(), &AllocationTarget::default(), 1_000.0).unwrap();
        assert!(plan.is_empty());
    }

    #[test]
    fn zero_valued_holdings_count_as_cold_start() {
        let p = portfolio(&[("OLD", 0.0)]);
        let t = AllocationTarget::new([("A", 1.0)]).unwrap();
        let plan = correct(&p, &t, 100.0).unwrap();
        assert_eq!(plan.len(), 1);
        assert!((plan[&sec("A")] - 100.0).abs() < 1e-12);
    }

    #[test]
    fn rejects_negative_investment() {
        let t = AllocationTarget::new([("A", 1.0)]).unwrap();
        assert!(correct(&Portfolio::new(), &t, -10.0).is_err());
    }
}
