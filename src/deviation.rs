//! Deviation metric: how far a portfolio lands from target after a purchase.

use crate::correction::fractional_gaps;
use crate::target::AllocationTarget;
use crate::types::{DeviationScore, Portfolio, PurchasePlan};

/// Holdings after executing `plan` on top of `portfolio`.
pub fn apply_plan(portfolio: &Portfolio, plan: &PurchasePlan) -> Portfolio {
    let mut after = portfolio.clone();
    for (security, amount) in plan {
        *after.entry(security.clone()).or_insert(0.0) += amount;
    }
    after
}

/// Sum of squared fractional gaps after the purchase.
///
/// This is the objective the constrained allocator minimizes.
pub fn squared_deviation(
    portfolio: &Portfolio,
    plan: &PurchasePlan,
    target: &AllocationTarget,
) -> f64 {
    fractional_gaps(&apply_plan(portfolio, plan), target)
        .values()
        .map(|g| g * g)
        .sum()
}

/// Euclidean norm of the post-purchase gap vector.
pub fn deviation(
    portfolio: &Portfolio,
    plan: &PurchasePlan,
    target: &AllocationTarget,
) -> DeviationScore {
    squared_deviation(portfolio, plan, target).sqrt()
}
