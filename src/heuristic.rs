//! Greedy alternative to the subset search: keep the largest purchases.

use crate::error::{Error, Result};
use crate::types::{Money, PurchasePlan, Security};

/// Keep the `n` largest entries of `plan` and rescale them so they still add
/// up to the full plan's total.
///
/// This is fast and does not minimize deviation. Ties in amount are broken by
/// identifier. `n` larger than the plan keeps every entry.
pub fn top_n(plan: &PurchasePlan, n: usize) -> Result<PurchasePlan> {
    if n == 0 {
        return Err(Error::InvalidArgument("n must be >= 1".into()));
    }

    let full_total: Money = plan.values().sum();

    let mut ranked: Vec<(&Security, Money)> = plan.iter().map(|(s, v)| (s, *v)).collect();
    ranked.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(b.0)));
    ranked.truncate(n);

    let kept_total: Money = ranked.iter().map(|(_, v)| v).sum();
    if kept_total == 0.0 || !kept_total.is_finite() {
        return Err(Error::DegenerateInput(format!(
            "top {n} purchases sum to {kept_total}, cannot rescale"
        )));
    }

    let scale = full_total / kept_total;
    Ok(ranked
        .into_iter()
        .map(|(s, v)| (s.clone(), v * scale))
        .collect())
}
