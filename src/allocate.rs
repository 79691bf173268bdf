//! Constrained allocation: the best split of the investment across a fixed
//! subset of securities.
//!
//! Buying `x_i` of each subset member moves the portfolio to a new total
//! `T' = total + investment`, which is fixed by the budget constraint. With
//! `r_i = target_i - held_i / T'` and `y_i = x_i / T'` the objective
//! (squared deviation) becomes
//!
//! ```text
//! Σ_{i∈S} (r_i - y_i)²  +  Σ_{j∉S} r_j²     subject to  Σ y_i = investment / T'
//! ```
//!
//! The second sum is a floor that no purchase inside the subset can lower.
//! The first is a Euclidean distance, so the optimum is a projection of `r`
//! onto the budget hyperplane (or the scaled simplex when purchases must be
//! non-negative). Both projections are closed-form.

use crate::correction::fractional_gaps;
use crate::error::{Error, Result};
use crate::target::AllocationTarget;
use crate::types::{Money, Portfolio, PurchasePlan, Security};
use crate::validate;

/// Sign constraint on the purchases inside a subset.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum Bounds {
    /// Any real amount, a negative entry meaning a sale.
    #[default]
    Unbounded,
    /// Purchases only; some subset members may receive nothing.
    LongOnly,
}

/// Optimal split for one subset.
#[derive(Clone, Debug, PartialEq)]
pub struct Allocation {
    /// Amount per subset member, summing to the investment.
    pub plan: PurchasePlan,
    /// Attained squared deviation, including the floor from securities outside the subset.
    pub residual: f64,
}

/// Precomputed gaps at the post-purchase total, shared across subsets.
///
/// The selector evaluates many subsets of the same universe; the gaps and the
/// total floor do not depend on the subset, so they are computed once.
#[derive(Clone, Debug)]
pub(crate) struct GapTable {
    securities: Vec<Security>,
    gaps: Vec<f64>,
    new_total: Money,
    budget: f64,
    floor: f64,
}

impl GapTable {
    /// Gaps for every security in `universe` (sorted) at the post-purchase total.
    pub(crate) fn new(
        universe: Vec<Security>,
        portfolio: &Portfolio,
        target: &AllocationTarget,
        investment: Money,
    ) -> Self {
        let total: Money = portfolio.values().sum();
        let new_total = total + investment;

        let gaps: Vec<f64> = if new_total > 0.0 {
            universe
                .iter()
                .map(|s| {
                    let held = portfolio.get(s).copied().unwrap_or(0.0);
                    target.get(s) - held / new_total
                })
                .collect()
        } else {
            vec![0.0; universe.len()]
        };
        let floor = gaps.iter().map(|g| g * g).sum();
        let budget = if new_total > 0.0 {
            investment / new_total
        } else {
            0.0
        };

        Self {
            securities: universe,
            gaps,
            new_total,
            budget,
            floor,
        }
    }

    pub(crate) fn securities(&self) -> &[Security] {
        &self.securities
    }

    /// Solve for the subset given as indices into [`GapTable::securities`].
    pub(crate) fn solve(&self, subset: &[usize], bounds: Bounds) -> Result<Allocation> {
        if subset.is_empty() {
            return Err(Error::InvalidArgument(
                "subset must contain at least one security".into(),
            ));
        }

        if self.new_total <= 0.0 {
            let plan = subset
                .iter()
                .map(|&i| (self.securities[i].clone(), 0.0))
                .collect();
            return Ok(Allocation {
                plan,
                residual: 0.0,
            });
        }

        let r: Vec<f64> = subset.iter().map(|&i| self.gaps[i]).collect();
        let y = match bounds {
            Bounds::Unbounded => project_hyperplane(&r, self.budget),
            Bounds::LongOnly => project_simplex(&r, self.budget),
        };

        let inside_before: f64 = r.iter().map(|g| g * g).sum();
        let inside_after: f64 = r.iter().zip(&y).map(|(ri, yi)| (ri - yi).powi(2)).sum();
        // Clamp cancellation noise; the floor term alone is never negative.
        let residual = (self.floor - inside_before).max(0.0) + inside_after;

        let plan: PurchasePlan = subset
            .iter()
            .zip(&y)
            .map(|(&i, yi)| (self.securities[i].clone(), yi * self.new_total))
            .collect();

        if !residual.is_finite() || plan.values().any(|x| !x.is_finite()) {
            return Err(Error::NumericalFailure(format!(
                "non-finite allocation for subset of {} securities",
                subset.len()
            )));
        }

        Ok(Allocation { plan, residual })
    }
}

/// Find the split of `investment` across `subset` that minimizes the squared
/// deviation of the whole portfolio from `target`.
///
/// Securities held or targeted but not in `subset` keep their current value
/// and still count toward the residual.
pub fn allocate(
    subset: &[Security],
    portfolio: &Portfolio,
    target: &AllocationTarget,
    investment: Money,
    bounds: Bounds,
) -> Result<Allocation> {
    validate::portfolio(portfolio)?;
    validate::investment(investment)?;
    if subset.is_empty() {
        return Err(Error::InvalidArgument(
            "subset must contain at least one security".into(),
        ));
    }

    let mut universe: Vec<Security> = fractional_gaps(portfolio, target).into_keys().collect();
    for s in subset {
        if let Err(pos) = universe.binary_search(s) {
            universe.insert(pos, s.clone());
        }
    }

    let mut indices = Vec::with_capacity(subset.len());
    for s in subset {
        // every subset member was inserted above, so this is always Ok
        let i = universe.binary_search(s).unwrap_or_else(|pos| pos);
        if indices.contains(&i) {
            return Err(Error::InvalidArgument(format!(
                "security {s} appears twice in subset"
            )));
        }
        indices.push(i);
    }

    GapTable::new(universe, portfolio, target, investment).solve(&indices, bounds)
}

/// Closest point to `r` on the hyperplane `Σ y = budget`.
fn project_hyperplane(r: &[f64], budget: f64) -> Vec<f64> {
    let shift = (r.iter().sum::<f64>() - budget) / r.len() as f64;
    r.iter().map(|ri| ri - shift).collect()
}

/// Closest point to `r` on the simplex `{y >= 0, Σ y = budget}`.
fn project_simplex(r: &[f64], budget: f64) -> Vec<f64> {
    if budget <= 0.0 {
        return vec![0.0; r.len()];
    }

    let mut u = r.to_vec();
    u.sort_by(|a, b| b.total_cmp(a));

    let mut cssv = 0.0;
    let mut rho = 0_usize;
    let mut rho_sum = 0.0;
    for (i, ui) in u.iter().enumerate() {
        cssv += *ui;
        let theta = (cssv - budget) / (i as f64 + 1.0);
        if *ui - theta > 0.0 {
            rho = i + 1;
            rho_sum = cssv;
        }
    }

    // rho >= 1 whenever budget > 0: the largest entry always qualifies.
    let theta = (rho_sum - budget) / rho.max(1) as f64;
    r.iter().map(|ri| (ri - theta).max(0.0)).collect()
}
