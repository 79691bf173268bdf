//! Cardinality-constrained selection: the best `k` securities to fund.
//!
//! Every `k`-subset of the held-or-targeted universe is solved with the
//! closed-form allocator and the lowest residual wins. Enumeration runs over
//! the universe sorted by identifier, so ties always resolve to the same
//! subset.

use std::collections::BTreeSet;

use log::debug;

use crate::allocate::{Allocation, Bounds, GapTable};
use crate::error::{Error, Result};
use crate::target::AllocationTarget;
use crate::types::{Money, Portfolio, PurchasePlan, Security};
use crate::validate;

/// Subsets solved per parallel batch.
#[cfg(feature = "parallel")]
const BLOCK_SIZE: usize = 1024;

/// Tuning for the subset search.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SelectOptions {
    /// Sign constraint passed to the allocator.
    pub bounds: Bounds,
    /// Stop at the first subset whose residual is at or below this value.
    pub early_exit_epsilon: f64,
}

impl Default for SelectOptions {
    fn default() -> Self {
        Self {
            bounds: Bounds::Unbounded,
            early_exit_epsilon: 0.0,
        }
    }
}

/// Winning subset of a selection run.
#[derive(Clone, Debug, PartialEq)]
pub struct Selection {
    /// Purchases for the chosen subset only.
    pub plan: PurchasePlan,
    /// Squared deviation attained by `plan`.
    pub residual: f64,
    /// Chosen securities in identifier order.
    pub subset: Vec<Security>,
    /// Subsets examined before the search finished.
    pub evaluated: usize,
}

impl Selection {
    /// The plan with an explicit zero for every other security of `universe`.
    pub fn dense<'a>(&self, universe: impl IntoIterator<Item = &'a Security>) -> PurchasePlan {
        let mut plan = self.plan.clone();
        for s in universe {
            plan.entry(s.clone()).or_insert(0.0);
        }
        plan
    }
}

/// Held or targeted securities, sorted by identifier.
pub fn universe(portfolio: &Portfolio, target: &AllocationTarget) -> Vec<Security> {
    portfolio
        .keys()
        .chain(target.keys())
        .cloned()
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// Number of `k`-subsets of `n` items, saturating at `u128::MAX`.
pub fn binomial(n: usize, k: usize) -> u128 {
    if k > n {
        return 0;
    }
    let k = k.min(n - k);
    let mut acc: u128 = 1;
    for i in 0..k {
        acc = acc.saturating_mul((n - i) as u128) / (i + 1) as u128;
    }
    acc
}

/// Lexicographic `k`-combinations of `0..n`, as index vectors.
#[derive(Clone, Debug)]
pub struct Combinations {
    n: usize,
    indices: Vec<usize>,
    started: bool,
    done: bool,
}

impl Combinations {
    pub fn new(n: usize, k: usize) -> Self {
        Self {
            n,
            indices: (0..k).collect(),
            started: false,
            done: k > n,
        }
    }
}

impl Iterator for Combinations {
    type Item = Vec<usize>;

    fn next(&mut self) -> Option<Vec<usize>> {
        if self.done {
            return None;
        }
        if !self.started {
            self.started = true;
            return Some(self.indices.clone());
        }

        let k = self.indices.len();
        let mut i = k;
        loop {
            if i == 0 {
                self.done = true;
                return None;
            }
            i -= 1;
            if self.indices[i] < self.n - k + i {
                break;
            }
        }

        self.indices[i] += 1;
        for j in i + 1..k {
            self.indices[j] = self.indices[j - 1] + 1;
        }
        Some(self.indices.clone())
    }
}

/// Running best over subsets offered in enumeration order.
struct Scan {
    best: Option<(Vec<usize>, Allocation)>,
    evaluated: usize,
    epsilon: f64,
}

impl Scan {
    fn new(epsilon: f64) -> Self {
        Self {
            best: None,
            evaluated: 0,
            epsilon,
        }
    }

    /// Record one solved subset. Returns true once the search may stop.
    fn offer(&mut self, combo: Vec<usize>, allocation: Allocation) -> bool {
        self.evaluated += 1;
        let hit = allocation.residual <= self.epsilon;
        if self
            .best
            .as_ref()
            .is_none_or(|(_, best)| allocation.residual < best.residual)
        {
            self.best = Some((combo, allocation));
        }
        hit
    }
}

/// Solve subsets one at a time in enumeration order.
fn scan_sequential(table: &GapTable, k: usize, options: &SelectOptions) -> Result<Scan> {
    let mut scan = Scan::new(options.early_exit_epsilon);
    for combo in Combinations::new(table.securities().len(), k) {
        let allocation = table.solve(&combo, options.bounds)?;
        if scan.offer(combo, allocation) {
            break;
        }
    }
    Ok(scan)
}

/// Solve `block_size` subsets at a time on the rayon pool.
#[cfg(feature = "parallel")]
fn scan_blocks(
    table: &GapTable,
    k: usize,
    options: &SelectOptions,
    block_size: usize,
) -> Result<Scan> {
    use rayon::prelude::*;

    let mut combos = Combinations::new(table.securities().len(), k);
    let mut scan = Scan::new(options.early_exit_epsilon);
    loop {
        let block: Vec<Vec<usize>> = combos.by_ref().take(block_size.max(1)).collect();
        if block.is_empty() {
            break;
        }

        let solved: Vec<Allocation> = block
            .par_iter()
            .map(|combo| table.solve(combo, options.bounds))
            .collect::<Result<Vec<_>>>()?;

        // Fold in enumeration order so the outcome matches the sequential scan.
        for (combo, allocation) in block.into_iter().zip(solved) {
            if scan.offer(combo, allocation) {
                return Ok(scan);
            }
        }
    }
    Ok(scan)
}

#[cfg(not(feature = "parallel"))]
fn scan(table: &GapTable, k: usize, options: &SelectOptions) -> Result<Scan> {
    scan_sequential(table, k, options)
}

#[cfg(feature = "parallel")]
fn scan(table: &GapTable, k: usize, options: &SelectOptions) -> Result<Scan> {
    // A single block gains nothing from the pool.
    if binomial(table.securities().len(), k) <= BLOCK_SIZE as u128 {
        return scan_sequential(table, k, options);
    }
    scan_blocks(table, k, options, BLOCK_SIZE)
}

/// Search every `k`-subset and return the full result.
pub fn select_with(
    portfolio: &Portfolio,
    target: &AllocationTarget,
    investment: Money,
    k: usize,
    options: &SelectOptions,
) -> Result<Selection> {
    validate::portfolio(portfolio)?;
    validate::investment(investment)?;
    if !options.early_exit_epsilon.is_finite() || options.early_exit_epsilon < 0.0 {
        return Err(Error::InvalidArgument(format!(
            "early_exit_epsilon must be finite and >= 0, got {}",
            options.early_exit_epsilon
        )));
    }

    let universe = universe(portfolio, target);
    let n = universe.len();
    if n == 0 {
        return Err(Error::DegenerateInput(
            "no securities held or targeted".into(),
        ));
    }
    if k == 0 || k > n {
        return Err(Error::InvalidArgument(format!(
            "k must be in [1, {n}], got {k}"
        )));
    }

    debug!(
        "selecting {k} of {n} securities ({} subsets, {:?})",
        binomial(n, k),
        options.bounds
    );

    let table = GapTable::new(universe, portfolio, target, investment);
    let scan = scan(&table, k, options)?;
    let evaluated = scan.evaluated;
    let (combo, allocation) = scan.best.ok_or_else(|| {
        Error::DegenerateInput("no subset was evaluated".into())
    })?;

    let subset: Vec<Security> = combo
        .iter()
        .map(|&i| table.securities()[i].clone())
        .collect();
    debug!(
        "best subset {:?} residual {:.3e} after {evaluated} subsets",
        subset_names(&subset),
        allocation.residual
    );

    Ok(Selection {
        plan: allocation.plan,
        residual: allocation.residual,
        subset,
        evaluated,
    })
}

/// Fund exactly `k` securities, choosing the subset that lands closest to target.
pub fn select(
    portfolio: &Portfolio,
    target: &AllocationTarget,
    investment: Money,
    k: usize,
) -> Result<PurchasePlan> {
    select_with(portfolio, target, investment, k, &SelectOptions::default()).map(|s| s.plan)
}

fn subset_names(subset: &[Security]) -> Vec<&str> {
    subset.iter().map(Security::as_str).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::deviation::squared_deviation;

    fn sec(s: &str) -> Security {
        Security::new(s)
    }

    fn four_security_case() -> (Portfolio, AllocationTarget) {
        let p: Portfolio = [
            (sec("A"), 3_000.0),
            (sec("B"), 4_000.0),
            (sec("C"), 3_000.0),
        ]
        .into_iter()
        .collect();
        let t = AllocationTarget::new([("A", 0.25), ("B", 0.5), ("C", 0.1), ("D", 0.15)]).unwrap();
        (p, t)
    }

    #[test]
    fn combinations_are_lexicographic() {
        let all: Vec<Vec<usize>> = Combinations::new(4, 2).collect();
        assert_eq!(
            all,
            vec![
                vec![0, 1],
                vec![0, 2],
                vec![0, 3],
                vec![1, 2],
                vec![1, 3],
                vec![2, 3]
            ]
        );
    }

    #[test]
    fn combinations_count_matches_binomial() {
        for n in 0..8 {
            for k in 0..=n {
                assert_eq!(Combinations::new(n, k).count() as u128, binomial(n, k), "C({n},{k})");
            }
        }
        assert_eq!(Combinations::new(2, 3).count(), 0);
        assert_eq!(binomial(2, 3), 0);
        assert_eq!(binomial(50, 25), 126_410_606_437_752);
    }

    #[test]
    fn universe_is_sorted_union() {
        let (p, t) = four_security_case();
        let u = universe(&p, &t);
        assert_eq!(u, vec![sec("A"), sec("B"), sec("C"), sec("D")]);
    }

    #[test]
    fn picks_subset_with_lowest_residual() {
        let (p, t) = four_security_case();
        let s = select_with(&p, &t, 1_000.0, 2, &SelectOptions::default()).unwrap();
        assert_eq!(s.evaluated, 6);
        assert_eq!(s.plan.len(), 2);

        // Brute force against the metric directly.
        let u = universe(&p, &t);
        for combo in Combinations::new(u.len(), 2) {
            let subset: Vec<Security> = combo.iter().map(|&i| u[i].clone()).collect();
            let a = crate::allocate::allocate(&subset, &p, &t, 1_000.0, Bounds::Unbounded).unwrap();
            assert!(s.residual <= a.residual + 1e-15);
        }
        assert!((s.residual - squared_deviation(&p, &s.plan, &t)).abs() < 1e-12);
    }

    #[test]
    fn dense_fills_zeros() {
        let (p, t) = four_security_case();
        let s = select_with(&p, &t, 1_000.0, 1, &SelectOptions::default()).unwrap();
        let u = universe(&p, &t);
        let dense = s.dense(&u);
        assert_eq!(dense.len(), 4);
        assert_eq!(dense.values().filter(|v| **v != 0.0).count(), 1);
    }

    #[test]
    fn early_exit_stops_at_first_hit() {
        let (p, t) = four_security_case();
        let options = SelectOptions {
            early_exit_epsilon: 1.0,
            ..SelectOptions::default()
        };
        let s = select_with(&p, &t, 1_000.0, 2, &options).unwrap();
        assert_eq!(s.evaluated, 1);
        assert_eq!(s.subset, vec![sec("A"), sec("B")]);
    }

    #[cfg(feature = "parallel")]
    #[test]
    fn block_scan_matches_sequential_scan() {
        let p: Portfolio = [
            (sec("A"), 3_000.0),
            (sec("B"), 4_000.0),
            (sec("C"), 3_000.0),
            (sec("E"), 500.0),
            (sec("F"), 2_500.0),
        ]
        .into_iter()
        .collect();
        let t = AllocationTarget::new([
            ("A", 0.2),
            ("B", 0.3),
            ("C", 0.1),
            ("D", 0.15),
            ("E", 0.15),
            ("F", 0.1),
        ])
        .unwrap();
        let table = GapTable::new(universe(&p, &t), &p, &t, 1_000.0);

        for k in 1..=3 {
            // Every distinct residual as a threshold, so early exits land at
            // every position inside a block, plus a run with no early exit.
            let mut thresholds: Vec<f64> = Combinations::new(6, k)
                .map(|c| table.solve(&c, Bounds::Unbounded).unwrap().residual)
                .collect();
            thresholds.push(0.0);

            for (epsilon, block_size) in thresholds
                .iter()
                .flat_map(|e| (1..=7).map(move |b| (*e, b)))
            {
                let options = SelectOptions {
                    early_exit_epsilon: epsilon,
                    ..SelectOptions::default()
                };
                let seq = scan_sequential(&table, k, &options).unwrap();
                let par = scan_blocks(&table, k, &options, block_size).unwrap();

                assert_eq!(seq.evaluated, par.evaluated, "k={k} eps={epsilon} block={block_size}");
                let (seq_combo, seq_alloc) = seq.best.unwrap();
                let (par_combo, par_alloc) = par.best.unwrap();
                assert_eq!(seq_combo, par_combo);
                assert_eq!(seq_alloc.residual.to_bits(), par_alloc.residual.to_bits());
                for (s, x) in &seq_alloc.plan {
                    assert_eq!(x.to_bits(), par_alloc.plan[s].to_bits());
                }
            }
        }
    }

    #[test]
    fn sequential_scan_stops_at_first_subset_within_epsilon() {
        let (p, t) = four_security_case();
        let table = GapTable::new(universe(&p, &t), &p, &t, 1_000.0);
        let residuals: Vec<f64> = Combinations::new(4, 2)
            .map(|c| table.solve(&c, Bounds::Unbounded).unwrap().residual)
            .collect();

        for &epsilon in &residuals {
            let first_hit = residuals.iter().position(|r| *r <= epsilon).unwrap();
            let options = SelectOptions {
                early_exit_epsilon: epsilon,
                ..SelectOptions::default()
            };
            let scan = scan_sequential(&table, 2, &options).unwrap();
            assert_eq!(scan.evaluated, first_hit + 1);
        }
    }

    #[test]
    fn ties_keep_first_subset() {
        // Symmetric: any single security gives the same residual.
        let t = AllocationTarget::new([("X", 0.5), ("Y", 0.5)]).unwrap();
        let s = select_with(&Portfolio::new(), &t, 100.0, 1, &SelectOptions::default()).unwrap();
        assert_eq!(s.subset, vec![sec("X")]);
    }

    #[test]
    fn rejects_bad_cardinality() {
        let (p, t) = four_security_case();
        assert!(matches!(
            select(&p, &t, 1_000.0, 0),
            Err(Error::InvalidArgument(_))
        ));
        assert!(matches!(
            select(&p, &t, 1_000.0, 5),
            Err(Error::InvalidArgument(_))
        ));
    }

    #[test]
    fn rejects_empty_universe() {
        let err = select(&Portfolio::new(), &AllocationTarget::default(), 1_000.0, 1).unwrap_err();
        assert!(matches!(err, Error::DegenerateInput(_)));
    }

    #[test]
    fn rejects_negative_epsilon() {
        let (p, t) = four_security_case();
        let options = SelectOptions {
            early_exit_epsilon: -1.0,
            ..SelectOptions::default()
        };
        assert!(select_with(&p, &t, 1_000.0, 2, &options).is_err());
    }
}
