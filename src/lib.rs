//! # stockbalancer
//!
//! Deterministic investment balancing: given current holdings, a target
//! allocation, and an amount of new money, recommend how much to spend on
//! each security so the portfolio lands as close to target as possible.
//!
//! ## Features
//!
//! - **Unrestricted correction**: close every gap and spread the new money by target
//! - **Cardinality constraint**: fund exactly `k` securities, picking the best subset
//! - **Closed-form allocation**: each subset is solved exactly, no iterative solver
//! - **Greedy heuristic**: keep the `n` largest purchases when the search space is too big
//! - **Reproducible**: ordered maps and sorted enumeration, identical output on every run
//!
//! ## Quick Start
//!
//! ```
//! use stockbalancer::{correct, deviation, AllocationTarget, Portfolio, Security};
//!
//! let target = AllocationTarget::new([("A", 0.25), ("B", 0.5), ("C", 0.1), ("D", 0.15)]).unwrap();
//! let portfolio: Portfolio = [
//!     (Security::new("A"), 3_000.0),
//!     (Security::new("B"), 4_000.0),
//!     (Security::new("C"), 3_000.0),
//! ]
//! .into_iter()
//! .collect();
//!
//! let plan = correct(&portfolio, &target, 1_000.0).unwrap();
//! assert!((plan[&Security::new("D")] - 1_650.0).abs() < 1e-9);
//! assert!(deviation(&portfolio, &plan, &target) < 1e-9);
//! ```
//!
//! Unrestricted plans may contain negative entries: a position already above
//! target by more than the new money can dilute has to be trimmed.
//!
//! ## Funding only `k` securities
//!
//! ```
//! use stockbalancer::{select, AllocationTarget, Portfolio};
//!
//! let target = AllocationTarget::new([("X", 0.5), ("Y", 0.3), ("Z", 0.2)]).unwrap();
//! let plan = select(&Portfolio::new(), &target, 1_000.0, 2).unwrap();
//!
//! assert_eq!(plan.len(), 2);
//! let total: f64 = plan.values().sum();
//! assert!((total - 1_000.0).abs() < 1e-9);
//! ```
//!
//! ## One entry point
//!
//! [`Balancer`] dispatches on an explicit [`Mode`] and reports the resulting
//! deviation together with the target sum:
//!
//! ```
//! use stockbalancer::{AllocationTarget, BalanceConfig, Balancer, Bounds, Mode, Portfolio, Security};
//!
//! let balancer = Balancer::new(BalanceConfig {
//!     bounds: Bounds::LongOnly,
//!     ..Default::default()
//! })
//! .unwrap();
//!
//! let portfolio: Portfolio = [(Security::new("X"), 900.0)].into_iter().collect();
//! let target = AllocationTarget::new([("X", 0.5), ("Y", 0.5)]).unwrap();
//!
//! let rec = balancer.recommend(&portfolio, &target, 300.0, Mode::Restricted(1)).unwrap();
//! assert!((rec.plan[&Security::new("Y")] - 300.0).abs() < 1e-9);
//! assert!(rec.plan.values().all(|x| *x >= 0.0));
//! ```
//!
//! ## Cargo features
//!
//! | Feature | Effect |
//! |---------|--------|
//! | `serde` | Serialize/deserialize securities, targets, and config |
//! | `parallel` | Solve candidate subsets on the rayon thread pool |

mod allocate;
mod balancer;
mod config;
mod correction;
mod deviation;
mod error;
mod heuristic;
mod select;
mod target;
mod types;
mod validate;

pub use allocate::{Allocation, Bounds, allocate};
pub use balancer::{Balancer, Mode, Recommendation};
pub use config::{BalanceConfig, Search};
pub use correction::{correct, fractional_gaps};
pub use deviation::{apply_plan, deviation, squared_deviation};
pub use error::{Error, Result};
pub use heuristic::top_n;
pub use select::{Combinations, SelectOptions, Selection, binomial, select, select_with, universe};
pub use target::AllocationTarget;
pub use types::{DeviationScore, Money, Portfolio, PurchasePlan, Security, total_value};
