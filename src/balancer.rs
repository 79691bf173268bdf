//! Single entry point dispatching between unrestricted and restricted balancing.

use std::fmt;

use log::{debug, warn};

use crate::config::{BalanceConfig, Search};
use crate::correction::correct;
use crate::deviation::deviation;
use crate::error::{Error, Result};
use crate::heuristic::top_n;
use crate::select::select_with;
use crate::target::AllocationTarget;
use crate::types::{DeviationScore, Money, Portfolio, PurchasePlan};

/// How many securities may receive money this round.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Mode {
    /// Every held or targeted security may be bought or trimmed.
    Unrestricted,
    /// Exactly this many securities receive money.
    Restricted(usize),
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mode::Unrestricted => write!(f, "unrestricted"),
            Mode::Restricted(k) => write!(f, "restricted to {k}"),
        }
    }
}

/// Outcome of one balancing run.
#[derive(Clone, Debug, PartialEq)]
pub struct Recommendation {
    pub plan: PurchasePlan,
    /// Distance from target after executing `plan`.
    pub deviation: DeviationScore,
    /// Sum of the target fractions, reported so callers can flag a skewed target.
    pub target_sum: f64,
    pub mode: Mode,
}

/// Balancing engine configured once and reused across runs.
#[derive(Clone, Debug, Default)]
pub struct Balancer {
    config: BalanceConfig,
}

impl Balancer {
    /// Create a balancer, rejecting an invalid config.
    pub fn new(config: BalanceConfig) -> Result<Self> {
        config.validate().map_err(Error::InvalidArgument)?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &BalanceConfig {
        &self.config
    }

    /// Recommend how to invest `investment` so `portfolio` approaches `target`.
    pub fn recommend(
        &self,
        portfolio: &Portfolio,
        target: &AllocationTarget,
        investment: Money,
        mode: Mode,
    ) -> Result<Recommendation> {
        let target_sum = self.check_target_sum(target)?;

        let plan = match mode {
            Mode::Unrestricted => correct(portfolio, target, investment)?,
            Mode::Restricted(k) => match self.config.search {
                Search::Exhaustive => {
                    select_with(portfolio, target, investment, k, &self.config.select_options())?
                        .plan
                }
                Search::TopN => top_n(&correct(portfolio, target, investment)?, k)?,
            },
        };

        let deviation = deviation(portfolio, &plan, target);
        debug!("{mode} plan with {} entries, deviation {deviation:.6}", plan.len());

        Ok(Recommendation {
            plan,
            deviation,
            target_sum,
            mode,
        })
    }

    fn check_target_sum(&self, target: &AllocationTarget) -> Result<f64> {
        let sum = target.sum();
        if (sum - 1.0).abs() > self.config.target_sum_tolerance {
            if self.config.strict_target_sum {
                return Err(Error::InvalidArgument(format!(
                    "target fractions sum to {sum:.6}, expected 1"
                )));
            }
            warn!(
                "target fractions sum to {sum:.6}; the plan will {} relative to portfolio value",
                if sum < 1.0 { "under-invest" } else { "over-invest" }
            );
        }
        Ok(sum)
    }
}
