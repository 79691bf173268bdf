//! Balancer configuration.

use crate::allocate::Bounds;
use crate::select::SelectOptions;

/// Algorithm used when only `k` securities may be funded.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum Search {
    /// Solve every `k`-subset and keep the best.
    #[default]
    Exhaustive,
    /// Keep the `k` largest unconstrained purchases and rescale.
    TopN,
}

/// Configuration for the [`Balancer`](crate::Balancer).
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct BalanceConfig {
    /// Sign constraint for restricted purchases.
    pub bounds: Bounds,
    /// Restricted-mode algorithm.
    pub search: Search,
    /// Exhaustive search stops at the first subset at or below this residual.
    pub early_exit_epsilon: f64,
    /// Allowed distance of the target sum from 1 before it is flagged.
    pub target_sum_tolerance: f64,
    /// Reject targets outside the tolerance instead of warning.
    pub strict_target_sum: bool,
}

impl BalanceConfig {
    /// Validate the config. Returns `Err` with a description if any field is nonsensical.
    pub fn validate(&self) -> Result<(), String> {
        if !self.early_exit_epsilon.is_finite() || self.early_exit_epsilon < 0.0 {
            return Err(format!(
                "early_exit_epsilon must be >= 0 and finite, got {}",
                self.early_exit_epsilon
            ));
        }
        if !self.target_sum_tolerance.is_finite() || self.target_sum_tolerance < 0.0 {
            return Err(format!(
                "target_sum_tolerance must be >= 0 and finite, got {}",
                self.target_sum_tolerance
            ));
        }
        Ok(())
    }

    pub fn select_options(&self) -> SelectOptions {
        SelectOptions {
            bounds: self.bounds,
            early_exit_epsilon: self.early_exit_epsilon,
        }
    }
}

impl Default for BalanceConfig {
    fn default() -> Self {
        Self {
            bounds: Bounds::Unbounded,
            search: Search::Exhaustive,
            early_exit_epsilon: 0.0,
            target_sum_tolerance: 1e-6,
            strict_target_sum: false,
        }
    }
}
