//! Fixed-point solver configuration and diagnostics.

use serde::{Deserialize, Serialize};

use crate::error::{ModelError, Result};

/// Configuration for the inner Bellman iteration at a fixed price schedule.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ValueIterationOptions {
    /// Supremum norm tolerance on successive value functions.
    pub tolerance: f64,
    /// Maximum number of sweeps allowed before aborting.
    pub max_iterations: usize,
    /// Evaluate the `(i, s)` cells of a sweep on the rayon thread pool.
    pub parallel: bool,
}

impl Default for ValueIterationOptions {
    fn default() -> Self {
        Self {
            tolerance: 1e-5,
            max_iterations: 10_000,
            parallel: false,
        }
    }
}

/// Configuration for the outer price-schedule iteration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PriceIterationOptions {
    /// Supremum norm tolerance used when repayment probabilities are continuous.
    /// Discrete choice rules require an exact match instead.
    pub tolerance: f64,
    /// Maximum number of price updates before aborting.
    pub max_iterations: usize,
}

impl Default for PriceIterationOptions {
    fn default() -> Self {
        Self {
            tolerance: 1e-5,
            max_iterations: 1_000,
        }
    }
}

fn check_tolerance(name: &'static str, tolerance: f64, max_iterations: usize) -> Result<()> {
    if !tolerance.is_finite() || tolerance <= 0.0 {
        return Err(ModelError::invalid_parameter(
            name,
            tolerance,
            "must be positive and finite",
        ));
    }
    if max_iterations == 0 {
        return Err(ModelError::invalid_parameter(
            name,
            0.0,
            "iteration cap must be at least 1",
        ));
    }
    Ok(())
}

impl ValueIterationOptions {
    pub fn validate(&self) -> Result<()> {
        check_tolerance("value tolerance", self.tolerance, self.max_iterations)
    }
}

impl PriceIterationOptions {
    pub fn validate(&self) -> Result<()> {
        check_tolerance("price tolerance", self.tolerance, self.max_iterations)
    }
}

/// Diagnostics returned by one converged inner solve.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ValueIterationSummary {
    /// Number of sweeps performed.
    pub iterations: usize,
    /// Sup-norm change of the value function in the final sweep.
    pub max_gap: f64,
}

/// Diagnostics for a full nested solve.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SolveSummary {
    /// Number of price updates performed.
    pub price_iterations: usize,
    /// Sweeps summed across every inner solve.
    pub value_sweeps: usize,
    /// Sup-norm change of the value function in the last sweep.
    pub value_gap: f64,
    /// Sup-norm change of the price schedule in the last update.
    pub price_gap: f64,
}
