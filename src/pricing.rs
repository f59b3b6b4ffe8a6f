//! Bond price schedule implied by repayment probabilities.

use nalgebra::{DMatrix, DVector};

use crate::choice::ChoiceRule;

/// Risk-neutral price `q[j] = Σ_s π(s) · D[j, s] / R`, clipped to `[0, 1/R]`.
pub fn price_update(
    repay_probability: &DMatrix<f64>,
    distribution: &DVector<f64>,
    gross_return: f64,
) -> DVector<f64> {
    let ceiling = 1.0 / gross_return;
    (repay_probability * distribution).map(|expected| (expected / gross_return).clamp(0.0, ceiling))
}

/// Difference between two successive price schedules.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PriceChange {
    /// Sup-norm distance.
    pub max_gap: f64,
    /// Number of entries that differ bit-for-bit.
    pub changed: usize,
}

impl PriceChange {
    pub fn between(old: &DVector<f64>, new: &DVector<f64>) -> Self {
        let mut max_gap = 0.0_f64;
        let mut changed = 0usize;
        for (a, b) in old.iter().zip(new.iter()) {
            if a != b {
                changed += 1;
                max_gap = max_gap.max((a - b).abs());
            }
        }
        Self { max_gap, changed }
    }

    /// Discrete rules converge only on an exact match; smoothed rules on the sup norm.
    pub fn is_converged(&self, choice: &ChoiceRule, tolerance: f64) -> bool {
        if choice.is_discrete() {
            self.changed == 0
        } else {
            self.max_gap < tolerance
        }
    }
}
