//! Repay/default choice rules.
//!
//! Both rules turn the two competing continuation values into a value of
//! having the choice and a repayment probability `D`. `D` always refers to
//! *repayment*: `1.0` means the borrower repays for sure, `0.0` means it
//! defaults for sure.
//!
//! The extreme-value rule adds i.i.d. Gumbel taste shocks with scale `1/α` to
//! each alternative. The value of the choice is then the log-sum
//!
//! ```text
//! V = γ/α + (1/α) · ln(exp(α·V_repay) + exp(α·V_default))
//! ```
//!
//! evaluated with the larger exponent factored out, and `D` is the logit
//! probability of repaying. As `α → ∞` it recovers the hard-max rule.

use serde::{Deserialize, Serialize};

use crate::error::{ModelError, Result};

/// Euler–Mascheroni constant, the mean of a standard Gumbel variable.
pub const EULER_GAMMA: f64 = 0.577_215_664_901_532_9;

/// How the repay/default decision is resolved.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub enum ChoiceRule {
    /// Deterministic choice; ties go to repayment.
    #[default]
    HardMax,
    /// Logit choice induced by Gumbel taste shocks with scale `1/scale`.
    ExtremeValue { scale: f64 },
}

/// Result of combining the repay and default values for one `(i, s)` cell.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ChoiceOutcome {
    pub value: f64,
    pub repay_probability: f64,
}

impl ChoiceRule {
    /// Validates the smoothing scale.
    pub fn validate(&self) -> Result<()> {
        match *self {
            Self::HardMax => Ok(()),
            Self::ExtremeValue { scale } => {
                if scale.is_finite() && scale > 0.0 {
                    Ok(())
                } else {
                    Err(ModelError::invalid_parameter(
                        "choice scale",
                        scale,
                        "must be positive and finite",
                    ))
                }
            }
        }
    }

    /// Whether repayment probabilities are restricted to `{0, 1}`.
    pub fn is_discrete(&self) -> bool {
        matches!(self, Self::HardMax)
    }

    /// Combines repay and default values into the value of choosing and `D`.
    pub fn combine(&self, repay: f64, default: f64) -> Result<ChoiceOutcome> {
        if !repay.is_finite() || !default.is_finite() {
            return Err(ModelError::numerical("repay/default choice"));
        }
        match *self {
            Self::HardMax => Ok(if repay >= default {
                ChoiceOutcome {
                    value: repay,
                    repay_probability: 1.0,
                }
            } else {
                ChoiceOutcome {
                    value: default,
                    repay_probability: 0.0,
                }
            }),
            Self::ExtremeValue { scale } => log_sum(repay, default, scale),
        }
    }
}

fn log_sum(repay: f64, default: f64, scale: f64) -> Result<ChoiceOutcome> {
    let scaled_repay = scale * repay;
    let scaled_default = scale * default;
    if !scaled_repay.is_finite() || !scaled_default.is_finite() {
        return Err(ModelError::numerical("log-sum scaling"));
    }

    let m = scaled_repay.max(scaled_default);
    let exp_repay = (scaled_repay - m).exp();
    let exp_default = (scaled_default - m).exp();
    let expsum = exp_repay + exp_default;

    let value = m / scale + EULER_GAMMA / scale + expsum.ln() / scale;
    let repay_probability = exp_repay / expsum;
    if !value.is_finite() || !repay_probability.is_finite() {
        return Err(ModelError::numerical("log-sum evaluation"));
    }
    Ok(ChoiceOutcome {
        value,
        repay_probability,
    })
}
