//! Aggregated solver configuration.

use serde::{Deserialize, Serialize};

use crate::choice::ChoiceRule;
use crate::error::Result;
use crate::solving::{PriceIterationOptions, ValueIterationOptions};

/// Everything the nested solver needs besides the structural [`Parameters`](crate::Parameters).
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct SolverOptions {
    /// Configuration for the inner Bellman iteration.
    pub value: ValueIterationOptions,
    /// Configuration for the outer price iteration.
    pub price: PriceIterationOptions,
    /// Repay/default decision rule.
    pub choice: ChoiceRule,
}

impl SolverOptions {
    /// Rejects non-positive tolerances, zero caps and invalid smoothing scales.
    pub fn validate(&self) -> Result<()> {
        self.value.validate()?;
        self.price.validate()?;
        self.choice.validate()
    }

    /// Override the choice rule while preserving other defaults.
    pub fn with_choice(mut self, choice: ChoiceRule) -> Self {
        self.choice = choice;
        self
    }

    /// Switch to Gumbel-smoothed choice with scale `alpha`.
    pub fn with_smoothing(self, alpha: f64) -> Self {
        self.with_choice(ChoiceRule::ExtremeValue { scale: alpha })
    }

    /// Override the inner-loop settings.
    pub fn with_value_iteration(mut self, value: ValueIterationOptions) -> Self {
        self.value = value;
        self
    }

    /// Override the outer-loop settings.
    pub fn with_price_iteration(mut self, price: PriceIterationOptions) -> Self {
        self.price = price;
        self
    }

    /// Set both the value and price tolerances.
    pub fn with_tolerances(mut self, value: f64, price: f64) -> Self {
        self.value.tolerance = value;
        self.price.tolerance = price;
        self
    }

    /// Enable or disable parallel sweeps.
    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.value.parallel = parallel;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ModelError;

    #[test]
    fn defaults_are_valid_hard_max() {
        let options = SolverOptions::default();
        assert!(options.validate().is_ok());
        assert!(options.choice.is_discrete());
    }

    #[test]
    fn rejects_non_positive_alpha_and_tolerance() {
        let options = SolverOptions::default().with_smoothing(-1.0);
        assert!(matches!(
            options.validate(),
            Err(ModelError::InvalidParameter { .. })
        ));

        let options = SolverOptions::default().with_tolerances(0.0, 1e-6);
        assert!(options.validate().is_err());
    }
}
