//! Outer loop: iterate the price schedule until it is consistent with default risk.

use log::{debug, info, warn};
use nalgebra::DVector;

use crate::bellman::{derive_policy, solve_value_function};
use crate::error::{ModelError, Result};
use crate::model::Parameters;
use crate::options::SolverOptions;
use crate::pricing::{price_update, PriceChange};
use crate::solution::Solution;
use crate::solving::SolveSummary;
use crate::state::SolverState;

/// A validated default model together with its solver configuration.
#[derive(Clone, Debug)]
pub struct DefaultProblem {
    parameters: Parameters,
    options: SolverOptions,
}

impl DefaultProblem {
    /// Validates parameters and options; configuration errors surface here, before any solve.
    pub fn new(parameters: Parameters, options: SolverOptions) -> Result<Self> {
        parameters.validate()?;
        options.validate()?;
        Ok(Self {
            parameters,
            options,
        })
    }

    pub fn parameters(&self) -> &Parameters {
        &self.parameters
    }

    pub fn options(&self) -> &SolverOptions {
        &self.options
    }

    /// Solves from the flat initial guess `q[j] = β`.
    pub fn solve(&self) -> Result<Solution> {
        let initial = DVector::from_element(self.parameters.grid_size(), self.parameters.discount);
        self.solve_from(initial)
    }

    /// Solves from a caller-supplied initial price schedule.
    pub fn solve_from(&self, initial_prices: DVector<f64>) -> Result<Solution> {
        let parameters = &self.parameters;
        let options = &self.options;
        let mut state = SolverState::new(parameters, initial_prices)?;

        let mut value_sweeps = 0usize;
        let mut change = PriceChange {
            max_gap: f64::INFINITY,
            changed: parameters.grid_size(),
        };

        for iteration in 1..=options.price.max_iterations {
            let inner = solve_value_function(parameters, options.choice, &options.value, &mut state)?;
            value_sweeps += inner.iterations;

            let updated = price_update(
                &state.repay_probability,
                parameters.income.stationary(),
                parameters.gross_return,
            );
            change = PriceChange::between(&state.prices, &updated);
            debug!(
                "price iteration {iteration}: {} entries changed, max gap {:.3e}, {} sweeps",
                change.changed, change.max_gap, inner.iterations
            );

            if change.is_converged(&options.choice, options.price.tolerance) {
                derive_policy(&mut state);
                let summary = SolveSummary {
                    price_iterations: iteration,
                    value_sweeps,
                    value_gap: inner.max_gap,
                    price_gap: change.max_gap,
                };
                info!(
                    "default model solved: {iteration} price iterations, {value_sweeps} value sweeps"
                );
                return Ok(Solution::from_state(
                    state,
                    parameters.grid.clone(),
                    options.choice,
                    parameters.gross_return,
                    summary,
                ));
            }

            state.prices = updated;
        }

        warn!(
            "price iteration hit the cap of {} iterations ({} entries still changing)",
            options.price.max_iterations, change.changed
        );
        Err(ModelError::PriceIterationDidNotConverge {
            iterations: options.price.max_iterations,
            max_gap: change.max_gap,
            changed: change.changed,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::choice::ChoiceRule;
    use crate::income::IncomeProcess;
    use crate::model::BorrowingGrid;
    use crate::solving::PriceIterationOptions;

    fn parameters(size: usize) -> Parameters {
        let income = IncomeProcess::iid(vec![0.2, 1.2], vec![0.2, 0.8]).unwrap();
        let grid = BorrowingGrid::uniform(-0.15, 2.0, size).unwrap();
        Parameters::builder(income, grid).build().unwrap()
    }

    #[test]
    fn converged_prices_reproduce_themselves() {
        let problem = DefaultProblem::new(parameters(30), SolverOptions::default()).unwrap();
        let solution = problem.solve().unwrap();

        let implied = price_update(
            solution.repay_probability(),
            problem.parameters().income.stationary(),
            1.1,
        );
        assert_eq!(&implied, solution.prices());
        assert_eq!(solution.summary().price_gap, 0.0);
    }

    #[test]
    fn rejects_mismatched_initial_prices() {
        let problem = DefaultProblem::new(parameters(10), SolverOptions::default()).unwrap();
        let result = problem.solve_from(DVector::from_element(9, 0.5));
        assert!(matches!(
            result,
            Err(ModelError::DimensionMismatch {
                expected: 10,
                found: 9,
                ..
            })
        ));
    }

    #[test]
    fn price_cap_is_reported_as_non_convergence() {
        let options = SolverOptions::default().with_price_iteration(PriceIterationOptions {
            tolerance: 1e-5,
            max_iterations: 1,
        });
        let problem = DefaultProblem::new(parameters(30), options).unwrap();
        // Implied prices lie in {0, 0.2, 0.8, 1} / R, so the flat guess q = β always moves.
        let result = problem.solve();
        match result {
            Err(error @ ModelError::PriceIterationDidNotConverge { .. }) => {
                assert!(error.is_non_convergence());
            }
            other => panic!("expected price non-convergence, got {other:?}"),
        }
    }

    #[test]
    fn invalid_smoothing_scale_fails_before_solving() {
        let options = SolverOptions::default().with_choice(ChoiceRule::ExtremeValue { scale: 0.0 });
        let result = DefaultProblem::new(parameters(10), options);
        assert!(matches!(result, Err(ModelError::InvalidParameter { .. })));
    }

    #[test]
    fn smoothed_solve_keeps_probabilities_in_unit_interval() {
        let options = SolverOptions::default()
            .with_smoothing(2.0)
            .with_tolerances(1e-8, 1e-6);
        let problem = DefaultProblem::new(parameters(20), options).unwrap();
        let solution = problem.solve().unwrap();

        assert!(solution
            .repay_probability()
            .iter()
            .all(|d| (0.0..=1.0).contains(d)));
        assert!(solution.prices().iter().all(|q| (0.0..=1.0 / 1.1).contains(q)));
        assert!(solution.summary().price_gap < 1e-6);
    }
}
