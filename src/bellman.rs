//! Inner loop: Bellman iteration over the borrowing grid at a fixed price schedule.

use log::{debug, warn};
use nalgebra::{DMatrix, DVector};
use rayon::prelude::*;

use crate::choice::ChoiceRule;
use crate::error::{ModelError, Result};
use crate::model::Parameters;
use crate::solving::{ValueIterationOptions, ValueIterationSummary};
use crate::state::SolverState;
use crate::utility::crra;

/// Value of permanent exclusion from credit markets, one entry per income state.
///
/// For i.i.d. income this is `u(y_s) + β/(1-β) · E[u(y)]`. For Markov income
/// the perpetuity is solved exactly as `(I - βP)⁻¹ u(y)`.
pub fn autarky_value(parameters: &Parameters) -> Result<DVector<f64>> {
    let states = parameters.state_count();
    let beta = parameters.discount;
    let flow = DVector::from_fn(states, |s, _| {
        crra(
            parameters.autarky_income(s),
            parameters.risk_aversion,
            parameters.lowval,
        )
    });

    let value = if parameters.income.is_iid() {
        let expected = parameters.income.stationary().dot(&flow);
        flow.map(|u| u + beta / (1.0 - beta) * expected)
    } else {
        let system =
            DMatrix::<f64>::identity(states, states) - parameters.income.transition() * beta;
        system
            .lu()
            .solve(&flow)
            .ok_or_else(|| ModelError::singular("autarky perpetuity"))?
    };

    if value.iter().any(|v| !v.is_finite()) {
        return Err(ModelError::numerical("autarky value"));
    }
    Ok(value)
}

/// Result of evaluating one `(i, s)` cell in a sweep.
#[derive(Clone, Copy, Debug)]
struct CellUpdate {
    value: f64,
    value_repay: f64,
    best_choice: usize,
    repay_probability: f64,
}

/// Read-only inputs shared by every cell of one sweep.
struct Sweep<'a> {
    parameters: &'a Parameters,
    choice: ChoiceRule,
    /// `q[j] · b[j]`, the resources raised by choosing `j`.
    proceeds: DVector<f64>,
    /// `EV[j, s] = Σ_s' π(s'|s) V[j, s']`.
    expected: DMatrix<f64>,
    value_default: &'a DVector<f64>,
}

impl Sweep<'_> {
    fn evaluate(&self, i: usize, s: usize) -> Result<CellUpdate> {
        let income = self.parameters.income.levels()[s];
        let debt = self.parameters.grid.level(i);
        let beta = self.parameters.discount;

        let mut best = f64::NEG_INFINITY;
        let mut best_choice = 0usize;
        for (j, proceeds) in self.proceeds.iter().enumerate() {
            let consumption = income + proceeds - debt;
            let candidate = crra(
                consumption,
                self.parameters.risk_aversion,
                self.parameters.lowval,
            ) + beta * self.expected[(j, s)];
            // Strict comparison keeps the first maximizer.
            if candidate > best {
                best = candidate;
                best_choice = j;
            }
        }
        if !best.is_finite() {
            return Err(ModelError::numerical("repay branch maximization"));
        }

        let outcome = self.choice.combine(best, self.value_default[s])?;
        Ok(CellUpdate {
            value: outcome.value,
            value_repay: best,
            best_choice,
            repay_probability: outcome.repay_probability,
        })
    }
}

/// Applies one Bellman sweep to `state` and returns the sup-norm change in `V`.
fn sweep(
    parameters: &Parameters,
    choice: ChoiceRule,
    parallel: bool,
    state: &mut SolverState,
) -> Result<f64> {
    let rows = parameters.grid_size();
    let cells = rows * parameters.state_count();

    let updates: Vec<CellUpdate> = {
        let context = Sweep {
            parameters,
            choice,
            proceeds: state.prices.component_mul(parameters.grid.points()),
            expected: &state.value * parameters.income.transition().transpose(),
            value_default: &state.value_default,
        };

        // Cell k maps to (k % rows, k / rows), matching nalgebra's column-major layout.
        if parallel {
            (0..cells)
                .into_par_iter()
                .map(|k| context.evaluate(k % rows, k / rows))
                .collect::<Result<Vec<_>>>()?
        } else {
            (0..cells)
                .map(|k| context.evaluate(k % rows, k / rows))
                .collect::<Result<Vec<_>>>()?
        }
    };

    let mut max_gap = 0.0_f64;
    for (k, update) in updates.into_iter().enumerate() {
        let cell = (k % rows, k / rows);
        max_gap = max_gap.max((update.value - state.value[cell]).abs());
        state.value[cell] = update.value;
        state.value_repay[cell] = update.value_repay;
        state.best_choice[cell] = update.best_choice;
        state.repay_probability[cell] = update.repay_probability;
    }
    Ok(max_gap)
}

/// Iterates the Bellman operator at the current `state.prices` until `V` settles.
pub(crate) fn solve_value_function(
    parameters: &Parameters,
    choice: ChoiceRule,
    options: &ValueIterationOptions,
    state: &mut SolverState,
) -> Result<ValueIterationSummary> {
    let mut max_gap = f64::INFINITY;
    let mut iteration = 0usize;

    while iteration < options.max_iterations {
        max_gap = sweep(parameters, choice, options.parallel, state)?;
        iteration += 1;
        if max_gap < options.tolerance {
            debug!("value iteration converged after {iteration} sweeps (max gap {max_gap:.3e})");
            return Ok(ValueIterationSummary {
                iterations: iteration,
                max_gap,
            });
        }
    }

    warn!("value iteration hit the cap of {iteration} sweeps (max gap {max_gap:.3e})");
    Err(ModelError::ValueIterationDidNotConverge {
        iterations: iteration,
        max_gap,
    })
}

/// Copies `jBest` into `Policy`, resetting cells where default is more likely than repayment.
pub(crate) fn derive_policy(state: &mut SolverState) {
    for (k, policy) in state.policy.iter_mut().enumerate() {
        *policy = if state.repay_probability[k] < 0.5 {
            0
        } else {
            state.best_choice[k]
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::income::IncomeProcess;
    use crate::model::BorrowingGrid;
    use approx::assert_relative_eq;

    fn parameters(size: usize) -> Parameters {
        let income = IncomeProcess::iid(vec![0.2, 1.2], vec![0.2, 0.8]).unwrap();
        let grid = BorrowingGrid::uniform(-0.15, 2.0, size).unwrap();
        Parameters::builder(income, grid).build().unwrap()
    }

    fn tight() -> ValueIterationOptions {
        ValueIterationOptions {
            tolerance: 1e-10,
            ..ValueIterationOptions::default()
        }
    }

    #[test]
    fn autarky_matches_geometric_series() {
        let parameters = parameters(5);
        let autarky = autarky_value(&parameters).unwrap();
        // u(0.2) = -5, u(1.2) = -5/6, E[u] = -5/3, β/(1-β) = 4.
        assert_relative_eq!(autarky[0], -5.0 - 4.0 * 5.0 / 3.0, epsilon = 1e-12);
        assert_relative_eq!(autarky[1], -5.0 / 6.0 - 4.0 * 5.0 / 3.0, epsilon = 1e-12);
    }

    #[test]
    fn markov_autarky_solves_its_own_recursion() {
        let mut parameters = parameters(5);
        let transition = DMatrix::from_row_slice(2, 2, &[0.6, 0.4, 0.1, 0.9]);
        parameters.income = IncomeProcess::markov(vec![0.2, 1.2], transition).unwrap();
        let autarky = autarky_value(&parameters).unwrap();

        let flow = DVector::from_vec(vec![-5.0, -5.0 / 6.0]);
        let recursion = &flow + parameters.income.transition() * &autarky * 0.8;
        assert_relative_eq!(autarky, recursion, epsilon = 1e-10);
    }

    #[test]
    fn hard_max_value_is_max_of_branches() {
        let parameters = parameters(25);
        let prices = DVector::from_element(25, 0.8);
        let mut state = SolverState::new(&parameters, prices).unwrap();
        let summary =
            solve_value_function(&parameters, ChoiceRule::HardMax, &tight(), &mut state).unwrap();
        assert!(summary.max_gap < 1e-10);

        for s in 0..2 {
            for i in 0..25 {
                let expected = state.value_repay[(i, s)].max(state.value_default[s]);
                assert_eq!(state.value[(i, s)], expected);
                let d = state.repay_probability[(i, s)];
                assert!(d == 0.0 || d == 1.0);
            }
        }
    }

    #[test]
    fn repay_value_falls_as_debt_rises() {
        let parameters = parameters(20);
        let prices = DVector::from_element(20, 0.7);
        let mut state = SolverState::new(&parameters, prices).unwrap();
        solve_value_function(&parameters, ChoiceRule::HardMax, &tight(), &mut state).unwrap();

        for s in 0..2 {
            for i in 1..20 {
                assert!(state.value_repay[(i, s)] <= state.value_repay[(i - 1, s)] + 1e-12);
            }
        }
    }

    #[test]
    fn smoothed_value_satisfies_log_sum_identity() {
        let alpha = 5.0;
        let parameters = parameters(20);
        let prices = DVector::from_element(20, 0.75);
        let mut state = SolverState::new(&parameters, prices).unwrap();
        let choice = ChoiceRule::ExtremeValue { scale: alpha };
        solve_value_function(&parameters, choice, &tight(), &mut state).unwrap();

        for s in 0..2 {
            for i in 0..20 {
                let repay = state.value_repay[(i, s)];
                let default = state.value_default[s];
                let expected = crate::choice::EULER_GAMMA / alpha
                    + ((alpha * repay).exp() + (alpha * default).exp()).ln() / alpha;
                assert_relative_eq!(state.value[(i, s)], expected, epsilon = 1e-9);
                let d = state.repay_probability[(i, s)];
                assert!((0.0..=1.0).contains(&d));
            }
        }
    }

    #[test]
    fn parallel_sweep_matches_serial() {
        let parameters = parameters(30);
        let prices = DVector::from_fn(30, |j, _| 0.9 - 0.02 * j as f64);
        let mut serial = SolverState::new(&parameters, prices.clone()).unwrap();
        let mut parallel = SolverState::new(&parameters, prices).unwrap();

        let options = tight();
        solve_value_function(&parameters, ChoiceRule::HardMax, &options, &mut serial).unwrap();
        let parallel_options = ValueIterationOptions {
            parallel: true,
            ..options
        };
        solve_value_function(&parameters, ChoiceRule::HardMax, &parallel_options, &mut parallel)
            .unwrap();

        assert_eq!(serial.value, parallel.value);
        assert_eq!(serial.best_choice, parallel.best_choice);
    }

    #[test]
    fn reports_non_convergence_with_residual() {
        let parameters = parameters(10);
        let prices = DVector::from_element(10, 0.8);
        let mut state = SolverState::new(&parameters, prices).unwrap();
        let options = ValueIterationOptions {
            tolerance: 1e-12,
            max_iterations: 3,
            parallel: false,
        };
        let result = solve_value_function(&parameters, ChoiceRule::HardMax, &options, &mut state);
        match result {
            Err(ModelError::ValueIterationDidNotConverge {
                iterations,
                max_gap,
            }) => {
                assert_eq!(iterations, 3);
                assert!(max_gap > 1e-12);
            }
            other => panic!("expected non-convergence, got {other:?}"),
        }
    }

    #[test]
    fn defaulting_cells_reset_policy_to_lowest_index() {
        let parameters = parameters(25);
        let prices = DVector::from_element(25, 0.8);
        let mut state = SolverState::new(&parameters, prices).unwrap();
        solve_value_function(&parameters, ChoiceRule::HardMax, &tight(), &mut state).unwrap();
        derive_policy(&mut state);

        for k in 0..state.policy.len() {
            if state.repay_probability[k] == 0.0 {
                assert_eq!(state.policy[k], 0);
            } else {
                assert_eq!(state.policy[k], state.best_choice[k]);
            }
        }
        // Owing 2.0 out of an income of 0.2 cannot be serviced.
        assert_eq!(state.repay_probability[(24, 0)], 0.0);
    }
}
