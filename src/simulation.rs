//! Monte Carlo simulation of a solved economy.

use rand::distributions::WeightedIndex;
use rand::rngs::SmallRng;
use rand::SeedableRng;
use rand_distr::{Distribution, Gumbel};
use serde::{Deserialize, Serialize};

use crate::choice::ChoiceRule;
use crate::error::{ModelError, Result};
use crate::problem::DefaultProblem;
use crate::solution::Solution;

/// Length, seed and starting point of a simulated path.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SimulationOptions {
    pub periods: usize,
    pub seed: u64,
    /// Borrowing grid index held in the first period.
    pub initial_debt: usize,
    /// Income state in the first period.
    pub initial_state: usize,
}

impl Default for SimulationOptions {
    fn default() -> Self {
        Self {
            periods: 1_000,
            seed: 1234,
            initial_debt: 0,
            initial_state: 0,
        }
    }
}

/// One simulated history; entry `t` describes period `t`.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct SimulatedPath {
    pub income_state: Vec<usize>,
    /// Borrowing index held at the start of the period.
    pub debt_index: Vec<usize>,
    pub defaulted: Vec<bool>,
    pub consumption: Vec<f64>,
}

impl SimulatedPath {
    pub fn len(&self) -> usize {
        self.income_state.len()
    }

    pub fn is_empty(&self) -> bool {
        self.income_state.is_empty()
    }

    /// Share of periods in which the borrower defaulted.
    pub fn default_frequency(&self) -> f64 {
        if self.defaulted.is_empty() {
            return 0.0;
        }
        let defaults = self.defaulted.iter().filter(|d| **d).count();
        defaults as f64 / self.defaulted.len() as f64
    }
}

/// Simulates income draws and borrowing decisions under the solved policy.
///
/// Under the hard rule the borrower repays exactly where the repayment
/// indicator is one. Under the smoothed rule each period draws standard Gumbel
/// shocks, scaled by `1/α`, on the repay and default values, so repayment
/// frequencies match the solved probabilities. A defaulting borrower consumes
/// autarky income and restarts at the lowest grid index.
pub fn simulate(
    problem: &DefaultProblem,
    solution: &Solution,
    options: &SimulationOptions,
) -> Result<SimulatedPath> {
    let parameters = problem.parameters();
    let grid_size = parameters.grid_size();
    let states = parameters.state_count();
    if solution.grid_size() != grid_size {
        return Err(ModelError::dimension_mismatch(
            "solution grid",
            grid_size,
            solution.grid_size(),
        ));
    }
    if solution.state_count() != states {
        return Err(ModelError::dimension_mismatch(
            "solution income states",
            states,
            solution.state_count(),
        ));
    }
    if options.initial_debt >= grid_size {
        return Err(ModelError::dimension_mismatch(
            "initial debt index",
            grid_size,
            options.initial_debt,
        ));
    }
    if options.initial_state >= states {
        return Err(ModelError::dimension_mismatch(
            "initial income state",
            states,
            options.initial_state,
        ));
    }

    let transition = parameters.income.transition();
    let mut next_state = Vec::with_capacity(states);
    for row in transition.row_iter() {
        let weights = WeightedIndex::new(row.iter().copied())
            .map_err(|_| ModelError::InvalidProbabilities { row: next_state.len(), slack: 1.0 })?;
        next_state.push(weights);
    }
    let shocks = Gumbel::new(0.0, 1.0)
        .map_err(|_| ModelError::invalid_parameter("gumbel scale", 1.0, "must be positive"))?;

    let mut rng = SmallRng::seed_from_u64(options.seed);
    let mut path = SimulatedPath {
        income_state: Vec::with_capacity(options.periods),
        debt_index: Vec::with_capacity(options.periods),
        defaulted: Vec::with_capacity(options.periods),
        consumption: Vec::with_capacity(options.periods),
    };

    let levels = parameters.income.levels();
    let grid = &parameters.grid;
    let prices = solution.prices();
    let mut state = options.initial_state;
    let mut debt = options.initial_debt;

    for _ in 0..options.periods {
        let cell = (debt, state);
        let repays = match solution.choice() {
            ChoiceRule::HardMax => solution.repay_probability()[cell] >= 0.5,
            ChoiceRule::ExtremeValue { scale } => {
                let repay: f64 = solution.value_repay()[cell] + shocks.sample(&mut rng) / scale;
                let default: f64 =
                    solution.value_default()[state] + shocks.sample(&mut rng) / scale;
                repay >= default
            }
        };

        let (consumption, next_debt) = if repays {
            let j = solution.repay_choice()[cell];
            (levels[state] + prices[j] * grid.level(j) - grid.level(debt), j)
        } else {
            (parameters.autarky_income(state), 0)
        };

        path.income_state.push(state);
        path.debt_index.push(debt);
        path.defaulted.push(!repays);
        path.consumption.push(consumption);

        debt = next_debt;
        state = next_state[state].sample(&mut rng);
    }

    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::income::IncomeProcess;
    use crate::model::{BorrowingGrid, Parameters};
    use crate::options::SolverOptions;

    fn problem(options: SolverOptions) -> DefaultProblem {
        let income = IncomeProcess::iid(vec![0.2, 1.2], vec![0.2, 0.8]).unwrap();
        let grid = BorrowingGrid::uniform(-0.15, 2.0, 30).unwrap();
        let parameters = Parameters::builder(income, grid).build().unwrap();
        DefaultProblem::new(parameters, options).unwrap()
    }

    #[test]
    fn hard_rule_path_follows_policy() {
        let problem = problem(SolverOptions::default());
        let solution = problem.solve().unwrap();
        let options = SimulationOptions {
            periods: 500,
            ..SimulationOptions::default()
        };
        let path = simulate(&problem, &solution, &options).unwrap();
        assert_eq!(path.len(), 500);

        for t in 1..path.len() {
            let cell = (path.debt_index[t - 1], path.income_state[t - 1]);
            let expected = if path.defaulted[t - 1] {
                0
            } else {
                solution.policy()[cell]
            };
            assert_eq!(path.debt_index[t], expected);
            assert_eq!(
                path.defaulted[t - 1],
                solution.repay_probability()[cell] == 0.0
            );
        }
        assert!(path.consumption.iter().all(|c| *c > 0.0));
    }

    #[test]
    fn same_seed_reproduces_path() {
        let problem = problem(SolverOptions::default().with_smoothing(2.0).with_tolerances(1e-8, 1e-6));
        let solution = problem.solve().unwrap();
        let options = SimulationOptions::default();
        let first = simulate(&problem, &solution, &options).unwrap();
        let second = simulate(&problem, &solution, &options).unwrap();
        assert_eq!(first.defaulted, second.defaulted);
        assert_eq!(first.income_state, second.income_state);
        assert!((0.0..=1.0).contains(&first.default_frequency()));
    }

    #[test]
    fn rejects_out_of_range_start() {
        let problem = problem(SolverOptions::default());
        let solution = problem.solve().unwrap();
        let options = SimulationOptions {
            initial_debt: 30,
            ..SimulationOptions::default()
        };
        assert!(matches!(
            simulate(&problem, &solution, &options),
            Err(ModelError::DimensionMismatch { .. })
        ));
    }
}
