//! Mutable arrays owned by a single solve invocation.

use nalgebra::{DMatrix, DVector};

use crate::bellman::autarky_value;
use crate::error::{ModelError, Result};
use crate::model::Parameters;

/// Working arrays, indexed `(i, s)` with `i` the borrowing index and `s` the income state.
///
/// Created once per solve and mutated in place through every inner and outer
/// iteration. Callers only ever see the frozen [`Solution`](crate::Solution).
#[derive(Clone, Debug)]
pub(crate) struct SolverState {
    /// Value of having the repay/default choice, `V`.
    pub value: DMatrix<f64>,
    /// Best value conditional on repaying, `Vrepay`.
    pub value_repay: DMatrix<f64>,
    /// Maximizing next-borrowing index for the repay branch, `jBest`.
    pub best_choice: DMatrix<usize>,
    /// Autarky value per income state, `Vdefault`.
    pub value_default: DVector<f64>,
    /// Repayment indicator or probability, `D`.
    pub repay_probability: DMatrix<f64>,
    /// Chosen next-borrowing index, `Policy`.
    pub policy: DMatrix<usize>,
    /// Price per unit of debt by next-borrowing index, `q`.
    pub prices: DVector<f64>,
}

impl SolverState {
    pub fn new(parameters: &Parameters, prices: DVector<f64>) -> Result<Self> {
        let grid_size = parameters.grid_size();
        let states = parameters.state_count();
        if prices.len() != grid_size {
            return Err(ModelError::dimension_mismatch(
                "initial prices",
                grid_size,
                prices.len(),
            ));
        }
        if prices.iter().any(|q| !q.is_finite()) {
            return Err(ModelError::numerical("initial prices"));
        }

        Ok(Self {
            value: DMatrix::zeros(grid_size, states),
            value_repay: DMatrix::zeros(grid_size, states),
            best_choice: DMatrix::from_element(grid_size, states, 0),
            value_default: autarky_value(parameters)?,
            repay_probability: DMatrix::from_element(grid_size, states, 1.0),
            policy: DMatrix::from_element(grid_size, states, 0),
            prices,
        })
    }
}
