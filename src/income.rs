//! Finite-state income processes driving the borrower's endowment.

use nalgebra::{DMatrix, DVector};
use serde::{Deserialize, Serialize};

use crate::error::{ModelError, Result};

const PROBABILITY_SLACK: f64 = 1e-8;

/// Discrete income process: ordered levels `y_1..y_S` with an S×S transition matrix.
///
/// The i.i.d. case is stored as a transition matrix whose rows all equal the
/// unconditional probabilities, so the solver only ever deals with one shape.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct IncomeProcess {
    levels: DVector<f64>,
    transition: DMatrix<f64>,
    stationary: DVector<f64>,
}

impl IncomeProcess {
    /// Builds an i.i.d. process from income levels and their unconditional probabilities.
    pub fn iid(levels: Vec<f64>, probabilities: Vec<f64>) -> Result<Self> {
        if levels.is_empty() {
            return Err(ModelError::dimension_mismatch("income levels", 1, 0));
        }
        if probabilities.len() != levels.len() {
            return Err(ModelError::dimension_mismatch(
                "income probabilities",
                levels.len(),
                probabilities.len(),
            ));
        }
        let probabilities = DVector::from_vec(probabilities);
        validate_row(0, probabilities.iter().copied())?;

        let states = levels.len();
        let transition = DMatrix::from_fn(states, states, |_, next| probabilities[next]);
        let process = Self {
            levels: DVector::from_vec(levels),
            transition,
            stationary: probabilities,
        };
        process.validate_levels()?;
        Ok(process)
    }

    /// Builds a Markov process from income levels and a row-stochastic transition matrix.
    pub fn markov(levels: Vec<f64>, transition: DMatrix<f64>) -> Result<Self> {
        let states = levels.len();
        if states == 0 {
            return Err(ModelError::dimension_mismatch("income levels", 1, 0));
        }
        if transition.nrows() != states || transition.ncols() != states {
            return Err(ModelError::dimension_mismatch(
                "transition matrix",
                states,
                transition.nrows().max(transition.ncols()),
            ));
        }
        for (row, probabilities) in transition.row_iter().enumerate() {
            validate_row(row, probabilities.iter().copied())?;
        }

        let stationary = stationary_distribution(&transition)?;
        let process = Self {
            levels: DVector::from_vec(levels),
            transition,
            stationary,
        };
        process.validate_levels()?;
        Ok(process)
    }

    /// Re-checks invariants, e.g. after deserialization.
    pub fn validate(&self) -> Result<()> {
        let states = self.levels.len();
        if states == 0 {
            return Err(ModelError::dimension_mismatch("income levels", 1, 0));
        }
        if self.transition.nrows() != states || self.transition.ncols() != states {
            return Err(ModelError::dimension_mismatch(
                "transition matrix",
                states,
                self.transition.nrows(),
            ));
        }
        if self.stationary.len() != states {
            return Err(ModelError::dimension_mismatch(
                "stationary distribution",
                states,
                self.stationary.len(),
            ));
        }
        for (row, probabilities) in self.transition.row_iter().enumerate() {
            validate_row(row, probabilities.iter().copied())?;
        }
        validate_row(states, self.stationary.iter().copied())?;
        self.validate_levels()
    }

    fn validate_levels(&self) -> Result<()> {
        for level in self.levels.iter() {
            if !level.is_finite() {
                return Err(ModelError::invalid_parameter(
                    "income level",
                    *level,
                    "must be finite",
                ));
            }
        }
        Ok(())
    }

    /// Number of income states `S`.
    pub fn state_count(&self) -> usize {
        self.levels.len()
    }

    /// Income levels indexed by state.
    pub fn levels(&self) -> &DVector<f64> {
        &self.levels
    }

    /// Transition matrix, `transition[(s, s')] = π(s' | s)`.
    pub fn transition(&self) -> &DMatrix<f64> {
        &self.transition
    }

    /// Stationary (unconditional) distribution over income states.
    pub fn stationary(&self) -> &DVector<f64> {
        &self.stationary
    }

    /// Whether every row of the transition matrix is identical.
    pub fn is_iid(&self) -> bool {
        let first = self.transition.row(0);
        self.transition
            .row_iter()
            .all(|row| row.iter().zip(first.iter()).all(|(a, b)| a == b))
    }
}

fn validate_row(row: usize, probabilities: impl Iterator<Item = f64>) -> Result<()> {
    let mut sum = 0.0;
    for probability in probabilities {
        if !probability.is_finite() || probability < 0.0 {
            return Err(ModelError::InvalidProbabilities {
                row,
                slack: probability,
            });
        }
        sum += probability;
    }
    let slack = (sum - 1.0).abs();
    if slack > PROBABILITY_SLACK {
        return Err(ModelError::InvalidProbabilities { row, slack });
    }
    Ok(())
}

/// Solves `π'(P - I) = 0` with the last equation replaced by `Σπ = 1`.
fn stationary_distribution(transition: &DMatrix<f64>) -> Result<DVector<f64>> {
    let states = transition.nrows();
    let mut system = transition.transpose() - DMatrix::<f64>::identity(states, states);
    system.row_mut(states - 1).fill(1.0);
    let mut rhs = DVector::zeros(states);
    rhs[states - 1] = 1.0;

    let solution = system
        .lu()
        .solve(&rhs)
        .ok_or_else(|| ModelError::singular("stationary distribution"))?;
    if solution.iter().any(|p| !p.is_finite()) {
        return Err(ModelError::numerical("stationary distribution"));
    }
    // Round-off can leave tiny negatives on near-absorbing chains.
    let clipped = solution.map(|p| p.max(0.0));
    let total = clipped.sum();
    Ok(clipped / total)
}
