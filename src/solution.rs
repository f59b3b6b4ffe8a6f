//! Frozen output of a converged solve, exposed read-only to analysis code.

use nalgebra::{DMatrix, DVector};
use serde::{Deserialize, Serialize};

use crate::choice::ChoiceRule;
use crate::model::BorrowingGrid;
use crate::solving::SolveSummary;
use crate::state::SolverState;

/// Converged value, policy, repayment and price arrays.
///
/// Matrices are `I × S`: rows index current borrowing, columns index income states.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Solution {
    grid: BorrowingGrid,
    choice: ChoiceRule,
    gross_return: f64,
    value: DMatrix<f64>,
    value_repay: DMatrix<f64>,
    value_default: DVector<f64>,
    repay_choice: DMatrix<usize>,
    repay_probability: DMatrix<f64>,
    policy: DMatrix<usize>,
    prices: DVector<f64>,
    summary: SolveSummary,
}

impl Solution {
    pub(crate) fn from_state(
        state: SolverState,
        grid: BorrowingGrid,
        choice: ChoiceRule,
        gross_return: f64,
        summary: SolveSummary,
    ) -> Self {
        Self {
            grid,
            choice,
            gross_return,
            value: state.value,
            value_repay: state.value_repay,
            value_default: state.value_default,
            repay_choice: state.best_choice,
            repay_probability: state.repay_probability,
            policy: state.policy,
            prices: state.prices,
            summary,
        }
    }

    pub fn grid(&self) -> &BorrowingGrid {
        &self.grid
    }

    /// Choice rule the solution was computed under.
    pub fn choice(&self) -> ChoiceRule {
        self.choice
    }

    /// Value of having the repay/default choice, `V[i, s]`.
    pub fn value(&self) -> &DMatrix<f64> {
        &self.value
    }

    /// Best value conditional on repayment, `Vrepay[i, s]`.
    pub fn value_repay(&self) -> &DMatrix<f64> {
        &self.value_repay
    }

    /// Autarky value per income state.
    pub fn value_default(&self) -> &DVector<f64> {
        &self.value_default
    }

    /// Autarky value of state `s` broadcast across the grid, for plotting against `V`.
    pub fn autarky_curve(&self, state: usize) -> DVector<f64> {
        DVector::from_element(self.grid.len(), self.value_default[state])
    }

    /// Next-borrowing index that maximizes the repay branch, whether or not repayment is chosen.
    pub fn repay_choice(&self) -> &DMatrix<usize> {
        &self.repay_choice
    }

    /// Repayment indicator (hard rule) or probability (smoothed rule).
    pub fn repay_probability(&self) -> &DMatrix<f64> {
        &self.repay_probability
    }

    pub fn default_probability(&self) -> DMatrix<f64> {
        self.repay_probability.map(|d| 1.0 - d)
    }

    /// Next-borrowing grid index chosen in each cell.
    pub fn policy(&self) -> &DMatrix<usize> {
        &self.policy
    }

    /// Next-borrowing level chosen in each cell.
    pub fn policy_levels(&self) -> DMatrix<f64> {
        self.policy.map(|j| self.grid.level(j))
    }

    /// Bond price schedule `q[j]`.
    pub fn prices(&self) -> &DVector<f64> {
        &self.prices
    }

    /// Debt proceeds `q[j] · b[j]`; not monotone in general.
    pub fn laffer_curve(&self) -> DVector<f64> {
        self.prices.component_mul(self.grid.points())
    }

    /// Implied spread `1/q[j] - R`, `None` where the price is zero.
    pub fn spreads(&self) -> Vec<Option<f64>> {
        self.prices
            .iter()
            .map(|q| (*q > 0.0).then(|| 1.0 / q - self.gross_return))
            .collect()
    }

    pub fn summary(&self) -> &SolveSummary {
        &self.summary
    }

    /// Number of grid points `I`.
    pub fn grid_size(&self) -> usize {
        self.grid.len()
    }

    /// Number of income states `S`.
    pub fn state_count(&self) -> usize {
        self.value_default.len()
    }
}
