//! Model primitives: the borrowing grid and validated structural parameters.

use nalgebra::DVector;
use serde::{Deserialize, Serialize};

use crate::error::{ModelError, Result};
use crate::income::IncomeProcess;

/// Ordered, strictly increasing borrowing levels `b_0 < b_1 < ... < b_{I-1}`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BorrowingGrid {
    points: DVector<f64>,
}

impl BorrowingGrid {
    /// Evenly spaced grid of `size` points spanning `[lower, upper]`.
    pub fn uniform(lower: f64, upper: f64, size: usize) -> Result<Self> {
        if !lower.is_finite() || !upper.is_finite() || lower >= upper {
            return Err(ModelError::InvalidGridBounds { lower, upper });
        }
        if size < 2 {
            return Err(ModelError::GridTooSmall { points: size });
        }
        let step = (upper - lower) / (size - 1) as f64;
        let points = DVector::from_fn(size, |i, _| {
            if i == size - 1 {
                upper
            } else {
                lower + step * i as f64
            }
        });
        Ok(Self { points })
    }

    /// Grid from explicit points, which must be finite and strictly increasing.
    pub fn from_points(points: Vec<f64>) -> Result<Self> {
        let grid = Self {
            points: DVector::from_vec(points),
        };
        grid.validate()?;
        Ok(grid)
    }

    /// Re-checks the grid invariants.
    pub fn validate(&self) -> Result<()> {
        if self.points.len() < 2 {
            return Err(ModelError::GridTooSmall {
                points: self.points.len(),
            });
        }
        for (index, point) in self.points.iter().enumerate() {
            if !point.is_finite() {
                return Err(ModelError::NonIncreasingGrid { index });
            }
            if index > 0 && *point <= self.points[index - 1] {
                return Err(ModelError::NonIncreasingGrid { index });
            }
        }
        Ok(())
    }

    /// Number of grid points `I`.
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Always `false` for a validated grid; provided for API symmetry with `len`.
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Borrowing levels as a vector.
    pub fn points(&self) -> &DVector<f64> {
        &self.points
    }

    /// Borrowing level at `index`.
    pub fn level(&self, index: usize) -> f64 {
        self.points[index]
    }

    pub fn lower(&self) -> f64 {
        self.points[0]
    }

    pub fn upper(&self) -> f64 {
        self.points[self.points.len() - 1]
    }
}

/// Structural parameters of the default model.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Parameters {
    /// CRRA coefficient `σ > 0`.
    pub risk_aversion: f64,
    /// Discount factor `β ∈ (0, 1)`.
    pub discount: f64,
    /// Gross risk-free return `R > 1`.
    pub gross_return: f64,
    /// Proportional output loss while in autarky, in `[0, 1)`.
    pub default_cost: f64,
    /// Utility assigned to non-positive consumption.
    pub lowval: f64,
    pub income: IncomeProcess,
    pub grid: BorrowingGrid,
}

impl Parameters {
    /// Starts a builder from the income process and borrowing grid.
    pub fn builder(income: IncomeProcess, grid: BorrowingGrid) -> ParametersBuilder {
        ParametersBuilder::new(income, grid)
    }

    /// Validates every scalar, the income process and the grid.
    pub fn validate(&self) -> Result<()> {
        if !self.risk_aversion.is_finite() || self.risk_aversion <= 0.0 {
            return Err(ModelError::invalid_parameter(
                "risk_aversion",
                self.risk_aversion,
                "must be positive",
            ));
        }
        if !(self.discount > 0.0 && self.discount < 1.0) {
            return Err(ModelError::invalid_parameter(
                "discount",
                self.discount,
                "must lie in (0, 1)",
            ));
        }
        if !self.gross_return.is_finite() || self.gross_return <= 1.0 {
            return Err(ModelError::invalid_parameter(
                "gross_return",
                self.gross_return,
                "must exceed 1",
            ));
        }
        if !(0.0..1.0).contains(&self.default_cost) {
            return Err(ModelError::invalid_parameter(
                "default_cost",
                self.default_cost,
                "must lie in [0, 1)",
            ));
        }
        if !self.lowval.is_finite() {
            return Err(ModelError::invalid_parameter(
                "lowval",
                self.lowval,
                "must be finite",
            ));
        }
        self.income.validate()?;
        self.grid.validate()
    }

    /// Number of borrowing grid points `I`.
    pub fn grid_size(&self) -> usize {
        self.grid.len()
    }

    /// Number of income states `S`.
    pub fn state_count(&self) -> usize {
        self.income.state_count()
    }

    /// Income received in state `s` while excluded from credit markets.
    pub fn autarky_income(&self, state: usize) -> f64 {
        self.income.levels()[state] * (1.0 - self.default_cost)
    }

    /// Upper bound `1/R` on any admissible bond price.
    pub fn risk_free_price(&self) -> f64 {
        1.0 / self.gross_return
    }
}

/// Builder that validates scalar parameters before constructing [`Parameters`].
#[derive(Debug)]
pub struct ParametersBuilder {
    income: IncomeProcess,
    grid: BorrowingGrid,
    risk_aversion: f64,
    discount: f64,
    gross_return: f64,
    default_cost: f64,
    lowval: f64,
}

impl ParametersBuilder {
    /// Start building from the income process and grid; scalars take textbook defaults.
    pub fn new(income: IncomeProcess, grid: BorrowingGrid) -> Self {
        Self {
            income,
            grid,
            risk_aversion: 2.0,
            discount: 0.8,
            gross_return: 1.1,
            default_cost: 0.0,
            lowval: -1e10,
        }
    }

    pub fn risk_aversion(mut self, sigma: f64) -> Self {
        self.risk_aversion = sigma;
        self
    }

    pub fn discount(mut self, beta: f64) -> Self {
        self.discount = beta;
        self
    }

    pub fn gross_return(mut self, gross_return: f64) -> Self {
        self.gross_return = gross_return;
        self
    }

    /// Sets the proportional output loss suffered in autarky.
    pub fn default_cost(mut self, cost: f64) -> Self {
        self.default_cost = cost;
        self
    }

    /// Sets the utility sentinel for infeasible consumption.
    pub fn lowval(mut self, lowval: f64) -> Self {
        self.lowval = lowval;
        self
    }

    /// Finalizes construction after validating every field.
    pub fn build(self) -> Result<Parameters> {
        let parameters = Parameters {
            risk_aversion: self.risk_aversion,
            discount: self.discount,
            gross_return: self.gross_return,
            default_cost: self.default_cost,
            lowval: self.lowval,
            income: self.income,
            grid: self.grid,
        };
        parameters.validate()?;
        Ok(parameters)
    }
}
