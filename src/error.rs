use thiserror::Error;

/// Unified error type for `defaultvfi` operations.
#[derive(Debug, Error)]
pub enum ModelError {
    /// Raised when the borrowing grid bounds are not strictly ordered or not finite.
    #[error("borrowing grid bounds must satisfy lower < upper, found [{lower}, {upper}]")]
    InvalidGridBounds { lower: f64, upper: f64 },

    /// Raised when fewer than two grid points are requested.
    #[error("borrowing grid needs at least 2 points, found {points}")]
    GridTooSmall { points: usize },

    /// Raised when explicit grid points are not strictly increasing.
    #[error("borrowing grid must be strictly increasing; point {index} breaks the ordering")]
    NonIncreasingGrid { index: usize },

    /// Raised when provided arrays or matrices have incompatible dimensions.
    #[error("dimension mismatch in {context}: expected {expected} but found {found}")]
    DimensionMismatch {
        /// Human-readable context describing the operation.
        context: &'static str,
        /// The required dimension, often the model-implied value.
        expected: usize,
        /// The dimension that was actually supplied.
        found: usize,
    },

    /// Raised when a probability row has negative entries or does not sum to one.
    #[error("income probabilities in row {row} must be non-negative and sum to one (slack {slack})")]
    InvalidProbabilities { row: usize, slack: f64 },

    /// Raised when a scalar parameter lies outside its admissible range.
    #[error("parameter `{name}` = {value} is invalid: {reason}")]
    InvalidParameter {
        name: &'static str,
        value: f64,
        reason: &'static str,
    },

    /// Raised when linear algebra operations encounter a singular system.
    #[error("matrix in {context} is singular")]
    SingularMatrix { context: &'static str },

    /// Raised when the inner Bellman iteration fails to meet the value tolerance.
    #[error("value iteration did not converge after {iterations} sweeps; last max gap {max_gap}")]
    ValueIterationDidNotConverge {
        /// Number of sweeps performed before termination.
        iterations: usize,
        /// Sup-norm change of the value function in the last sweep.
        max_gap: f64,
    },

    /// Raised when the outer price iteration fails to stabilise.
    #[error(
        "price iteration did not converge after {iterations} iterations; last max gap {max_gap} ({changed} entries changed)"
    )]
    PriceIterationDidNotConverge {
        /// Number of outer iterations performed.
        iterations: usize,
        /// Sup-norm change of the price schedule in the last iteration.
        max_gap: f64,
        /// Number of price entries that changed in the last iteration.
        changed: usize,
    },

    /// Raised when numerical routines produce NaN or infinite values.
    #[error("encountered a non-finite value during {context}")]
    NumericalError { context: &'static str },
}

impl ModelError {
    /// Helper to format a [`DimensionMismatch`](ModelError::DimensionMismatch) error.
    pub fn dimension_mismatch(context: &'static str, expected: usize, found: usize) -> Self {
        Self::DimensionMismatch {
            context,
            expected,
            found,
        }
    }

    /// Helper to raise when a matrix factorization fails due to singularity.
    pub fn singular(context: &'static str) -> Self {
        Self::SingularMatrix { context }
    }

    /// Helper for rejecting an out-of-range scalar parameter.
    pub fn invalid_parameter(name: &'static str, value: f64, reason: &'static str) -> Self {
        Self::InvalidParameter {
            name,
            value,
            reason,
        }
    }

    /// Helper for flagging a non-finite intermediate result.
    pub fn numerical(context: &'static str) -> Self {
        Self::NumericalError { context }
    }

    /// Returns `true` for errors raised by exhausting an iteration cap.
    pub fn is_non_convergence(&self) -> bool {
        matches!(
            self,
            Self::ValueIterationDidNotConverge { .. } | Self::PriceIterationDidNotConverge { .. }
        )
    }
}

/// Type alias for results returned by this crate.
pub type Result<T> = std::result::Result<T, ModelError>;
