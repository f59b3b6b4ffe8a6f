//! Nested fixed-point solver for discrete sovereign (or household) default models.
//!
//! A borrower with CRRA preferences holds debt on a discrete grid, receives
//! income from a finite Markov process and each period either repays (and
//! picks next period's debt) or defaults into permanent autarky. Lenders are
//! risk neutral, so the bond price schedule is the discounted expected
//! repayment probability. This crate solves for
//!
//! - the value function and repay/default decision (`bellman` module),
//! - the bond price schedule consistent with that decision (`problem` and
//!   `pricing` modules),
//!
//! under either a hard repay/default choice or a logit choice smoothed by
//! extreme-value taste shocks (`choice` module). Converged arrays are exposed
//! through [`Solution`] for plotting and analysis, and `simulation` draws
//! histories from the solved economy.
//!
//! # Quick start
//!
//! ```no_run
//! use defaultvfi::{BorrowingGrid, DefaultProblem, IncomeProcess, Parameters, SolverOptions};
//!
//! let income = IncomeProcess::iid(vec![0.2, 1.2], vec![0.2, 0.8]).expect("valid income");
//! let grid = BorrowingGrid::uniform(-0.15, 2.0, 150).expect("valid grid");
//! let parameters = Parameters::builder(income, grid)
//!     .risk_aversion(2.0)
//!     .discount(0.8)
//!     .gross_return(1.1)
//!     .build()
//!     .expect("valid parameters");
//!
//! let problem = DefaultProblem::new(parameters, SolverOptions::default()).expect("valid options");
//! let solution = problem.solve().expect("converged");
//! println!("price schedule: {:?}", solution.prices());
//!
//! // Same model with Gumbel taste shocks of scale 1/α.
//! let smoothed = SolverOptions::default().with_smoothing(50.0);
//! let problem = DefaultProblem::new(problem.parameters().clone(), smoothed).expect("valid options");
//! let solution = problem.solve().expect("converged");
//! println!("repayment probabilities: {:?}", solution.repay_probability());
//! ```

pub mod bellman;
pub mod choice;
pub mod error;
pub mod income;
pub mod model;
pub mod options;
pub mod pricing;
pub mod problem;
pub mod simulation;
pub mod solution;
pub mod solving;
mod state;
pub mod utility;

pub use choice::{ChoiceOutcome, ChoiceRule};
pub use error::{ModelError, Result};
pub use income::IncomeProcess;
pub use model::{BorrowingGrid, Parameters, ParametersBuilder};
pub use options::SolverOptions;
pub use problem::DefaultProblem;
pub use simulation::{simulate, SimulatedPath, SimulationOptions};
pub use solution::Solution;
pub use solving::{PriceIterationOptions, SolveSummary, ValueIterationOptions, ValueIterationSummary};
