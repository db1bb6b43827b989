use thiserror::Error;

/// Failures of the iterative solvers.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SolverError {
    #[error("failed to converge after {iterations} iterations")]
    MaxIterationsExceeded { iterations: usize },

    #[error("no bracket: f({a}) and f({b}) have the same sign")]
    NoBracket { a: f64, b: f64 },

    #[error("objective is not finite at the starting point")]
    InfeasibleStart,

    #[error("invalid solver input: {0}")]
    InvalidInput(String),
}
