//! Solver error types.
//!
//! Infeasibility, timeouts and backend failures are outcomes, not errors;
//! see [`crate::SolveStatus`].

use clusterfit_core::ConfigError;
use thiserror::Error;

/// Errors that can occur before or around a solve.
#[derive(Debug, Error)]
pub enum SolveError {
    #[error("invalid solve limits: {0}")]
    Limits(#[from] ConfigError),

    #[error("solved model does not match scenario: {0}")]
    ScenarioMismatch(String),

    #[error("solver worker panicked")]
    WorkerPanicked,
}

pub type SolveResult<T> = Result<T, SolveError>;
