//! Error types shared by the Newton solver, the arclength corrector and the
//! continuation driver.

use nalgebra::DVector;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, ContinuationError>;

/// Iterative solver that produced a [`ContinuationError::NonConvergence`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SolverKind {
    Newton,
    ArclengthCorrector,
}

impl fmt::Display for SolverKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SolverKind::Newton => write!(f, "Newton solver"),
            SolverKind::ArclengthCorrector => write!(f, "Newton corrector"),
        }
    }
}

#[derive(Debug, Error)]
pub enum ContinuationError {
    /// The iteration cap was hit before the update norm dropped below tolerance.
    /// Carries the last iterate so callers can inspect or retry from it.
    #[error(
        "{solver} did not converge in {iterations} iterations \
         (last step norm {step_norm:e}, residual norm {residual_norm:e})"
    )]
    NonConvergence {
        solver: SolverKind,
        iterations: usize,
        step_norm: f64,
        /// ||F(state)|| at the last iterate (and, for the corrector, its parameter value).
        residual_norm: f64,
        state: DVector<f64>,
        /// Parameter value of the last iterate; `None` for the fixed-parameter solver.
        parameter: Option<f64>,
    },

    #[error("singular Jacobian: {0}")]
    SingularJacobian(String),

    #[error("dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("unknown parameter `{0}`")]
    UnknownParameter(String),

    #[error("model does not support bordered solves")]
    BorderedSolveUnsupported,

    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Failure raised by the model itself (assembly, backend errors, ...).
    #[error(transparent)]
    Model(#[from] anyhow::Error),
}

impl ContinuationError {
    pub fn is_non_convergence(&self) -> bool {
        matches!(self, ContinuationError::NonConvergence { .. })
    }

    pub fn is_singular(&self) -> bool {
        matches!(self, ContinuationError::SingularJacobian(_))
    }
}
