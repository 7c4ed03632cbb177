//! The `arclength_core` crate traces solution branches of parameterized
//! nonlinear systems F(x, lambda) = 0 with pseudo-arclength continuation.
//!
//! Key components:
//! - **Model**: `ContinuationModel`, the residual/Jacobian/solve/parameter interface a
//!   discretization implements. `DenseModel` is a closure-based nalgebra reference backend.
//! - **Newton**: plain Newton-Raphson at a fixed parameter value.
//! - **Continuation**: the arclength corrector (bordered or two-solve) and the
//!   predictor-corrector driver with target detection.
pub mod continuation;
pub mod dense;
pub mod error;
pub mod model;
pub mod newton;

pub use continuation::{
    continuation, continuation_with_observer, correct, initial_tangent, ContinuationOutcome,
    ContinuationSettings, ContinuationStatus, CorrectorSettings, Tangent,
};
pub use dense::{DenseModel, ParameterSet};
pub use error::{ContinuationError, Result, SolverKind};
pub use model::ContinuationModel;
pub use newton::{newton, NewtonSettings, NewtonSolution};
