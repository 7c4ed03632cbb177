use log::{debug, warn};
use nalgebra::DVector;
use serde::{Deserialize, Serialize};

use crate::error::{ContinuationError, Result, SolverKind};
use crate::model::ContinuationModel;

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct NewtonSettings {
    pub max_steps: usize,
    pub tolerance: f64,
}

impl Default for NewtonSettings {
    fn default() -> Self {
        Self {
            max_steps: 1000,
            tolerance: 1e-7,
        }
    }
}

impl NewtonSettings {
    pub fn validate(&self) -> Result<()> {
        if self.max_steps == 0 {
            return Err(ContinuationError::InvalidInput(
                "max_steps must be greater than zero.".into(),
            ));
        }
        if !(self.tolerance > 0.0) {
            return Err(ContinuationError::InvalidInput(
                "tolerance must be positive.".into(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct NewtonSolution {
    pub state: DVector<f64>,
    pub iterations: usize,
    /// Norm of the last Newton update.
    pub step_norm: f64,
}

/// Plain Newton-Raphson for F(x) = 0 at the model's current parameter values.
///
/// Convergence is declared when the Euclidean norm of the update drops below
/// `settings.tolerance`. Exhausting `settings.max_steps` is reported as
/// [`ContinuationError::NonConvergence`] carrying the last iterate.
pub fn newton<M: ContinuationModel>(
    model: &mut M,
    x0: &DVector<f64>,
    settings: NewtonSettings,
) -> Result<NewtonSolution> {
    settings.validate()?;
    let dim = model.dimension();
    if x0.len() != dim {
        return Err(ContinuationError::DimensionMismatch {
            expected: dim,
            actual: x0.len(),
        });
    }

    let mut x = x0.clone();
    let mut step_norm = f64::INFINITY;

    for k in 0..settings.max_steps {
        let fval = model.rhs(&x)?;
        let jac = model.jacobian(&x)?;
        let dx = model.solve(&jac, &(-fval))?;

        x += &dx;

        step_norm = dx.norm();
        if step_norm < settings.tolerance {
            debug!("Newton converged in {} steps with norm {:e}", k + 1, step_norm);
            return Ok(NewtonSolution {
                state: x,
                iterations: k + 1,
                step_norm,
            });
        }
    }

    let residual_norm = model.rhs(&x)?.norm();
    warn!(
        "Newton failed to converge in {} steps (last norm {:e}, residual {:e})",
        settings.max_steps, step_norm, residual_norm
    );
    Err(ContinuationError::NonConvergence {
        solver: SolverKind::Newton,
        iterations: settings.max_steps,
        step_norm,
        residual_norm,
        state: x,
        parameter: None,
    })
}
