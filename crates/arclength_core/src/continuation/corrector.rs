//! Pseudo-arclength Newton corrector.
//!
//! Projects a predicted point back onto the solution branch while keeping it
//! at (weighted) arclength `ds` from the previous accepted point:
//!
//! ```text
//! F(x, l) = 0
//! zeta (x - x0).(x - x0) + (1 - zeta) (l - l0)^2 = ds^2,   zeta = 1/n
//! ```

use log::{debug, warn};
use nalgebra::DVector;

use super::types::CorrectorSettings;
use super::util::{arclength_weight, checked_rhs, parameter_derivative};
use crate::error::{ContinuationError, Result, SolverKind};
use crate::model::ContinuationModel;

/// A point accepted by the corrector.
#[derive(Debug, Clone)]
pub struct CorrectedPoint {
    pub state: DVector<f64>,
    pub parameter: f64,
    pub iterations: usize,
}

/// Corrects the predicted point `(x, l)` given the previous accepted point
/// `(x0, l0)`.
///
/// Uses the model's bordered solve when it advertises one, and otherwise two
/// solves with J followed by elimination of the parameter update. On return
/// the model's parameter holds the final corrector iterate.
#[allow(clippy::too_many_arguments)]
pub fn correct<M: ContinuationModel>(
    model: &mut M,
    parameter: &str,
    ds: f64,
    x: &DVector<f64>,
    x0: &DVector<f64>,
    l: f64,
    l0: f64,
    settings: &CorrectorSettings,
) -> Result<CorrectedPoint> {
    settings.validate()?;
    let dim = model.dimension();
    for len in [x.len(), x0.len()] {
        if len != dim {
            return Err(ContinuationError::DimensionMismatch {
                expected: dim,
                actual: len,
            });
        }
    }

    let zeta = arclength_weight(dim);
    let bordered = model.supports_bordered_solve();

    let mut x = x.clone();
    let mut l = l;
    let mut dxnorm = f64::INFINITY;

    for k in 0..settings.max_steps {
        let (fval, dflval) =
            parameter_derivative(model, parameter, &x, l, settings.parameter_perturbation)?;
        let jac = model.jacobian(&x)?;

        let diff = &x - x0;
        let rnp1 = zeta * diff.dot(&diff) + (1.0 - zeta) * (l - l0).powi(2) - ds * ds;

        let (dx, dl) = if bordered {
            let w = &diff * (2.0 * zeta);
            let c = 2.0 * (1.0 - zeta) * (l - l0);
            model.solve_bordered(&jac, &(-&fval), -rnp1, &dflval, &w, c)?
        } else {
            let z1 = model.solve(&jac, &(-&fval))?;
            let z2 = model.solve(&jac, &dflval)?;

            let denom = 2.0 * (1.0 - zeta) * (l - l0) - 2.0 * zeta * diff.dot(&z2);
            let dl = (-rnp1 - 2.0 * zeta * diff.dot(&z1)) / denom;
            if !dl.is_finite() {
                return Err(ContinuationError::SingularJacobian(
                    "arclength elimination has a vanishing pivot".into(),
                ));
            }
            (z1 - &z2 * dl, dl)
        };

        x += &dx;
        l += dl;

        dxnorm = dx.norm();
        if dxnorm < settings.tolerance {
            model.set_parameter(parameter, l)?;
            debug!(
                "Newton corrector converged in {} steps with norm {:e}",
                k + 1,
                dxnorm
            );
            return Ok(CorrectedPoint {
                state: x,
                parameter: l,
                iterations: k + 1,
            });
        }
    }

    model.set_parameter(parameter, l)?;
    let residual_norm = checked_rhs(model, &x)?.norm();
    warn!(
        "No convergence achieved by Newton corrector (last norm {:e}, residual {:e})",
        dxnorm, residual_norm
    );
    Err(ContinuationError::NonConvergence {
        solver: SolverKind::ArclengthCorrector,
        iterations: settings.max_steps,
        step_norm: dxnorm,
        residual_norm,
        state: x,
        parameter: Some(l),
    })
}
