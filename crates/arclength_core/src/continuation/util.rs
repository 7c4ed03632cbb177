//! Helpers shared by the corrector and the driver.

use nalgebra::DVector;

use crate::error::{ContinuationError, Result};
use crate::model::ContinuationModel;

/// Weight zeta = 1/n of the state part of the arclength constraint.
pub fn arclength_weight(dim: usize) -> f64 {
    1.0 / dim as f64
}

/// Evaluates F(x) and a forward-difference approximation of dF/dlambda at
/// `value`. The parameter is left at `value` afterwards, also when an
/// evaluation fails.
pub(crate) fn parameter_derivative<M: ContinuationModel>(
    model: &mut M,
    parameter: &str,
    x: &DVector<f64>,
    value: f64,
    delta: f64,
) -> Result<(DVector<f64>, DVector<f64>)> {
    model.set_parameter(parameter, value)?;
    let fval = checked_rhs(model, x)?;

    model.set_parameter(parameter, value + delta)?;
    let perturbed = checked_rhs(model, x);
    model.set_parameter(parameter, value)?;

    let dflval = (perturbed? - &fval) / delta;
    Ok((fval, dflval))
}

/// `model.rhs` with a check that the result has the state dimension.
pub(crate) fn checked_rhs<M: ContinuationModel>(
    model: &mut M,
    x: &DVector<f64>,
) -> Result<DVector<f64>> {
    let fval = model.rhs(x)?;
    if fval.len() != x.len() {
        return Err(ContinuationError::DimensionMismatch {
            expected: x.len(),
            actual: fval.len(),
        });
    }
    Ok(fval)
}

/// True when `previous` and `current` lie on opposite sides of `target`
/// (one of them may sit exactly on it).
pub fn crosses_target(previous: f64, current: f64, target: f64) -> bool {
    let before = previous - target;
    let after = current - target;
    (after >= 0.0 && before < 0.0) || (after <= 0.0 && before > 0.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dense::{DenseModel, ParameterSet};
    use nalgebra::DMatrix;

    #[test]
    fn crossing_detects_both_directions() {
        assert!(crosses_target(0.4, 0.6, 0.5));
        assert!(crosses_target(0.6, 0.4, 0.5));
        assert!(crosses_target(0.4, 0.5, 0.5));
        assert!(crosses_target(0.6, 0.5, 0.5));
    }

    #[test]
    fn crossing_ignores_approach_without_passing() {
        assert!(!crosses_target(0.4, 0.49, 0.5));
        assert!(!crosses_target(0.6, 0.51, 0.5));
        assert!(!crosses_target(0.49, 0.4, 0.5));
    }

    #[test]
    fn parameter_derivative_restores_parameter() {
        let mut model = DenseModel::new(
            2,
            ParameterSet::new().with("mu", 0.0),
            |x: &DVector<f64>, p: &ParameterSet| {
                let mu = p["mu"];
                DVector::from_vec(vec![x[0] - mu * mu, x[1] + 3.0 * mu])
            },
            |_: &DVector<f64>, _: &ParameterSet| DMatrix::identity(2, 2),
        );
        let x = DVector::from_vec(vec![1.0, 2.0]);
        let (fval, dflval) =
            parameter_derivative(&mut model, "mu", &x, 2.0, 1.0).expect("derivative");

        assert_eq!(model.get_parameter("mu").unwrap(), 2.0);
        assert!((fval[0] + 3.0).abs() < 1e-15);
        assert!((fval[1] - 8.0).abs() < 1e-15);
        // Forward difference with delta = 1: (-(3^2) + 2^2) / 1 = -5
        assert!((dflval[0] + 5.0).abs() < 1e-15);
        assert!((dflval[1] - 3.0).abs() < 1e-15);
    }

    #[test]
    fn weight_is_inverse_dimension() {
        assert_eq!(arclength_weight(1), 1.0);
        assert_eq!(arclength_weight(4), 0.25);
    }
}
