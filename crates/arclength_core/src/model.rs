use nalgebra::DVector;

use crate::error::{ContinuationError, Result};

/// Core interface implemented by any discretized model that can be continued.
///
/// The continuation parameter is addressed by name and lives inside the
/// model; `rhs` and `jacobian` are always evaluated at its current value.
pub trait ContinuationModel {
    /// Factorized or otherwise solvable Jacobian produced by [`Self::jacobian`].
    type Jacobian;

    /// Number of state variables (excluding the continuation parameter).
    fn dimension(&self) -> usize;

    /// Evaluate F(x) at the current parameter values.
    fn rhs(&mut self, x: &DVector<f64>) -> Result<DVector<f64>>;

    /// Evaluate the Jacobian dF/dx at the current parameter values.
    fn jacobian(&mut self, x: &DVector<f64>) -> Result<Self::Jacobian>;

    /// Solve J y = rhs. Must return [`ContinuationError::SingularJacobian`]
    /// instead of a non-finite solution.
    fn solve(&mut self, jac: &Self::Jacobian, rhs: &DVector<f64>) -> Result<DVector<f64>>;

    /// Solve the bordered system
    ///
    /// ```text
    /// [ J   v ] [ y  ]   [ rhs  ]
    /// [ w^T c ] [ mu ] = [ rhs2 ]
    /// ```
    ///
    /// Only called when [`Self::supports_bordered_solve`] returns true.
    fn solve_bordered(
        &mut self,
        _jac: &Self::Jacobian,
        _rhs: &DVector<f64>,
        _rhs2: f64,
        _v: &DVector<f64>,
        _w: &DVector<f64>,
        _c: f64,
    ) -> Result<(DVector<f64>, f64)> {
        Err(ContinuationError::BorderedSolveUnsupported)
    }

    fn supports_bordered_solve(&self) -> bool {
        false
    }

    fn set_parameter(&mut self, name: &str, value: f64) -> Result<()>;

    fn get_parameter(&self, name: &str) -> Result<f64>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::continuation::{continuation, initial_tangent, ContinuationSettings};
    use anyhow::anyhow;

    /// Scalar model x - mu whose assembly breaks down for mu >= 1.5.
    struct BrittleModel {
        mu: f64,
    }

    impl ContinuationModel for BrittleModel {
        type Jacobian = f64;

        fn dimension(&self) -> usize {
            1
        }

        fn rhs(&mut self, x: &DVector<f64>) -> Result<DVector<f64>> {
            if self.mu >= 1.5 {
                return Err(anyhow!("assembly failed at mu = {}", self.mu).into());
            }
            Ok(DVector::from_vec(vec![x[0] - self.mu]))
        }

        fn jacobian(&mut self, _x: &DVector<f64>) -> Result<f64> {
            Ok(1.0)
        }

        fn solve(&mut self, jac: &f64, rhs: &DVector<f64>) -> Result<DVector<f64>> {
            Ok(rhs / *jac)
        }

        fn set_parameter(&mut self, name: &str, value: f64) -> Result<()> {
            match name {
                "mu" => {
                    self.mu = value;
                    Ok(())
                }
                _ => Err(ContinuationError::UnknownParameter(name.to_string())),
            }
        }

        fn get_parameter(&self, name: &str) -> Result<f64> {
            match name {
                "mu" => Ok(self.mu),
                _ => Err(ContinuationError::UnknownParameter(name.to_string())),
            }
        }
    }

    #[test]
    fn default_bordered_solve_is_unsupported() {
        let mut model = BrittleModel { mu: 0.0 };
        assert!(!model.supports_bordered_solve());
        let v = DVector::from_vec(vec![1.0]);
        let err = model
            .solve_bordered(&1.0, &v, 0.0, &v, &v, 1.0)
            .expect_err("no bordered solve");
        assert!(matches!(err, ContinuationError::BorderedSolveUnsupported));
    }

    #[test]
    fn failed_derivative_evaluation_restores_parameter_and_surfaces_model_error() {
        let mut model = BrittleModel { mu: 1.0 };
        let x = DVector::from_vec(vec![1.0]);
        // The forward difference evaluates at mu + 1 = 2, which fails.
        let err = initial_tangent(&mut model, "mu", &x, 1.0).expect_err("assembly fails");
        assert!(matches!(err, ContinuationError::Model(_)));
        assert!(format!("{err}").contains("assembly failed"));
        assert_eq!(model.mu, 1.0);

        let tangent = initial_tangent(&mut model, "mu", &x, 0.25).expect("small perturbation");
        assert!((tangent.weighted_norm() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn start_at_target_skips_derivative_evaluation() {
        // mu + 1 = 2 would fail assembly; only the Newton solve at mu = 1 may run.
        let mut model = BrittleModel { mu: 1.0 };
        let x0 = DVector::from_vec(vec![0.5]);
        let outcome = continuation(&mut model, &x0, "mu", 1.0, ContinuationSettings::default())
            .expect("snap at start");
        assert!(outcome.reached_target());
        assert_eq!(outcome.steps, 0);
        assert!(outcome.tangent.is_none());
        assert!((outcome.state[0] - 1.0).abs() < 1e-12);
        assert_eq!(model.mu, 1.0);
    }

    #[test]
    fn user_models_drive_continuation() {
        let mut model = BrittleModel { mu: 0.0 };
        let settings = ContinuationSettings {
            step_size: 0.1,
            corrector: crate::continuation::CorrectorSettings {
                parameter_perturbation: 0.01,
                ..Default::default()
            },
            ..ContinuationSettings::default()
        };
        let x0 = DVector::from_vec(vec![0.0]);
        let outcome =
            continuation(&mut model, &x0, "mu", 1.0, settings).expect("linear branch");
        assert!(outcome.reached_target());
        assert!((outcome.state[0] - 1.0).abs() < 1e-12);
        assert_eq!(model.mu, 1.0);
    }
}
