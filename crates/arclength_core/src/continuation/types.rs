//! Core types for pseudo-arclength continuation.
//!
//! Settings, the tangent carried between steps, and the outcome of a run.

use nalgebra::DVector;
use serde::{Deserialize, Serialize};

use super::util::arclength_weight;
use crate::error::{ContinuationError, Result};
use crate::newton::NewtonSettings;

/// Settings for the arclength Newton corrector.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct CorrectorSettings {
    pub max_steps: usize,
    pub tolerance: f64,
    /// Forward-difference perturbation used to approximate dF/dlambda.
    pub parameter_perturbation: f64,
}

impl Default for CorrectorSettings {
    fn default() -> Self {
        Self {
            max_steps: 100,
            tolerance: 1e-4,
            parameter_perturbation: 1.0,
        }
    }
}

impl CorrectorSettings {
    pub fn validate(&self) -> Result<()> {
        if self.max_steps == 0 {
            return Err(invalid("corrector max_steps must be greater than zero."));
        }
        if !(self.tolerance > 0.0) {
            return Err(invalid("corrector tolerance must be positive."));
        }
        if !self.parameter_perturbation.is_finite() || self.parameter_perturbation == 0.0 {
            return Err(invalid("parameter_perturbation must be finite and non-zero."));
        }
        Ok(())
    }
}

/// Settings controlling one continuation run.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct ContinuationSettings {
    /// Arclength step `ds`. Its sign selects the initial direction in lambda.
    pub step_size: f64,
    pub max_steps: usize,
    /// Steps moving lambda by less than this end the run as degenerate.
    pub degenerate_step_tolerance: f64,
    pub corrector: CorrectorSettings,
    /// Settings for the final Newton solve at the target parameter value.
    pub newton: NewtonSettings,
}

impl Default for ContinuationSettings {
    fn default() -> Self {
        Self {
            step_size: 0.1,
            max_steps: 1000,
            degenerate_step_tolerance: 1e-10,
            corrector: CorrectorSettings::default(),
            newton: NewtonSettings {
                tolerance: 1e-4,
                ..NewtonSettings::default()
            },
        }
    }
}

impl ContinuationSettings {
    pub fn validate(&self) -> Result<()> {
        if !self.step_size.is_finite() || self.step_size == 0.0 {
            return Err(invalid("step_size must be finite and non-zero."));
        }
        if self.max_steps == 0 {
            return Err(invalid("max_steps must be greater than zero."));
        }
        if !(self.degenerate_step_tolerance >= 0.0) {
            return Err(invalid("degenerate_step_tolerance must be non-negative."));
        }
        self.corrector.validate()?;
        self.newton.validate()
    }
}

fn invalid(message: &str) -> ContinuationError {
    ContinuationError::InvalidInput(message.to_string())
}

/// Direction in (x, lambda) space used by the predictor.
#[derive(Debug, Clone, PartialEq)]
pub struct Tangent {
    pub dx: DVector<f64>,
    pub dl: f64,
}

impl Tangent {
    /// Scale `(dx, dl)` to unit length under [`Tangent::weighted_norm`].
    pub fn normalized(dx: DVector<f64>, dl: f64) -> Self {
        let tangent = Self { dx, dl };
        let nrm = tangent.weighted_norm();
        Self {
            dx: tangent.dx / nrm,
            dl: tangent.dl / nrm,
        }
    }

    /// Secant direction `(dx, dl) / ds` from the displacement of an accepted step.
    pub fn secant(dx: DVector<f64>, dl: f64, ds: f64) -> Self {
        Self {
            dx: dx / ds,
            dl: dl / ds,
        }
    }

    /// sqrt(zeta * dx.dx + dl^2) with zeta = 1/n.
    pub fn weighted_norm(&self) -> f64 {
        let zeta = arclength_weight(self.dx.len());
        (zeta * self.dx.dot(&self.dx) + self.dl * self.dl).sqrt()
    }
}

/// How a continuation run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ContinuationStatus {
    /// The target was bracketed and the final Newton solve converged at it.
    TargetReached,
    /// Lambda stopped moving (fold with respect to the parameter); target not reached.
    Degenerate,
    /// The step budget ran out before the target was bracketed.
    MaxStepsExhausted,
}

#[derive(Debug, Clone)]
pub struct ContinuationOutcome {
    pub state: DVector<f64>,
    pub parameter: f64,
    pub status: ContinuationStatus,
    /// Number of predictor-corrector steps taken.
    pub steps: usize,
    /// Tangent in effect at the last accepted point; pass it back to resume.
    /// `None` when the run started at the target and only ran the final Newton solve.
    pub tangent: Option<Tangent>,
}

impl ContinuationOutcome {
    pub fn reached_target(&self) -> bool {
        self.status == ContinuationStatus::TargetReached
    }
}
