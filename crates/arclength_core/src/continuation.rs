pub mod corrector;
pub mod types;
pub mod util;

pub use corrector::{correct, CorrectedPoint};
pub use types::{
    ContinuationOutcome, ContinuationSettings, ContinuationStatus, CorrectorSettings, Tangent,
};

use log::{info, warn};
use nalgebra::DVector;

use crate::error::{ContinuationError, Result};
use crate::model::ContinuationModel;
use crate::newton::newton;
use util::{crosses_target, parameter_derivative};

/// Initial tangent at `x` for the model's current value of `parameter`.
///
/// Solves J dx = -dF/dlambda with dlambda = 1, then scales the pair to unit
/// weighted norm. The lambda component is always positive, so the sign of the
/// step size alone decides the initial direction.
pub fn initial_tangent<M: ContinuationModel>(
    model: &mut M,
    parameter: &str,
    x: &DVector<f64>,
    parameter_perturbation: f64,
) -> Result<Tangent> {
    let l = model.get_parameter(parameter)?;
    let (_, dflval) = parameter_derivative(model, parameter, x, l, parameter_perturbation)?;

    let jac = model.jacobian(x)?;
    let dx = -model.solve(&jac, &dflval)?;

    Ok(Tangent::normalized(dx, 1.0))
}

/// Continues the branch through `x0` (at the model's current value of
/// `parameter`) until the parameter reaches `target`.
pub fn continuation<M: ContinuationModel>(
    model: &mut M,
    x0: &DVector<f64>,
    parameter: &str,
    target: f64,
    settings: ContinuationSettings,
) -> Result<ContinuationOutcome> {
    continuation_with_observer(model, x0, parameter, target, settings, |_, _, _| {})
}

/// Like [`continuation`], calling `observer(model, x, lambda)` for every
/// accepted point, including the final point at the target.
pub fn continuation_with_observer<M, O>(
    model: &mut M,
    x0: &DVector<f64>,
    parameter: &str,
    target: f64,
    settings: ContinuationSettings,
    mut observer: O,
) -> Result<ContinuationOutcome>
where
    M: ContinuationModel,
    O: FnMut(&M, &DVector<f64>, f64),
{
    settings.validate()?;
    let dim = model.dimension();
    if dim == 0 {
        return Err(ContinuationError::InvalidInput(
            "model has zero dimension.".into(),
        ));
    }
    if x0.len() != dim {
        return Err(ContinuationError::DimensionMismatch {
            expected: dim,
            actual: x0.len(),
        });
    }
    if !target.is_finite() {
        return Err(ContinuationError::InvalidInput(
            "target must be finite.".into(),
        ));
    }

    let ds = settings.step_size;
    let mut l = model.get_parameter(parameter)?;

    if l == target {
        let snapped = newton(model, x0, settings.newton)?;
        observer(&*model, &snapped.state, target);
        return Ok(ContinuationOutcome {
            state: snapped.state,
            parameter: target,
            status: ContinuationStatus::TargetReached,
            steps: 0,
            tangent: None,
        });
    }

    // The first step always moves lambda along sign(ds). Heading away from the
    // target is legitimate when a fold turns the branch back towards it.
    if (target - l) * ds < 0.0 {
        warn!(
            "step size {} initially moves {} away from target {} (currently {})",
            ds, parameter, target, l
        );
    }

    let mut tangent = initial_tangent(
        model,
        parameter,
        x0,
        settings.corrector.parameter_perturbation,
    )?;

    let mut x = x0.clone();

    for step in 0..settings.max_steps {
        // Predictor
        let x_pred = &x + &tangent.dx * ds;
        let l_pred = l + ds * tangent.dl;

        let corrected = correct(
            model,
            parameter,
            ds,
            &x_pred,
            &x,
            l_pred,
            l,
            &settings.corrector,
        )?;
        info!("{}: {:.6}", parameter, corrected.parameter);

        if crosses_target(l, corrected.parameter, target) {
            // The corrector usually overshoots; converge onto the target itself.
            model.set_parameter(parameter, target)?;
            let snapped = newton(model, &corrected.state, settings.newton)?;
            observer(&*model, &snapped.state, target);
            return Ok(ContinuationOutcome {
                state: snapped.state,
                parameter: target,
                status: ContinuationStatus::TargetReached,
                steps: step + 1,
                tangent: Some(tangent),
            });
        }

        let dl = corrected.parameter - l;
        let dx = &corrected.state - &x;
        x = corrected.state;
        l = corrected.parameter;
        observer(&*model, &x, l);

        if dl.abs() < settings.degenerate_step_tolerance {
            warn!(
                "{} is stationary at {} (|dl| = {:e}); stopping before target {}",
                parameter,
                l,
                dl.abs(),
                target
            );
            return Ok(ContinuationOutcome {
                state: x,
                parameter: l,
                status: ContinuationStatus::Degenerate,
                steps: step + 1,
                tangent: Some(tangent),
            });
        }

        tangent = Tangent::secant(dx, dl, ds);
    }

    warn!(
        "Continuation of {} stopped at {} after {} steps without reaching {}",
        parameter, l, settings.max_steps, target
    );
    Ok(ContinuationOutcome {
        state: x,
        parameter: l,
        status: ContinuationStatus::MaxStepsExhausted,
        steps: settings.max_steps,
        tangent: Some(tangent),
    })
}
