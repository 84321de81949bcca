//! Adaptive Runge-Kutta-Fehlberg 7(8) stepper.
//!
//! The stepper is the numerical collaborator behind [`crate::ivp::solve_ivp`].
//! It advances a fixed-size state with the 8th-order solution and accepts or
//! rejects each step against a mixed absolute/relative error bound.

use thiserror::Error;
use tracing::trace;

use crate::coefficients::{A, B, B_ERR, C, STAGES};

/// System of ordinary differential equations: dy/dt = f(t, y)
pub trait OdeSystem<const N: usize> {
    /// Evaluate the right-hand side at `(t, y)` into `dydt`.
    fn rhs(&self, t: f64, y: &[f64; N], dydt: &mut [f64; N]);
}

/// Outcome of a single trial step.
#[derive(Debug, Clone)]
pub struct StepResult<const N: usize> {
    /// State after the step (8th-order solution)
    pub y: [f64; N],
    /// Time after the step
    pub t: f64,
    /// Normalized error estimate, accepted when `<= 1.0`
    pub error: f64,
    /// Suggested magnitude of the next step
    pub h_next: f64,
    /// Whether the step was accepted
    pub accepted: bool,
}

/// Counters collected while integrating.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Stats {
    /// Right-hand-side evaluations
    pub fn_evals: u64,
    /// Accepted steps
    pub accepted_steps: u64,
    /// Rejected steps
    pub rejected_steps: u64,
}

/// I-controller: `h_new = safety * h * error^(-1/8)`, clamped per step.
#[derive(Debug, Clone)]
pub struct StepController {
    /// Safety factor
    pub safety: f64,
    /// Largest growth factor per step
    pub max_factor: f64,
    /// Smallest reduction factor per step
    pub min_factor: f64,
    exponent: f64,
}

impl Default for StepController {
    fn default() -> Self {
        Self {
            safety: 0.9,
            max_factor: 5.0,
            min_factor: 0.2,
            exponent: 1.0 / 8.0,
        }
    }
}

impl StepController {
    /// Step-size factor for a normalized error.
    pub fn compute_factor(&self, error: f64) -> f64 {
        if error == 0.0 {
            return self.max_factor;
        }
        if error.is_nan() {
            return self.min_factor;
        }
        (self.safety * error.powf(-self.exponent)).clamp(self.min_factor, self.max_factor)
    }
}

/// Error tolerances: a step passes when `|y8 - y7| <= atol + rtol * |y8|`
/// holds in every component.
#[derive(Debug, Clone, PartialEq)]
pub struct Tolerances<const N: usize> {
    /// Absolute tolerance per component
    pub atol: [f64; N],
    /// Relative tolerance per component
    pub rtol: [f64; N],
}

impl<const N: usize> Tolerances<N> {
    /// Same tolerances for every component.
    pub fn new(atol: f64, rtol: f64) -> Self {
        Self {
            atol: [atol; N],
            rtol: [rtol; N],
        }
    }

    fn validate(&self) -> Result<(), IntegrationError> {
        for (i, (&a, &r)) in self.atol.iter().zip(self.rtol.iter()).enumerate() {
            if !a.is_finite() || a <= 0.0 {
                return Err(IntegrationError::InvalidInput {
                    message: format!("atol[{}] must be positive and finite", i),
                });
            }
            if !r.is_finite() || r < 0.0 {
                return Err(IntegrationError::InvalidInput {
                    message: format!("rtol[{}] must be non-negative and finite", i),
                });
            }
        }
        Ok(())
    }
}

/// Runge-Kutta-Fehlberg 7(8) integrator over an `N`-component state.
///
/// ```
/// use mechsim::{OdeSystem, Rkf78, Tolerances};
///
/// struct Decay;
///
/// impl OdeSystem<1> for Decay {
///     fn rhs(&self, _t: f64, y: &[f64; 1], dydt: &mut [f64; 1]) {
///         dydt[0] = -y[0];
///     }
/// }
///
/// let mut solver = Rkf78::new(Tolerances::new(1e-12, 1e-12));
/// let (t, y) = solver.integrate(&Decay, 0.0, &[1.0], 1.0, 0.1).unwrap();
/// assert_eq!(t, 1.0);
/// assert!((y[0] - (-1.0f64).exp()).abs() < 1e-10);
/// ```
#[derive(Debug, Clone)]
pub struct Rkf78<const N: usize> {
    tol: Tolerances<N>,
    controller: StepController,
    /// Smallest step magnitude
    pub h_min: f64,
    /// Largest step magnitude
    pub h_max: f64,
    /// Step budget per `integrate`/`advance` call
    pub max_steps: u64,
    k: [[f64; N]; STAGES],
    /// Counters since construction
    pub stats: Stats,
}

impl<const N: usize> Rkf78<N> {
    /// New integrator with the given tolerances.
    pub fn new(tol: Tolerances<N>) -> Self {
        Self {
            tol,
            controller: StepController::default(),
            h_min: 1e-14,
            h_max: f64::INFINITY,
            max_steps: 10_000_000,
            k: [[0.0; N]; STAGES],
            stats: Stats::default(),
        }
    }

    /// Attempt one step of signed size `h` from `(t, y)`.
    pub fn step<S: OdeSystem<N>>(
        &mut self,
        sys: &S,
        t: f64,
        y: &[f64; N],
        h: f64,
    ) -> StepResult<N> {
        let h = h.signum() * h.abs().clamp(self.h_min, self.h_max);

        self.compute_stages(sys, t, y, h);
        let y8 = self.compute_solution(y, h);
        let error = self.compute_error(&y8, h);
        let accepted = error <= 1.0;

        let factor = self.controller.compute_factor(error);
        let h_next = (h.abs() * factor).clamp(self.h_min, self.h_max);

        self.stats.fn_evals += STAGES as u64;
        if accepted {
            self.stats.accepted_steps += 1;
        } else {
            self.stats.rejected_steps += 1;
            trace!(t, h, error, "step rejected");
        }

        StepResult {
            y: y8,
            t: t + h,
            error,
            h_next,
            accepted,
        }
    }

    /// Integrate from `t0` to `tf` starting with step guess `h0`.
    ///
    /// Returns the final time and state.
    pub fn integrate<S: OdeSystem<N>>(
        &mut self,
        sys: &S,
        t0: f64,
        y0: &[f64; N],
        tf: f64,
        h0: f64,
    ) -> Result<(f64, [f64; N]), IntegrationError> {
        if t0 == tf {
            return Ok((t0, *y0));
        }
        self.validate_inputs(t0, y0, tf, h0)?;
        let (t, y, _) = self.advance(sys, t0, y0, tf, h0)?;
        Ok((t, y))
    }

    /// Like [`Rkf78::integrate`] without input validation, additionally
    /// returning the signed step to continue with past `tf`.
    ///
    /// A final step shortened to land on `tf` does not shrink the returned
    /// step, so consecutive calls over a dense sample grid keep the
    /// controller's stride.
    pub fn advance<S: OdeSystem<N>>(
        &mut self,
        sys: &S,
        t0: f64,
        y0: &[f64; N],
        tf: f64,
        h0: f64,
    ) -> Result<(f64, [f64; N], f64), IntegrationError> {
        let direction = (tf - t0).signum();
        let mut t = t0;
        let mut y = *y0;
        let mut h_free = h0;
        let mut step_count = 0u64;

        while (tf - t) * direction > self.h_min {
            let clamped = (t + h_free - tf) * direction > 0.0;
            let h = if clamped { tf - t } else { h_free };

            let result = self.step(sys, t, &y, h);

            if result.accepted {
                t = if clamped { tf } else { result.t };
                y = result.y;
                if !y.iter().all(|v| v.is_finite()) {
                    return Err(IntegrationError::NonFiniteState { t });
                }
            }

            if !(result.accepted && clamped) {
                h_free = result.h_next * direction;
            }

            step_count += 1;
            if step_count > self.max_steps {
                return Err(IntegrationError::MaxStepsExceeded);
            }

            // a rejected step already at h_min cannot make progress
            if !result.accepted && result.h_next <= self.h_min && (tf - t) * direction > self.h_min
            {
                if !result.error.is_finite() {
                    return Err(IntegrationError::NonFiniteState { t });
                }
                return Err(IntegrationError::StepSizeTooSmall {
                    t,
                    h: result.h_next,
                });
            }
        }

        Ok((t, y, h_free))
    }

    #[allow(clippy::needless_range_loop)]
    fn compute_stages<S: OdeSystem<N>>(&mut self, sys: &S, t: f64, y: &[f64; N], h: f64) {
        let mut y_stage = [0.0; N];
        sys.rhs(t, y, &mut self.k[0]);

        for i in 1..STAGES {
            for n in 0..N {
                let mut sum = 0.0;
                for j in 0..i {
                    sum += A[i][j] * self.k[j][n];
                }
                y_stage[n] = y[n] + h * sum;
            }
            sys.rhs(t + C[i] * h, &y_stage, &mut self.k[i]);
        }
    }

    #[allow(clippy::needless_range_loop)]
    fn compute_solution(&self, y: &[f64; N], h: f64) -> [f64; N] {
        let mut y_new = [0.0; N];
        for n in 0..N {
            let mut sum = 0.0;
            for i in 0..STAGES {
                sum += B[i] * self.k[i][n];
            }
            y_new[n] = y[n] + h * sum;
        }
        y_new
    }

    /// Infinity norm of the error scaled by `atol + rtol * |y8|`.
    #[allow(clippy::needless_range_loop)]
    fn compute_error(&self, y8: &[f64; N], h: f64) -> f64 {
        let mut max_err: f64 = 0.0;
        for n in 0..N {
            let mut err_n = 0.0;
            for i in 0..STAGES {
                err_n += B_ERR[i] * self.k[i][n];
            }
            let scale = self.tol.atol[n] + self.tol.rtol[n] * y8[n].abs();
            max_err = max_err.max((h * err_n).abs() / scale);
        }
        max_err
    }

    fn validate_inputs(
        &self,
        t0: f64,
        y0: &[f64; N],
        tf: f64,
        h0: f64,
    ) -> Result<(), IntegrationError> {
        if !t0.is_finite() || !tf.is_finite() || !h0.is_finite() {
            return Err(IntegrationError::InvalidInput {
                message: "t0, tf, and h0 must be finite".to_string(),
            });
        }
        if h0 == 0.0 {
            return Err(IntegrationError::InvalidInput {
                message: "h0 must be non-zero".to_string(),
            });
        }
        let span = tf - t0;
        if span != 0.0 && h0.signum() != span.signum() {
            return Err(IntegrationError::InvalidInput {
                message: "h0 sign must match integration direction (tf - t0)".to_string(),
            });
        }
        if let Some(i) = y0.iter().position(|v| !v.is_finite()) {
            return Err(IntegrationError::InvalidInput {
                message: format!("y0[{}] is not finite", i),
            });
        }
        self.tol.validate()
    }
}

/// Integration failures.
#[derive(Debug, Clone, Error)]
pub enum IntegrationError {
    /// Step size fell to the lower limit without meeting the tolerances
    #[error("step size {h} too small at t = {t}")]
    StepSizeTooSmall {
        /// Time of the failure
        t: f64,
        /// Offending step magnitude
        h: f64,
    },
    /// Step budget exhausted
    #[error("maximum number of integration steps exceeded")]
    MaxStepsExceeded,
    /// Invalid time grid, initial state, or tolerances
    #[error("invalid input: {message}")]
    InvalidInput {
        /// What was wrong
        message: String,
    },
    /// The state became NaN or infinite, usually a singular vector field
    #[error("non-finite state at t = {t}")]
    NonFiniteState {
        /// Time of the first non-finite state
        t: f64,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    struct HarmonicOscillator {
        omega: f64,
    }

    impl OdeSystem<2> for HarmonicOscillator {
        fn rhs(&self, _t: f64, y: &[f64; 2], dydt: &mut [f64; 2]) {
            dydt[0] = y[1];
            dydt[1] = -self.omega * self.omega * y[0];
        }
    }

    struct Constant;

    impl OdeSystem<1> for Constant {
        fn rhs(&self, _t: f64, _y: &[f64; 1], dydt: &mut [f64; 1]) {
            dydt[0] = 1.0;
        }
    }

    #[test]
    fn test_harmonic_oscillator_period() {
        let sys = HarmonicOscillator { omega: 1.0 };
        let tf = 2.0 * std::f64::consts::PI;
        let mut solver = Rkf78::new(Tolerances::new(1e-12, 1e-12));

        let (t, y) = solver.integrate(&sys, 0.0, &[1.0, 0.0], tf, 0.1).unwrap();

        assert!((t - tf).abs() < 1e-10);
        assert!((y[0] - 1.0).abs() < 1e-10, "y(2π) = {}", y[0]);
        assert!(y[1].abs() < 1e-10, "y'(2π) = {}", y[1]);
        assert_eq!(
            solver.stats.fn_evals,
            13 * (solver.stats.accepted_steps + solver.stats.rejected_steps)
        );
    }

    #[test]
    fn test_backward_integration() {
        let sys = HarmonicOscillator { omega: 1.0 };
        let tf = 2.0 * std::f64::consts::PI;
        let mut solver = Rkf78::new(Tolerances::new(1e-12, 1e-12));

        let (t, y) = solver.integrate(&sys, tf, &[1.0, 0.0], 0.0, -0.1).unwrap();

        assert!(t.abs() < 1e-10, "t = {}", t);
        assert!((y[0] - 1.0).abs() < 1e-10);
        assert!(y[1].abs() < 1e-10);
    }

    #[test]
    fn test_large_h0_is_rejected_then_recovers() {
        let sys = HarmonicOscillator { omega: 1.0 };
        let tf = 2.0 * std::f64::consts::PI;
        let mut solver = Rkf78::new(Tolerances::new(1e-12, 1e-12));

        let (_, y) = solver.integrate(&sys, 0.0, &[1.0, 0.0], tf, 100.0).unwrap();

        assert!((y[0] - 1.0).abs() < 1e-9);
        assert!(solver.stats.rejected_steps > 0);
    }

    #[test]
    fn test_advance_keeps_stride_after_clamped_step() {
        let sys = HarmonicOscillator { omega: 1.0 };
        let mut solver = Rkf78::new(Tolerances::new(1e-9, 1e-9));

        // the last step is cut to land on tf; the carried step must not be
        let (t, _, h_next) = solver.advance(&sys, 0.0, &[1.0, 0.0], 1e-3, 0.5).unwrap();

        assert_eq!(t, 1e-3);
        assert!(h_next > 1e-3, "carried step {} collapsed", h_next);
    }

    #[test]
    fn test_zero_length_integration() {
        let mut solver = Rkf78::new(Tolerances::new(1e-12, 1e-12));
        let (t, y) = solver.integrate(&Constant, 5.0, &[42.0], 5.0, 0.1).unwrap();
        assert_eq!(t, 5.0);
        assert_eq!(y[0], 42.0);
        assert_eq!(solver.stats, Stats::default());
    }

    #[test]
    fn test_invalid_inputs_rejected() {
        let cases: [(Tolerances<1>, f64, f64); 4] = [
            (Tolerances::new(f64::NAN, 1e-12), 1.0, 0.1),
            (Tolerances::new(-1e-12, 1e-12), 1.0, 0.1),
            (Tolerances::new(1e-12, f64::INFINITY), 1.0, 0.1),
            (Tolerances::new(1e-12, 1e-12), 1.0, -0.1),
        ];
        for (tol, tf, h0) in cases {
            let mut solver = Rkf78::new(tol);
            let result = solver.integrate(&Constant, 0.0, &[1.0], tf, h0);
            assert!(
                matches!(result, Err(IntegrationError::InvalidInput { .. })),
                "expected InvalidInput, got {:?}",
                result
            );
        }

        let mut solver = Rkf78::new(Tolerances::new(1e-12, 1e-12));
        let result = solver.integrate(&Constant, 0.0, &[f64::NAN], 1.0, 0.1);
        assert!(matches!(result, Err(IntegrationError::InvalidInput { .. })));
    }

    #[test]
    fn test_step_size_too_small_error() {
        struct Stiff;
        impl OdeSystem<1> for Stiff {
            fn rhs(&self, _t: f64, y: &[f64; 1], dydt: &mut [f64; 1]) {
                dydt[0] = -1.0 / (y[0] * y[0] + 1e-30);
            }
        }

        let mut solver = Rkf78::new(Tolerances::new(1e-12, 1e-12));
        solver.h_min = 1e-4;

        let result = solver.integrate(&Stiff, 0.0, &[0.001], 1.0, 0.0001);
        assert!(
            matches!(result, Err(IntegrationError::StepSizeTooSmall { .. })),
            "expected StepSizeTooSmall, got {:?}",
            result
        );
    }

    #[test]
    fn test_max_steps_exceeded() {
        let mut solver = Rkf78::new(Tolerances::new(1e-12, 1e-12));
        solver.max_steps = 5;

        let sys = HarmonicOscillator { omega: 1.0 };
        let result = solver.integrate(&sys, 0.0, &[1.0, 0.0], 100.0, 0.01);
        assert!(matches!(result, Err(IntegrationError::MaxStepsExceeded)));
    }

    #[test]
    fn test_non_finite_state_reported() {
        struct Blowup;
        impl OdeSystem<1> for Blowup {
            fn rhs(&self, _t: f64, _y: &[f64; 1], dydt: &mut [f64; 1]) {
                dydt[0] = f64::INFINITY;
            }
        }

        let mut solver = Rkf78::new(Tolerances::new(1e-9, 1e-9));
        let result = solver.integrate(&Blowup, 0.0, &[0.0], 1.0, 0.1);
        assert!(
            matches!(result, Err(IntegrationError::NonFiniteState { .. })),
            "expected NonFiniteState, got {:?}",
            result
        );
    }

    #[test]
    fn test_step_controller_limits() {
        let ctrl = StepController::default();
        assert_eq!(ctrl.compute_factor(0.0), ctrl.max_factor);
        assert_eq!(ctrl.compute_factor(1e-20), ctrl.max_factor);
        assert_eq!(ctrl.compute_factor(1e20), ctrl.min_factor);
        assert!((ctrl.compute_factor(1.0) - ctrl.safety).abs() < 1e-15);
        assert_eq!(ctrl.compute_factor(f64::NAN), ctrl.min_factor);
    }

    #[test]
    fn test_tighter_tolerance_is_more_accurate() {
        let sys = HarmonicOscillator { omega: 1.0 };
        let tf = 20.0 * std::f64::consts::PI;

        let run = |tol: f64| {
            let mut solver = Rkf78::new(Tolerances::new(tol, tol));
            let (_, y) = solver.integrate(&sys, 0.0, &[1.0, 0.0], tf, 0.1).unwrap();
            (y[0] - tf.cos()).abs()
        };

        let err_loose = run(1e-6);
        let err_tight = run(1e-12);
        assert!(
            err_loose > err_tight,
            "loose error {:.3e} should exceed tight {:.3e}",
            err_loose,
            err_tight
        );
    }
}
