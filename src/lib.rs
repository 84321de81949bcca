//! # mechsim: classical mechanics with an adaptive RKF7(8) integrator
//!
//! Two small mechanical systems, a planar two-body problem and a double
//! pendulum, integrated with an embedded Runge-Kutta-Fehlberg 7(8) pair and
//! sampled at caller-chosen times.
//!
//! ## Pipeline
//!
//! parameters → vector field → [`solve_ivp`] → per-component arrays → plot
//!
//! ```rust
//! use mechsim::systems::two_body::{self, TwoBodyParams};
//! use mechsim::{solve_ivp, SolveOptions};
//!
//! let params = TwoBodyParams::new(20.0, 1.0, 20.0);
//! let y0 = two_body::barycentric_state(&params, 0.1, 0.5);
//! let t: Vec<f64> = (0..=100).map(|i| i as f64 * 0.01).collect();
//!
//! let sol = solve_ivp(&params, &t, &y0, &SolveOptions::default()).unwrap();
//! assert_eq!(sol.component(0).len(), t.len());
//! ```
//!
//! ## Plotting
//!
//! ```rust
//! use mechsim::plot::{Figure, LineOptions};
//!
//! let mut fig = Figure::default();
//! fig.gca()
//!     .set_title("parabola")
//!     .plot(&[0.0, 1.0, 2.0], &[0.0, 1.0, 4.0], &LineOptions::default())
//!     .unwrap();
//! let svg = fig.to_svg_string().unwrap();
//! assert!(svg.contains("parabola"));
//! ```
//!
//! ## Tolerances
//!
//! [`SolveOptions`] defaults to `atol = rtol = 1e-9`. The error of a step is
//! the infinity norm of the 7th/8th-order difference scaled by
//! `atol + rtol * |y|`; steps with a scaled error above one are retried.
//!
//! ## Singularities
//!
//! The vector fields are not guarded: coincident bodies produce infinite
//! accelerations. The driver reports any non-finite state as
//! [`IntegrationError::NonFiniteState`] rather than returning it.
//!
//! ## References
//!
//! 1. Fehlberg, E. (1968). "Classical Fifth-, Sixth-, Seventh-, and
//!    Eighth-Order Runge-Kutta Formulas with Stepsize Control".
//!    NASA TR R-287.
//!
//! 2. Hairer, E., Nørsett, S.P., & Wanner, G. (1993). "Solving
//!    Ordinary Differential Equations I: Nonstiff Problems".
//!    Springer.

#![deny(missing_docs)]
#![deny(unsafe_code)]

pub mod coefficients;
pub mod config;
pub mod ivp;
pub mod plot;
pub mod solver;
pub mod systems;

pub use config::{ConfigError, SamplingConfig, ScenarioConfig, SystemConfig, ToleranceConfig};
pub use ivp::{solve_ivp, Solution, SolveOptions};
pub use plot::{Axes, Figure, LineOptions, LineStyle, PlotError};
pub use solver::{IntegrationError, OdeSystem, Rkf78, Stats, StepController, StepResult, Tolerances};
pub use systems::{PendulumParams, TwoBodyParams};
