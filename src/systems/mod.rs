//! Equations of motion of the simulated systems.
//!
//! Each system is an immutable parameter struct implementing
//! [`OdeSystem`](crate::solver::OdeSystem) by delegating to a pure
//! `derivative(params, state)` function.

pub mod double_pendulum;
pub mod two_body;

pub use double_pendulum::PendulumParams;
pub use two_body::TwoBodyParams;
