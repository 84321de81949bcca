//! Planar double pendulum with point masses on massless rigid arms.
//!
//! State vector: `[θ1, θ2, ω1, ω2]`, angles measured from the downward
//! vertical in radians.

use serde::{Deserialize, Serialize};

use crate::solver::OdeSystem;

/// Number of state components.
pub const DIM: usize = 4;

/// Component names in state order, used for CSV headers.
pub const COMPONENTS: [&str; DIM] = ["theta1", "theta2", "omega1", "omega2"];

/// Arm lengths, bob masses and gravitational acceleration.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PendulumParams {
    /// Length of the upper arm
    pub l1: f64,
    /// Length of the lower arm
    pub l2: f64,
    /// Mass of the upper bob
    pub m1: f64,
    /// Mass of the lower bob
    pub m2: f64,
    /// Gravitational acceleration
    pub g: f64,
}

impl PendulumParams {
    /// New parameter set.
    pub fn new(l1: f64, l2: f64, m1: f64, m2: f64, g: f64) -> Self {
        Self { l1, l2, m1, m2, g }
    }
}

/// Time derivative of `state` from the coupled equations of motion.
///
/// Both angular accelerations share the denominator
/// `2 m1 + m2 - m2 cos(2 (θ1 - θ2))`; it is not guarded.
pub fn derivative(params: &PendulumParams, state: &[f64; DIM]) -> [f64; DIM] {
    let [th1, th2, w1, w2] = *state;
    let PendulumParams { l1, l2, m1, m2, g } = *params;

    let delta = th1 - th2;
    let (sin_d, cos_d) = delta.sin_cos();
    let den = 2.0 * m1 + m2 - m2 * (2.0 * delta).cos();

    let alpha1 = (-g * (2.0 * m1 + m2) * th1.sin()
        - m2 * g * (th1 - 2.0 * th2).sin()
        - 2.0 * sin_d * m2 * (w2 * w2 * l2 + w1 * w1 * l1 * cos_d))
        / (l1 * den);
    let alpha2 = (2.0
        * sin_d
        * (w1 * w1 * l1 * (m1 + m2) + g * (m1 + m2) * th1.cos() + w2 * w2 * l2 * m2 * cos_d))
        / (l2 * den);

    [w1, w2, alpha1, alpha2]
}

impl OdeSystem<DIM> for PendulumParams {
    fn rhs(&self, _t: f64, y: &[f64; DIM], dydt: &mut [f64; DIM]) {
        *dydt = derivative(self, y);
    }
}

/// Cartesian bob positions with the pivot at the origin and y pointing up.
pub fn bob_positions(params: &PendulumParams, th1: f64, th2: f64) -> ([f64; 2], [f64; 2]) {
    let p1 = [params.l1 * th1.sin(), -params.l1 * th1.cos()];
    let p2 = [p1[0] + params.l2 * th2.sin(), p1[1] - params.l2 * th2.cos()];
    (p1, p2)
}

/// Kinetic plus potential energy, zero potential at the pivot height.
pub fn total_energy(params: &PendulumParams, state: &[f64; DIM]) -> f64 {
    let [th1, th2, w1, w2] = *state;
    let PendulumParams { l1, l2, m1, m2, g } = *params;

    let kinetic = 0.5 * m1 * (l1 * w1).powi(2)
        + 0.5
            * m2
            * ((l1 * w1).powi(2) + (l2 * w2).powi(2) + 2.0 * l1 * l2 * w1 * w2 * (th1 - th2).cos());
    let potential = -(m1 + m2) * g * l1 * th1.cos() - m2 * g * l2 * th2.cos();
    kinetic + potential
}
