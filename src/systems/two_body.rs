//! Planar two-body problem under Newtonian gravity.
//!
//! State vector: `[x1, y1, x2, y2, vx1, vy1, vx2, vy2]`.

use serde::{Deserialize, Serialize};

use crate::solver::OdeSystem;

/// Number of state components.
pub const DIM: usize = 8;

/// Component names in state order, used for CSV headers.
pub const COMPONENTS: [&str; DIM] = ["x1", "y1", "x2", "y2", "vx1", "vy1", "vx2", "vy2"];

/// Masses and gravitational constant.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TwoBodyParams {
    /// Mass of body 1
    pub m1: f64,
    /// Mass of body 2
    pub m2: f64,
    /// Gravitational constant
    pub g: f64,
}

impl TwoBodyParams {
    /// New parameter set.
    pub fn new(m1: f64, m2: f64, g: f64) -> Self {
        Self { m1, m2, g }
    }
}

/// Time derivative of `state`.
///
/// Velocities pass through unchanged; each body accelerates toward the other
/// with magnitude `G * m_other / r²`. Coincident bodies give non-finite
/// accelerations.
pub fn derivative(params: &TwoBodyParams, state: &[f64; DIM]) -> [f64; DIM] {
    let [x1, y1, x2, y2, vx1, vy1, vx2, vy2] = *state;
    let dx = x2 - x1;
    let dy = y2 - y1;
    let r = (dx * dx + dy * dy).sqrt();
    let r3 = r * r * r;

    let k1 = params.g * params.m2 / r3;
    let k2 = params.g * params.m1 / r3;

    [vx1, vy1, vx2, vy2, k1 * dx, k1 * dy, -k2 * dx, -k2 * dy]
}

impl OdeSystem<DIM> for TwoBodyParams {
    fn rhs(&self, _t: f64, y: &[f64; DIM], dydt: &mut [f64; DIM]) {
        *dydt = derivative(self, y);
    }
}

/// Euclidean distance between the bodies.
pub fn separation(state: &[f64; DIM]) -> f64 {
    (state[2] - state[0]).hypot(state[3] - state[1])
}

/// Kinetic plus gravitational potential energy.
pub fn total_energy(params: &TwoBodyParams, state: &[f64; DIM]) -> f64 {
    let v1_sq = state[4] * state[4] + state[5] * state[5];
    let v2_sq = state[6] * state[6] + state[7] * state[7];
    let kinetic = 0.5 * params.m1 * v1_sq + 0.5 * params.m2 * v2_sq;
    kinetic - params.g * params.m1 * params.m2 / separation(state)
}

/// Total linear momentum `m1 v1 + m2 v2`.
pub fn linear_momentum(params: &TwoBodyParams, state: &[f64; DIM]) -> [f64; 2] {
    [
        params.m1 * state[4] + params.m2 * state[6],
        params.m1 * state[5] + params.m2 * state[7],
    ]
}

/// Initial state with the barycentre at rest at the origin.
///
/// Body 1 starts at `(x1, 0)` moving with `(0, vy1)`; body 2 is mirrored
/// through the origin, scaled by the mass ratio `m1/m2`.
pub fn barycentric_state(params: &TwoBodyParams, x1: f64, vy1: f64) -> [f64; DIM] {
    let ratio = params.m1 / params.m2;
    [x1, 0.0, -ratio * x1, 0.0, 0.0, vy1, 0.0, -ratio * vy1]
}
