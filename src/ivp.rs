//! Initial value problems sampled on a caller-supplied time grid.
//!
//! [`solve_ivp`] integrates over `[t_eval[0], t_eval[last]]` and records the
//! state at exactly each requested time. Each sample is hit by shortening the
//! step that would cross it; the controller's step suggestion carries across
//! samples so a dense grid does not force small steps.

use tracing::{debug, warn};

use crate::solver::{IntegrationError, OdeSystem, Rkf78, Stats, Tolerances};

/// Options for [`solve_ivp`].
#[derive(Debug, Clone, PartialEq)]
pub struct SolveOptions {
    /// Absolute tolerance, applied to every component
    pub atol: f64,
    /// Relative tolerance, applied to every component
    pub rtol: f64,
    /// Initial step magnitude; one hundredth of the span when `None`
    pub h0: Option<f64>,
    /// Step budget for the whole solve
    pub max_steps: u64,
}

impl Default for SolveOptions {
    fn default() -> Self {
        Self {
            atol: 1e-9,
            rtol: 1e-9,
            h0: None,
            max_steps: 10_000_000,
        }
    }
}

impl SolveOptions {
    /// Default options with the given tolerances.
    pub fn with_tolerances(atol: f64, rtol: f64) -> Self {
        Self {
            atol,
            rtol,
            ..Self::default()
        }
    }
}

/// Sampled solution: one sequence per state component, aligned with `t`.
#[derive(Debug, Clone, PartialEq)]
pub struct Solution<const N: usize> {
    /// Sample times, as requested
    pub t: Vec<f64>,
    /// `y[i][k]` is component `i` at time `t[k]`
    pub y: [Vec<f64>; N],
    /// Solver counters for the whole solve
    pub stats: Stats,
}

impl<const N: usize> Solution<N> {
    fn with_capacity(capacity: usize) -> Self {
        Self {
            t: Vec::with_capacity(capacity),
            y: std::array::from_fn(|_| Vec::with_capacity(capacity)),
            stats: Stats::default(),
        }
    }

    fn push(&mut self, t: f64, state: &[f64; N]) {
        self.t.push(t);
        for (series, &value) in self.y.iter_mut().zip(state.iter()) {
            series.push(value);
        }
    }

    /// Number of samples.
    pub fn len(&self) -> usize {
        self.t.len()
    }

    /// Whether there are no samples.
    pub fn is_empty(&self) -> bool {
        self.t.is_empty()
    }

    /// Time series of component `i`.
    ///
    /// # Panics
    /// If `i >= N`.
    pub fn component(&self, i: usize) -> &[f64] {
        &self.y[i]
    }

    /// Full state at sample `k`, or `None` past the end.
    pub fn state(&self, k: usize) -> Option<[f64; N]> {
        if k >= self.len() {
            return None;
        }
        Some(std::array::from_fn(|i| self.y[i][k]))
    }

    /// Iterate over `(t, state)` pairs.
    pub fn states(&self) -> impl Iterator<Item = (f64, [f64; N])> + '_ {
        self.t
            .iter()
            .enumerate()
            .map(|(k, &t)| (t, std::array::from_fn(|i| self.y[i][k])))
    }
}

/// Solve `dy/dt = sys(t, y)`, `y(t_eval[0]) = y0`, returning the state at
/// every time in `t_eval`.
///
/// `t_eval` must be non-empty, finite and monotonic (repeated times are
/// allowed). The first sample is `y0` itself.
pub fn solve_ivp<S, const N: usize>(
    sys: &S,
    t_eval: &[f64],
    y0: &[f64; N],
    options: &SolveOptions,
) -> Result<Solution<N>, IntegrationError>
where
    S: OdeSystem<N>,
{
    let direction = validate_grid(t_eval)?;
    let t0 = t_eval[0];
    let t_end = t_eval[t_eval.len() - 1];

    if let Some(i) = y0.iter().position(|v| !v.is_finite()) {
        return Err(IntegrationError::InvalidInput {
            message: format!("y0[{}] is not finite", i),
        });
    }

    validate_options(options)?;

    let mut solution = Solution::with_capacity(t_eval.len());
    solution.push(t0, y0);
    if t_eval.len() == 1 || t0 == t_end {
        for &t in &t_eval[1..] {
            solution.push(t, y0);
        }
        return Ok(solution);
    }

    let mut h = match options.h0 {
        Some(h0) => h0.abs() * direction,
        None => (t_end - t0) / 100.0,
    };

    let mut solver = Rkf78::new(Tolerances::new(options.atol, options.rtol));
    let mut t = t0;
    let mut y = *y0;
    for &target in &t_eval[1..] {
        if target != t {
            let taken = solver.stats.accepted_steps + solver.stats.rejected_steps;
            solver.max_steps = options.max_steps.saturating_sub(taken);
            let (t_next, y_next, h_next) = solver.advance(sys, t, &y, target, h).map_err(|e| {
                warn!(t, target, error = %e, "integration failed");
                e
            })?;
            // a gap below h_min is left for the next interval to cover
            t = t_next;
            y = y_next;
            h = h_next;
        }
        solution.push(target, &y);
    }

    solution.stats = solver.stats;
    debug!(
        samples = solution.len(),
        t0,
        t_end,
        accepted = solution.stats.accepted_steps,
        rejected = solution.stats.rejected_steps,
        fn_evals = solution.stats.fn_evals,
        "solve_ivp finished"
    );
    Ok(solution)
}

fn validate_options(options: &SolveOptions) -> Result<(), IntegrationError> {
    if let Some(h0) = options.h0 {
        if !h0.is_finite() || h0 == 0.0 {
            return Err(IntegrationError::InvalidInput {
                message: "h0 must be finite and non-zero".to_string(),
            });
        }
    }
    if !options.atol.is_finite() || options.atol <= 0.0 {
        return Err(IntegrationError::InvalidInput {
            message: "atol must be positive and finite".to_string(),
        });
    }
    if !options.rtol.is_finite() || options.rtol < 0.0 {
        return Err(IntegrationError::InvalidInput {
            message: "rtol must be non-negative and finite".to_string(),
        });
    }
    Ok(())
}

/// Direction of the grid: `1.0` forward, `-1.0` backward.
fn validate_grid(t_eval: &[f64]) -> Result<f64, IntegrationError> {
    let (first, last) = match (t_eval.first(), t_eval.last()) {
        (Some(&first), Some(&last)) => (first, last),
        _ => {
            return Err(IntegrationError::InvalidInput {
                message: "t_eval is empty".to_string(),
            })
        }
    };
    if let Some(i) = t_eval.iter().position(|t| !t.is_finite()) {
        return Err(IntegrationError::InvalidInput {
            message: format!("t_eval[{}] is not finite", i),
        });
    }
    let direction = if last < first { -1.0 } else { 1.0 };
    if let Some(k) = t_eval
        .windows(2)
        .position(|pair| (pair[1] - pair[0]) * direction < 0.0)
    {
        return Err(IntegrationError::InvalidInput {
            message: format!("t_eval is not monotonic at index {}", k + 1),
        });
    }
    Ok(direction)
}
