//! Scenario files: which system to integrate, from where, and how densely
//! to sample.
//!
//! ```yaml
//! system:
//!   kind: double_pendulum
//!   params: { l1: 1.0, l2: 1.0, m1: 1.0, m2: 1.0, g: 9.81 }
//!   initial: [1.5707963267948966, 3.141592653589793, 0.0, 0.0]
//! sampling:
//!   t_start: 0.0
//!   t_end: 20.0
//!   samples: 2001
//! tolerances:          # optional, defaults to 1e-9 / 1e-9
//!   atol: 1.0e-9
//!   rtol: 1.0e-9
//! ```

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::ivp::SolveOptions;
use crate::systems::{double_pendulum, two_body, PendulumParams, TwoBodyParams};

/// Scenario loading failures.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// File could not be read
    #[error("cannot read scenario: {0}")]
    Io(#[from] std::io::Error),
    /// Malformed YAML or wrong field types
    #[error("cannot parse scenario: {0}")]
    Yaml(#[from] serde_yaml::Error),
    /// Well-formed but unusable values
    #[error("invalid scenario: {0}")]
    Invalid(String),
}

/// The system to integrate with its parameters and initial state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SystemConfig {
    /// Planar two-body problem
    TwoBody {
        /// Masses and gravitational constant
        params: TwoBodyParams,
        /// `[x1, y1, x2, y2, vx1, vy1, vx2, vy2]`
        initial: [f64; two_body::DIM],
    },
    /// Double pendulum
    DoublePendulum {
        /// Arm lengths, masses, gravity
        params: PendulumParams,
        /// `[θ1, θ2, ω1, ω2]`
        initial: [f64; double_pendulum::DIM],
    },
}

/// Evenly spaced sample times over `[t_start, t_end]`, both ends included.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SamplingConfig {
    /// First sample time, also the initial time
    pub t_start: f64,
    /// Last sample time
    pub t_end: f64,
    /// Number of samples
    pub samples: usize,
}

impl SamplingConfig {
    /// The sample times.
    pub fn times(&self) -> Vec<f64> {
        if self.samples <= 1 {
            return vec![self.t_start; self.samples];
        }
        let step = (self.t_end - self.t_start) / (self.samples - 1) as f64;
        let mut times: Vec<f64> = (0..self.samples)
            .map(|i| self.t_start + step * i as f64)
            .collect();
        // pin the end point against accumulated rounding
        times[self.samples - 1] = self.t_end;
        times
    }
}

/// Solver error tolerances.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToleranceConfig {
    /// Absolute tolerance
    #[serde(default = "default_tolerance")]
    pub atol: f64,
    /// Relative tolerance
    #[serde(default = "default_tolerance")]
    pub rtol: f64,
}

fn default_tolerance() -> f64 {
    1e-9
}

impl Default for ToleranceConfig {
    fn default() -> Self {
        Self {
            atol: default_tolerance(),
            rtol: default_tolerance(),
        }
    }
}

/// A complete scenario file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioConfig {
    /// System and initial state
    pub system: SystemConfig,
    /// Sample grid
    pub sampling: SamplingConfig,
    /// Solver tolerances
    #[serde(default)]
    pub tolerances: ToleranceConfig,
}

impl ScenarioConfig {
    /// Load and validate a YAML scenario file.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let reader = BufReader::new(File::open(path)?);
        let scenario: ScenarioConfig = serde_yaml::from_reader(reader)?;
        scenario.validate()?;
        Ok(scenario)
    }

    /// Parse and validate a YAML scenario.
    pub fn from_yaml_str(yaml: &str) -> Result<Self, ConfigError> {
        let scenario: ScenarioConfig = serde_yaml::from_str(yaml)?;
        scenario.validate()?;
        Ok(scenario)
    }

    /// Heavy primary (m1 = 20) orbited by a light body (m2 = 1), G = 20,
    /// barycentre at rest, sampled over [0, 20].
    pub fn two_body_preset() -> Self {
        let params = TwoBodyParams::new(20.0, 1.0, 20.0);
        Self {
            system: SystemConfig::TwoBody {
                params,
                initial: two_body::barycentric_state(&params, 0.1, 0.5),
            },
            sampling: SamplingConfig {
                t_start: 0.0,
                t_end: 20.0,
                samples: 2001,
            },
            tolerances: ToleranceConfig::default(),
        }
    }

    /// Unit arms and masses released from (π/2, π) at rest, sampled over
    /// [0, 20].
    pub fn double_pendulum_preset() -> Self {
        Self {
            system: SystemConfig::DoublePendulum {
                params: PendulumParams::new(1.0, 1.0, 1.0, 1.0, 9.81),
                initial: [std::f64::consts::FRAC_PI_2, std::f64::consts::PI, 0.0, 0.0],
            },
            sampling: SamplingConfig {
                t_start: 0.0,
                t_end: 20.0,
                samples: 2001,
            },
            tolerances: ToleranceConfig::default(),
        }
    }

    /// Solver options for this scenario.
    pub fn solve_options(&self) -> SolveOptions {
        SolveOptions::with_tolerances(self.tolerances.atol, self.tolerances.rtol)
    }

    /// Reject values the solver or the equations cannot use.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let s = &self.sampling;
        if !s.t_start.is_finite() || !s.t_end.is_finite() {
            return Err(ConfigError::Invalid("sampling bounds must be finite".into()));
        }
        if s.samples == 0 {
            return Err(ConfigError::Invalid("sampling.samples must be at least 1".into()));
        }
        let t = &self.tolerances;
        if !(t.atol.is_finite() && t.atol > 0.0) || !(t.rtol.is_finite() && t.rtol >= 0.0) {
            return Err(ConfigError::Invalid(format!(
                "tolerances must be finite with atol > 0 and rtol >= 0 (got {} / {})",
                t.atol, t.rtol
            )));
        }

        let (masses, initial): (Vec<f64>, &[f64]) = match &self.system {
            SystemConfig::TwoBody { params, initial } => (vec![params.m1, params.m2], initial),
            SystemConfig::DoublePendulum { params, initial } => {
                if !(params.l1 > 0.0 && params.l2 > 0.0) {
                    return Err(ConfigError::Invalid("arm lengths must be positive".into()));
                }
                (vec![params.m1, params.m2], initial)
            }
        };
        if masses.iter().any(|m| !(m.is_finite() && *m > 0.0)) {
            return Err(ConfigError::Invalid("masses must be positive and finite".into()));
        }
        if initial.iter().any(|v| !v.is_finite()) {
            return Err(ConfigError::Invalid("initial state must be finite".into()));
        }
        Ok(())
    }
}
