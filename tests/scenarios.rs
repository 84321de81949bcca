//! End-to-end checks of both systems through the sampling driver.

use std::f64::consts::{FRAC_PI_2, PI};
use std::path::PathBuf;

use approx::{assert_abs_diff_eq, assert_relative_eq};
use mechsim::systems::{double_pendulum, two_body};
use mechsim::{
    solve_ivp, IntegrationError, PendulumParams, ScenarioConfig, SolveOptions, SystemConfig,
    TwoBodyParams,
};

fn linspace(start: f64, stop: f64, n: usize) -> Vec<f64> {
    let step = (stop - start) / (n - 1) as f64;
    (0..n).map(|i| start + step * i as f64).collect()
}

fn scenario_path(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("scenarios")
        .join(name)
}

fn unit_pendulum() -> PendulumParams {
    PendulumParams::new(1.0, 1.0, 1.0, 1.0, 9.81)
}

#[test]
fn two_body_orbit_stays_bounded() {
    let params = TwoBodyParams::new(20.0, 1.0, 20.0);
    let y0 = two_body::barycentric_state(&params, 0.1, 0.5);
    let t = linspace(0.0, 20.0, 2001);

    let sol = solve_ivp(&params, &t, &y0, &SolveOptions::default()).unwrap();
    assert_eq!(sol.len(), t.len());

    let mut min_sep = f64::INFINITY;
    let mut max_sep: f64 = 0.0;
    for (_, y) in sol.states() {
        assert!(y.iter().all(|v| v.is_finite()));
        assert!(y[..4].iter().all(|p| p.abs() < 2.5), "escaped: {:?}", y);
        let r = two_body::separation(&y);
        min_sep = min_sep.min(r);
        max_sep = max_sep.max(r);
    }

    // released at apoapsis (2.1); periapsis of this ellipse is ~0.799
    assert!(max_sep < 2.1 + 1e-6 && max_sep > 2.09, "max separation {}", max_sep);
    assert!(min_sep > 0.79 && min_sep < 0.85, "min separation {}", min_sep);
}

#[test]
fn two_body_conserves_energy_and_momentum() {
    let params = TwoBodyParams::new(20.0, 1.0, 20.0);
    let y0 = two_body::barycentric_state(&params, 0.1, 0.5);
    let t = linspace(0.0, 20.0, 2001);

    let sol = solve_ivp(&params, &t, &y0, &SolveOptions::default()).unwrap();

    let e0 = two_body::total_energy(&params, &y0);
    for (_, y) in sol.states() {
        assert_relative_eq!(two_body::total_energy(&params, &y), e0, max_relative = 1e-5);
        let p = two_body::linear_momentum(&params, &y);
        assert_abs_diff_eq!(p[0], 0.0, epsilon = 1e-9);
        assert_abs_diff_eq!(p[1], 0.0, epsilon = 1e-9);
    }
}

#[test]
fn two_body_collision_is_reported() {
    let params = TwoBodyParams::new(1.0, 1.0, 1.0);
    let y0 = [0.5, 0.5, 0.5, 0.5, 0.0, 0.0, 0.0, 0.0];

    let result = solve_ivp(&params, &[0.0, 1.0], &y0, &SolveOptions::default());
    assert!(
        matches!(result, Err(IntegrationError::NonFiniteState { .. })),
        "got {:?}",
        result
    );
}

#[test]
fn pendulum_runs_are_reproducible() {
    let params = unit_pendulum();
    let y0 = [FRAC_PI_2, PI, 0.0, 0.0];
    let t = linspace(0.0, 2.0, 201);
    let opts = SolveOptions::default();

    let first = solve_ivp(&params, &t, &y0, &opts).unwrap();
    let second = solve_ivp(&params, &t, &y0, &opts).unwrap();

    assert_eq!(first, second);
}

#[test]
fn pendulum_conserves_energy() {
    let params = unit_pendulum();
    let y0 = [FRAC_PI_2, PI, 0.0, 0.0];
    let t = linspace(0.0, 10.0, 201);

    let sol = solve_ivp(&params, &t, &y0, &SolveOptions::default()).unwrap();

    let e0 = double_pendulum::total_energy(&params, &y0);
    for (t, y) in sol.states() {
        let e = double_pendulum::total_energy(&params, &y);
        assert!(
            ((e - e0) / e0).abs() < 1e-5,
            "energy {} at t = {} drifted from {}",
            e,
            t,
            e0
        );
    }
}

#[test]
fn pendulum_at_rest_stays_at_rest() {
    let t = linspace(0.0, 5.0, 11);
    let sol = solve_ivp(&unit_pendulum(), &t, &[0.0; 4], &SolveOptions::default()).unwrap();

    for i in 0..4 {
        assert!(sol.component(i).iter().all(|&v| v == 0.0));
    }
}

#[test]
fn single_sample_returns_initial_state() {
    let y0 = [FRAC_PI_2, PI, 0.0, 0.0];
    let sol = solve_ivp(&unit_pendulum(), &[0.0], &y0, &SolveOptions::default()).unwrap();

    assert_eq!(sol.len(), 1);
    assert_eq!(sol.state(0), Some(y0));
}

#[test]
fn small_swing_matches_linearised_period() {
    // tiny amplitude, negligible lower mass: a simple pendulum of length l1
    let params = PendulumParams::new(1.0, 1.0, 1.0, 1e-9, 9.81);
    let theta0 = 1e-3;
    let period = 2.0 * PI * (params.l1 / params.g).sqrt();

    let sol = solve_ivp(
        &params,
        &[0.0, period],
        &[theta0, theta0, 0.0, 0.0],
        &SolveOptions::with_tolerances(1e-12, 1e-12),
    )
    .unwrap();

    assert_relative_eq!(sol.component(0)[1], theta0, max_relative = 1e-4);
}

#[test]
fn bundled_scenarios_match_presets() {
    let two_body = ScenarioConfig::from_path(scenario_path("two_body.yaml")).unwrap();
    assert_eq!(two_body, ScenarioConfig::two_body_preset());

    let pendulum = ScenarioConfig::from_path(scenario_path("double_pendulum.yaml")).unwrap();
    assert_eq!(pendulum, ScenarioConfig::double_pendulum_preset());
    assert!(matches!(pendulum.system, SystemConfig::DoublePendulum { .. }));
}

#[test]
fn scenario_drives_solver() {
    let scenario = ScenarioConfig::double_pendulum_preset();
    let t = scenario.sampling.times();
    let opts = scenario.solve_options();
    let SystemConfig::DoublePendulum { params, initial } = scenario.system else {
        panic!("preset is not a pendulum");
    };

    let sol = solve_ivp(&params, &t[..101], &initial, &opts).unwrap();
    assert_eq!(sol.t, t[..101].to_vec());
    assert_eq!(sol.state(0), Some(initial));
}
