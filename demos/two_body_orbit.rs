//! Two-body orbit: heavy primary with a light companion.
//!
//! Integrates over [0, 20] at 1e-9 tolerance, prints the conserved
//! quantities and writes `two_body_orbit.svg`.
//!
//! Run with:
//!   cargo run --example two_body_orbit

use mechsim::plot::{Figure, LineOptions, LineStyle};
use mechsim::systems::two_body::{self, TwoBodyParams};
use mechsim::{solve_ivp, SolveOptions};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let params = TwoBodyParams::new(20.0, 1.0, 20.0);
    let y0 = two_body::barycentric_state(&params, 0.1, 0.5);
    let t: Vec<f64> = (0..=2000).map(|i| i as f64 * 0.01).collect();

    let sol = solve_ivp(&params, &t, &y0, &SolveOptions::default())?;

    let e0 = two_body::total_energy(&params, &y0);
    let yf = sol.state(sol.len() - 1).ok_or("empty solution")?;
    let ef = two_body::total_energy(&params, &yf);
    let pf = two_body::linear_momentum(&params, &yf);

    println!("Two-Body Orbit (m1 = 20, m2 = 1, G = 20)");
    println!("  Samples:        {}", sol.len());
    println!(
        "  Energy drift:   {:.2e}  (relative: {:.2e})",
        (ef - e0).abs(),
        ((ef - e0) / e0).abs()
    );
    println!("  Final momentum: [{:.2e}, {:.2e}]", pf[0], pf[1]);
    println!();
    println!("  Accepted steps: {}", sol.stats.accepted_steps);
    println!("  Rejected steps: {}", sol.stats.rejected_steps);
    println!("  Function evals: {}", sol.stats.fn_evals);

    let mut fig = Figure::new(800, 800);
    fig.gca()
        .set_title("Two-body orbit")
        .set_xlabel("x")
        .set_ylabel("y")
        .plot(sol.component(0), sol.component(1), &LineOptions::default().label("body 1"))?
        .plot(
            sol.component(2),
            sol.component(3),
            &LineOptions::default().style(LineStyle::Dashed).label("body 2"),
        )?;
    fig.save_svg("two_body_orbit.svg")?;
    println!("  Plot written to two_body_orbit.svg");
    Ok(())
}
