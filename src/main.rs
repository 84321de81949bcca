use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use mechsim::plot::{Figure, LineOptions, LineStyle};
use mechsim::systems::{double_pendulum, two_body, PendulumParams, TwoBodyParams};
use mechsim::{solve_ivp, ScenarioConfig, Solution, SystemConfig};

#[derive(Parser)]
#[command(name = "mechsim", version)]
#[command(about = "Integrate and plot a two-body orbit or a double pendulum")]
struct Cli {
    /// Log solver statistics
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a YAML scenario file
    Run {
        scenario: PathBuf,
        #[command(flatten)]
        output: OutputArgs,
    },
    /// Run a built-in scenario
    Demo {
        #[arg(value_enum)]
        system: Preset,
        #[command(flatten)]
        output: OutputArgs,
    },
}

#[derive(Args)]
struct OutputArgs {
    /// Write sampled states as CSV
    #[arg(long)]
    csv: Option<PathBuf>,

    /// Write plots as SVG
    #[arg(long)]
    svg: Option<PathBuf>,
}

#[derive(Clone, Copy, ValueEnum)]
enum Preset {
    TwoBody,
    DoublePendulum,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let (scenario, output) = match cli.command {
        Commands::Run { scenario, output } => {
            let config = ScenarioConfig::from_path(&scenario)
                .with_context(|| format!("loading {}", scenario.display()))?;
            (config, output)
        }
        Commands::Demo { system, output } => {
            let config = match system {
                Preset::TwoBody => ScenarioConfig::two_body_preset(),
                Preset::DoublePendulum => ScenarioConfig::double_pendulum_preset(),
            };
            (config, output)
        }
    };

    run(&scenario, &output)
}

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

fn run(scenario: &ScenarioConfig, output: &OutputArgs) -> Result<()> {
    let t = scenario.sampling.times();
    let options = scenario.solve_options();

    match &scenario.system {
        SystemConfig::TwoBody { params, initial } => {
            let sol = solve_ivp(params, &t, initial, &options).context("two-body integration")?;
            let drift = energy_drift(&sol, |y| two_body::total_energy(params, y));
            info!(
                samples = sol.len(),
                max_energy_drift = drift.iter().copied().fold(0.0, f64::max),
                "two-body solved"
            );
            if let Some(path) = &output.csv {
                write_csv(path, &two_body::COMPONENTS, &sol)?;
            }
            if let Some(path) = &output.svg {
                two_body_figure(params, &sol, &drift)?
                    .save_svg(path)
                    .with_context(|| format!("writing {}", path.display()))?;
                info!(path = %path.display(), "plot written");
            }
        }
        SystemConfig::DoublePendulum { params, initial } => {
            let sol = solve_ivp(params, &t, initial, &options).context("pendulum integration")?;
            let drift = energy_drift(&sol, |y| double_pendulum::total_energy(params, y));
            info!(
                samples = sol.len(),
                max_energy_drift = drift.iter().copied().fold(0.0, f64::max),
                "double pendulum solved"
            );
            if let Some(path) = &output.csv {
                write_csv(path, &double_pendulum::COMPONENTS, &sol)?;
            }
            if let Some(path) = &output.svg {
                pendulum_figure(params, &sol, &drift)?
                    .save_svg(path)
                    .with_context(|| format!("writing {}", path.display()))?;
                info!(path = %path.display(), "plot written");
            }
        }
    }

    if output.csv.is_none() && output.svg.is_none() {
        warn!("no --csv or --svg given, nothing written");
    }
    Ok(())
}

/// Relative energy error against the first sample.
fn energy_drift<const N: usize>(sol: &Solution<N>, energy: impl Fn(&[f64; N]) -> f64) -> Vec<f64> {
    let mut states = sol.states();
    let Some((_, first)) = states.next() else {
        return Vec::new();
    };
    let e0 = energy(&first);
    std::iter::once(0.0)
        .chain(states.map(|(_, y)| ((energy(&y) - e0) / e0).abs()))
        .collect()
}

fn write_csv<const N: usize>(path: &Path, names: &[&str; N], sol: &Solution<N>) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("creating {}", path.display()))?;

    let mut header = vec!["t"];
    header.extend_from_slice(names);
    writer.write_record(&header)?;
    for (t, y) in sol.states() {
        writer.write_record(std::iter::once(t).chain(y).map(|v| v.to_string()))?;
    }
    writer.flush()?;

    info!(path = %path.display(), rows = sol.len(), "csv written");
    Ok(())
}

fn two_body_figure(params: &TwoBodyParams, sol: &Solution<8>, drift: &[f64]) -> Result<Figure> {
    let mut fig = Figure::new(900, 1200);
    fig.gca()
        .set_title(format!(
            "Two-body orbit (m1 = {}, m2 = {}, G = {})",
            params.m1, params.m2, params.g
        ))
        .set_xlabel("x")
        .set_ylabel("y")
        .plot(sol.component(0), sol.component(1), &LineOptions::default().label("body 1"))?
        .plot(
            sol.component(2),
            sol.component(3),
            &LineOptions::default().style(LineStyle::Dashed).label("body 2"),
        )?;
    add_drift_axes(&mut fig, &sol.t, drift)?;
    Ok(fig)
}

fn pendulum_figure(params: &PendulumParams, sol: &Solution<4>, drift: &[f64]) -> Result<Figure> {
    let mut fig = Figure::new(900, 1500);
    fig.gca()
        .set_title("Double pendulum angles")
        .set_xlabel("t")
        .set_ylabel("rad")
        .plot(&sol.t, sol.component(0), &LineOptions::default().label("theta1"))?
        .plot(&sol.t, sol.component(1), &LineOptions::default().label("theta2"))?;

    let (x2, y2): (Vec<f64>, Vec<f64>) = sol
        .states()
        .map(|(_, y)| {
            let (_, lower) = double_pendulum::bob_positions(params, y[0], y[1]);
            (lower[0], lower[1])
        })
        .unzip();
    fig.add_axes()
        .set_title("Lower bob path")
        .set_xlabel("x")
        .set_ylabel("y")
        .plot(&x2, &y2, &LineOptions::default())?;

    add_drift_axes(&mut fig, &sol.t, drift)?;
    Ok(fig)
}

/// Log-scale energy error panel, skipped when the error is identically zero.
fn add_drift_axes(fig: &mut Figure, t: &[f64], drift: &[f64]) -> Result<()> {
    if !drift.iter().any(|d| d.is_finite() && *d > 0.0) {
        return Ok(());
    }
    fig.add_axes()
        .set_title("Relative energy error")
        .set_xlabel("t")
        .set_log_y(true)
        .plot(t, drift, &LineOptions::default())?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use mechsim::Stats;

    fn series(t: Vec<f64>, y: Vec<f64>) -> Solution<1> {
        Solution {
            t,
            y: [y],
            stats: Stats::default(),
        }
    }

    #[test]
    fn test_energy_drift_relative_to_first_sample() {
        let sol = series(vec![0.0, 1.0, 2.0], vec![-2.0, -2.2, -1.5]);
        let drift = energy_drift(&sol, |y| y[0]);

        assert_eq!(drift[0], 0.0);
        assert!((drift[1] - 0.1).abs() < 1e-12);
        assert!((drift[2] - 0.25).abs() < 1e-12);
        assert!(energy_drift(&series(vec![], vec![]), |y| y[0]).is_empty());
    }

    #[test]
    fn test_drift_panel_skipped_when_flat() {
        let t = [0.0, 1.0, 2.0];
        let mut fig = Figure::default();
        add_drift_axes(&mut fig, &t, &[0.0, 0.0, 0.0]).unwrap();
        assert!(fig.axes().is_empty());

        add_drift_axes(&mut fig, &t, &[0.0, 1e-12, 3e-12]).unwrap();
        assert_eq!(fig.axes().len(), 1);
        fig.to_svg_string().unwrap();
    }

    #[test]
    fn test_write_csv_rows() {
        let sol = series(vec![0.0, 0.5], vec![1.0, 2.0]);
        let path = std::env::temp_dir().join(format!("mechsim-{}.csv", std::process::id()));

        write_csv(&path, &["theta"], &sol).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        std::fs::remove_file(&path).unwrap();

        let rows: Vec<&str> = text.lines().collect();
        assert_eq!(rows, ["t,theta", "0,1", "0.5,2"]);
    }
}
