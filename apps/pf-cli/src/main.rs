use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::time::Instant;

use pf_components::Fault;
use pf_project::Scenario;
use pf_sim::{SimOptions, SimRecord};
use pf_solver::BalanceReport;

mod error;

use error::{CliError, CliResult};

#[derive(Parser)]
#[command(name = "pf-cli")]
#[command(about = "PlantFlow CLI - HVAC hydraulic network balancing", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate scenario file syntax and structure
    Validate {
        /// Path to the scenario YAML file
        scenario_path: PathBuf,
    },
    /// Balance the network once at its initial control signals
    Solve {
        /// Path to the scenario YAML file
        scenario_path: PathBuf,
        /// Write the balance report as JSON
        #[arg(long)]
        json: Option<PathBuf>,
    },
    /// Run the time-stepped simulation
    Run {
        /// Path to the scenario YAML file
        scenario_path: PathBuf,
        /// Number of one-minute steps (defaults to the scenario's horizon)
        #[arg(long)]
        steps: Option<usize>,
        /// Record every N-th step
        #[arg(long, default_value_t = 1)]
        record_every: usize,
        /// Write the simulation record as JSON
        #[arg(long)]
        json: Option<PathBuf>,
    },
    /// Run several scenarios in parallel
    Batch {
        /// Paths to scenario YAML files
        #[arg(required = true)]
        scenario_paths: Vec<PathBuf>,
        /// Number of one-minute steps for every scenario
        #[arg(long)]
        steps: Option<usize>,
    },
}

fn main() -> CliResult<()> {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Validate { scenario_path } => cmd_validate(&scenario_path),
        Commands::Solve {
            scenario_path,
            json,
        } => cmd_solve(&scenario_path, json.as_deref()),
        Commands::Run {
            scenario_path,
            steps,
            record_every,
            json,
        } => cmd_run(&scenario_path, steps, record_every, json.as_deref()),
        Commands::Batch {
            scenario_paths,
            steps,
        } => cmd_batch(&scenario_paths, steps),
    }
}

fn cmd_validate(scenario_path: &Path) -> CliResult<()> {
    println!("Validating scenario: {}", scenario_path.display());
    let scenario = pf_project::load_yaml(scenario_path)?;
    pf_project::build_network(&scenario)?;
    println!(
        "✓ Scenario is valid ({} headers, {} branches, {} controllers)",
        scenario.headers.len(),
        scenario.branches.len(),
        scenario.controllers.len()
    );
    Ok(())
}

fn cmd_solve(scenario_path: &Path, json: Option<&Path>) -> CliResult<()> {
    let scenario = pf_project::load_yaml(scenario_path)?;
    println!("Balancing: {}", scenario.name);

    let start = Instant::now();
    let report = pf_sim::solve_scenario(&scenario)?;
    let elapsed = start.elapsed().as_secs_f64();

    print_balance(&report);
    println!("\n  Solve time: {:.3}s", elapsed);

    if let Some(path) = json {
        write_json(path, &report)?;
    }
    Ok(())
}

fn cmd_run(
    scenario_path: &Path,
    steps: Option<usize>,
    record_every: usize,
    json: Option<&Path>,
) -> CliResult<()> {
    let scenario = pf_project::load_yaml(scenario_path)?;
    let steps_to_run = steps.unwrap_or(scenario.simulation.steps);
    println!("Running: {} ({} min)", scenario.name, steps_to_run);

    let start = Instant::now();
    let record = pf_sim::run_scenario(
        &scenario,
        &SimOptions {
            steps,
            record_every,
        },
    )?;
    let elapsed = start.elapsed().as_secs_f64();

    print_run_summary(&scenario, &record);
    println!("\n  Run time: {:.3}s", elapsed);

    if let Some(path) = json {
        write_json(path, &record)?;
    }
    Ok(())
}

fn cmd_batch(scenario_paths: &[PathBuf], steps: Option<usize>) -> CliResult<()> {
    let scenarios = scenario_paths
        .iter()
        .map(|p| pf_project::load_yaml(p))
        .collect::<Result<Vec<_>, _>>()?;
    println!("Running {} scenarios in parallel", scenarios.len());

    let start = Instant::now();
    let results = pf_sim::run_batch(
        &scenarios,
        &SimOptions {
            steps,
            record_every: 1,
        },
    );
    let elapsed = start.elapsed().as_secs_f64();

    println!(
        "\n{:<32} {:>6} {:>12} {:>12}",
        "Scenario", "Steps", "Unconverged", "Energy kWh"
    );
    let mut failed = 0;
    for (scenario, result) in scenarios.iter().zip(&results) {
        match result {
            Ok(record) => println!(
                "{:<32} {:>6} {:>12} {:>12.3}",
                scenario.name,
                record.steps.len(),
                record.unconverged().count(),
                record.energy_kwh()
            ),
            Err(e) => {
                failed += 1;
                println!("{:<32} failed: {}", scenario.name, e);
            }
        }
    }
    println!("\n  Total time: {:.3}s", elapsed);

    if failed > 0 {
        return Err(CliError::Batch {
            failed,
            total: scenarios.len(),
        });
    }
    Ok(())
}

fn print_balance(report: &BalanceReport) {
    let status = if report.converged {
        "✓ Converged"
    } else {
        "✗ Not converged"
    };
    println!(
        "{} ({} iterations, {} evaluations, residual {:.3e})",
        status, report.iterations, report.evaluations, report.residual
    );

    println!("\n{:<20} {:>12}", "Header", "p (kPa)");
    for h in &report.headers {
        println!("{:<20} {:>12.3}", h.name, h.pressure);
    }

    println!(
        "\n{:<20} {:>12} {:>12} {:>8} {:>10}  {}",
        "Branch", "g (m3/min)", "dp (kPa)", "signal", "power kW", "fault"
    );
    for b in &report.branches {
        println!(
            "{:<20} {:>12.4} {:>12.3} {:>8.3} {:>10.3}  {}",
            b.name,
            b.flow,
            b.pressure_delta,
            b.control_signal,
            b.power.power_kw,
            fault_label(b.fault)
        );
    }
    println!("\n  Total power: {:.3} kW", report.total_power_kw());
}

fn print_run_summary(scenario: &Scenario, record: &SimRecord) {
    let unconverged = record.unconverged().count();
    if unconverged == 0 {
        println!("✓ All {} recorded steps converged", record.steps.len());
    } else {
        println!(
            "✗ {} of {} recorded steps did not converge",
            unconverged,
            record.steps.len()
        );
    }

    println!(
        "\n{:<20} {:>12} {:>12} {:>12}",
        "Branch", "g min", "g mean", "g max"
    );
    for branch in &scenario.branches {
        let flows = record.flow_series(&branch.id);
        if flows.is_empty() {
            continue;
        }
        let min = flows.iter().copied().fold(f64::INFINITY, f64::min);
        let max = flows.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let mean = flows.iter().sum::<f64>() / flows.len() as f64;
        println!(
            "{:<20} {:>12.4} {:>12.4} {:>12.4}",
            branch.id, min, mean, max
        );
    }
    println!("\n  Energy: {:.3} kWh", record.energy_kwh());
}

fn fault_label(fault: Option<Fault>) -> String {
    fault.map(|f| f.to_string()).unwrap_or_default()
}

fn write_json<T: serde::Serialize>(path: &Path, value: &T) -> CliResult<()> {
    pf_project::write_json(path, value).map_err(|source| CliError::OutputWrite {
        path: path.to_path_buf(),
        source,
    })?;
    println!("  Wrote {}", path.display());
    Ok(())
}
