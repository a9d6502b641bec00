//! Time-stepped simulation runner and result recording.
//!
//! One step is one minute: scheduled signals are applied, controllers act
//! on the measurements of the previous balance, the network is balanced,
//! and the result is recorded.

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use pf_components::{Fault, SignalTarget};
use pf_project::Scenario;
use pf_solver::{BalanceReport, BranchReport, HeaderReport, Network};

use crate::controllers::Controller;
use crate::error::{SimError, SimResult};
use crate::schedule::Schedule;

/// Options for simulation runs.
#[derive(Clone, Debug, Default)]
pub struct SimOptions {
    /// Overrides the scenario's step count.
    pub steps: Option<usize>,
    /// Record every N-th step; the last step is always recorded. 0 means 1.
    pub record_every: usize,
}

/// Network state after one step.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StepRecord {
    pub minute: usize,
    pub converged: bool,
    pub iterations: usize,
    pub evaluations: usize,
    pub residual: f64,
    pub fault: Option<Fault>,
    pub headers: Vec<HeaderReport>,
    pub branches: Vec<BranchReport>,
    pub total_power_kw: f64,
    /// Signals written by controllers before the balance: `(controller, target, value)`.
    pub control_actions: Vec<(String, SignalTarget, f64)>,
}

impl StepRecord {
    fn new(
        minute: usize,
        report: BalanceReport,
        control_actions: Vec<(String, SignalTarget, f64)>,
    ) -> Self {
        Self {
            minute,
            converged: report.converged,
            iterations: report.iterations,
            evaluations: report.evaluations,
            residual: report.residual,
            fault: report.fault,
            total_power_kw: report.total_power_kw(),
            headers: report.headers,
            branches: report.branches,
            control_actions,
        }
    }

    pub fn branch(&self, name: &str) -> Option<&BranchReport> {
        self.branches.iter().find(|b| b.name == name)
    }

    pub fn header(&self, name: &str) -> Option<&HeaderReport> {
        self.headers.iter().find(|h| h.name == name)
    }
}

/// Record of a simulation run.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SimRecord {
    pub scenario: String,
    pub steps: Vec<StepRecord>,
}

impl SimRecord {
    pub fn unconverged(&self) -> impl Iterator<Item = &StepRecord> {
        self.steps.iter().filter(|s| !s.converged)
    }

    /// Energy over the recorded steps, each holding its power for one minute.
    pub fn energy_kwh(&self) -> f64 {
        self.steps.iter().map(|s| s.total_power_kw / 60.0).sum()
    }

    /// Flow of `branch` at each recorded step.
    pub fn flow_series(&self, branch: &str) -> Vec<f64> {
        self.steps
            .iter()
            .filter_map(|s| s.branch(branch).map(|b| b.flow))
            .collect()
    }

    /// Control signal of `branch` at each recorded step.
    pub fn signal_series(&self, branch: &str) -> Vec<f64> {
        self.steps
            .iter()
            .filter_map(|s| s.branch(branch).map(|b| b.control_signal))
            .collect()
    }
}

/// A network with its schedules and controllers.
#[derive(Clone, Debug)]
pub struct Simulation {
    name: String,
    network: Network,
    schedules: Vec<Schedule>,
    controllers: Vec<Controller>,
    minute: usize,
    balanced: bool,
}

impl Simulation {
    pub fn new(
        name: impl Into<String>,
        network: Network,
        schedules: Vec<Schedule>,
        controllers: Vec<Controller>,
    ) -> Self {
        Self {
            name: name.into(),
            network,
            schedules,
            controllers,
            minute: 0,
            balanced: false,
        }
    }

    pub fn from_scenario(scenario: &Scenario) -> SimResult<Self> {
        pf_project::validate_scenario(scenario).map_err(pf_project::ProjectError::from)?;
        let network = pf_project::build_network(scenario)?;
        let schedules = scenario
            .schedules
            .iter()
            .map(|def| Schedule::from_def(def, &network))
            .collect::<SimResult<Vec<_>>>()?;
        let controllers = scenario
            .controllers
            .iter()
            .map(|def| Controller::from_def(def, &network))
            .collect::<SimResult<Vec<_>>>()?;
        Ok(Self::new(&scenario.name, network, schedules, controllers))
    }

    pub fn network(&self) -> &Network {
        &self.network
    }

    pub fn controllers(&self) -> &[Controller] {
        &self.controllers
    }

    /// Minute the next call to [`step`](Self::step) simulates.
    pub fn minute(&self) -> usize {
        self.minute
    }

    pub fn step(&mut self) -> SimResult<StepRecord> {
        let minute = self.minute;
        for schedule in &self.schedules {
            schedule.apply(minute, &mut self.network)?;
        }

        // controllers read the previous balance, so they sit out the first step
        let mut control_actions = Vec::new();
        if self.balanced {
            let measured = self
                .controllers
                .iter()
                .map(|c| c.measurement.read(&self.network))
                .collect::<SimResult<Vec<_>>>()?;
            for (controller, mv) in self.controllers.iter_mut().zip(measured) {
                for (target, value) in controller.step(mv, &mut self.network)? {
                    control_actions.push((controller.id.clone(), target, value));
                }
            }
        }

        let report = self.network.solve()?;
        self.balanced = true;
        if report.converged {
            debug!(minute, iterations = report.iterations, "step balanced");
        } else {
            warn!(
                scenario = %self.name,
                minute,
                residual = report.residual,
                "step did not converge; keeping best estimate"
            );
        }

        self.minute += 1;
        Ok(StepRecord::new(minute, report, control_actions))
    }

    pub fn run(&mut self, steps: usize, record_every: usize) -> SimResult<SimRecord> {
        if steps == 0 {
            return Err(SimError::InvalidArg {
                what: "steps must be positive",
            });
        }
        let record_every = record_every.max(1);
        info!(scenario = %self.name, steps, "simulation started");

        let mut record = SimRecord {
            scenario: self.name.clone(),
            steps: Vec::with_capacity(steps / record_every + 1),
        };
        for i in 0..steps {
            let step = self.step()?;
            if (i + 1) % record_every == 0 || i + 1 == steps {
                record.steps.push(step);
            }
        }

        info!(
            scenario = %self.name,
            recorded = record.steps.len(),
            unconverged = record.unconverged().count(),
            energy_kwh = record.energy_kwh(),
            "simulation finished"
        );
        Ok(record)
    }
}

/// Build and run `scenario` for its configured horizon, or `opts.steps`.
pub fn run_scenario(scenario: &Scenario, opts: &SimOptions) -> SimResult<SimRecord> {
    let mut sim = Simulation::from_scenario(scenario)?;
    let steps = opts.steps.unwrap_or(scenario.simulation.steps);
    sim.run(steps, opts.record_every)
}

/// One balance at the scenario's initial signals.
pub fn solve_scenario(scenario: &Scenario) -> SimResult<BalanceReport> {
    pf_project::validate_scenario(scenario).map_err(pf_project::ProjectError::from)?;
    let mut network = pf_project::build_network(scenario)?;
    Ok(network.solve()?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sim_options_defaults() {
        let opts = SimOptions::default();
        assert_eq!(opts.steps, None);
        assert_eq!(opts.record_every, 0);
    }

    #[test]
    fn empty_record_has_no_energy() {
        let record = SimRecord::default();
        assert_eq!(record.energy_kwh(), 0.0);
        assert_eq!(record.unconverged().count(), 0);
        assert!(record.flow_series("pump").is_empty());
    }
}
