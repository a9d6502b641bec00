//! Independent scenarios solved in parallel.

use rayon::prelude::*;

use pf_project::Scenario;
use pf_solver::BalanceReport;

use crate::error::SimResult;
use crate::sim::{SimOptions, SimRecord, run_scenario, solve_scenario};

/// Runs every scenario on its own network; results keep input order.
pub fn run_batch(scenarios: &[Scenario], opts: &SimOptions) -> Vec<SimResult<SimRecord>> {
    scenarios
        .par_iter()
        .map(|scenario| run_scenario(scenario, opts))
        .collect()
}

/// Single balance of every scenario at its initial signals.
pub fn solve_batch(scenarios: &[Scenario]) -> Vec<SimResult<BalanceReport>> {
    scenarios.par_iter().map(solve_scenario).collect()
}
