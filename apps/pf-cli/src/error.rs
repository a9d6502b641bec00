//! Error type for the command-line front end.

use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum CliError {
    #[error("Project error: {0}")]
    Project(String),

    #[error("Solver error: {0}")]
    Solver(String),

    #[error("Simulation error: {0}")]
    Simulation(String),

    #[error("Failed to write output file: {path}")]
    OutputWrite {
        path: PathBuf,
        source: pf_project::ProjectError,
    },

    #[error("{failed} of {total} scenarios failed")]
    Batch { failed: usize, total: usize },
}

pub type CliResult<T> = Result<T, CliError>;

impl From<pf_project::ProjectError> for CliError {
    fn from(err: pf_project::ProjectError) -> Self {
        CliError::Project(err.to_string())
    }
}

impl From<pf_solver::SolverError> for CliError {
    fn from(err: pf_solver::SolverError) -> Self {
        CliError::Solver(err.to_string())
    }
}

impl From<pf_sim::SimError> for CliError {
    fn from(err: pf_sim::SimError) -> Self {
        CliError::Simulation(err.to_string())
    }
}
