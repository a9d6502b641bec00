//! Error types for simulation runs.

use thiserror::Error;

/// Errors encountered while setting up or stepping a simulation.
///
/// Unconverged balances are not errors; they are flagged on the step record.
#[derive(Error, Debug)]
pub enum SimError {
    #[error("Invalid argument: {what}")]
    InvalidArg { what: &'static str },

    #[error("Unknown {what}: {id}")]
    Unknown { what: &'static str, id: String },

    #[error("Backend error: {message}")]
    Backend { message: String },
}

pub type SimResult<T> = Result<T, SimError>;

impl From<pf_solver::SolverError> for SimError {
    fn from(e: pf_solver::SolverError) -> Self {
        SimError::Backend {
            message: e.to_string(),
        }
    }
}

impl From<pf_components::ComponentError> for SimError {
    fn from(e: pf_components::ComponentError) -> Self {
        SimError::Backend {
            message: e.to_string(),
        }
    }
}

impl From<pf_controls::ControlError> for SimError {
    fn from(e: pf_controls::ControlError) -> Self {
        SimError::Backend {
            message: e.to_string(),
        }
    }
}

impl From<pf_project::ProjectError> for SimError {
    fn from(e: pf_project::ProjectError) -> Self {
        SimError::Backend {
            message: e.to_string(),
        }
    }
}
