//! Error types for solver set-up.

use pf_components::ComponentError;
use pf_core::PfError;
use pf_graph::GraphError;
use thiserror::Error;

/// Errors raised while assembling or configuring a network.
///
/// A solve that fails to balance is not an error; see
/// [`BalanceReport::converged`](crate::BalanceReport).
#[derive(Error, Debug)]
pub enum SolverError {
    #[error("Problem setup error: {what}")]
    ProblemSetup { what: String },

    #[error("Invalid solver configuration: {what}")]
    Config { what: &'static str },

    #[error("Branch '{branch}' does not join the reference branch's headers")]
    NotALoop { branch: String },

    #[error("{free} free headers exceed the limit of {max}")]
    TooManyHeaders { free: usize, max: usize },

    #[error("Unknown {what}: {id}")]
    Unknown { what: &'static str, id: String },

    #[error("Component error: {0}")]
    Component(#[from] ComponentError),

    #[error("Graph error: {0}")]
    Graph(#[from] GraphError),

    #[error("Numeric error: {0}")]
    Numeric(#[from] PfError),
}

pub type SolverResult<T> = Result<T, SolverError>;

impl From<SolverError> for PfError {
    fn from(e: SolverError) -> Self {
        match e {
            SolverError::ProblemSetup { what: _ } => PfError::InvalidArg {
                what: "problem setup",
            },
            SolverError::Config { what } => PfError::InvalidArg { what },
            SolverError::NotALoop { .. } => PfError::InvalidArg {
                what: "loop topology",
            },
            SolverError::TooManyHeaders { .. } => PfError::InvalidArg {
                what: "free header count",
            },
            SolverError::Unknown { what, .. } => PfError::InvalidArg { what },
            SolverError::Component(e) => e.into(),
            SolverError::Graph(e) => e.into(),
            SolverError::Numeric(e) => e,
        }
    }
}
