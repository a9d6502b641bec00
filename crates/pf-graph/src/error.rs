//! Topology construction and validation errors.

use pf_core::{BranchId, HeaderId, PfError};
use thiserror::Error;

pub type GraphResult<T> = Result<T, GraphError>;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GraphError {
    #[error("Topology has no headers")]
    Empty,

    #[error("Link {link} refers to non-existent header {header}")]
    InvalidHeaderRef { link: BranchId, header: HeaderId },

    #[error("Link {link} starts and ends at header {header}")]
    SelfLoop { link: BranchId, header: HeaderId },

    #[error("Header {header} ({name}) has no links")]
    IsolatedHeader { header: HeaderId, name: String },

    #[error("Header {header} ({name}) is not connected to the first header")]
    Disconnected { header: HeaderId, name: String },

    #[error("Duplicate {what} name: {name}")]
    DuplicateName { what: &'static str, name: String },

    #[error("{what} not found: {name}")]
    NotFound { what: &'static str, name: String },
}

impl From<GraphError> for PfError {
    fn from(err: GraphError) -> Self {
        match err {
            GraphError::Empty => PfError::InvalidArg {
                what: "topology has no headers",
            },
            GraphError::InvalidHeaderRef { .. } | GraphError::NotFound { .. } => {
                PfError::InvalidArg {
                    what: "link refers to an unknown header",
                }
            }
            _ => PfError::Invariant {
                what: "topology validation failed",
            },
        }
    }
}
