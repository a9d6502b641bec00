//! Error types for controller configuration.

use pf_core::PfError;
use thiserror::Error;

/// Result type for controller operations.
pub type ControlResult<T> = Result<T, ControlError>;

/// Errors raised when a controller is configured.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ControlError {
    /// Invalid argument provided to a controller constructor.
    #[error("Invalid argument: {what}")]
    InvalidArg { what: &'static str },

    /// Staging thresholds are inconsistent.
    #[error("Invalid staging thresholds: {what}")]
    Thresholds { what: String },
}

impl From<PfError> for ControlError {
    fn from(e: PfError) -> Self {
        match e {
            PfError::NonFinite { what, .. }
            | PfError::InvalidArg { what }
            | PfError::Invariant { what } => ControlError::InvalidArg { what },
        }
    }
}
