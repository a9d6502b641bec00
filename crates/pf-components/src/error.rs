//! Error types for component construction.
//!
//! Evaluation never fails: numeric trouble at solve time is reported as a
//! [`Fault`](crate::Fault) on the operating point instead.

use pf_core::PfError;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ComponentError {
    #[error("Non-finite value for {what}: {value}")]
    NonFinite { what: &'static str, value: f64 },

    #[error("Non-physical value: {what}")]
    NonPhysical { what: &'static str },

    #[error("Invalid argument: {what}")]
    InvalidArg { what: &'static str },

    #[error("Incompatible branch layout: {what}")]
    Incompatible { what: &'static str },
}

pub type ComponentResult<T> = Result<T, ComponentError>;

impl From<PfError> for ComponentError {
    fn from(e: PfError) -> Self {
        match e {
            PfError::NonFinite { what, value } => ComponentError::NonFinite { what, value },
            PfError::InvalidArg { what } | PfError::Invariant { what } => {
                ComponentError::InvalidArg { what }
            }
        }
    }
}

impl From<ComponentError> for PfError {
    fn from(e: ComponentError) -> Self {
        match e {
            ComponentError::NonFinite { what, value } => PfError::NonFinite { what, value },
            ComponentError::NonPhysical { what }
            | ComponentError::InvalidArg { what }
            | ComponentError::Incompatible { what } => PfError::InvalidArg { what },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let err = ComponentError::NonPhysical {
            what: "rangeability",
        };
        assert!(err.to_string().contains("rangeability"));
    }

    #[test]
    fn error_conversion() {
        let comp_err = ComponentError::Incompatible {
            what: "fan with valve",
        };
        let pf_err: PfError = comp_err.into();
        assert!(matches!(pf_err, PfError::InvalidArg { .. }));

        let back: ComponentError = PfError::NonFinite {
            what: "k",
            value: f64::NAN,
        }
        .into();
        assert!(matches!(back, ComponentError::NonFinite { what: "k", .. }));
    }
}
