//! Feedback controllers for plantflow simulations.
//!
//! Controllers are split into an immutable configuration and a state
//! value; `update` takes the previous state and returns the next one with
//! the new output. One call is one sample (one simulated minute).
//!
//! - [`PiController`]: incremental, rate-limited PI with integral reset
//! - [`UnitStaging`]: number of running units with hysteresis and dwell
//! - [`BypassSwitch`]: pump PI that hands over to a bypass valve PI

pub mod bypass;
pub mod error;
pub mod pi;
pub mod staging;

pub use bypass::{BypassSwitch, BypassSwitchState, SwitchOutput};
pub use error::{ControlError, ControlResult};
pub use pi::{Action, PiController, PiState};
pub use staging::{StagingState, UnitStaging};
