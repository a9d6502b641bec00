//! Time-stepped simulation of plantflow networks.
//!
//! Provides:
//! - Step-hold schedules of branch control signals
//! - Controllers bound to branch inputs and network measurements
//! - A one-minute step loop that balances the network each step
//! - Parallel batch runs over independent scenarios

pub mod batch;
pub mod controllers;
pub mod error;
pub mod schedule;
pub mod sim;

pub use batch::{run_batch, solve_batch};
pub use controllers::{ControlLaw, Controller, Measurement};
pub use error::{SimError, SimResult};
pub use schedule::Schedule;
pub use sim::{SimOptions, SimRecord, Simulation, StepRecord, run_scenario, solve_scenario};
