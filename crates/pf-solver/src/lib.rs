//! Hydraulic network balance for plantflow.
//!
//! Two solvers share the same branch contract:
//! - [`LoopBalance`]: bisection on the flow of a reference branch, for
//!   branches that all join the same two headers
//! - [`Network::solve`]: nested bisection on header pressures, for general
//!   topologies with a handful of free headers
//!
//! A solve that does not converge is not an error. The best guess is kept
//! and the report carries [`Fault::IterationExhausted`](pf_components::Fault).

pub mod config;
pub mod error;
pub mod loop_balance;
pub mod network;
pub mod report;

pub use config::BalanceConfig;
pub use error::{SolverError, SolverResult};
pub use loop_balance::{LoopBalance, LoopOutcome};
pub use network::Network;
pub use report::{BalanceReport, BranchReport, HeaderReport};
