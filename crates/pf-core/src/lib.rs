//! pf-core: stable foundation for plantflow.
//!
//! Contains:
//! - units (uom SI types + constructors, static head conversion)
//! - numeric (Real + tolerances + float helpers)
//! - bisection (bracketed scalar root search used by the network solver)
//! - ids (compact IDs for headers and branches)
//! - error (shared error types)

pub mod bisection;
pub mod error;
pub mod ids;
pub mod numeric;
pub mod units;

pub use bisection::{Bisection, BisectionConfig, BisectionOutcome, BisectionState, Slope};
pub use error::{PfError, PfResult};
pub use ids::*;
pub use numeric::*;
pub use units::*;
