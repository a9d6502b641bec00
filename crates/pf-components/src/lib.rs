//! pf-components: hydraulic devices and the branches built from them.
//!
//! Every element implements [`Characteristic`]: a flow/pressure curve set by a
//! control signal, with forward (`f2p`) and inverse (`p2f`) evaluation.
//!
//! - [`Valve`], [`Damper`]: passive throttles, signed loss valid in both directions
//! - [`Pump`], [`Fan`]: speed-controlled movers, forward flow only
//! - [`ParallelPumpUnit`]: identical pumps in parallel with an optional bypass
//! - [`Branch`]: one mover and one throttle in series with fixed losses and static head

pub mod branch;
pub mod damper;
pub mod error;
pub mod fan;
pub mod fault;
pub mod parallel;
pub mod polynomial;
pub mod pump;
pub mod quadratic;
pub mod rotating;
pub mod traits;
pub mod valve;

pub use branch::{Branch, BranchBuilder, Mover, SignalTarget, Throttle};
pub use damper::{Damper, DamperCurve};
pub use error::{ComponentError, ComponentResult};
pub use fan::{FAN_MOTOR_EFFICIENCY, Fan, PressureUnit};
pub use fault::Fault;
pub use parallel::ParallelPumpUnit;
pub use polynomial::Polynomial;
pub use pump::Pump;
pub use quadratic::{RootSolution, quadratic_root, real_roots};
pub use rotating::{MachineCurve, PowerReport};
pub use traits::{CLOSED_PRESSURE_SENTINEL, Characteristic, OperatingPoint, Regime};
pub use valve::{CV_TO_K, Valve};
