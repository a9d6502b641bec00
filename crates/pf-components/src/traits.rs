//! The flow/pressure contract shared by devices and branches.

use serde::{Deserialize, Serialize};

use crate::fault::Fault;
use crate::polynomial::Polynomial;

/// Pressure reported by a closed throttle, kPa.
pub const CLOSED_PRESSURE_SENTINEL: f64 = -99_999_999.0;

/// Snapshot of the last evaluation.
///
/// `pressure_delta` is a rise in the positive flow direction; a loss is negative.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct OperatingPoint {
    pub flow: f64,
    pub pressure_delta: f64,
    pub control_signal: f64,
    pub fault: Option<Fault>,
}

/// How a characteristic responds to flow at its current control signal.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Regime {
    /// Nothing passes (closed throttle, stopped mover with no bypass).
    Blocked,
    /// Signed loss `-k g|g|`, valid in both directions.
    Passive { k: f64 },
    /// Driven forward-only curve.
    Driven,
}

/// Flow/pressure characteristic parameterised by a control signal in `0..=1`.
///
/// `f2p` and `p2f` record their result; read it back with `operating_point`.
/// Neither ever fails: degenerate cases are flagged with a [`Fault`].
pub trait Characteristic {
    fn name(&self) -> &str;

    fn control_signal(&self) -> f64;

    /// Clamped to `0..=1`.
    fn set_control_signal(&mut self, signal: f64);

    fn regime(&self) -> Regime;

    /// Flow -> pressure rise.
    fn f2p(&mut self, flow: f64) -> f64;

    /// Pressure rise -> flow.
    fn p2f(&mut self, pressure_delta: f64) -> f64;

    /// Local flow -> pressure polynomial at the current signal, valid for `g >= 0`.
    ///
    /// `None` when the element is blocked or has no closed form.
    fn f2p_co(&self) -> Option<Polynomial>;

    fn operating_point(&self) -> OperatingPoint;
}

pub(crate) fn clamp_signal(signal: f64) -> f64 {
    if signal.is_nan() {
        0.0
    } else {
        signal.clamp(0.0, 1.0)
    }
}
