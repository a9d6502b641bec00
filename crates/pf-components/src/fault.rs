//! Non-fatal data-quality flags recorded on operating points.

use core::fmt;

use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Fault {
    /// A rotating machine was asked to run at reverse flow; flow held at zero.
    NoFlow,
    /// Head came out negative and was clipped to zero.
    NegativeHead,
    /// Efficiency came out non-positive; power reported as zero.
    NonPositiveEfficiency,
    /// The characteristic has no real root for the requested pressure.
    NoRoot,
    /// Both roots are negative.
    NegativeRoot,
    /// Closed throttle or stopped mover.
    DeviceDisabled,
    /// Network bisection hit its iteration cap; best guess kept.
    IterationExhausted,
}

impl fmt::Display for Fault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Fault::NoFlow => "NO_FLOW",
            Fault::NegativeHead => "NEGATIVE_HEAD",
            Fault::NonPositiveEfficiency => "NONPOSITIVE_EFFICIENCY",
            Fault::NoRoot => "NO_ROOT",
            Fault::NegativeRoot => "NEGATIVE_ROOT",
            Fault::DeviceDisabled => "DEVICE_DISABLED",
            Fault::IterationExhausted => "ITERATION_EXHAUSTED",
        };
        f.write_str(s)
    }
}
