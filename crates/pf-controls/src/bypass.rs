//! Pump speed control that hands over to a bypass valve at minimum speed.
//!
//! While the bypass is shut the pump controller runs. Once the pump has sat
//! at its minimum speed for `dwell` samples the bypass opens, the pump is
//! pinned at minimum, and the valve controller takes over. The bypass shuts
//! again after the valve has sat at its minimum for `dwell` samples. Both
//! integral sums are cleared at each hand-over.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use crate::error::{ControlError, ControlResult};
use crate::pi::{PiController, PiState};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BypassSwitch {
    pub pump: PiController,
    pub valve: PiController,
    pub dwell: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SwitchOutput {
    pub pump_speed: f64,
    pub bypass_opening: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BypassSwitchState {
    pub pump: PiState,
    pub valve: PiState,
    pub bypass_open: bool,
    /// Most recent first; `true` votes for an open bypass.
    votes: VecDeque<bool>,
}

impl BypassSwitch {
    pub fn new(pump: PiController, valve: PiController, dwell: usize) -> ControlResult<Self> {
        pump.validate()?;
        valve.validate()?;
        if dwell == 0 {
            return Err(ControlError::InvalidArg {
                what: "dwell must be at least one sample",
            });
        }
        Ok(Self { pump, valve, dwell })
    }

    /// Bypass shut, pump at `pump_speed`.
    pub fn state(&self, pump_speed: f64) -> BypassSwitchState {
        BypassSwitchState {
            pump: self.pump.state(pump_speed),
            valve: self.valve.state(0.0),
            bypass_open: false,
            votes: VecDeque::from(vec![false; self.dwell]),
        }
    }

    pub fn update(
        &self,
        state: &BypassSwitchState,
        sv: f64,
        mv: f64,
    ) -> (BypassSwitchState, SwitchOutput) {
        let mut next = state.clone();

        // votes read last sample's outputs
        let vote = if state.bypass_open {
            state.valve.output != self.valve.out_min
        } else {
            state.pump.output == self.pump.out_min
        };
        next.votes.pop_back();
        next.votes.push_front(vote);

        if state.bypass_open && next.votes.iter().all(|&v| !v) {
            next.bypass_open = false;
            next.pump.reset_integral();
            next.valve.reset_integral();
        } else if !state.bypass_open && next.votes.iter().all(|&v| v) {
            next.bypass_open = true;
            next.pump.reset_integral();
            next.valve.reset_integral();
        }

        if next.bypass_open {
            next.valve = self.valve.update(&next.valve, sv, mv).0;
            next.pump.output = self.pump.out_min;
        } else {
            next.valve.output = 0.0;
            next.pump = self.pump.update(&next.pump, sv, mv).0;
        }

        let out = SwitchOutput {
            pump_speed: next.pump.output,
            bypass_opening: next.valve.output,
        };
        (next, out)
    }
}
