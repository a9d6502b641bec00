//! Incremental PI controller.
//!
//! Each sample moves the output by a bounded increment rather than
//! recomputing it from scratch:
//!
//! - `sum += sv - mv`
//! - `step = kp * ((sv - mv) + sum / ti)`, clamped to `±max_step`
//! - `output += step * sign`, clamped to `[out_min, out_max]`
//!
//! The integral sum is cleared once the error has kept one sign for
//! `reset_window` consecutive samples.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use pf_core::ensure_finite;

use crate::error::{ControlError, ControlResult};

/// How the output responds to a positive error (`sv > mv`).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    /// Output rises when the measurement is below setpoint (pump speed on pressure).
    #[default]
    Direct,
    /// Output falls when the measurement is below setpoint (bypass valve on pressure).
    Reverse,
}

impl Action {
    pub fn sign(self) -> f64 {
        match self {
            Action::Direct => 1.0,
            Action::Reverse => -1.0,
        }
    }
}

/// PI controller configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PiController {
    /// Proportional gain.
    pub kp: f64,
    /// Integral time in samples.
    pub ti: f64,
    pub out_min: f64,
    pub out_max: f64,
    /// Largest output change per sample.
    #[serde(default = "default_max_step")]
    pub max_step: f64,
    #[serde(default)]
    pub action: Action,
    /// Same-sign samples before the integral sum is cleared.
    #[serde(default = "default_reset_window")]
    pub reset_window: usize,
    /// Act on every n-th call; hold the output in between.
    #[serde(default = "default_sample_every")]
    pub sample_every: usize,
}

fn default_max_step() -> f64 {
    0.05
}

fn default_reset_window() -> usize {
    30
}

fn default_sample_every() -> usize {
    1
}

impl Default for PiController {
    fn default() -> Self {
        Self {
            kp: 0.8,
            ti: 10.0,
            out_min: 0.0,
            out_max: 1.0,
            max_step: default_max_step(),
            action: Action::Direct,
            reset_window: default_reset_window(),
            sample_every: default_sample_every(),
        }
    }
}

impl PiController {
    pub fn new(kp: f64, ti: f64, out_min: f64, out_max: f64) -> ControlResult<Self> {
        let pi = Self {
            kp,
            ti,
            out_min,
            out_max,
            ..Self::default()
        };
        pi.validate()?;
        Ok(pi)
    }

    pub fn with_action(mut self, action: Action) -> Self {
        self.action = action;
        self
    }

    pub fn with_max_step(mut self, max_step: f64) -> Self {
        self.max_step = max_step;
        self
    }

    pub fn with_reset_window(mut self, samples: usize) -> Self {
        self.reset_window = samples;
        self
    }

    pub fn with_sample_every(mut self, calls: usize) -> Self {
        self.sample_every = calls;
        self
    }

    pub fn validate(&self) -> ControlResult<()> {
        ensure_finite(self.kp, "kp")?;
        ensure_finite(self.ti, "ti")?;
        ensure_finite(self.out_min, "out_min")?;
        ensure_finite(self.out_max, "out_max")?;
        ensure_finite(self.max_step, "max_step")?;
        if self.ti <= 0.0 {
            return Err(ControlError::InvalidArg {
                what: "ti must be positive",
            });
        }
        if self.out_min >= self.out_max {
            return Err(ControlError::InvalidArg {
                what: "out_min must be less than out_max",
            });
        }
        if self.max_step <= 0.0 {
            return Err(ControlError::InvalidArg {
                what: "max_step must be positive",
            });
        }
        if self.reset_window == 0 || self.sample_every == 0 {
            return Err(ControlError::InvalidArg {
                what: "reset_window and sample_every must be at least one",
            });
        }
        Ok(())
    }

    /// Fresh state holding `output`.
    pub fn state(&self, output: f64) -> PiState {
        PiState {
            integral: 0.0,
            output: output.clamp(self.out_min, self.out_max),
            enabled: true,
            calls: 0,
            error_signs: VecDeque::from(vec![0; self.reset_window]),
        }
    }

    /// One call with setpoint `sv` and measurement `mv`.
    pub fn update(&self, state: &PiState, sv: f64, mv: f64) -> (PiState, f64) {
        let mut next = state.clone();
        if !state.enabled {
            next.output = 0.0;
            return (next, 0.0);
        }

        let act = state.calls % self.sample_every == 0;
        next.calls = (state.calls + 1) % self.sample_every;
        if !act {
            return (next, state.output);
        }

        let error = sv - mv;
        next.integral += error;
        let step =
            (self.kp * (error + next.integral / self.ti)).clamp(-self.max_step, self.max_step);
        next.output = (state.output + step * self.action.sign()).clamp(self.out_min, self.out_max);

        let sign = if error > 0.0 {
            1
        } else if error < 0.0 {
            -1
        } else {
            0
        };
        next.error_signs.pop_back();
        next.error_signs.push_front(sign);
        let persistent = next.error_signs.iter().all(|&s| s == 1)
            || next.error_signs.iter().all(|&s| s == -1);
        if persistent {
            next.integral = 0.0;
            next.error_signs.iter_mut().for_each(|s| *s = 0);
        }

        let output = next.output;
        (next, output)
    }
}

/// Mutable side of a [`PiController`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PiState {
    /// Running sum of errors.
    pub integral: f64,
    pub output: f64,
    /// A disabled controller outputs zero.
    pub enabled: bool,
    calls: usize,
    /// Most recent first.
    error_signs: VecDeque<i8>,
}

impl PiState {
    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
        if !enabled {
            self.output = 0.0;
        }
    }

    pub fn reset_integral(&mut self) {
        self.integral = 0.0;
    }
}
