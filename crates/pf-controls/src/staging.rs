//! Unit-count staging with hysteresis and a dwell window.
//!
//! With `n` units running, a measurement above `thresholds_up[n - 1]` asks
//! for one more unit and a measurement below `thresholds_down[n - 2]` asks
//! for one fewer. The count only moves once every request in the last
//! `dwell` samples agrees.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use crate::error::{ControlError, ControlResult};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnitStaging {
    /// `thresholds_up[i]` stages from `i + 1` to `i + 2` units.
    pub thresholds_up: Vec<f64>,
    /// `thresholds_down[i]` destages from `i + 2` to `i + 1` units.
    pub thresholds_down: Vec<f64>,
    /// Samples a request must persist.
    pub dwell: usize,
}

impl Default for UnitStaging {
    fn default() -> Self {
        Self {
            thresholds_up: vec![0.5, 1.0],
            thresholds_down: vec![0.4, 0.9],
            dwell: 15,
        }
    }
}

impl UnitStaging {
    pub fn new(
        thresholds_up: Vec<f64>,
        thresholds_down: Vec<f64>,
        dwell: usize,
    ) -> ControlResult<Self> {
        let staging = Self {
            thresholds_up,
            thresholds_down,
            dwell,
        };
        staging.validate()?;
        Ok(staging)
    }

    pub fn validate(&self) -> ControlResult<()> {
        if self.dwell == 0 {
            return Err(ControlError::InvalidArg {
                what: "dwell must be at least one sample",
            });
        }
        if self.thresholds_up.len() != self.thresholds_down.len() {
            return Err(ControlError::Thresholds {
                what: format!(
                    "{} up thresholds but {} down thresholds",
                    self.thresholds_up.len(),
                    self.thresholds_down.len()
                ),
            });
        }
        for (i, (&up, &down)) in self
            .thresholds_up
            .iter()
            .zip(&self.thresholds_down)
            .enumerate()
        {
            if !(up.is_finite() && down.is_finite()) {
                return Err(ControlError::Thresholds {
                    what: format!("stage {} threshold is not finite", i + 1),
                });
            }
            if down >= up {
                return Err(ControlError::Thresholds {
                    what: format!("stage {}: down {down} must sit below up {up}", i + 1),
                });
            }
        }
        Ok(())
    }

    pub fn max_units(&self) -> usize {
        self.thresholds_up.len() + 1
    }

    /// Fresh state running `units`, clamped to `1..=max_units()`.
    pub fn state(&self, units: usize) -> StagingState {
        let units = units.clamp(1, self.max_units());
        StagingState {
            units,
            requests: VecDeque::from(vec![units; self.dwell]),
        }
    }

    /// Units wanted for `measure` at the current count.
    pub fn request(&self, units: usize, measure: f64) -> usize {
        if units < self.max_units() && measure > self.thresholds_up[units - 1] {
            units + 1
        } else if units > 1 && measure < self.thresholds_down[units - 2] {
            units - 1
        } else {
            units
        }
    }

    pub fn update(&self, state: &StagingState, measure: f64) -> (StagingState, usize) {
        let mut next = state.clone();
        let wanted = self.request(state.units, measure);
        next.requests.pop_back();
        next.requests.push_front(wanted);

        if next.requests.iter().all(|&r| r > state.units) {
            next.units = state.units + 1;
        } else if next.requests.iter().all(|&r| r < state.units) {
            next.units = state.units - 1;
        }
        let units = next.units;
        (next, units)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StagingState {
    pub units: usize,
    /// Most recent first.
    requests: VecDeque<usize>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn staging(dwell: usize) -> UnitStaging {
        UnitStaging::new(vec![5.0, 10.0], vec![4.0, 9.0], dwell).unwrap()
    }

    #[test]
    fn stages_up_after_dwell() {
        let s = staging(3);
        let mut state = s.state(1);
        let mut counts = Vec::new();
        for _ in 0..4 {
            let (next, n) = s.update(&state, 6.0);
            state = next;
            counts.push(n);
        }
        assert_eq!(counts, [1, 1, 2, 2]);
    }

    #[test]
    fn hysteresis_band_holds() {
        let s = staging(1);
        let state = s.state(2);
        // between down[0] = 4 and up[1] = 10 nothing changes
        for m in [4.5, 7.0, 9.9] {
            assert_eq!(s.update(&state, m).1, 2);
        }
        assert_eq!(s.update(&state, 3.9).1, 1);
        assert_eq!(s.update(&state, 10.1).1, 3);
    }

    #[test]
    fn interrupted_request_resets_dwell() {
        let s = staging(3);
        let mut state = s.state(1);
        for m in [6.0, 6.0, 4.5, 6.0, 6.0] {
            state = s.update(&state, m).0;
        }
        assert_eq!(state.units, 1);
        state = s.update(&state, 6.0).0;
        assert_eq!(state.units, 2);
    }

    #[test]
    fn count_is_bounded() {
        let s = staging(1);
        let mut state = s.state(9);
        assert_eq!(state.units, 3);
        state = s.update(&state, 100.0).0;
        assert_eq!(state.units, 3);
        let mut state = s.state(0);
        assert_eq!(state.units, 1);
        state = s.update(&state, -100.0).0;
        assert_eq!(state.units, 1);
    }

    #[test]
    fn rejects_bad_thresholds() {
        assert!(UnitStaging::new(vec![5.0], vec![4.0, 3.0], 1).is_err());
        assert!(UnitStaging::new(vec![5.0], vec![6.0], 1).is_err());
        assert!(UnitStaging::new(vec![5.0], vec![4.0], 0).is_err());
        assert!(UnitStaging::new(vec![f64::NAN], vec![4.0], 1).is_err());
    }

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn moves_one_unit_at_a_time(measures in prop::collection::vec(0.0f64..15.0, 1..100)) {
                let s = staging(2);
                let mut state = s.state(1);
                for m in measures {
                    let before = state.units;
                    state = s.update(&state, m).0;
                    prop_assert!(state.units.abs_diff(before) <= 1);
                    prop_assert!((1..=3).contains(&state.units));
                }
            }
        }
    }
}
