//! Controllers bound to a network: what they measure and which inputs they drive.

use pf_components::{Characteristic, SignalTarget};
use pf_controls::{
    BypassSwitch, BypassSwitchState, PiController, PiState, StagingState, UnitStaging,
};
use pf_core::{BranchId, HeaderId};
use pf_project::{ControllerDef, ControllerKindDef, MeasurementDef};
use pf_solver::Network;

use crate::error::{SimError, SimResult};

/// Process variable read from the last balance.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Measurement {
    BranchFlow(BranchId),
    PressureDifference { high: HeaderId, low: HeaderId },
}

impl Measurement {
    pub fn from_def(def: &MeasurementDef, network: &Network) -> SimResult<Self> {
        let topo = network.topology();
        match def {
            MeasurementDef::BranchFlow { branch } => topo
                .link_by_name(branch)
                .map(Measurement::BranchFlow)
                .ok_or_else(|| unknown("measured branch", branch)),
            MeasurementDef::PressureDifference { high, low } => {
                let high_id = topo
                    .header_by_name(high)
                    .ok_or_else(|| unknown("measured header", high))?;
                let low_id = topo
                    .header_by_name(low)
                    .ok_or_else(|| unknown("measured header", low))?;
                Ok(Measurement::PressureDifference {
                    high: high_id,
                    low: low_id,
                })
            }
        }
    }

    pub fn read(&self, network: &Network) -> SimResult<f64> {
        match *self {
            Measurement::BranchFlow(id) => network
                .branch(id)
                .map(|b| b.operating_point().flow)
                .ok_or_else(|| unknown("branch", &id.to_string())),
            Measurement::PressureDifference { high, low } => network
                .pressure_difference(high, low)
                .ok_or_else(|| unknown("header", &high.to_string())),
        }
    }
}

#[derive(Clone, Debug)]
pub enum ControlLaw {
    Pi {
        pi: PiController,
        state: PiState,
        setpoint: f64,
        target: SignalTarget,
    },
    Staging {
        staging: UnitStaging,
        state: StagingState,
        design: f64,
    },
    BypassSwitch {
        switch: BypassSwitch,
        state: BypassSwitchState,
        setpoint: f64,
    },
}

/// One controller acting on one branch.
#[derive(Clone, Debug)]
pub struct Controller {
    pub id: String,
    pub branch: BranchId,
    pub measurement: Measurement,
    pub law: ControlLaw,
}

impl Controller {
    /// Binds `def` to `network`, seeding state from the branch's current signals.
    pub fn from_def(def: &ControllerDef, network: &Network) -> SimResult<Self> {
        let measurement = Measurement::from_def(&def.measurement, network)?;
        let branch_name = def.kind.branch();
        let branch = network
            .topology()
            .link_by_name(branch_name)
            .ok_or_else(|| unknown("controlled branch", branch_name))?;
        let current = |target: SignalTarget| {
            network
                .branch(branch)
                .and_then(|b| b.signal(target))
                .ok_or(SimError::InvalidArg {
                    what: "controlled branch lacks the driven input",
                })
        };

        let law = match &def.kind {
            ControllerKindDef::Pi {
                controller,
                setpoint,
                target,
                ..
            } => {
                controller.validate()?;
                ControlLaw::Pi {
                    state: controller.state(current(*target)?),
                    pi: controller.clone(),
                    setpoint: *setpoint,
                    target: *target,
                }
            }
            ControllerKindDef::Staging {
                staging, design, ..
            } => {
                staging.validate()?;
                let units = current(SignalTarget::RunningUnits)?.round() as usize;
                ControlLaw::Staging {
                    state: staging.state(units),
                    staging: staging.clone(),
                    design: *design,
                }
            }
            ControllerKindDef::BypassSwitch {
                switch, setpoint, ..
            } => {
                current(SignalTarget::Bypass)?;
                let switch =
                    BypassSwitch::new(switch.pump.clone(), switch.valve.clone(), switch.dwell)?;
                ControlLaw::BypassSwitch {
                    state: switch.state(current(SignalTarget::Mover)?),
                    switch,
                    setpoint: *setpoint,
                }
            }
        };

        Ok(Self {
            id: def.id.clone(),
            branch,
            measurement,
            law,
        })
    }

    /// Advances one sample on `measured` and writes the outputs to the branch.
    pub fn step(
        &mut self,
        measured: f64,
        network: &mut Network,
    ) -> SimResult<Vec<(SignalTarget, f64)>> {
        let outputs = match &mut self.law {
            ControlLaw::Pi {
                pi,
                state,
                setpoint,
                target,
            } => {
                let (next, out) = pi.update(state, *setpoint, measured);
                *state = next;
                vec![(*target, out)]
            }
            ControlLaw::Staging {
                staging,
                state,
                design,
            } => {
                let (next, units) = staging.update(state, measured / *design);
                *state = next;
                vec![(SignalTarget::RunningUnits, units as f64)]
            }
            ControlLaw::BypassSwitch {
                switch,
                state,
                setpoint,
            } => {
                let (next, out) = switch.update(state, *setpoint, measured);
                *state = next;
                vec![
                    (SignalTarget::Mover, out.pump_speed),
                    (SignalTarget::Bypass, out.bypass_opening),
                ]
            }
        };

        let branch = network
            .branch_mut(self.branch)
            .ok_or_else(|| unknown("branch", &self.branch.to_string()))?;
        for &(target, value) in &outputs {
            branch.set_signal(target, value)?;
        }
        Ok(outputs)
    }
}

fn unknown(what: &'static str, id: &str) -> SimError {
    SimError::Unknown {
        what,
        id: id.to_string(),
    }
}
