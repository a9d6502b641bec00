//! Scenario schema definitions.

use serde::{Deserialize, Serialize};

use pf_components::{DamperCurve, MachineCurve, PressureUnit, SignalTarget};
use pf_controls::{BypassSwitch, PiController, UnitStaging};
use pf_solver::BalanceConfig;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Scenario {
    pub version: u32,
    pub name: String,
    pub headers: Vec<HeaderDef>,
    /// Header held at gauge 0.
    pub reference: String,
    #[serde(default)]
    pub branches: Vec<BranchDef>,
    #[serde(default)]
    pub solver: BalanceConfig,
    #[serde(default)]
    pub simulation: SimulationDef,
    #[serde(default)]
    pub schedules: Vec<ScheduleDef>,
    #[serde(default)]
    pub controllers: Vec<ControllerDef>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HeaderDef {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BranchDef {
    pub id: String,
    /// Upstream header; positive flow runs `from -> to`.
    pub from: String,
    pub to: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mover: Option<MoverDef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub throttle: Option<ThrottleDef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bypass: Option<BypassDef>,
    #[serde(default)]
    pub k_pipe: f64,
    #[serde(default)]
    pub k_equipment: f64,
    /// Pump-up height in metres of water.
    #[serde(default)]
    pub static_head_m: f64,
}

/// Omitting `curve` selects the standard machine of that kind.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type")]
pub enum MoverDef {
    Pump {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        curve: Option<MachineCurve>,
        #[serde(default = "full")]
        speed: f64,
    },
    Fan {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        curve: Option<MachineCurve>,
        #[serde(default)]
        unit: PressureUnit,
        #[serde(default = "full")]
        speed: f64,
    },
    ParallelPumps {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        curve: Option<MachineCurve>,
        #[serde(default = "full")]
        speed: f64,
        num_pumps: usize,
        /// Loss on each pump's own leg.
        #[serde(default)]
        k_pump_leg: f64,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        bypass: Option<BypassDef>,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type")]
pub enum ThrottleDef {
    Valve(ValveDef),
    Damper {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        curves: Option<Vec<DamperCurve>>,
        #[serde(default = "full")]
        opening: f64,
    },
}

/// Equal-percentage valve; missing sizes fall back to Cv 800, rangeability 100.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ValveDef {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cv_max: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rangeability: Option<f64>,
    #[serde(default = "full")]
    pub opening: f64,
}

/// Recirculation valve across the pumps; shut unless `opening` is given.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BypassDef {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cv_max: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rangeability: Option<f64>,
    #[serde(default)]
    pub opening: f64,
    #[serde(default)]
    pub k_leg: f64,
}

impl BypassDef {
    pub fn valve(&self) -> ValveDef {
        ValveDef {
            cv_max: self.cv_max,
            rangeability: self.rangeability,
            opening: self.opening,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SimulationDef {
    /// Number of one-minute steps.
    pub steps: usize,
}

impl Default for SimulationDef {
    fn default() -> Self {
        Self { steps: 60 }
    }
}

/// Step-hold schedule: each point's value holds until the next point.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ScheduleDef {
    pub branch: String,
    pub target: SignalTarget,
    pub points: Vec<SchedulePointDef>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct SchedulePointDef {
    pub minute: usize,
    pub value: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type")]
pub enum MeasurementDef {
    BranchFlow { branch: String },
    PressureDifference { high: String, low: String },
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ControllerDef {
    pub id: String,
    pub measurement: MeasurementDef,
    pub kind: ControllerKindDef,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type")]
pub enum ControllerKindDef {
    Pi {
        controller: PiController,
        setpoint: f64,
        branch: String,
        target: SignalTarget,
    },
    /// Drives the running-unit count of a parallel pump branch from
    /// `measurement / design`, typically a part-load ratio.
    Staging {
        staging: UnitStaging,
        branch: String,
        #[serde(default = "default_design")]
        design: f64,
    },
    /// Pump speed with hand-over to the bypass valve of the same branch.
    BypassSwitch {
        switch: BypassSwitch,
        setpoint: f64,
        branch: String,
    },
}

fn default_design() -> f64 {
    1.0
}

fn full() -> f64 {
    1.0
}

impl ControllerKindDef {
    /// Branch whose signals the controller writes.
    pub fn branch(&self) -> &str {
        match self {
            ControllerKindDef::Pi { branch, .. }
            | ControllerKindDef::Staging { branch, .. }
            | ControllerKindDef::BypassSwitch { branch, .. } => branch,
        }
    }
}
