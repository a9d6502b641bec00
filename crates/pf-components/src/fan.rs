//! Variable-speed fan with a cubic pressure curve.

use serde::{Deserialize, Serialize};

use crate::error::ComponentResult;
use crate::polynomial::Polynomial;
use crate::rotating::{MachineCurve, PowerReport, Rotor};
use crate::traits::{Characteristic, OperatingPoint, Regime};

/// Unit of a fan curve's pressure axis.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum PressureUnit {
    #[default]
    Kilopascal,
    Pascal,
}

impl PressureUnit {
    pub fn kpa_per_unit(self) -> f64 {
        match self {
            PressureUnit::Kilopascal => 1.0,
            PressureUnit::Pascal => 1e-3,
        }
    }
}

/// Motor loss applied to fan shaft power.
pub const FAN_MOTOR_EFFICIENCY: f64 = 0.8;

#[derive(Debug, Clone)]
pub struct Fan {
    rotor: Rotor,
}

impl Fan {
    pub fn new(
        name: impl Into<String>,
        curve: MachineCurve,
        unit: PressureUnit,
    ) -> ComponentResult<Self> {
        Ok(Self {
            rotor: Rotor::new(name.into(), curve, unit.kpa_per_unit())?,
        })
    }

    pub fn from_coefficients(
        name: impl Into<String>,
        pressure: [f64; 4],
        efficiency: [f64; 3],
        rated_efficiency: f64,
        unit: PressureUnit,
    ) -> ComponentResult<Self> {
        Self::new(
            name,
            MachineCurve {
                head: pressure,
                efficiency,
                rated_efficiency,
                motor_efficiency: FAN_MOTOR_EFFICIENCY,
            },
            unit,
        )
    }

    /// Air-handler supply fan, shutoff 0.6467 kPa.
    pub fn standard(name: impl Into<String>) -> Self {
        Self {
            rotor: Rotor::unchecked(name.into(), Self::standard_curve(), 1.0),
        }
    }

    pub fn standard_curve() -> MachineCurve {
        MachineCurve {
            head: [0.6467, 0.0082, -0.0004, 0.0],
            efficiency: [-0.0166, 0.0399, -0.0008],
            rated_efficiency: 0.6,
            motor_efficiency: FAN_MOTOR_EFFICIENCY,
        }
    }

    pub fn with_speed(mut self, speed: f64) -> Self {
        self.rotor.set_speed(speed);
        self
    }

    pub fn curve(&self) -> &MachineCurve {
        &self.rotor.curve
    }

    pub fn speed(&self) -> f64 {
        self.rotor.speed()
    }

    pub fn is_stopped(&self) -> bool {
        self.rotor.is_stopped()
    }

    pub fn power(&self) -> PowerReport {
        self.rotor.power()
    }
}

impl Characteristic for Fan {
    fn name(&self) -> &str {
        &self.rotor.name
    }

    fn control_signal(&self) -> f64 {
        self.rotor.speed()
    }

    fn set_control_signal(&mut self, signal: f64) {
        self.rotor.set_speed(signal);
    }

    fn regime(&self) -> Regime {
        self.rotor.regime()
    }

    fn f2p(&mut self, flow: f64) -> f64 {
        self.rotor.f2p(flow)
    }

    fn p2f(&mut self, pressure_delta: f64) -> f64 {
        self.rotor.p2f(pressure_delta)
    }

    fn f2p_co(&self) -> Option<Polynomial> {
        self.rotor.coefficients()
    }

    fn operating_point(&self) -> OperatingPoint {
        self.rotor.operating_point()
    }
}
