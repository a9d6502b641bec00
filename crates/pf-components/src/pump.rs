//! Variable-speed centrifugal pump.

use crate::error::{ComponentError, ComponentResult};
use crate::polynomial::Polynomial;
use crate::rotating::{MachineCurve, PowerReport, Rotor};
use crate::traits::{Characteristic, OperatingPoint, Regime};

/// Pump with a quadratic head curve in kPa over m3/min; control signal is the speed ratio.
#[derive(Debug, Clone)]
pub struct Pump {
    rotor: Rotor,
}

impl Pump {
    pub fn new(name: impl Into<String>, curve: MachineCurve) -> ComponentResult<Self> {
        if curve.head[3] != 0.0 {
            return Err(ComponentError::InvalidArg {
                what: "pump head curve must be quadratic",
            });
        }
        Ok(Self {
            rotor: Rotor::new(name.into(), curve, 1.0)?,
        })
    }

    /// Quadratic pump curve from head and efficiency coefficients.
    pub fn from_coefficients(
        name: impl Into<String>,
        head: [f64; 3],
        efficiency: [f64; 3],
        rated_efficiency: f64,
    ) -> ComponentResult<Self> {
        Self::new(
            name,
            MachineCurve {
                head: [head[0], head[1], head[2], 0.0],
                efficiency,
                rated_efficiency,
                motor_efficiency: 1.0,
            },
        )
    }

    /// Chilled-water pump with shutoff head 233 kPa.
    pub fn standard(name: impl Into<String>) -> Self {
        Self {
            rotor: Rotor::unchecked(name.into(), Self::standard_curve(), 1.0),
        }
    }

    pub fn standard_curve() -> MachineCurve {
        MachineCurve {
            head: [233.0, 5.9578, -4.95, 0.0],
            efficiency: [0.0099, 0.4174, -0.0508],
            rated_efficiency: 0.8,
            motor_efficiency: 1.0,
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

    pub fn shutoff_head(&self) -> f64 {
        self.rotor.shutoff_head()
    }

    pub fn power(&self) -> PowerReport {
        self.rotor.power()
    }
}

impl Characteristic for Pump {
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
