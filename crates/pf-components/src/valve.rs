//! Two-way valve with an equal-percentage characteristic.

use pf_core::{ensure_finite, signed_square};

use crate::error::{ComponentError, ComponentResult};
use crate::fault::Fault;
use crate::polynomial::Polynomial;
use crate::traits::{
    CLOSED_PRESSURE_SENTINEL, Characteristic, OperatingPoint, Regime, clamp_signal,
};

/// `1743 * (1000/60)^2`: kPa per (m3/min)^2 at Cv = 1.
pub const CV_TO_K: f64 = 1743.0 * (1000.0 / 60.0) * (1000.0 / 60.0);

/// Equal-percentage valve: `Cv(s) = cv_max * r^(s-1)`, `dp = -k(s) g|g|`.
#[derive(Debug, Clone)]
pub struct Valve {
    name: String,
    pub cv_max: f64,
    /// Ratio of the largest to smallest controllable Cv.
    pub rangeability: f64,
    opening: f64,
    op: OperatingPoint,
}

impl Valve {
    pub fn new(name: impl Into<String>, cv_max: f64, rangeability: f64) -> ComponentResult<Self> {
        ensure_finite(cv_max, "valve cv_max")?;
        ensure_finite(rangeability, "valve rangeability")?;
        if cv_max <= 0.0 {
            return Err(ComponentError::NonPhysical {
                what: "valve cv_max must be positive",
            });
        }
        if rangeability <= 1.0 {
            return Err(ComponentError::NonPhysical {
                what: "valve rangeability must exceed 1",
            });
        }
        Ok(Self {
            name: name.into(),
            cv_max,
            rangeability,
            opening: 0.0,
            op: OperatingPoint::default(),
        })
    }

    /// Cv 800, rangeability 100.
    pub fn standard(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            cv_max: 800.0,
            rangeability: 100.0,
            opening: 0.0,
            op: OperatingPoint::default(),
        }
    }

    pub fn with_opening(mut self, opening: f64) -> Self {
        self.set_control_signal(opening);
        self
    }

    pub fn opening(&self) -> f64 {
        self.opening
    }

    pub fn is_closed(&self) -> bool {
        self.opening <= 0.0
    }

    /// Resistance at the current opening, `None` when closed.
    pub fn resistance(&self) -> Option<f64> {
        if self.is_closed() {
            return None;
        }
        let cv = self.cv_max * self.rangeability.powf(self.opening - 1.0);
        Some(CV_TO_K / (cv * cv))
    }

    fn record(&mut self, flow: f64, pressure_delta: f64, fault: Option<Fault>) {
        self.op = OperatingPoint {
            flow,
            pressure_delta,
            control_signal: self.opening,
            fault,
        };
    }
}

impl Characteristic for Valve {
    fn name(&self) -> &str {
        &self.name
    }

    fn control_signal(&self) -> f64 {
        self.opening
    }

    fn set_control_signal(&mut self, signal: f64) {
        self.opening = clamp_signal(signal);
    }

    fn regime(&self) -> Regime {
        match self.resistance() {
            Some(k) => Regime::Passive { k },
            None => Regime::Blocked,
        }
    }

    fn f2p(&mut self, flow: f64) -> f64 {
        match self.resistance() {
            None => {
                self.record(0.0, CLOSED_PRESSURE_SENTINEL, Some(Fault::DeviceDisabled));
                CLOSED_PRESSURE_SENTINEL
            }
            Some(k) => {
                let dp = -k * signed_square(flow);
                self.record(flow, dp, None);
                dp
            }
        }
    }

    fn p2f(&mut self, pressure_delta: f64) -> f64 {
        match self.resistance() {
            None => {
                self.record(0.0, pressure_delta, Some(Fault::DeviceDisabled));
                0.0
            }
            Some(k) => {
                // A rise along the positive direction drives flow backwards.
                let g = -pressure_delta.signum() * (pressure_delta.abs() / k).sqrt();
                self.record(g, pressure_delta, None);
                g
            }
        }
    }

    fn f2p_co(&self) -> Option<Polynomial> {
        self.resistance().map(Polynomial::loss)
    }

    fn operating_point(&self) -> OperatingPoint {
        self.op
    }
}
