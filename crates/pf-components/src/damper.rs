//! Air damper with tabulated loss curves.

use serde::{Deserialize, Serialize};

use pf_core::{ensure_finite, signed_square};

use crate::error::{ComponentError, ComponentResult};
use crate::fault::Fault;
use crate::polynomial::Polynomial;
use crate::traits::{
    CLOSED_PRESSURE_SENTINEL, Characteristic, OperatingPoint, Regime, clamp_signal,
};

/// Loss `k g^2` measured at one opening.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct DamperCurve {
    pub opening: f64,
    pub k: f64,
}

/// Damper whose drop is interpolated between the two bracketing curves,
/// each evaluated at the same flow. Openings outside the table use the
/// nearest curve; opening 0 is shut.
#[derive(Debug, Clone)]
pub struct Damper {
    name: String,
    /// Sorted by descending opening.
    curves: Vec<DamperCurve>,
    opening: f64,
    op: OperatingPoint,
}

impl Damper {
    pub fn new(name: impl Into<String>, mut curves: Vec<DamperCurve>) -> ComponentResult<Self> {
        if curves.is_empty() {
            return Err(ComponentError::InvalidArg {
                what: "damper needs at least one curve",
            });
        }
        for c in &curves {
            ensure_finite(c.opening, "damper opening")?;
            ensure_finite(c.k, "damper loss coefficient")?;
            if !(c.opening > 0.0 && c.opening <= 1.0) {
                return Err(ComponentError::NonPhysical {
                    what: "damper curve opening must be in (0, 1]",
                });
            }
            if c.k <= 0.0 {
                return Err(ComponentError::NonPhysical {
                    what: "damper loss coefficient must be positive",
                });
            }
        }
        curves.sort_by(|a, b| b.opening.total_cmp(&a.opening));
        for pair in curves.windows(2) {
            if pair[0].opening == pair[1].opening {
                return Err(ComponentError::InvalidArg {
                    what: "duplicate damper curve opening",
                });
            }
            if pair[0].k >= pair[1].k {
                return Err(ComponentError::NonPhysical {
                    what: "damper loss must grow as it closes",
                });
            }
        }
        Ok(Self {
            name: name.into(),
            curves,
            opening: 0.0,
            op: OperatingPoint::default(),
        })
    }

    /// Five-point table measured on a rectangular opposed-blade damper.
    pub fn standard(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            curves: Self::standard_curves(),
            opening: 0.0,
            op: OperatingPoint::default(),
        }
    }

    pub fn standard_curves() -> Vec<DamperCurve> {
        [
            (1.0, 2.034_378_021_630_88e-5),
            (0.8, 4.958_854_402_902_87e-5),
            (0.6, 1.433_908_872_694_31e-4),
            (0.4, 5.088_751_278_638_76e-4),
            (0.2, 3.513_681_877_097_78e-3),
        ]
        .into_iter()
        .map(|(opening, k)| DamperCurve { opening, k })
        .collect()
    }

    pub fn with_opening(mut self, opening: f64) -> Self {
        self.set_control_signal(opening);
        self
    }

    pub fn curves(&self) -> &[DamperCurve] {
        &self.curves
    }

    pub fn opening(&self) -> f64 {
        self.opening
    }

    pub fn is_closed(&self) -> bool {
        self.opening <= 0.0
    }

    /// Interpolated loss coefficient, `None` when shut.
    pub fn resistance(&self) -> Option<f64> {
        if self.is_closed() {
            return None;
        }
        let s = self.opening;
        let first = self.curves[0];
        let last = self.curves[self.curves.len() - 1];
        if s >= first.opening {
            return Some(first.k);
        }
        if s <= last.opening {
            return Some(last.k);
        }
        let k = self
            .curves
            .windows(2)
            .find(|w| w[1].opening <= s && s < w[0].opening)
            .map(|w| {
                let (hi, lo) = (w[0], w[1]);
                (hi.k - lo.k) / (hi.opening - lo.opening) * (s - lo.opening) + lo.k
            })
            .unwrap_or(last.k);
        Some(k)
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

impl Characteristic for Damper {
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
