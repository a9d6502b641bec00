//! Fan-law machine model shared by pumps and fans.
//!
//! At speed ratio `s` the rated curve `H(G) = a + b G + c G^2 + d G^3`
//! (with `G = g / s`) scales to `dp(g) = H(g / s) * s^2`, i.e. the local
//! coefficients `[a s^2, b s, c, d / s]`.

use serde::{Deserialize, Serialize};

use pf_core::ensure_finite;

use crate::error::{ComponentError, ComponentResult};
use crate::fault::Fault;
use crate::polynomial::Polynomial;
use crate::traits::{OperatingPoint, Regime, clamp_signal};

/// Rated curves of one machine.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MachineCurve {
    /// Head at rated speed, ascending powers of flow.
    pub head: [f64; 4],
    /// Efficiency at rated speed, ascending powers of flow.
    pub efficiency: [f64; 3],
    /// Peak efficiency at rated speed, used for part-speed derating.
    pub rated_efficiency: f64,
    /// Motor/drive efficiency applied on top of the machine efficiency.
    pub motor_efficiency: f64,
}

impl MachineCurve {
    pub fn validate(&self) -> ComponentResult<()> {
        for v in self.head {
            ensure_finite(v, "machine head coefficient")?;
        }
        for v in self.efficiency {
            ensure_finite(v, "machine efficiency coefficient")?;
        }
        if self.head[0] <= 0.0 {
            return Err(ComponentError::NonPhysical {
                what: "shutoff head must be positive",
            });
        }
        if !(self.rated_efficiency > 0.0 && self.rated_efficiency <= 1.0) {
            return Err(ComponentError::NonPhysical {
                what: "rated efficiency must be in (0, 1]",
            });
        }
        if !(self.motor_efficiency > 0.0 && self.motor_efficiency <= 1.0) {
            return Err(ComponentError::NonPhysical {
                what: "motor efficiency must be in (0, 1]",
            });
        }
        Ok(())
    }

    /// Local coefficients at speed `s > 0`.
    pub fn at_speed(&self, s: f64) -> Polynomial {
        let [a, b, c, d] = self.head;
        Polynomial::cubic(a * s * s, b * s, c, d / s)
    }

    /// `K(s) * (e0 + e1 G + e2 G^2)` with `K = (1 - (1 - r_ef) / s^0.2) / r_ef`.
    pub fn efficiency_at(&self, g: f64, s: f64) -> f64 {
        let r = self.rated_efficiency;
        let derate = (1.0 - (1.0 - r) / s.powf(0.2)) / r;
        let big_g = g / s;
        let [e0, e1, e2] = self.efficiency;
        derate * (e0 + e1 * big_g + e2 * big_g * big_g)
    }
}

/// Efficiency and shaft power at the last operating point.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct PowerReport {
    pub efficiency: f64,
    pub power_kw: f64,
    pub fault: Option<Fault>,
}

impl PowerReport {
    pub fn idle() -> Self {
        Self::default()
    }
}

/// Speed-controlled machine state; wrapped by `Pump` and `Fan`.
#[derive(Debug, Clone)]
pub(crate) struct Rotor {
    pub(crate) name: String,
    pub(crate) curve: MachineCurve,
    /// Converts the curve's pressure unit to kPa for power.
    pub(crate) kpa_per_unit: f64,
    speed: f64,
    op: OperatingPoint,
}

impl Rotor {
    pub(crate) fn new(
        name: String,
        curve: MachineCurve,
        kpa_per_unit: f64,
    ) -> ComponentResult<Self> {
        curve.validate()?;
        Ok(Self::unchecked(name, curve, kpa_per_unit))
    }

    pub(crate) fn unchecked(name: String, curve: MachineCurve, kpa_per_unit: f64) -> Self {
        Self {
            name,
            curve,
            kpa_per_unit,
            speed: 0.0,
            op: OperatingPoint::default(),
        }
    }

    pub(crate) fn speed(&self) -> f64 {
        self.speed
    }

    pub(crate) fn set_speed(&mut self, s: f64) {
        self.speed = clamp_signal(s);
    }

    pub(crate) fn is_stopped(&self) -> bool {
        self.speed <= 0.0
    }

    pub(crate) fn regime(&self) -> Regime {
        if self.is_stopped() {
            Regime::Blocked
        } else {
            Regime::Driven
        }
    }

    pub(crate) fn coefficients(&self) -> Option<Polynomial> {
        if self.is_stopped() {
            None
        } else {
            Some(self.curve.at_speed(self.speed))
        }
    }

    /// Shutoff head at the current speed (zero when stopped).
    pub(crate) fn shutoff_head(&self) -> f64 {
        self.curve.head[0] * self.speed * self.speed
    }

    pub(crate) fn f2p(&mut self, flow: f64) -> f64 {
        if self.is_stopped() {
            self.record(0.0, 0.0, Some(Fault::DeviceDisabled));
            return 0.0;
        }
        if flow < 0.0 {
            let dp = self.shutoff_head();
            self.record(0.0, dp, Some(Fault::NoFlow));
            return dp;
        }
        let head = self.curve.at_speed(self.speed).eval(flow);
        if head < 0.0 {
            self.record(flow, 0.0, Some(Fault::NegativeHead));
            0.0
        } else {
            self.record(flow, head, None);
            head
        }
    }

    pub(crate) fn p2f(&mut self, pressure_delta: f64) -> f64 {
        if self.is_stopped() {
            self.record(0.0, pressure_delta, Some(Fault::DeviceDisabled));
            return 0.0;
        }
        let root = self.curve.at_speed(self.speed).solve_for(pressure_delta);
        self.record(root.flow, pressure_delta, root.fault);
        root.flow
    }

    pub(crate) fn operating_point(&self) -> OperatingPoint {
        self.op
    }

    /// Power at the recorded flow: `g * dp / (60 * motor * ef)` kW.
    pub(crate) fn power(&self) -> PowerReport {
        let g = self.op.flow;
        let s = self.speed;
        if g <= 0.0 || s <= 0.0 {
            return PowerReport::idle();
        }

        let efficiency = self.curve.efficiency_at(g, s);
        let mut head = self.curve.at_speed(s).eval(g);
        let mut fault = None;
        if head < 0.0 {
            head = 0.0;
            fault = Some(Fault::NegativeHead);
        }

        if efficiency <= 0.0 {
            return PowerReport {
                efficiency,
                power_kw: 0.0,
                fault: Some(Fault::NonPositiveEfficiency),
            };
        }

        let power_kw = g * head * self.kpa_per_unit
            / (60.0 * self.curve.motor_efficiency * efficiency);
        PowerReport {
            efficiency,
            power_kw,
            fault,
        }
    }

    fn record(&mut self, flow: f64, pressure_delta: f64, fault: Option<Fault>) {
        self.op = OperatingPoint {
            flow,
            pressure_delta,
            control_signal: self.speed,
            fault,
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn curve() -> MachineCurve {
        MachineCurve {
            head: [233.0, 5.9578, -4.95, 0.0],
            efficiency: [0.0099, 0.4174, -0.0508],
            rated_efficiency: 0.8,
            motor_efficiency: 1.0,
        }
    }

    #[test]
    fn fan_law_scaling() {
        let c = curve();
        let p = c.at_speed(0.5);
        // dp(g) = H(g / s) s^2
        let g = 1.3;
        let big_g = g / 0.5;
        let rated = 233.0 + 5.9578 * big_g - 4.95 * big_g * big_g;
        assert!((p.eval(g) - rated * 0.25).abs() < 1e-9);
    }

    #[test]
    fn rated_speed_has_no_derating() {
        let c = curve();
        let e = c.efficiency_at(2.0, 1.0);
        assert!((e - (0.0099 + 0.8348 - 0.2032)).abs() < 1e-12);
    }

    #[test]
    fn validation() {
        let mut c = curve();
        assert!(c.validate().is_ok());
        c.rated_efficiency = 0.0;
        assert!(c.validate().is_err());
        let mut c = curve();
        c.head[0] = -1.0;
        assert!(c.validate().is_err());
    }

    #[test]
    fn reverse_flow_held_at_shutoff() {
        let mut r = Rotor::unchecked("p".into(), curve(), 1.0);
        r.set_speed(1.0);
        let dp = r.f2p(-1.0);
        assert_eq!(dp, 233.0);
        assert_eq!(r.operating_point().flow, 0.0);
        assert_eq!(r.operating_point().fault, Some(Fault::NoFlow));
    }

    #[test]
    fn runout_clips_head() {
        let mut r = Rotor::unchecked("p".into(), curve(), 1.0);
        r.set_speed(1.0);
        assert_eq!(r.f2p(50.0), 0.0);
        assert_eq!(r.operating_point().fault, Some(Fault::NegativeHead));
    }

    #[test]
    fn non_positive_efficiency_gives_zero_power() {
        let mut c = curve();
        c.efficiency = [-0.5, 0.0, 0.0];
        let mut r = Rotor::unchecked("p".into(), c, 1.0);
        r.set_speed(1.0);
        r.f2p(2.0);
        let pw = r.power();
        assert_eq!(pw.power_kw, 0.0);
        assert_eq!(pw.fault, Some(Fault::NonPositiveEfficiency));
    }
}
