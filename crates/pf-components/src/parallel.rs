//! Identical pumps in parallel with an optional recirculation bypass.
//!
//! Unit flow is `n * g_pump - g_bypass`; the bypass carries flow from the
//! unit outlet back to its inlet when positive. Both legs see the unit
//! pressure rise `dp`:
//!
//! - pump leg: `dp = P(g_pump)`, `P` being the pump curve minus the pump-leg pipe loss
//! - bypass leg: `dp = k_b * g_bypass * |g_bypass|`

use pf_core::signed_square;

use crate::error::{ComponentError, ComponentResult};
use crate::fault::Fault;
use crate::polynomial::Polynomial;
use crate::pump::Pump;
use crate::quadratic::{quadratic_root, real_roots};
use crate::rotating::PowerReport;
use crate::traits::{Characteristic, OperatingPoint, Regime};
use crate::valve::Valve;

/// Flows are compared against this slack when picking a joint-quadratic root.
const SPLIT_SLACK: f64 = 1e-9;

#[derive(Debug, Clone)]
pub struct ParallelPumpUnit {
    name: String,
    pump: Pump,
    num_pumps: usize,
    bypass: Option<Valve>,
    k_pump_leg: f64,
    k_bypass_leg: f64,
    op: OperatingPoint,
}

impl ParallelPumpUnit {
    pub fn new(name: impl Into<String>, pump: Pump, num_pumps: usize) -> ComponentResult<Self> {
        if num_pumps == 0 {
            return Err(ComponentError::InvalidArg {
                what: "parallel unit needs at least one pump",
            });
        }
        Ok(Self {
            name: name.into(),
            pump,
            num_pumps,
            bypass: None,
            k_pump_leg: 0.0,
            k_bypass_leg: 0.0,
            op: OperatingPoint::default(),
        })
    }

    /// Loss on each pump's own leg, per-pump flow.
    pub fn with_pump_leg_loss(mut self, k: f64) -> ComponentResult<Self> {
        self.k_pump_leg = non_negative(k, "pump leg loss")?;
        Ok(self)
    }

    pub fn with_bypass(mut self, valve: Valve, k_leg: f64) -> ComponentResult<Self> {
        self.k_bypass_leg = non_negative(k_leg, "bypass leg loss")?;
        self.bypass = Some(valve);
        Ok(self)
    }

    pub fn pump(&self) -> &Pump {
        &self.pump
    }

    pub fn bypass(&self) -> Option<&Valve> {
        self.bypass.as_ref()
    }

    pub fn has_bypass(&self) -> bool {
        self.bypass.is_some()
    }

    /// Running pumps with an open bypass accept reverse unit flow through the bypass.
    pub fn passes_reverse_flow(&self) -> bool {
        self.bypass_k().is_some()
    }

    pub fn num_pumps(&self) -> usize {
        self.num_pumps
    }

    pub fn k_pump_leg(&self) -> f64 {
        self.k_pump_leg
    }

    pub fn k_bypass_leg(&self) -> f64 {
        self.k_bypass_leg
    }

    pub fn set_num_pumps(&mut self, n: usize) -> ComponentResult<()> {
        if n == 0 {
            return Err(ComponentError::InvalidArg {
                what: "parallel unit needs at least one pump",
            });
        }
        self.num_pumps = n;
        Ok(())
    }

    pub fn set_bypass_opening(&mut self, opening: f64) -> ComponentResult<()> {
        match self.bypass.as_mut() {
            Some(v) => {
                v.set_control_signal(opening);
                Ok(())
            }
            None => Err(ComponentError::InvalidArg {
                what: "unit has no bypass valve",
            }),
        }
    }

    pub fn bypass_opening(&self) -> Option<f64> {
        self.bypass.as_ref().map(Valve::opening)
    }

    /// Flow per running pump at the last evaluation.
    pub fn pump_flow(&self) -> f64 {
        self.pump.operating_point().flow
    }

    /// Recirculation through the bypass at the last evaluation.
    pub fn bypass_flow(&self) -> f64 {
        self.bypass
            .as_ref()
            .map(|v| v.operating_point().flow)
            .unwrap_or(0.0)
    }

    /// Combined shaft power of all running pumps.
    pub fn power(&self) -> PowerReport {
        let single = self.pump.power();
        PowerReport {
            power_kw: single.power_kw * self.num_pumps as f64,
            ..single
        }
    }

    /// Total bypass-leg resistance, `None` when there is no open bypass.
    fn bypass_k(&self) -> Option<f64> {
        self.bypass
            .as_ref()
            .and_then(Valve::resistance)
            .map(|k| k + self.k_bypass_leg)
    }

    /// Per-pump curve including the pump-leg loss.
    fn pump_leg(&self) -> Option<Polynomial> {
        self.pump
            .f2p_co()
            .map(|p| p + Polynomial::loss(self.k_pump_leg))
    }

    /// Solve the joint quadratic for the per-pump flow at unit flow `g`.
    ///
    /// Substituting `g_b = n g_p - g` into `P(g_p) = k_b g_b |g_b|` gives, for `g_b >= 0`,
    /// `[a0 - k_b g^2, a1 + 2 k_b n g, a2 - k_b n^2]`, and for `g_b < 0`,
    /// `[a0 + k_b g^2, a1 - 2 k_b n g, a2 + k_b n^2]`.
    pub fn split_flow(leg: Polynomial, k_b: f64, n: f64, g: f64) -> (f64, Option<Fault>) {
        let [a0, a1, a2, _] = leg.c;
        let balance = g / n;
        let start = balance.max(0.0);

        if leg.eval(start) >= 0.0 {
            // bypass recirculates; pump flow at or above the balance point
            let c = [a0 - k_b * g * g, a1 + 2.0 * k_b * n * g, a2 - k_b * n * n];
            pick_root(c, |gp| gp >= start - SPLIT_SLACK, start)
        } else {
            // pumps cannot hold the head; bypass flows forward, pump flow below balance
            let c = [a0 + k_b * g * g, a1 - 2.0 * k_b * n * g, a2 + k_b * n * n];
            pick_root(c, |gp| gp >= -SPLIT_SLACK && gp <= balance + SPLIT_SLACK, start)
        }
    }

    fn record(&mut self, flow: f64, pressure_delta: f64, fault: Option<Fault>) {
        self.op = OperatingPoint {
            flow,
            pressure_delta,
            control_signal: self.pump.speed(),
            fault,
        };
    }

    fn record_bypass(&mut self, g_bypass: f64) {
        if let Some(v) = self.bypass.as_mut() {
            v.f2p(g_bypass);
        }
    }
}

fn non_negative(k: f64, what: &'static str) -> ComponentResult<f64> {
    pf_core::ensure_finite(k, what)?;
    if k < 0.0 {
        return Err(ComponentError::NonPhysical { what });
    }
    Ok(k)
}

fn pick_root(
    c: [f64; 3],
    accept: impl Fn(f64) -> bool,
    fallback: f64,
) -> (f64, Option<Fault>) {
    let [c0, c1, c2] = c;
    if c2.abs() <= 1e-12 * c0.abs().max(c1.abs()).max(1.0) {
        let r = quadratic_root(c0, c1, c2);
        return if r.fault.is_none() && accept(r.flow) {
            (r.flow.max(0.0), None)
        } else {
            (fallback, Some(r.fault.unwrap_or(Fault::NoRoot)))
        };
    }
    match real_roots(c0, c1, c2) {
        Some([lo, hi]) => {
            if accept(hi) {
                (hi.max(0.0), None)
            } else if accept(lo) {
                (lo.max(0.0), None)
            } else {
                (fallback, Some(Fault::NegativeRoot))
            }
        }
        None => (fallback, Some(Fault::NoRoot)),
    }
}

impl Characteristic for ParallelPumpUnit {
    fn name(&self) -> &str {
        &self.name
    }

    fn control_signal(&self) -> f64 {
        self.pump.speed()
    }

    fn set_control_signal(&mut self, signal: f64) {
        self.pump.set_control_signal(signal);
    }

    fn regime(&self) -> Regime {
        if !self.pump.is_stopped() {
            Regime::Driven
        } else if let Some(k) = self.bypass_k() {
            Regime::Passive { k }
        } else {
            Regime::Blocked
        }
    }

    fn f2p(&mut self, flow: f64) -> f64 {
        let n = self.num_pumps as f64;
        let bypass_k = self.bypass_k();

        let Some(leg) = self.pump_leg() else {
            self.pump.f2p(0.0);
            return match bypass_k {
                Some(k) => {
                    // stopped pumps: the unit is just the bypass leg, run forwards
                    self.record_bypass(-flow);
                    let dp = -k * signed_square(flow);
                    self.record(flow, dp, None);
                    dp
                }
                None => {
                    self.record_bypass(0.0);
                    self.record(0.0, 0.0, Some(Fault::DeviceDisabled));
                    0.0
                }
            };
        };

        match bypass_k {
            None => {
                self.record_bypass(0.0);
                if flow < 0.0 {
                    self.pump.f2p(flow);
                    let dp = leg.eval(0.0);
                    self.record(0.0, dp, Some(Fault::NoFlow));
                    return dp;
                }
                let gp = flow / n;
                self.pump.f2p(gp);
                let dp = leg.eval(gp);
                self.record(flow, dp, None);
                dp
            }
            Some(k_b) => {
                let (gp, fault) = Self::split_flow(leg, k_b, n, flow);
                let gb = n * gp - flow;
                self.pump.f2p(gp);
                self.record_bypass(gb);
                // without a consistent split the bypass leg still fixes the pressure
                let dp = match fault {
                    None => leg.eval(gp),
                    Some(_) => k_b * signed_square(gb),
                };
                self.record(flow, dp, fault);
                dp
            }
        }
    }

    fn p2f(&mut self, pressure_delta: f64) -> f64 {
        let n = self.num_pumps as f64;
        let bypass_k = self.bypass_k();

        let (gp, pump_fault) = match self.pump_leg() {
            Some(leg) => {
                let r = leg.solve_for(pressure_delta);
                self.pump.f2p(r.flow);
                (r.flow, r.fault)
            }
            None => {
                self.pump.f2p(0.0);
                (0.0, None)
            }
        };

        let gb = match bypass_k {
            Some(k_b) => pressure_delta.signum() * (pressure_delta.abs() / k_b).sqrt(),
            None => 0.0,
        };
        self.record_bypass(gb);

        let fault = match self.regime() {
            Regime::Blocked => Some(Fault::DeviceDisabled),
            Regime::Passive { .. } => None,
            Regime::Driven => pump_fault,
        };
        let g = n * gp - gb;
        self.record(g, pressure_delta, fault);
        g
    }

    /// Closed form only with the bypass shut: `[a0, a1 / n, a2 / n^2]`.
    fn f2p_co(&self) -> Option<Polynomial> {
        if self.bypass_k().is_some() {
            return None;
        }
        let n = self.num_pumps as f64;
        self.pump_leg().map(|p| {
            let [a0, a1, a2, a3] = p.c;
            Polynomial::cubic(a0, a1 / n, a2 / (n * n), a3 / (n * n * n))
        })
    }

    fn operating_point(&self) -> OperatingPoint {
        self.op
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit(n: usize) -> ParallelPumpUnit {
        ParallelPumpUnit::new("CP", Pump::standard("CP").with_speed(1.0), n).unwrap()
    }

    #[test]
    fn bypass_closed_splits_evenly() {
        let mut u = unit(2)
            .with_bypass(Valve::standard("BV").with_opening(0.0), 0.0)
            .unwrap();
        let dp = u.f2p(6.0);
        assert!((u.pump_flow() - 3.0).abs() < 1e-12);
        assert_eq!(u.bypass_flow(), 0.0);
        let single = Pump::standard("p").with_speed(1.0).f2p_co().unwrap().eval(3.0);
        assert!((dp - single).abs() < 1e-9);
    }

    #[test]
    fn unit_coefficients_rescale_for_count() {
        let u = unit(3).with_pump_leg_loss(0.5).unwrap();
        let co = u.f2p_co().unwrap();
        assert!((co.c[0] - 233.0).abs() < 1e-12);
        assert!((co.c[1] - 5.9578 / 3.0).abs() < 1e-12);
        assert!((co.c[2] - (-4.95 - 0.5) / 9.0).abs() < 1e-12);
    }

    #[test]
    fn joint_quadratic_balances_both_legs() {
        let mut u = unit(2)
            .with_bypass(Valve::standard("BV").with_opening(0.4), 0.3)
            .unwrap();
        let g = 4.0;
        let dp = u.f2p(g);
        let gp = u.pump_flow();
        let gb = u.bypass_flow();
        assert!(u.operating_point().fault.is_none());
        // continuity
        assert!((2.0 * gp - gb - g).abs() < 1e-9);
        // both legs see dp
        let k_b = Valve::standard("x").with_opening(0.4).resistance().unwrap() + 0.3;
        assert!((k_b * gb * gb.abs() - dp).abs() < 1e-6);
        let leg = Pump::standard("p").with_speed(1.0).f2p_co().unwrap();
        assert!((leg.eval(gp) - dp).abs() < 1e-6);
        assert!(gb > 0.0);
    }

    #[test]
    fn joint_quadratic_forward_bypass() {
        // demand beyond what the pumps can push: bypass flows forward
        let mut u = unit(1)
            .with_bypass(Valve::standard("BV").with_opening(1.0), 0.0)
            .unwrap();
        let g = 15.0;
        let dp = u.f2p(g);
        let gp = u.pump_flow();
        let gb = u.bypass_flow();
        assert!(dp < 0.0);
        assert!(gb < 0.0);
        assert!((gp - gb - g).abs() < 1e-9);
    }

    #[test]
    fn decoupled_inverse() {
        let mut u = unit(2)
            .with_bypass(Valve::standard("BV").with_opening(0.5), 0.0)
            .unwrap();
        let g = u.p2f(150.0);
        let gp = u.pump_flow();
        let gb = u.bypass_flow();
        assert!((g - (2.0 * gp - gb)).abs() < 1e-12);
        // and forward evaluation at that flow recovers the pressure
        let dp = u.f2p(g);
        assert!((dp - 150.0).abs() < 1e-6);
    }

    #[test]
    fn stopped_without_bypass_blocks() {
        let mut u = ParallelPumpUnit::new("CP", Pump::standard("CP"), 2).unwrap();
        assert_eq!(u.regime(), Regime::Blocked);
        assert_eq!(u.f2p(3.0), 0.0);
        assert_eq!(u.operating_point().flow, 0.0);
        assert_eq!(u.p2f(20.0), 0.0);
        assert_eq!(u.operating_point().fault, Some(Fault::DeviceDisabled));
    }

    #[test]
    fn stopped_with_bypass_is_passive() {
        let mut u = ParallelPumpUnit::new("CP", Pump::standard("CP"), 2)
            .unwrap()
            .with_bypass(Valve::standard("BV").with_opening(1.0), 0.0)
            .unwrap();
        assert!(matches!(u.regime(), Regime::Passive { .. }));
        let g = u.p2f(-10.0);
        assert!(g > 0.0);
        assert_eq!(u.pump_flow(), 0.0);
        assert!((u.f2p(g) + 10.0).abs() < 1e-9);
    }

    #[test]
    fn power_scales_with_count() {
        let mut u = unit(3);
        u.f2p(9.0);
        let single = u.pump().power().power_kw;
        assert!((u.power().power_kw - 3.0 * single).abs() < 1e-12);
    }

    #[test]
    fn staging_inputs() {
        let mut u = unit(1);
        assert!(u.set_num_pumps(0).is_err());
        u.set_num_pumps(3).unwrap();
        assert_eq!(u.num_pumps(), 3);
        assert!(u.set_bypass_opening(0.5).is_err());
    }
}
