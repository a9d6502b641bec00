//! Composed hydraulic edge: one mover and one throttle in series with fixed losses.
//!
//! Series coefficients add: the branch curve is
//! `mover(g) + throttle(g) - (k_pipe + k_equipment) g|g| - H`
//! where `H` is the static head. A pump with a bypass valve is folded into
//! a one-pump [`ParallelPumpUnit`] at build time.

use serde::{Deserialize, Serialize};

use pf_core::units::{Length, as_kpa, constants, static_head_pressure};
use pf_core::{Bisection, BisectionConfig, Slope, ensure_finite, signed_square};

use crate::damper::Damper;
use crate::error::{ComponentError, ComponentResult};
use crate::fan::Fan;
use crate::fault::Fault;
use crate::parallel::ParallelPumpUnit;
use crate::polynomial::Polynomial;
use crate::pump::Pump;
use crate::rotating::PowerReport;
use crate::traits::{CLOSED_PRESSURE_SENTINEL, Characteristic, OperatingPoint, Regime};
use crate::valve::Valve;

const INVERSION_MAX_ITER: usize = 200;
const BRACKET_DOUBLINGS: usize = 60;

/// Pressure-raising slot.
#[derive(Debug, Clone)]
pub enum Mover {
    Pump(Pump),
    Fan(Fan),
    Parallel(ParallelPumpUnit),
}

/// Series throttling slot.
#[derive(Debug, Clone)]
pub enum Throttle {
    Valve(Valve),
    Damper(Damper),
}

/// Which control input of a branch a signal drives.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignalTarget {
    /// Pump/fan speed ratio.
    Mover,
    /// Valve or damper opening.
    Throttle,
    /// Bypass valve opening of a parallel unit.
    Bypass,
    /// Number of running pumps of a parallel unit.
    RunningUnits,
}

macro_rules! delegate {
    ($self:expr, $enum:ident { $($variant:ident),* }, $inner:ident => $body:expr) => {
        match $self {
            $($enum::$variant($inner) => $body,)*
        }
    };
}

impl Mover {
    pub fn power(&self) -> PowerReport {
        delegate!(self, Mover { Pump, Fan, Parallel }, m => m.power())
    }

    fn kind(&self) -> &'static str {
        match self {
            Mover::Pump(_) => "pump",
            Mover::Fan(_) => "fan",
            Mover::Parallel(_) => "parallel pump unit",
        }
    }
}

impl Characteristic for Mover {
    fn name(&self) -> &str {
        delegate!(self, Mover { Pump, Fan, Parallel }, m => m.name())
    }
    fn control_signal(&self) -> f64 {
        delegate!(self, Mover { Pump, Fan, Parallel }, m => m.control_signal())
    }
    fn set_control_signal(&mut self, signal: f64) {
        delegate!(self, Mover { Pump, Fan, Parallel }, m => m.set_control_signal(signal))
    }
    fn regime(&self) -> Regime {
        delegate!(self, Mover { Pump, Fan, Parallel }, m => m.regime())
    }
    fn f2p(&mut self, flow: f64) -> f64 {
        delegate!(self, Mover { Pump, Fan, Parallel }, m => m.f2p(flow))
    }
    fn p2f(&mut self, pressure_delta: f64) -> f64 {
        delegate!(self, Mover { Pump, Fan, Parallel }, m => m.p2f(pressure_delta))
    }
    fn f2p_co(&self) -> Option<Polynomial> {
        delegate!(self, Mover { Pump, Fan, Parallel }, m => m.f2p_co())
    }
    fn operating_point(&self) -> OperatingPoint {
        delegate!(self, Mover { Pump, Fan, Parallel }, m => m.operating_point())
    }
}

impl Characteristic for Throttle {
    fn name(&self) -> &str {
        delegate!(self, Throttle { Valve, Damper }, t => t.name())
    }
    fn control_signal(&self) -> f64 {
        delegate!(self, Throttle { Valve, Damper }, t => t.control_signal())
    }
    fn set_control_signal(&mut self, signal: f64) {
        delegate!(self, Throttle { Valve, Damper }, t => t.set_control_signal(signal))
    }
    fn regime(&self) -> Regime {
        delegate!(self, Throttle { Valve, Damper }, t => t.regime())
    }
    fn f2p(&mut self, flow: f64) -> f64 {
        delegate!(self, Throttle { Valve, Damper }, t => t.f2p(flow))
    }
    fn p2f(&mut self, pressure_delta: f64) -> f64 {
        delegate!(self, Throttle { Valve, Damper }, t => t.p2f(pressure_delta))
    }
    fn f2p_co(&self) -> Option<Polynomial> {
        delegate!(self, Throttle { Valve, Damper }, t => t.f2p_co())
    }
    fn operating_point(&self) -> OperatingPoint {
        delegate!(self, Throttle { Valve, Damper }, t => t.operating_point())
    }
}

#[derive(Debug, Clone)]
pub struct Branch {
    name: String,
    mover: Option<Mover>,
    throttle: Option<Throttle>,
    k_pipe: f64,
    k_equipment: f64,
    /// kPa, subtracted from the rise in either flow direction.
    static_head: f64,
    op: OperatingPoint,
}

impl Branch {
    pub fn builder(name: impl Into<String>) -> BranchBuilder {
        BranchBuilder::new(name)
    }

    pub fn mover(&self) -> Option<&Mover> {
        self.mover.as_ref()
    }

    pub fn throttle(&self) -> Option<&Throttle> {
        self.throttle.as_ref()
    }

    pub fn parallel_unit(&self) -> Option<&ParallelPumpUnit> {
        match &self.mover {
            Some(Mover::Parallel(u)) => Some(u),
            _ => None,
        }
    }

    pub fn k_pipe(&self) -> f64 {
        self.k_pipe
    }

    pub fn k_equipment(&self) -> f64 {
        self.k_equipment
    }

    pub fn static_head(&self) -> f64 {
        self.static_head
    }

    fn fixed_loss(&self) -> f64 {
        self.k_pipe + self.k_equipment
    }

    /// Shaft power of the mover, idle without one.
    pub fn power(&self) -> PowerReport {
        self.mover
            .as_ref()
            .map(Mover::power)
            .unwrap_or_else(PowerReport::idle)
    }

    pub fn signal(&self, target: SignalTarget) -> Option<f64> {
        match target {
            SignalTarget::Mover => self.mover.as_ref().map(Characteristic::control_signal),
            SignalTarget::Throttle => self.throttle.as_ref().map(Characteristic::control_signal),
            SignalTarget::Bypass => self.parallel_unit().and_then(ParallelPumpUnit::bypass_opening),
            SignalTarget::RunningUnits => self.parallel_unit().map(|u| u.num_pumps() as f64),
        }
    }

    pub fn set_signal(&mut self, target: SignalTarget, value: f64) -> ComponentResult<()> {
        ensure_finite(value, "control signal")?;
        match target {
            SignalTarget::Mover => match self.mover.as_mut() {
                Some(m) => m.set_control_signal(value),
                None => return Err(missing("branch has no mover")),
            },
            SignalTarget::Throttle => match self.throttle.as_mut() {
                Some(t) => t.set_control_signal(value),
                None => return Err(missing("branch has no throttle")),
            },
            SignalTarget::Bypass => match self.mover.as_mut() {
                Some(Mover::Parallel(u)) => u.set_bypass_opening(value)?,
                _ => return Err(missing("branch has no bypass valve")),
            },
            SignalTarget::RunningUnits => match self.mover.as_mut() {
                Some(Mover::Parallel(u)) => {
                    if value < 0.5 {
                        return Err(ComponentError::InvalidArg {
                            what: "running unit count must be at least one",
                        });
                    }
                    u.set_num_pumps(value.round() as usize)?
                }
                _ => return Err(missing("branch has no parallel pump unit")),
            },
        }
        Ok(())
    }

    /// Sum of device rises and fixed losses at `flow`, updating device states.
    fn chain(&mut self, flow: f64) -> f64 {
        let mut dp = -self.fixed_loss() * signed_square(flow) - self.static_head;
        if let Some(m) = self.mover.as_mut() {
            dp += m.f2p(flow);
        }
        if let Some(t) = self.throttle.as_mut() {
            dp += t.f2p(flow);
        }
        dp
    }

    fn device_fault(&self) -> Option<Fault> {
        self.mover
            .as_ref()
            .and_then(|m| m.operating_point().fault)
            .or_else(|| self.throttle.as_ref().and_then(|t| t.operating_point().fault))
    }

    fn record(&mut self, flow: f64, pressure_delta: f64, fault: Option<Fault>) {
        self.op = OperatingPoint {
            flow,
            pressure_delta,
            control_signal: self.control_signal(),
            fault,
        };
    }

    fn blocked_pressure(&self) -> f64 {
        let throttle_shut = matches!(
            self.throttle.as_ref().map(Characteristic::regime),
            Some(Regime::Blocked)
        );
        if throttle_shut {
            CLOSED_PRESSURE_SENTINEL
        } else {
            0.0
        }
    }

    fn settle_blocked(&mut self) {
        if let Some(m) = self.mover.as_mut() {
            m.f2p(0.0);
        }
        if let Some(t) = self.throttle.as_mut() {
            t.f2p(0.0);
        }
    }

    /// Driven branches pass reverse flow only through an open bypass.
    fn reversible(&self) -> bool {
        matches!(&self.mover, Some(Mover::Parallel(u)) if u.passes_reverse_flow())
    }

    /// Invert the monotone branch curve by bisection on signed flow.
    fn invert_numerically(&mut self, dp: f64) -> (f64, Option<Fault>) {
        let reverse = self.chain(0.0) < dp;
        if reverse && !self.reversible() {
            return (0.0, Some(Fault::NegativeRoot));
        }
        let step = if reverse { -1.0 } else { 1.0 };
        let mut far = step;
        let mut bracketed = false;
        for _ in 0..BRACKET_DOUBLINGS {
            let p = self.chain(far);
            if (reverse && p >= dp) || (!reverse && p <= dp) {
                bracketed = true;
                break;
            }
            far *= 2.0;
        }
        if !bracketed {
            return (0.0, Some(Fault::NoRoot));
        }

        let (lower, upper) = if reverse { (far, 0.0) } else { (0.0, far) };
        let tolerance = 1e-9 * dp.abs().max(1.0);
        let cfg = BisectionConfig::new(lower, upper, tolerance, Slope::Decreasing)
            .with_max_iterations(INVERSION_MAX_ITER);
        match Bisection::run(cfg, |g| self.chain(g) - dp) {
            Ok(out) if out.converged() => (out.x, None),
            Ok(out) => (out.x, Some(Fault::IterationExhausted)),
            Err(_) => (0.0, Some(Fault::NoRoot)),
        }
    }
}

fn missing(what: &'static str) -> ComponentError {
    ComponentError::InvalidArg { what }
}

impl Characteristic for Branch {
    fn name(&self) -> &str {
        &self.name
    }

    /// The throttle opening when there is a throttle, else the mover speed, else 1.
    fn control_signal(&self) -> f64 {
        self.throttle
            .as_ref()
            .map(Characteristic::control_signal)
            .or_else(|| self.mover.as_ref().map(Characteristic::control_signal))
            .unwrap_or(1.0)
    }

    fn set_control_signal(&mut self, signal: f64) {
        if let Some(t) = self.throttle.as_mut() {
            t.set_control_signal(signal);
        } else if let Some(m) = self.mover.as_mut() {
            m.set_control_signal(signal);
        }
    }

    fn regime(&self) -> Regime {
        let mover = self.mover.as_ref().map(Characteristic::regime);
        let throttle = self.throttle.as_ref().map(Characteristic::regime);
        if mover == Some(Regime::Blocked) || throttle == Some(Regime::Blocked) {
            return Regime::Blocked;
        }
        if mover == Some(Regime::Driven) {
            return Regime::Driven;
        }
        let k = [mover, throttle]
            .into_iter()
            .flatten()
            .map(|r| match r {
                Regime::Passive { k } => k,
                _ => 0.0,
            })
            .sum::<f64>()
            + self.fixed_loss();
        Regime::Passive { k }
    }

    fn f2p(&mut self, flow: f64) -> f64 {
        match self.regime() {
            Regime::Blocked => {
                self.settle_blocked();
                let dp = self.blocked_pressure();
                self.record(0.0, dp, Some(Fault::DeviceDisabled));
                dp
            }
            Regime::Driven if flow < 0.0 && !self.reversible() => {
                let dp = self.chain(0.0);
                self.record(0.0, dp, Some(Fault::NoFlow));
                dp
            }
            Regime::Driven | Regime::Passive { .. } => {
                let dp = self.chain(flow);
                let fault = self.device_fault();
                self.record(flow, dp, fault);
                dp
            }
        }
    }

    fn p2f(&mut self, pressure_delta: f64) -> f64 {
        let (flow, fault) = match self.regime() {
            Regime::Blocked => {
                self.settle_blocked();
                (0.0, Some(Fault::DeviceDisabled))
            }
            Regime::Passive { k } => {
                // -H - k g|g| = dp
                let target = pressure_delta + self.static_head;
                let (g, fault) = if target == 0.0 {
                    (0.0, None)
                } else if k <= 0.0 {
                    (0.0, Some(Fault::NoRoot))
                } else {
                    (-target.signum() * (target.abs() / k).sqrt(), None)
                };
                self.chain(g);
                (g, fault)
            }
            Regime::Driven => match self.f2p_co() {
                Some(curve) => {
                    let root = curve.solve_for(pressure_delta);
                    self.chain(root.flow);
                    (root.flow, root.fault)
                }
                None => {
                    let (g, fault) = self.invert_numerically(pressure_delta);
                    self.chain(g);
                    (g, fault)
                }
            },
        };
        self.record(flow, pressure_delta, fault);
        flow
    }

    fn f2p_co(&self) -> Option<Polynomial> {
        let fixed = Polynomial::quadratic(-self.static_head, 0.0, -self.fixed_loss());
        match self.regime() {
            Regime::Blocked => None,
            Regime::Passive { k } => Some(Polynomial::quadratic(-self.static_head, 0.0, -k)),
            Regime::Driven => {
                let mover = self.mover.as_ref()?.f2p_co()?;
                let throttle = match self.throttle.as_ref() {
                    Some(t) => t.f2p_co()?,
                    None => Polynomial::ZERO,
                };
                Some(mover + throttle + fixed)
            }
        }
    }

    fn operating_point(&self) -> OperatingPoint {
        self.op
    }
}

/// Collects slots and losses, then checks the layout in `build()`.
#[derive(Debug)]
pub struct BranchBuilder {
    name: String,
    mover: Option<Mover>,
    throttle: Option<Throttle>,
    bypass: Option<(Valve, f64)>,
    k_pipe: f64,
    k_equipment: f64,
    static_head: f64,
}

impl BranchBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            mover: None,
            throttle: None,
            bypass: None,
            k_pipe: 0.0,
            k_equipment: 0.0,
            static_head: 0.0,
        }
    }

    pub fn pump(mut self, pump: Pump) -> Self {
        self.mover = Some(Mover::Pump(pump));
        self
    }

    pub fn fan(mut self, fan: Fan) -> Self {
        self.mover = Some(Mover::Fan(fan));
        self
    }

    pub fn parallel(mut self, unit: ParallelPumpUnit) -> Self {
        self.mover = Some(Mover::Parallel(unit));
        self
    }

    pub fn valve(mut self, valve: Valve) -> Self {
        self.throttle = Some(Throttle::Valve(valve));
        self
    }

    pub fn damper(mut self, damper: Damper) -> Self {
        self.throttle = Some(Throttle::Damper(damper));
        self
    }

    /// Bypass valve across a single pump; `k_leg` is the bypass pipe loss.
    pub fn bypass(mut self, valve: Valve, k_leg: f64) -> Self {
        self.bypass = Some((valve, k_leg));
        self
    }

    pub fn k_pipe(mut self, k: f64) -> Self {
        self.k_pipe = k;
        self
    }

    pub fn k_equipment(mut self, k: f64) -> Self {
        self.k_equipment = k;
        self
    }

    /// Static head in kPa.
    pub fn static_head_kpa(mut self, head: f64) -> Self {
        self.static_head = head;
        self
    }

    /// Static head as a water column height.
    pub fn static_head(mut self, height: Length) -> Self {
        self.static_head = as_kpa(static_head_pressure(height, constants::water_density()));
        self
    }

    pub fn build(self) -> ComponentResult<Branch> {
        for (k, what) in [
            (self.k_pipe, "pipe loss"),
            (self.k_equipment, "equipment loss"),
        ] {
            ensure_finite(k, what)?;
            if k < 0.0 {
                return Err(ComponentError::NonPhysical { what });
            }
        }
        ensure_finite(self.static_head, "static head")?;

        match (&self.mover, &self.throttle) {
            (Some(Mover::Fan(_)), Some(Throttle::Valve(_))) => {
                return Err(ComponentError::Incompatible {
                    what: "a fan branch throttles with a damper, not a valve",
                });
            }
            (Some(Mover::Pump(_) | Mover::Parallel(_)), Some(Throttle::Damper(_))) => {
                return Err(ComponentError::Incompatible {
                    what: "a pump branch throttles with a valve, not a damper",
                });
            }
            _ => {}
        }

        let mut k_pipe = self.k_pipe;
        let mut k_equipment = self.k_equipment;
        let mover = match (self.mover, self.bypass) {
            (Some(Mover::Pump(pump)), Some((valve, k_leg))) => {
                // pipe and equipment losses sit on the pump leg inside the bypass loop
                let unit_name = format!("{} unit", pump.name());
                let unit = ParallelPumpUnit::new(unit_name, pump, 1)?
                    .with_pump_leg_loss(k_pipe + k_equipment)?
                    .with_bypass(valve, k_leg)?;
                k_pipe = 0.0;
                k_equipment = 0.0;
                Some(Mover::Parallel(unit))
            }
            (Some(Mover::Parallel(_)), Some(_)) => {
                return Err(ComponentError::Incompatible {
                    what: "a parallel pump unit carries its own bypass",
                });
            }
            (Some(m), Some(_)) => {
                return Err(ComponentError::Incompatible {
                    what: match m.kind() {
                        "fan" => "a fan cannot take a bypass valve",
                        _ => "bypass requires a pump",
                    },
                });
            }
            (None, Some(_)) => {
                return Err(ComponentError::Incompatible {
                    what: "bypass requires a pump",
                });
            }
            (mover, None) => mover,
        };

        Ok(Branch {
            name: self.name,
            mover,
            throttle: self.throttle,
            k_pipe,
            k_equipment,
            static_head: self.static_head,
            op: OperatingPoint::default(),
        })
    }
}
