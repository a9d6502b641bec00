//! Solver settings.

use serde::{Deserialize, Serialize};

use pf_core::{BisectionConfig, Slope};

use crate::error::{SolverError, SolverResult};

/// Tolerances, brackets, and caps for one balance.
///
/// Flows are in m3/min and pressures in kPa, matching the device curves.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BalanceConfig {
    /// Converged when every flow imbalance is below this.
    pub flow_tolerance: f64,
    /// Cap for the reference-branch flow bisection.
    pub max_iterations: usize,
    pub flow_min: f64,
    pub flow_max: f64,
    pub pressure_min: f64,
    pub pressure_max: f64,
    /// Cap for each level of the nested header-pressure bisection.
    pub pressure_iterations: usize,
    /// Nesting depth allowed for the header solve.
    pub max_free_headers: usize,
}

impl Default for BalanceConfig {
    fn default() -> Self {
        Self {
            flow_tolerance: 1e-4,
            max_iterations: 30,
            flow_min: 0.0,
            flow_max: 50.0,
            pressure_min: -1000.0,
            pressure_max: 1000.0,
            pressure_iterations: 50,
            max_free_headers: 3,
        }
    }
}

impl BalanceConfig {
    /// Settings for networks whose design flow is about `scale`.
    ///
    /// A chiller plant at 10 m3/min gets a 0.01 tolerance; a terminal unit
    /// at 0.1 m3/min gets 1e-4.
    pub fn for_flow_scale(scale: f64) -> Self {
        let scale = scale.abs().max(f64::MIN_POSITIVE);
        Self {
            flow_tolerance: 1e-3 * scale,
            flow_max: 5.0 * scale,
            ..Self::default()
        }
    }

    pub fn with_flow_tolerance(mut self, tolerance: f64) -> Self {
        self.flow_tolerance = tolerance;
        self
    }

    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    pub fn with_pressure_iterations(mut self, iterations: usize) -> Self {
        self.pressure_iterations = iterations;
        self
    }

    pub fn validate(&self) -> SolverResult<()> {
        if !(self.flow_tolerance.is_finite() && self.flow_tolerance > 0.0) {
            return Err(SolverError::Config {
                what: "flow tolerance must be positive",
            });
        }
        if self.max_iterations == 0 || self.pressure_iterations == 0 {
            return Err(SolverError::Config {
                what: "iteration caps must be at least one",
            });
        }
        self.flow_bisection().validate()?;
        self.pressure_bisection().validate()?;
        Ok(())
    }

    /// Bisection on reference-branch flow; imbalance grows with flow.
    pub fn flow_bisection(&self) -> BisectionConfig {
        BisectionConfig::new(
            self.flow_min,
            self.flow_max,
            self.flow_tolerance,
            Slope::Increasing,
        )
        .with_max_iterations(self.max_iterations)
    }

    /// Bisection on one header's pressure; its net inflow falls as pressure rises.
    pub fn pressure_bisection(&self) -> BisectionConfig {
        BisectionConfig::new(
            self.pressure_min,
            self.pressure_max,
            self.flow_tolerance,
            Slope::Decreasing,
        )
        .with_max_iterations(self.pressure_iterations)
    }
}
