//! Solve results.

use serde::{Deserialize, Serialize};

use pf_components::{Branch, Characteristic, Fault, PowerReport};

/// One branch after a balance.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BranchReport {
    pub name: String,
    pub flow: f64,
    pub pressure_delta: f64,
    pub control_signal: f64,
    pub fault: Option<Fault>,
    pub power: PowerReport,
}

impl BranchReport {
    pub fn capture(branch: &Branch) -> Self {
        let op = branch.operating_point();
        Self {
            name: branch.name().to_string(),
            flow: op.flow,
            pressure_delta: op.pressure_delta,
            control_signal: op.control_signal,
            fault: op.fault,
            power: branch.power(),
        }
    }
}

/// Gauge pressure and net inflow at one header.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct HeaderReport {
    pub name: String,
    pub pressure: f64,
    pub imbalance: f64,
}

/// Outcome of [`Network::solve`](crate::Network::solve) or
/// [`Network::balance_loop`](crate::Network::balance_loop).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BalanceReport {
    pub converged: bool,
    /// Bisection iterations at the outermost level.
    pub iterations: usize,
    /// Residual evaluations across all levels.
    pub evaluations: usize,
    /// Largest `|imbalance|` over the balanced headers.
    pub residual: f64,
    pub headers: Vec<HeaderReport>,
    pub branches: Vec<BranchReport>,
    /// `IterationExhausted` when the best guess was accepted unconverged.
    pub fault: Option<Fault>,
}

impl BalanceReport {
    pub fn branch(&self, name: &str) -> Option<&BranchReport> {
        self.branches.iter().find(|b| b.name == name)
    }

    pub fn header(&self, name: &str) -> Option<&HeaderReport> {
        self.headers.iter().find(|h| h.name == name)
    }

    pub fn total_power_kw(&self) -> f64 {
        self.branches.iter().map(|b| b.power.power_kw).sum()
    }

    /// Branches carrying a fault flag, in declaration order.
    pub fn faulted(&self) -> impl Iterator<Item = &BranchReport> {
        self.branches.iter().filter(|b| b.fault.is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pf_components::Pump;

    #[test]
    fn capture_reads_last_point() {
        let mut b = Branch::builder("CP")
            .pump(Pump::standard("CP").with_speed(1.0))
            .k_pipe(5.0)
            .build()
            .unwrap();
        let dp = b.f2p(3.0);
        let r = BranchReport::capture(&b);
        assert_eq!(r.name, "CP");
        assert_eq!(r.flow, 3.0);
        assert_eq!(r.pressure_delta, dp);
        assert!(r.power.power_kw > 0.0);
    }

    #[test]
    fn lookups_and_totals() {
        let branch = |name: &str, kw: f64, fault| BranchReport {
            name: name.into(),
            flow: 1.0,
            pressure_delta: 0.0,
            control_signal: 1.0,
            fault,
            power: PowerReport {
                efficiency: 0.7,
                power_kw: kw,
                fault: None,
            },
        };
        let report = BalanceReport {
            converged: true,
            iterations: 3,
            evaluations: 3,
            residual: 0.0,
            headers: vec![HeaderReport {
                name: "S".into(),
                pressure: 12.0,
                imbalance: 0.0,
            }],
            branches: vec![
                branch("a", 2.0, None),
                branch("b", 3.5, Some(Fault::DeviceDisabled)),
            ],
            fault: None,
        };
        assert_eq!(report.header("S").unwrap().pressure, 12.0);
        assert!(report.branch("c").is_none());
        assert_eq!(report.total_power_kw(), 5.5);
        let faulted: Vec<_> = report.faulted().map(|b| b.name.as_str()).collect();
        assert_eq!(faulted, ["b"]);
    }
}
