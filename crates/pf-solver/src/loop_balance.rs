//! Flow bisection on a reference branch.
//!
//! Every branch joins the same two headers. A guess `g` at the reference
//! branch fixes the pressure difference through its `f2p`; siblings answer
//! with `p2f` of that difference (negated for siblings running the other
//! way) and the imbalance is the net inflow at the reference's outlet:
//!
//! `g + sum(same-direction flows) - sum(opposite flows)`
//!
//! which grows with `g` for any set of monotone characteristics.

use tracing::{debug, warn};

use pf_components::{Branch, Characteristic};
use pf_core::Bisection;

use crate::config::BalanceConfig;
use crate::error::{SolverError, SolverResult};

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LoopOutcome {
    /// Flow through the reference branch.
    pub flow: f64,
    /// Pressure rise across the reference branch, `from -> to`.
    pub pressure_delta: f64,
    pub imbalance: f64,
    pub iterations: usize,
    pub converged: bool,
}

#[derive(Clone, Copy, Debug)]
pub struct LoopBalance {
    config: BalanceConfig,
}

impl LoopBalance {
    pub fn new(config: BalanceConfig) -> SolverResult<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &BalanceConfig {
        &self.config
    }

    /// Balance `branches` around `branches[reference]`.
    ///
    /// `same_direction[i]` is true when branch `i` runs the same way as the
    /// reference. Branch states are left at the accepted guess.
    pub fn solve(
        &self,
        branches: &mut [Branch],
        reference: usize,
        same_direction: &[bool],
    ) -> SolverResult<LoopOutcome> {
        if reference >= branches.len() || same_direction.len() != branches.len() {
            return Err(SolverError::ProblemSetup {
                what: format!(
                    "reference {reference} and {} directions for {} branches",
                    same_direction.len(),
                    branches.len()
                ),
            });
        }

        let out = Bisection::run(self.config.flow_bisection(), |g| {
            imbalance(branches, reference, same_direction, g).1
        })?;
        let (pressure_delta, residual) = imbalance(branches, reference, same_direction, out.x);

        let name = branches[reference].name();
        if out.converged() {
            debug!(
                branch = name,
                flow = out.x,
                iterations = out.iterations,
                "loop balanced"
            );
        } else {
            warn!(
                branch = name,
                flow = out.x,
                imbalance = residual,
                iterations = out.iterations,
                "loop balance exhausted; keeping best guess"
            );
        }

        Ok(LoopOutcome {
            flow: out.x,
            pressure_delta,
            imbalance: residual,
            iterations: out.iterations,
            converged: out.converged(),
        })
    }
}

/// Pressure rise at the reference and the resulting imbalance for flow `g`.
pub fn imbalance(
    branches: &mut [Branch],
    reference: usize,
    same_direction: &[bool],
    g: f64,
) -> (f64, f64) {
    let dp = branches[reference].f2p(g);
    let mut net = g;
    for (i, (branch, &same)) in branches.iter_mut().zip(same_direction).enumerate() {
        if i == reference {
            continue;
        }
        if same {
            net += branch.p2f(dp);
        } else {
            net -= branch.p2f(-dp);
        }
    }
    (dp, net)
}
