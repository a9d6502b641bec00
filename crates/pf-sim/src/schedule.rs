//! Step-hold signal schedules.

use pf_components::SignalTarget;
use pf_core::BranchId;
use pf_project::ScheduleDef;
use pf_solver::Network;

use crate::error::{SimError, SimResult};

/// Piecewise-constant signal for one branch input.
#[derive(Clone, Debug, PartialEq)]
pub struct Schedule {
    pub branch: BranchId,
    pub target: SignalTarget,
    /// `(minute, value)`, strictly increasing in minute.
    points: Vec<(usize, f64)>,
}

impl Schedule {
    pub fn new(
        branch: BranchId,
        target: SignalTarget,
        points: Vec<(usize, f64)>,
    ) -> SimResult<Self> {
        if points.is_empty() {
            return Err(SimError::InvalidArg {
                what: "schedule needs at least one point",
            });
        }
        if points.windows(2).any(|w| w[1].0 <= w[0].0) {
            return Err(SimError::InvalidArg {
                what: "schedule minutes must be strictly increasing",
            });
        }
        Ok(Self {
            branch,
            target,
            points,
        })
    }

    pub fn from_def(def: &ScheduleDef, network: &Network) -> SimResult<Self> {
        let branch = network
            .topology()
            .link_by_name(&def.branch)
            .ok_or_else(|| SimError::Unknown {
                what: "schedule branch",
                id: def.branch.clone(),
            })?;
        Self::new(
            branch,
            def.target,
            def.points.iter().map(|p| (p.minute, p.value)).collect(),
        )
    }

    /// Value of the latest point at or before `minute`; `None` before the first.
    pub fn value_at(&self, minute: usize) -> Option<f64> {
        let idx = self.points.partition_point(|&(m, _)| m <= minute);
        idx.checked_sub(1).map(|i| self.points[i].1)
    }

    pub fn apply(&self, minute: usize, network: &mut Network) -> SimResult<()> {
        let Some(value) = self.value_at(minute) else {
            return Ok(());
        };
        let branch = network
            .branch_mut(self.branch)
            .ok_or_else(|| SimError::Unknown {
                what: "branch",
                id: self.branch.to_string(),
            })?;
        branch.set_signal(self.target, value)?;
        Ok(())
    }
}
