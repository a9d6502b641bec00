//! Header-pressure balance over an arbitrary topology.
//!
//! The reference header sits at gauge 0. Every other ("free") header's
//! pressure is found by bisection on its net inflow, nested in declaration
//! order: for each guess at one header the headers after it are balanced
//! completely before its own residual is read. Work is bounded by
//! `pressure_iterations ^ free_headers`, hence the cap on free headers.

use tracing::{debug, warn};

use pf_components::{Branch, Characteristic, Fault};
use pf_core::{Bisection, BisectionOutcome, BranchId, HeaderId};
use pf_graph::Topology;

use crate::config::BalanceConfig;
use crate::error::{SolverError, SolverResult};
use crate::loop_balance::LoopBalance;
use crate::report::{BalanceReport, BranchReport, HeaderReport};

/// Topology plus one branch per link.
#[derive(Debug, Clone)]
pub struct Network {
    topology: Topology,
    branches: Vec<Branch>,
    reference: HeaderId,
    free: Vec<HeaderId>,
    pressures: Vec<f64>,
    config: BalanceConfig,
}

#[derive(Default)]
struct SolveStats {
    evaluations: usize,
}

impl Network {
    /// `branches[i]` sits on link `i` and must carry the link's name.
    pub fn new(
        topology: Topology,
        branches: Vec<Branch>,
        reference: HeaderId,
        config: BalanceConfig,
    ) -> SolverResult<Self> {
        if branches.len() != topology.links().len() {
            return Err(SolverError::ProblemSetup {
                what: format!(
                    "{} branches for {} links",
                    branches.len(),
                    topology.links().len()
                ),
            });
        }
        for (link, branch) in topology.links().iter().zip(&branches) {
            if link.name != branch.name() {
                return Err(SolverError::ProblemSetup {
                    what: format!(
                        "branch '{}' placed on link '{}'",
                        branch.name(),
                        link.name
                    ),
                });
            }
        }
        if topology.header(reference).is_none() {
            return Err(SolverError::Unknown {
                what: "reference header",
                id: reference.to_string(),
            });
        }

        let free = topology
            .headers()
            .iter()
            .map(|h| h.id)
            .filter(|&id| id != reference)
            .collect();
        let pressures = vec![0.0; topology.headers().len()];
        let mut network = Self {
            topology,
            branches,
            reference,
            free,
            pressures,
            config,
        };
        network.set_config(config)?;
        Ok(network)
    }

    pub fn topology(&self) -> &Topology {
        &self.topology
    }

    pub fn branches(&self) -> &[Branch] {
        &self.branches
    }

    pub fn branch(&self, id: BranchId) -> Option<&Branch> {
        self.branches.get(id.index() as usize)
    }

    pub fn branch_mut(&mut self, id: BranchId) -> Option<&mut Branch> {
        self.branches.get_mut(id.index() as usize)
    }

    pub fn branch_by_name(&self, name: &str) -> Option<&Branch> {
        self.branches.iter().find(|b| b.name() == name)
    }

    pub fn branch_by_name_mut(&mut self, name: &str) -> Option<&mut Branch> {
        self.branches.iter_mut().find(|b| b.name() == name)
    }

    pub fn reference(&self) -> HeaderId {
        self.reference
    }

    pub fn config(&self) -> &BalanceConfig {
        &self.config
    }

    pub fn set_config(&mut self, config: BalanceConfig) -> SolverResult<()> {
        config.validate()?;
        if self.free.len() > config.max_free_headers {
            return Err(SolverError::TooManyHeaders {
                free: self.free.len(),
                max: config.max_free_headers,
            });
        }
        self.config = config;
        Ok(())
    }

    /// Gauge pressure from the last balance.
    pub fn pressure(&self, header: HeaderId) -> Option<f64> {
        self.pressures.get(header.index() as usize).copied()
    }

    /// Pressure difference `p_a - p_b` from the last balance.
    pub fn pressure_difference(&self, a: HeaderId, b: HeaderId) -> Option<f64> {
        Some(self.pressure(a)? - self.pressure(b)?)
    }

    /// Balance every free header's pressure.
    pub fn solve(&mut self) -> SolverResult<BalanceReport> {
        let mut stats = SolveStats::default();
        let outer = if self.free.is_empty() {
            None
        } else {
            Some(self.balance_header(0, &mut stats)?)
        };

        let imbalances = self.settle();
        let residual = self
            .free
            .iter()
            .map(|h| imbalances[h.index() as usize].abs())
            .fold(0.0, f64::max);
        let converged = residual < self.config.flow_tolerance;
        let iterations = outer.map(|o| o.iterations).unwrap_or(0);

        if converged {
            debug!(
                headers = self.free.len(),
                iterations,
                evaluations = stats.evaluations,
                residual,
                "network balanced"
            );
        } else {
            warn!(
                headers = self.free.len(),
                iterations,
                evaluations = stats.evaluations,
                residual,
                "network balance exhausted; keeping best guess"
            );
        }

        Ok(self.report(converged, iterations, stats.evaluations, residual, imbalances))
    }

    /// Balance a two-header loop by bisecting on the flow of `reference`.
    ///
    /// Every link must join the same two headers as the reference link.
    pub fn balance_loop(&mut self, reference: BranchId) -> SolverResult<BalanceReport> {
        let link = self
            .topology
            .link(reference)
            .ok_or_else(|| SolverError::Unknown {
                what: "branch",
                id: reference.to_string(),
            })?;
        let (from, to) = (link.from, link.to);

        let mut same_direction = Vec::with_capacity(self.branches.len());
        for l in self.topology.links() {
            if l.from == from && l.to == to {
                same_direction.push(true);
            } else if l.from == to && l.to == from {
                same_direction.push(false);
            } else {
                return Err(SolverError::NotALoop {
                    branch: l.name.clone(),
                });
            }
        }

        let outcome = LoopBalance::new(self.config)?.solve(
            &mut self.branches,
            reference.index() as usize,
            &same_direction,
        )?;

        // p_to = p_from + dp, with the reference header at zero
        let (fi, ti) = (from.index() as usize, to.index() as usize);
        if to == self.reference {
            self.pressures[ti] = 0.0;
            self.pressures[fi] = -outcome.pressure_delta;
        } else {
            self.pressures[fi] = 0.0;
            self.pressures[ti] = outcome.pressure_delta;
        }

        let imbalances = self.imbalances();
        Ok(self.report(
            outcome.converged,
            outcome.iterations,
            outcome.iterations + 1,
            outcome.imbalance.abs(),
            imbalances,
        ))
    }

    fn balance_header(
        &mut self,
        level: usize,
        stats: &mut SolveStats,
    ) -> SolverResult<BisectionOutcome> {
        let header = self.free[level];
        let idx = header.index() as usize;
        let inner = level + 1 < self.free.len();

        let mut search = Bisection::new(self.config.pressure_bisection())?;
        while let Some(p) = search.next_guess() {
            self.pressures[idx] = p;
            if inner {
                self.balance_header(level + 1, stats)?;
            }
            stats.evaluations += 1;
            let r = self.net_inflow(header);
            search.report(r);
        }

        let out = search.outcome();
        self.pressures[idx] = out.x;
        if inner {
            // re-settle the inner headers at the accepted guess
            self.balance_header(level + 1, stats)?;
        }
        if level == 0 || !out.converged() {
            debug!(
                header = %header,
                level,
                pressure = out.x,
                residual = out.residual,
                state = ?out.state,
                "header bisection finished"
            );
        }
        Ok(out)
    }

    /// Net inflow at `header` with every incident branch re-evaluated.
    fn net_inflow(&mut self, header: HeaderId) -> f64 {
        let mut inflow = 0.0;
        for inc in self.topology.incident(header) {
            let i = inc.link.index() as usize;
            let link = &self.topology.links()[i];
            let rise = self.pressures[link.to.index() as usize]
                - self.pressures[link.from.index() as usize];
            inflow += inc.end.inflow_sign() * self.branches[i].p2f(rise);
        }
        inflow
    }

    /// Evaluate every branch at the current pressures; returns per-header imbalance.
    fn settle(&mut self) -> Vec<f64> {
        for (link, branch) in self.topology.links().iter().zip(self.branches.iter_mut()) {
            let rise = self.pressures[link.to.index() as usize]
                - self.pressures[link.from.index() as usize];
            branch.p2f(rise);
        }
        self.imbalances()
    }

    /// Net inflow per header from the branches' recorded flows.
    fn imbalances(&self) -> Vec<f64> {
        let mut net = vec![0.0; self.topology.headers().len()];
        for (link, branch) in self.topology.links().iter().zip(&self.branches) {
            let g = branch.operating_point().flow;
            net[link.from.index() as usize] -= g;
            net[link.to.index() as usize] += g;
        }
        net
    }

    fn report(
        &self,
        converged: bool,
        iterations: usize,
        evaluations: usize,
        residual: f64,
        imbalances: Vec<f64>,
    ) -> BalanceReport {
        let headers = self
            .topology
            .headers()
            .iter()
            .zip(imbalances)
            .map(|(h, imbalance)| HeaderReport {
                name: h.name.clone(),
                pressure: self.pressures[h.id.index() as usize],
                imbalance,
            })
            .collect();
        BalanceReport {
            converged,
            iterations,
            evaluations,
            residual,
            headers,
            branches: self.branches.iter().map(BranchReport::capture).collect(),
            fault: (!converged).then_some(Fault::IterationExhausted),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pf_components::Pump;
    use pf_graph::TopologyBuilder;

    fn simple_loop(k: f64) -> Network {
        let mut b = TopologyBuilder::new();
        let r = b.add_header("R");
        let s = b.add_header("S");
        b.add_link("pump", r, s);
        b.add_link("load", s, r);
        let topo = b.build().unwrap();
        let branches = vec![
            Branch::builder("pump")
                .pump(Pump::standard("CP").with_speed(1.0))
                .build()
                .unwrap(),
            Branch::builder("load").k_equipment(k).build().unwrap(),
        ];
        Network::new(topo, branches, r, BalanceConfig::default()).unwrap()
    }

    #[test]
    fn header_solve_matches_loop_balance() {
        let mut by_header = simple_loop(10.0);
        let mut by_loop = simple_loop(10.0);
        let a = by_header.solve().unwrap();
        let b = by_loop
            .balance_loop(by_loop.topology().link_by_name("pump").unwrap())
            .unwrap();
        assert!(a.converged && b.converged);
        let ga = a.branch("load").unwrap().flow;
        let gb = b.branch("load").unwrap().flow;
        assert!((ga - gb).abs() < 2e-4);
        let pa = a.header("S").unwrap().pressure;
        let pb = b.header("S").unwrap().pressure;
        assert!((pa - pb).abs() / pa < 1e-3);
    }

    #[test]
    fn name_mismatch_is_rejected() {
        let mut b = TopologyBuilder::new();
        let r = b.add_header("R");
        let s = b.add_header("S");
        b.add_link("pump", r, s);
        b.add_link("load", s, r);
        let topo = b.build().unwrap();
        let branches = vec![
            Branch::builder("load").k_pipe(1.0).build().unwrap(),
            Branch::builder("pump").k_pipe(1.0).build().unwrap(),
        ];
        let err = Network::new(topo, branches, r, BalanceConfig::default()).unwrap_err();
        assert!(matches!(err, SolverError::ProblemSetup { .. }));
    }

    #[test]
    fn pressure_difference_reads_last_solve() {
        let mut net = simple_loop(10.0);
        net.solve().unwrap();
        let s = net.topology().header_by_name("S").unwrap();
        let r = net.reference();
        let dp = net.pressure_difference(s, r).unwrap();
        let pump = net.branch_by_name("pump").unwrap().operating_point();
        assert!((dp - pump.pressure_delta).abs() < 1e-9);
    }
}
