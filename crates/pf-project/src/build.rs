//! Scenario to solver network.

use std::collections::HashMap;

use pf_components::{
    Branch, Damper, Fan, MachineCurve, ParallelPumpUnit, PressureUnit, Pump, Valve,
};
use pf_core::{HeaderId, m};
use pf_graph::TopologyBuilder;
use pf_solver::Network;

use crate::schema::{BranchDef, MoverDef, Scenario, ThrottleDef, ValveDef};
use crate::{ProjectError, ProjectResult};

/// Builds the network with every branch at its initial signals.
///
/// Header and link names are the scenario IDs. Call
/// [`validate_scenario`](crate::validate_scenario) first for readable errors;
/// component and topology checks still run here.
pub fn build_network(scenario: &Scenario) -> ProjectResult<Network> {
    let mut topo = TopologyBuilder::new();
    let headers: HashMap<&str, HeaderId> = scenario
        .headers
        .iter()
        .map(|h| (h.id.as_str(), topo.add_header(h.id.as_str())))
        .collect();

    let mut branches = Vec::with_capacity(scenario.branches.len());
    for def in &scenario.branches {
        let from = *headers.get(def.from.as_str()).ok_or_else(|| missing(&def.from, def))?;
        let to = *headers.get(def.to.as_str()).ok_or_else(|| missing(&def.to, def))?;
        topo.add_link(def.id.as_str(), from, to);
        branches.push(build_branch(def)?);
    }
    let topology = topo.build()?;

    let reference = topology
        .header_by_name(&scenario.reference)
        .ok_or_else(|| ProjectError::Build {
            what: format!("reference header '{}' not found", scenario.reference),
        })?;
    Ok(Network::new(topology, branches, reference, scenario.solver)?)
}

pub fn build_branch(def: &BranchDef) -> ProjectResult<Branch> {
    let mut builder = Branch::builder(def.id.as_str())
        .k_pipe(def.k_pipe)
        .k_equipment(def.k_equipment)
        .static_head(m(def.static_head_m));

    builder = match &def.mover {
        Some(MoverDef::Pump { curve, speed }) => {
            builder.pump(pump(format!("{} pump", def.id), curve.as_ref(), *speed)?)
        }
        Some(MoverDef::Fan { curve, unit, speed }) => {
            builder.fan(fan(format!("{} fan", def.id), curve.as_ref(), *unit, *speed)?)
        }
        Some(MoverDef::ParallelPumps {
            curve,
            speed,
            num_pumps,
            k_pump_leg,
            bypass,
        }) => {
            let p = pump(format!("{} pump", def.id), curve.as_ref(), *speed)?;
            let mut unit = ParallelPumpUnit::new(format!("{} unit", def.id), p, *num_pumps)?
                .with_pump_leg_loss(*k_pump_leg)?;
            if let Some(b) = bypass {
                unit = unit.with_bypass(valve(format!("{} bypass", def.id), &b.valve())?, b.k_leg)?;
            }
            builder.parallel(unit)
        }
        None => builder,
    };

    builder = match &def.throttle {
        Some(ThrottleDef::Valve(v)) => builder.valve(valve(format!("{} valve", def.id), v)?),
        Some(ThrottleDef::Damper { curves, opening }) => {
            let name = format!("{} damper", def.id);
            let damper = match curves {
                Some(curves) => Damper::new(name, curves.clone())?,
                None => Damper::standard(name),
            };
            builder.damper(damper.with_opening(*opening))
        }
        None => builder,
    };

    if let Some(b) = &def.bypass {
        builder = builder.bypass(valve(format!("{} bypass", def.id), &b.valve())?, b.k_leg);
    }

    Ok(builder.build()?)
}

fn pump(name: String, curve: Option<&MachineCurve>, speed: f64) -> ProjectResult<Pump> {
    let p = match curve {
        Some(c) => Pump::new(name, c.clone())?,
        None => Pump::standard(name),
    };
    Ok(p.with_speed(speed))
}

fn fan(
    name: String,
    curve: Option<&MachineCurve>,
    unit: PressureUnit,
    speed: f64,
) -> ProjectResult<Fan> {
    let f = match curve {
        Some(c) => Fan::new(name, c.clone(), unit)?,
        None => Fan::standard(name),
    };
    Ok(f.with_speed(speed))
}

fn valve(name: String, def: &ValveDef) -> ProjectResult<Valve> {
    let v = match (def.cv_max, def.rangeability) {
        (None, None) => Valve::standard(name),
        (cv, r) => Valve::new(name, cv.unwrap_or(800.0), r.unwrap_or(100.0))?,
    };
    Ok(v.with_opening(def.opening))
}

fn missing(header: &str, def: &BranchDef) -> ProjectError {
    ProjectError::Build {
        what: format!("branch '{}' references unknown header '{header}'", def.id),
    }
}
