//! Scenario validation logic.

use std::collections::{HashMap, HashSet};

use pf_components::SignalTarget;

use crate::schema::{
    BranchDef, BypassDef, ControllerDef, ControllerKindDef, MeasurementDef, MoverDef, Scenario,
    ScheduleDef, ThrottleDef, ValveDef,
};

pub const LATEST_VERSION: u32 = 1;

#[derive(thiserror::Error, Debug)]
pub enum ValidationError {
    #[error("Duplicate ID: {id} in {context}")]
    DuplicateId { id: String, context: String },

    #[error("Missing reference: {id} in {context}")]
    MissingReference { id: String, context: String },

    #[error("Invalid value: {field} = {value} ({reason})")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Unsupported feature: {feature} - {reason}")]
    Unsupported { feature: String, reason: String },

    #[error("Unsupported version: {version}")]
    UnsupportedVersion { version: u32 },
}

pub fn validate_scenario(scenario: &Scenario) -> Result<(), ValidationError> {
    if scenario.version > LATEST_VERSION {
        return Err(ValidationError::UnsupportedVersion {
            version: scenario.version,
        });
    }

    let mut header_ids = HashSet::new();
    for header in &scenario.headers {
        if header.id.trim().is_empty() {
            return Err(invalid("header id", &header.id, "must not be empty"));
        }
        if !header_ids.insert(header.id.as_str()) {
            return Err(ValidationError::DuplicateId {
                id: header.id.clone(),
                context: "headers".to_string(),
            });
        }
    }
    if !header_ids.contains(scenario.reference.as_str()) {
        return Err(ValidationError::MissingReference {
            id: scenario.reference.clone(),
            context: "reference header".to_string(),
        });
    }

    let mut branches = HashMap::new();
    for branch in &scenario.branches {
        if branches.insert(branch.id.as_str(), branch).is_some() {
            return Err(ValidationError::DuplicateId {
                id: branch.id.clone(),
                context: "branches".to_string(),
            });
        }
        validate_branch(branch, &header_ids)?;
    }

    let free = scenario.headers.len().saturating_sub(1);
    if free > scenario.solver.max_free_headers {
        return Err(ValidationError::Unsupported {
            feature: format!("{free} free headers"),
            reason: format!(
                "the header solve nests at most {} levels",
                scenario.solver.max_free_headers
            ),
        });
    }
    if !(scenario.solver.flow_tolerance > 0.0 && scenario.solver.flow_tolerance.is_finite()) {
        return Err(invalid(
            "solver flow_tolerance",
            scenario.solver.flow_tolerance,
            "must be positive and finite",
        ));
    }

    if scenario.simulation.steps == 0 {
        return Err(invalid("simulation steps", 0, "must be at least one"));
    }

    for schedule in &scenario.schedules {
        validate_schedule(schedule, &branches)?;
    }

    let mut controller_ids = HashSet::new();
    let mut driven = HashSet::new();
    for controller in &scenario.controllers {
        if !controller_ids.insert(controller.id.as_str()) {
            return Err(ValidationError::DuplicateId {
                id: controller.id.clone(),
                context: "controllers".to_string(),
            });
        }
        validate_controller(controller, &branches, &header_ids)?;
        for target in controller_targets(&controller.kind) {
            if !driven.insert((controller.kind.branch(), target)) {
                return Err(invalid(
                    format!("controller '{}' target", controller.id),
                    format!("{}/{target:?}", controller.kind.branch()),
                    "already driven by another controller",
                ));
            }
        }
    }

    Ok(())
}

fn validate_branch(branch: &BranchDef, header_ids: &HashSet<&str>) -> Result<(), ValidationError> {
    for (end, id) in [("from", &branch.from), ("to", &branch.to)] {
        if !header_ids.contains(id.as_str()) {
            return Err(ValidationError::MissingReference {
                id: id.clone(),
                context: format!("branch '{}' {end}", branch.id),
            });
        }
    }
    if branch.from == branch.to {
        return Err(invalid(
            format!("branch '{}' to", branch.id),
            &branch.to,
            "a branch must join two different headers",
        ));
    }

    non_negative(&branch.id, "k_pipe", branch.k_pipe)?;
    non_negative(&branch.id, "k_equipment", branch.k_equipment)?;
    if !branch.static_head_m.is_finite() {
        return Err(invalid(
            format!("branch '{}' static_head_m", branch.id),
            branch.static_head_m,
            "must be finite",
        ));
    }

    match &branch.mover {
        Some(MoverDef::Pump { speed, .. }) | Some(MoverDef::Fan { speed, .. }) => {
            fraction(&branch.id, "mover speed", *speed)?;
        }
        Some(MoverDef::ParallelPumps {
            speed,
            num_pumps,
            k_pump_leg,
            bypass,
            ..
        }) => {
            fraction(&branch.id, "mover speed", *speed)?;
            if *num_pumps == 0 {
                return Err(invalid(
                    format!("branch '{}' num_pumps", branch.id),
                    0,
                    "must be at least one",
                ));
            }
            non_negative(&branch.id, "k_pump_leg", *k_pump_leg)?;
            if let Some(b) = bypass {
                validate_bypass(&branch.id, b)?;
            }
        }
        None => {}
    }

    match &branch.throttle {
        Some(ThrottleDef::Valve(v)) => validate_valve(&branch.id, "valve", v)?,
        Some(ThrottleDef::Damper { opening, .. }) => {
            fraction(&branch.id, "damper opening", *opening)?;
        }
        None => {}
    }

    if let Some(b) = &branch.bypass {
        if !matches!(branch.mover, Some(MoverDef::Pump { .. })) {
            return Err(ValidationError::Unsupported {
                feature: format!("bypass on branch '{}'", branch.id),
                reason: "a branch-level bypass needs a single pump; parallel units carry their own"
                    .to_string(),
            });
        }
        validate_bypass(&branch.id, b)?;
    }

    Ok(())
}

fn validate_bypass(branch: &str, bypass: &BypassDef) -> Result<(), ValidationError> {
    validate_valve(branch, "bypass valve", &bypass.valve())?;
    non_negative(branch, "bypass k_leg", bypass.k_leg)
}

fn validate_valve(branch: &str, what: &str, valve: &ValveDef) -> Result<(), ValidationError> {
    fraction(branch, &format!("{what} opening"), valve.opening)?;
    if let Some(cv) = valve.cv_max
        && !(cv.is_finite() && cv > 0.0)
    {
        return Err(invalid(
            format!("branch '{branch}' {what} cv_max"),
            cv,
            "must be positive and finite",
        ));
    }
    if let Some(r) = valve.rangeability
        && !(r.is_finite() && r > 1.0)
    {
        return Err(invalid(
            format!("branch '{branch}' {what} rangeability"),
            r,
            "must exceed 1",
        ));
    }
    Ok(())
}

fn validate_schedule(
    schedule: &ScheduleDef,
    branches: &HashMap<&str, &BranchDef>,
) -> Result<(), ValidationError> {
    let branch = lookup_branch(branches, &schedule.branch, "schedule branch")?;
    check_target(branch, schedule.target, "schedule")?;
    if schedule.points.is_empty() {
        return Err(invalid(
            format!("schedule on '{}' points", schedule.branch),
            "[]",
            "needs at least one point",
        ));
    }
    for pair in schedule.points.windows(2) {
        if pair[1].minute <= pair[0].minute {
            return Err(invalid(
                format!("schedule on '{}' minute", schedule.branch),
                pair[1].minute,
                "minutes must be strictly increasing",
            ));
        }
    }
    for point in &schedule.points {
        if !point.value.is_finite() {
            return Err(invalid(
                format!("schedule on '{}' value", schedule.branch),
                point.value,
                "must be finite",
            ));
        }
    }
    Ok(())
}

fn validate_controller(
    controller: &ControllerDef,
    branches: &HashMap<&str, &BranchDef>,
    header_ids: &HashSet<&str>,
) -> Result<(), ValidationError> {
    let context = format!("controller '{}'", controller.id);
    match &controller.measurement {
        MeasurementDef::BranchFlow { branch } => {
            lookup_branch(branches, branch, &format!("{context} measurement"))?;
        }
        MeasurementDef::PressureDifference { high, low } => {
            for id in [high, low] {
                if !header_ids.contains(id.as_str()) {
                    return Err(ValidationError::MissingReference {
                        id: id.clone(),
                        context: format!("{context} measurement"),
                    });
                }
            }
        }
    }

    let branch = lookup_branch(branches, controller.kind.branch(), &context)?;
    match &controller.kind {
        ControllerKindDef::Pi {
            controller: pi,
            setpoint,
            target,
            ..
        } => {
            pi.validate().map_err(|e| invalid(&context, "pi", e))?;
            finite(&context, "setpoint", *setpoint)?;
            check_target(branch, *target, &context)?;
        }
        ControllerKindDef::Staging {
            staging, design, ..
        } => {
            staging.validate().map_err(|e| invalid(&context, "staging", e))?;
            if !(design.is_finite() && *design > 0.0) {
                return Err(invalid(
                    format!("{context} design"),
                    design,
                    "must be positive and finite",
                ));
            }
            check_target(branch, SignalTarget::RunningUnits, &context)?;
        }
        ControllerKindDef::BypassSwitch {
            switch, setpoint, ..
        } => {
            switch.pump.validate().map_err(|e| invalid(&context, "pump", e))?;
            switch.valve.validate().map_err(|e| invalid(&context, "valve", e))?;
            if switch.dwell == 0 {
                return Err(invalid(format!("{context} dwell"), 0, "must be at least one"));
            }
            finite(&context, "setpoint", *setpoint)?;
            check_target(branch, SignalTarget::Mover, &context)?;
            check_target(branch, SignalTarget::Bypass, &context)?;
        }
    }
    Ok(())
}

fn controller_targets(kind: &ControllerKindDef) -> Vec<SignalTarget> {
    match kind {
        ControllerKindDef::Pi { target, .. } => vec![*target],
        ControllerKindDef::Staging { .. } => vec![SignalTarget::RunningUnits],
        ControllerKindDef::BypassSwitch { .. } => vec![SignalTarget::Mover, SignalTarget::Bypass],
    }
}

/// Whether `branch` has the input `target` drives.
fn check_target(
    branch: &BranchDef,
    target: SignalTarget,
    context: &str,
) -> Result<(), ValidationError> {
    let parallel = matches!(branch.mover, Some(MoverDef::ParallelPumps { .. }));
    let ok = match target {
        SignalTarget::Mover => branch.mover.is_some(),
        SignalTarget::Throttle => branch.throttle.is_some(),
        SignalTarget::Bypass => {
            branch.bypass.is_some()
                || matches!(
                    branch.mover,
                    Some(MoverDef::ParallelPumps {
                        bypass: Some(_),
                        ..
                    })
                )
        }
        SignalTarget::RunningUnits => parallel,
    };
    if ok {
        Ok(())
    } else {
        Err(invalid(
            format!("{context} target"),
            format!("{target:?}"),
            format!("branch '{}' has no such input", branch.id),
        ))
    }
}

fn lookup_branch<'a>(
    branches: &HashMap<&str, &'a BranchDef>,
    id: &str,
    context: &str,
) -> Result<&'a BranchDef, ValidationError> {
    branches
        .get(id)
        .copied()
        .ok_or_else(|| ValidationError::MissingReference {
            id: id.to_string(),
            context: context.to_string(),
        })
}

fn invalid(
    field: impl Into<String>,
    value: impl ToString,
    reason: impl ToString,
) -> ValidationError {
    ValidationError::InvalidValue {
        field: field.into(),
        value: value.to_string(),
        reason: reason.to_string(),
    }
}

fn finite(owner: &str, field: &str, v: f64) -> Result<(), ValidationError> {
    if v.is_finite() {
        Ok(())
    } else {
        Err(invalid(format!("{owner} {field}"), v, "must be finite"))
    }
}

fn non_negative(branch: &str, field: &str, v: f64) -> Result<(), ValidationError> {
    if v.is_finite() && v >= 0.0 {
        Ok(())
    } else {
        Err(invalid(
            format!("branch '{branch}' {field}"),
            v,
            "must be non-negative and finite",
        ))
    }
}

fn fraction(branch: &str, field: &str, v: f64) -> Result<(), ValidationError> {
    if (0.0..=1.0).contains(&v) {
        Ok(())
    } else {
        Err(invalid(
            format!("branch '{branch}' {field}"),
            v,
            "must be in [0, 1]",
        ))
    }
}
