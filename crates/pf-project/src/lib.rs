//! pf-project: scenario files for plantflow.
//!
//! A scenario holds the header/branch layout, initial control signals,
//! solver settings, schedules, and controllers. Files are YAML; results
//! and scenarios can also be written as JSON.

pub mod build;
pub mod schema;
pub mod validate;

pub use build::{build_branch, build_network};
pub use schema::*;
pub use validate::{LATEST_VERSION, ValidationError, validate_scenario};

use tracing::debug;

pub type ProjectResult<T> = Result<T, ProjectError>;

#[derive(thiserror::Error, Debug)]
pub enum ProjectError {
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Build error: {what}")]
    Build { what: String },

    #[error("Component error: {0}")]
    Component(#[from] pf_components::ComponentError),

    #[error("Topology error: {0}")]
    Graph(#[from] pf_graph::GraphError),

    #[error("Solver error: {0}")]
    Solver(#[from] pf_solver::SolverError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub fn parse_yaml(content: &str) -> ProjectResult<Scenario> {
    let scenario: Scenario = serde_yaml::from_str(content)?;
    validate_scenario(&scenario)?;
    Ok(scenario)
}

pub fn load_yaml(path: &std::path::Path) -> ProjectResult<Scenario> {
    let content = std::fs::read_to_string(path)?;
    let scenario = parse_yaml(&content)?;
    debug!(
        path = %path.display(),
        scenario = %scenario.name,
        headers = scenario.headers.len(),
        branches = scenario.branches.len(),
        "loaded scenario"
    );
    Ok(scenario)
}

pub fn save_yaml(path: &std::path::Path, scenario: &Scenario) -> ProjectResult<()> {
    validate_scenario(scenario)?;
    let content = serde_yaml::to_string(scenario)?;
    std::fs::write(path, content)?;
    Ok(())
}

pub fn load_json(path: &std::path::Path) -> ProjectResult<Scenario> {
    let content = std::fs::read_to_string(path)?;
    let scenario: Scenario = serde_json::from_str(&content)?;
    validate_scenario(&scenario)?;
    Ok(scenario)
}

pub fn save_json(path: &std::path::Path, scenario: &Scenario) -> ProjectResult<()> {
    validate_scenario(scenario)?;
    let content = serde_json::to_string_pretty(scenario)?;
    std::fs::write(path, content)?;
    Ok(())
}

/// Writes any serializable result (a balance report, a simulation record) as JSON.
pub fn write_json<T: serde::Serialize>(path: &std::path::Path, value: &T) -> ProjectResult<()> {
    let content = serde_json::to_string_pretty(value)?;
    std::fs::write(path, content)?;
    Ok(())
}
