use std::path::PathBuf;

fn scenario_dir() -> PathBuf {
    let crate_dir = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    crate_dir
        .parent()
        .and_then(|p| p.parent())
        .expect("workspace root")
        .join("scenarios")
}

#[test]
fn scenarios_validate_and_build() {
    for name in ["chilled_water_loop.yaml", "air_handler.yaml"] {
        let path = scenario_dir().join(name);
        let scenario = pf_project::load_yaml(&path)
            .unwrap_or_else(|e| panic!("{} failed to load: {e}", path.display()));
        let network = pf_project::build_network(&scenario)
            .unwrap_or_else(|e| panic!("{} failed to build: {e}", path.display()));
        assert_eq!(network.branches().len(), scenario.branches.len());
    }
}

#[test]
fn chilled_water_loop_solves() {
    let scenario = pf_project::load_yaml(&scenario_dir().join("chilled_water_loop.yaml")).unwrap();
    let mut network = pf_project::build_network(&scenario).unwrap();
    let report = network.solve().unwrap();
    assert!(report.converged, "residual {}", report.residual);

    let pumps = report.branch("pumps").unwrap().flow;
    let east = report.branch("coil_east").unwrap().flow;
    let west = report.branch("coil_west").unwrap().flow;
    assert!(pumps > 0.0);
    assert!((pumps - east - west).abs() < 10.0 * scenario.solver.flow_tolerance);
    // the east coil has less pipe loss
    assert!(east > west);
}
