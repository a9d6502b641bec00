use std::path::PathBuf;

use pf_components::SignalTarget;
use pf_project::Scenario;
use pf_sim::{SimOptions, Simulation, run_batch, run_scenario, solve_batch};

fn load(name: &str) -> Scenario {
    let root = PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .parent()
        .and_then(|p| p.parent())
        .expect("workspace root")
        .join("scenarios")
        .join(name);
    pf_project::load_yaml(&root).unwrap()
}

#[test]
fn air_handler_holds_static_pressure() {
    let scenario = load("air_handler.yaml");
    let record = run_scenario(&scenario, &SimOptions::default()).unwrap();
    assert_eq!(record.steps.len(), 60);
    assert_eq!(record.unconverged().count(), 0);

    let dp = |minute: usize| {
        let step = &record.steps[minute];
        step.header("supply").unwrap().pressure - step.header("return").unwrap().pressure
    };
    // too little pressure at the starting speed
    assert!(dp(0) < 0.28);
    assert!((dp(29) - 0.3).abs() < 0.01, "dp at 29: {}", dp(29));
    assert!((dp(59) - 0.3).abs() < 0.01, "dp at 59: {}", dp(59));

    let speed = record.signal_series("supply_fan");
    assert!(speed[29] > 0.8);
    // the south damper closes at minute 30, so the fan slows down
    assert!(speed[59] < speed[29]);
}

#[test]
fn schedules_apply_from_their_minute() {
    let scenario = load("air_handler.yaml");
    let record = run_scenario(
        &scenario,
        &SimOptions {
            steps: Some(35),
            record_every: 1,
        },
    )
    .unwrap();
    let damper = record.signal_series("zone_south");
    assert_eq!(damper[29], 1.0);
    assert_eq!(damper[30], 0.3);
    assert_eq!(damper[34], 0.3);
}

#[test]
fn controllers_start_after_first_balance() {
    let scenario = load("air_handler.yaml");
    let mut sim = Simulation::from_scenario(&scenario).unwrap();
    let first = sim.step().unwrap();
    assert_eq!(first.minute, 0);
    assert!(first.control_actions.is_empty());
    let second = sim.step().unwrap();
    assert_eq!(second.minute, 1);
    assert_eq!(second.control_actions.len(), 1);
    let (id, target, value) = &second.control_actions[0];
    assert_eq!(id, "static_pressure");
    assert_eq!(*target, SignalTarget::Mover);
    assert!(*value > 0.8);
    assert_eq!(sim.minute(), 2);
}

#[test]
fn chilled_water_plant_hands_over_to_bypass() {
    let scenario = load("chilled_water_loop.yaml");
    let record = run_scenario(&scenario, &SimOptions::default()).unwrap();
    assert_eq!(record.steps.len(), 120);
    assert_eq!(record.unconverged().count(), 0);

    let actions = || record.steps.iter().flat_map(|s| s.control_actions.iter());
    assert!(
        actions().any(|(id, t, v)| id == "dp_control" && *t == SignalTarget::Bypass && *v > 0.0),
        "bypass never opened"
    );
    assert!(
        actions().any(|(id, t, v)| {
            id == "pump_staging" && *t == SignalTarget::RunningUnits && *v == 1.0
        }),
        "never staged down"
    );

    let last = record.steps.last().unwrap();
    let dp = last.header("supply").unwrap().pressure - last.header("return").unwrap().pressure;
    assert!((dp - 60.0).abs() < 3.0, "final dp {dp}");

    for step in &record.steps {
        let pumps = step.branch("pumps").unwrap().flow;
        let loads = step.branch("coil_east").unwrap().flow + step.branch("coil_west").unwrap().flow;
        assert!((pumps - loads).abs() < 10.0 * scenario.solver.flow_tolerance);
    }
    assert!(record.energy_kwh() > 0.0);
}

#[test]
fn record_every_decimates_but_keeps_last() {
    let scenario = load("air_handler.yaml");
    let record = run_scenario(
        &scenario,
        &SimOptions {
            steps: Some(25),
            record_every: 10,
        },
    )
    .unwrap();
    let minutes: Vec<usize> = record.steps.iter().map(|s| s.minute).collect();
    assert_eq!(minutes, vec![9, 19, 24]);
}

#[test]
fn batch_matches_serial_runs() {
    let scenarios = vec![load("air_handler.yaml"), load("chilled_water_loop.yaml")];
    let opts = SimOptions {
        steps: Some(20),
        record_every: 1,
    };
    let batch = run_batch(&scenarios, &opts);
    assert_eq!(batch.len(), 2);
    for (scenario, result) in scenarios.iter().zip(batch) {
        let parallel = result.unwrap();
        let serial = run_scenario(scenario, &opts).unwrap();
        assert_eq!(parallel, serial);
    }

    let solved = solve_batch(&scenarios);
    assert!(solved.iter().all(|r| r.as_ref().is_ok_and(|rep| rep.converged)));
}

#[test]
fn zero_steps_is_rejected() {
    let scenario = load("air_handler.yaml");
    let mut sim = Simulation::from_scenario(&scenario).unwrap();
    assert!(sim.run(0, 1).is_err());
}

#[test]
fn record_serializes_to_json() {
    let scenario = load("air_handler.yaml");
    let record = run_scenario(
        &scenario,
        &SimOptions {
            steps: Some(3),
            record_every: 1,
        },
    )
    .unwrap();
    let json = serde_json::to_string(&record).unwrap();
    let back: pf_sim::SimRecord = serde_json::from_str(&json).unwrap();
    assert_eq!(back.steps.len(), 3);
    assert_eq!(back.scenario, record.scenario);
}
