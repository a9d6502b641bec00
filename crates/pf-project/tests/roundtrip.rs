use pf_components::SignalTarget;
use pf_project::*;

fn two_header_loop() -> Scenario {
    Scenario {
        version: LATEST_VERSION,
        name: "Round trip".to_string(),
        headers: vec![
            HeaderDef {
                id: "supply".to_string(),
                name: Some("Supply".to_string()),
            },
            HeaderDef {
                id: "return".to_string(),
                name: None,
            },
        ],
        reference: "return".to_string(),
        branches: vec![
            BranchDef {
                id: "pump".to_string(),
                from: "return".to_string(),
                to: "supply".to_string(),
                mover: Some(MoverDef::Pump {
                    curve: None,
                    speed: 0.9,
                }),
                throttle: None,
                bypass: Some(BypassDef {
                    cv_max: Some(200.0),
                    rangeability: None,
                    opening: 0.0,
                    k_leg: 1.5,
                }),
                k_pipe: 0.5,
                k_equipment: 0.0,
                static_head_m: 0.0,
            },
            BranchDef {
                id: "coil".to_string(),
                from: "supply".to_string(),
                to: "return".to_string(),
                mover: None,
                throttle: Some(ThrottleDef::Valve(ValveDef {
                    cv_max: None,
                    rangeability: None,
                    opening: 0.7,
                })),
                bypass: None,
                k_pipe: 8.0,
                k_equipment: 2.0,
                static_head_m: 0.0,
            },
        ],
        solver: pf_solver::BalanceConfig::for_flow_scale(4.0),
        simulation: SimulationDef { steps: 30 },
        schedules: vec![ScheduleDef {
            branch: "coil".to_string(),
            target: SignalTarget::Throttle,
            points: vec![
                SchedulePointDef {
                    minute: 0,
                    value: 0.7,
                },
                SchedulePointDef {
                    minute: 15,
                    value: 0.4,
                },
            ],
        }],
        controllers: vec![ControllerDef {
            id: "dp".to_string(),
            measurement: MeasurementDef::PressureDifference {
                high: "supply".to_string(),
                low: "return".to_string(),
            },
            kind: ControllerKindDef::Pi {
                controller: pf_controls::PiController::default(),
                setpoint: 80.0,
                branch: "pump".to_string(),
                target: SignalTarget::Mover,
            },
        }],
    }
}

#[test]
fn roundtrip_yaml() {
    let scenario = two_header_loop();
    let path = std::env::temp_dir().join("pf_project_roundtrip.yaml");

    save_yaml(&path, &scenario).unwrap();
    let loaded = load_yaml(&path).unwrap();

    assert_eq!(scenario, loaded);
}

#[test]
fn roundtrip_json() {
    let scenario = two_header_loop();
    let path = std::env::temp_dir().join("pf_project_roundtrip.json");

    save_json(&path, &scenario).unwrap();
    let loaded = load_json(&path).unwrap();

    assert_eq!(scenario, loaded);
}

#[test]
fn save_rejects_invalid_scenario() {
    let mut scenario = two_header_loop();
    scenario.reference = "missing".to_string();
    let path = std::env::temp_dir().join("pf_project_invalid.yaml");
    assert!(matches!(
        save_yaml(&path, &scenario),
        Err(ProjectError::Validation(_))
    ));
}

#[test]
fn defaults_fill_in_omitted_fields() {
    let yaml = r#"
version: 1
name: minimal
headers:
  - id: a
  - id: b
reference: b
branches:
  - id: pump
    from: b
    to: a
    mover:
      type: Pump
  - id: load
    from: a
    to: b
    k_pipe: 10.0
"#;
    let scenario = parse_yaml(yaml).unwrap();
    assert_eq!(scenario.simulation.steps, 60);
    assert_eq!(scenario.solver, pf_solver::BalanceConfig::default());
    match &scenario.branches[0].mover {
        Some(MoverDef::Pump { curve, speed }) => {
            assert!(curve.is_none());
            assert_eq!(*speed, 1.0);
        }
        other => panic!("unexpected mover {other:?}"),
    }
}

#[test]
fn build_places_branches_on_links() {
    let scenario = two_header_loop();
    let network = build_network(&scenario).unwrap();
    assert_eq!(network.branches().len(), 2);
    let pump = network.branch_by_name("pump").unwrap();
    // a single pump with a bypass becomes a one-pump unit
    assert_eq!(pump.parallel_unit().map(|u| u.num_pumps()), Some(1));
    assert_eq!(pump.signal(SignalTarget::Mover), Some(0.9));
    let coil = network.branch_by_name("coil").unwrap();
    assert_eq!(coil.signal(SignalTarget::Throttle), Some(0.7));
    assert_eq!(
        network.topology().header_by_name("return"),
        Some(network.reference())
    );
}

#[test]
fn build_reports_incompatible_slots() {
    let mut scenario = two_header_loop();
    scenario.branches[1].throttle = Some(ThrottleDef::Damper {
        curves: None,
        opening: 1.0,
    });
    scenario.branches[1].mover = Some(MoverDef::Pump {
        curve: None,
        speed: 1.0,
    });
    assert!(matches!(
        build_network(&scenario),
        Err(ProjectError::Component(_))
    ));
}
