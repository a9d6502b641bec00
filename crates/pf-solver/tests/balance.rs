//! Network balance against closed-form operating points.

use pf_components::{Branch, Characteristic, Fault, Pump, Valve};
use pf_core::units::m;
use pf_core::{Tolerances, nearly_equal};
use pf_graph::TopologyBuilder;
use pf_solver::{BalanceConfig, Network, SolverError};
use proptest::prelude::*;

const A: f64 = 233.0;
const B: f64 = 5.9578;
const C: f64 = -4.95;

/// Positive root of `A s^2 + B s g + C g^2 = k g^2 + h`.
fn operating_flow(s: f64, k: f64, h: f64) -> f64 {
    let qa = k - C;
    let qb = -B * s;
    let qc = h - A * s * s;
    (-qb + (qb * qb - 4.0 * qa * qc).sqrt()) / (2.0 * qa)
}

fn pump_loop(s: f64, k_pipe: f64, load: Branch) -> Network {
    let mut b = TopologyBuilder::new();
    let r = b.add_header("Return");
    let sup = b.add_header("Supply");
    b.add_link("pump", r, sup);
    b.add_link(load.name().to_string(), sup, r);
    let topo = b.build().unwrap();
    let pump = Branch::builder("pump")
        .pump(Pump::standard("CP-1").with_speed(s))
        .k_pipe(k_pipe)
        .build()
        .unwrap();
    Network::new(topo, vec![pump, load], r, BalanceConfig::default()).unwrap()
}

fn resistance(name: &str, k: f64) -> Branch {
    Branch::builder(name).k_equipment(k).build().unwrap()
}

#[test]
fn pump_into_resistance_by_flow_bisection() {
    let mut net = pump_loop(1.0, 0.0, resistance("load", 10.0));
    net.set_config(BalanceConfig::default().with_flow_tolerance(1e-6)).unwrap();
    let id = net.topology().link_by_name("pump").unwrap();
    let report = net.balance_loop(id).unwrap();

    assert!(report.converged);
    assert!(report.iterations <= 30);
    assert!(report.fault.is_none());

    let g = report.branch("pump").unwrap().flow;
    let exact = operating_flow(1.0, 10.0, 0.0);
    assert!(nearly_equal(exact, 4.152, Tolerances::abs(1e-3)));
    assert!(nearly_equal(g, exact, Tolerances::abs(1e-6)));

    // the pump curve itself meets the load curve at the balanced flow
    let mut pump = Pump::standard("CP-1").with_speed(1.0);
    let mismatch = pump.f2p(g) - 10.0 * g * g;
    assert!(mismatch.abs() < 1e-4, "pump vs load: {mismatch}");
}

#[test]
fn part_speed_pump_with_fixed_losses() {
    let mut net = pump_loop(0.8, 7.0, resistance("load", 10.0));
    let report = net.solve().unwrap();
    assert!(report.converged);
    let exact = operating_flow(0.8, 17.0, 0.0);
    assert!(nearly_equal(report.branch("pump").unwrap().flow, exact, Tolerances::abs(1e-4)));
    assert!(nearly_equal(report.branch("load").unwrap().flow, exact, Tolerances::abs(1e-4)));
}

#[test]
fn static_head_lifts_the_curve() {
    let tower = Branch::builder("tower")
        .k_equipment(5.0)
        .static_head(m(10.0))
        .build()
        .unwrap();
    let head = tower.static_head();
    let mut net = pump_loop(1.0, 0.0, tower);
    let report = net.solve().unwrap();
    assert!(report.converged);
    let exact = operating_flow(1.0, 5.0, head);
    assert!(nearly_equal(report.branch("tower").unwrap().flow, exact, Tolerances::abs(1e-4)));
}

#[test]
fn nested_headers_conserve_flow() {
    let mut b = TopologyBuilder::new();
    let r = b.add_header("R");
    let s = b.add_header("S");
    let mid = b.add_header("M");
    b.add_link("pump", r, s);
    b.add_link("valve", s, mid);
    b.add_link("coil", mid, r);
    b.add_link("bypass", s, r);
    let topo = b.build().unwrap();
    let branches = vec![
        Branch::builder("pump")
            .pump(Pump::standard("CP").with_speed(1.0))
            .build()
            .unwrap(),
        Branch::builder("valve")
            .valve(Valve::standard("V").with_opening(0.6))
            .k_pipe(2.0)
            .build()
            .unwrap(),
        resistance("coil", 5.0),
        resistance("bypass", 8.0),
    ];
    let mut net = Network::new(topo, branches, r, BalanceConfig::default()).unwrap();
    let report = net.solve().unwrap();

    assert!(report.converged);
    for h in &report.headers {
        assert!(h.imbalance.abs() < 2e-4, "{}: {}", h.name, h.imbalance);
    }
    let valve = report.branch("valve").unwrap().flow;
    let coil = report.branch("coil").unwrap().flow;
    assert!(nearly_equal(valve, coil, Tolerances::abs(1e-4)));
    let p_s = report.header("S").unwrap().pressure;
    let p_m = report.header("M").unwrap().pressure;
    assert!(p_s > p_m && p_m > 0.0);
    let pump = report.branch("pump").unwrap().flow;
    let bypass = report.branch("bypass").unwrap().flow;
    assert!(nearly_equal(pump - valve, bypass, Tolerances::abs(1e-4)));
}

#[test]
fn identical_loads_split_evenly() {
    let mut b = TopologyBuilder::new();
    let r = b.add_header("R");
    let s = b.add_header("S");
    b.add_link("pump", r, s);
    b.add_link("ahu-1", s, r);
    b.add_link("ahu-2", s, r);
    let topo = b.build().unwrap();
    let branches = vec![
        Branch::builder("pump")
            .pump(Pump::standard("CP").with_speed(1.0))
            .build()
            .unwrap(),
        resistance("ahu-1", 20.0),
        resistance("ahu-2", 20.0),
    ];
    let mut net = Network::new(topo, branches, r, BalanceConfig::default()).unwrap();
    let report = net.solve().unwrap();
    let a = report.branch("ahu-1").unwrap().flow;
    let b = report.branch("ahu-2").unwrap().flow;
    assert!(nearly_equal(a, b, Tolerances::abs(1e-12)));
    // two k = 20 legs in parallel act as k = 5
    assert!(nearly_equal(a + b, operating_flow(1.0, 5.0, 0.0), Tolerances::abs(1e-4)));
}

#[test]
fn closed_branch_does_not_stop_the_solve() {
    let mut b = TopologyBuilder::new();
    let r = b.add_header("R");
    let s = b.add_header("S");
    b.add_link("pump", r, s);
    b.add_link("open", s, r);
    b.add_link("shut", s, r);
    let topo = b.build().unwrap();
    let branches = vec![
        Branch::builder("pump")
            .pump(Pump::standard("CP").with_speed(1.0))
            .build()
            .unwrap(),
        resistance("open", 10.0),
        Branch::builder("shut")
            .valve(Valve::standard("V"))
            .build()
            .unwrap(),
    ];
    let mut net = Network::new(topo, branches, r, BalanceConfig::default()).unwrap();
    let report = net.solve().unwrap();
    assert!(report.converged);
    let shut = report.branch("shut").unwrap();
    assert_eq!(shut.flow, 0.0);
    assert_eq!(shut.fault, Some(Fault::DeviceDisabled));
    let open = report.branch("open").unwrap().flow;
    assert!(nearly_equal(open, operating_flow(1.0, 10.0, 0.0), Tolerances::abs(1e-4)));
    assert_eq!(report.faulted().count(), 1);
}

#[test]
fn cross_link_carries_reverse_flow() {
    let mut b = TopologyBuilder::new();
    let r = b.add_header("R");
    let ha = b.add_header("A");
    let hb = b.add_header("B");
    b.add_link("strong", r, ha);
    b.add_link("weak", r, hb);
    b.add_link("cross", hb, ha);
    b.add_link("load-a", ha, r);
    b.add_link("load-b", hb, r);
    let topo = b.build().unwrap();
    let pump = |name: &str, s: f64| {
        Branch::builder(name)
            .pump(Pump::standard(name).with_speed(s))
            .build()
            .unwrap()
    };
    let branches = vec![
        pump("strong", 1.0),
        pump("weak", 0.8),
        resistance("cross", 2.0),
        resistance("load-a", 10.0),
        resistance("load-b", 10.0),
    ];
    let mut net = Network::new(topo, branches, r, BalanceConfig::default()).unwrap();
    let report = net.solve().unwrap();
    assert!(report.converged);
    // A sits higher than B, so the B -> A link runs backwards
    assert!(report.header("A").unwrap().pressure > report.header("B").unwrap().pressure);
    assert!(report.branch("cross").unwrap().flow < 0.0);
}

#[test]
fn exhaustion_is_reported_not_raised() {
    let mut net = pump_loop(1.0, 0.0, resistance("load", 10.0));
    net.set_config(BalanceConfig::default().with_pressure_iterations(6))
        .unwrap();
    let report = net.solve().unwrap();
    assert!(!report.converged);
    assert_eq!(report.fault, Some(Fault::IterationExhausted));
    assert!(report.branch("pump").unwrap().flow > 0.0);
}

#[test]
fn too_many_free_headers() {
    let mut b = TopologyBuilder::new();
    let ids: Vec<_> = (0..5).map(|i| b.add_header(format!("H{i}"))).collect();
    for i in 0..5 {
        b.add_link(format!("L{i}"), ids[i], ids[(i + 1) % 5]);
    }
    let topo = b.build().unwrap();
    let branches = (0..5).map(|i| resistance(&format!("L{i}"), 1.0)).collect();
    let err = Network::new(topo, branches, ids[0], BalanceConfig::default()).unwrap_err();
    assert!(matches!(err, SolverError::TooManyHeaders { free: 4, max: 3 }));
}

#[test]
fn loop_balance_needs_two_headers() {
    let mut b = TopologyBuilder::new();
    let r = b.add_header("R");
    let s = b.add_header("S");
    let mid = b.add_header("M");
    b.add_link("pump", r, s);
    b.add_link("a", s, mid);
    b.add_link("b", mid, r);
    let topo = b.build().unwrap();
    let branches = vec![
        Branch::builder("pump")
            .pump(Pump::standard("CP").with_speed(1.0))
            .build()
            .unwrap(),
        resistance("a", 1.0),
        resistance("b", 1.0),
    ];
    let mut net = Network::new(topo, branches, r, BalanceConfig::default()).unwrap();
    let id = net.topology().link_by_name("pump").unwrap();
    assert!(matches!(
        net.balance_loop(id),
        Err(SolverError::NotALoop { .. })
    ));
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn loop_balance_finds_operating_point(s in 0.5f64..1.0, k in 2.0f64..50.0) {
        let mut net = pump_loop(s, 0.0, resistance("load", k));
        let id = net.topology().link_by_name("pump").unwrap();
        let report = net.balance_loop(id).unwrap();
        prop_assert!(report.converged);
        let g = report.branch("pump").unwrap().flow;
        prop_assert!(nearly_equal(g, operating_flow(s, k, 0.0), Tolerances::abs(1e-3)));
    }
}
