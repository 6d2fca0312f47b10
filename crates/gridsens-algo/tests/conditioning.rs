//! Network conditioning is stable under repetition

use gridsens_algo::test_utils::six_bus_network;
use gridsens_algo::NetworkConditioner;
use gridsens_core::{Battery, Ohms, Terminal};

#[test]
fn second_pass_changes_nothing() {
    let mut network = six_bus_network();
    network
        .branches
        .get_mut("ULYSSL71ATHEN_ACLS")
        .unwrap()
        .x = Ohms(-1e-7);
    network
        .add_battery(Battery {
            id: "ATHEN7_BESS".into(),
            terminal: Terminal::new("ATHEN7", "ATHEN7_0"),
            target_p: 50.0,
            min_p: -100.0,
            max_p: 100.0,
        })
        .unwrap();

    let conditioner = NetworkConditioner::default();
    let first = conditioner.apply(&mut network);
    assert_eq!(first.floored_branches, vec!["ULYSSL71ATHEN_ACLS".to_string()]);
    assert_eq!(first.batteries_disconnected, 1);
    let snapshot = network.clone();

    let second = conditioner.apply(&mut network);
    assert!(second.floored_branches.is_empty());
    assert_eq!(second.batteries_disconnected, 0);

    for (id, branch) in &network.branches {
        assert_eq!(branch.x, snapshot.branches[id].x);
        assert_eq!(branch.r, snapshot.branches[id].r);
    }
    for (id, station) in &network.converter_stations {
        let before = &snapshot.converter_stations[id];
        assert_eq!(station.loss_factor, before.loss_factor);
        assert_eq!(station.voltage_regulator_on, before.voltage_regulator_on);
    }
    assert_eq!(network.branches["ULYSSL71ATHEN_ACLS"].x, Ohms(-1e-5));
}
