//! Exchange split into AC and HVDC parts on the FR/ES system

use gridsens_algo::test_utils::{
    approx_eq, disable_droop, redispatch, six_bus_network, AC_BORDER_NORTH, AC_BORDER_SOUTH, ES,
    FR, GENERATOR, HVDC_1, HVDC_2,
};
use gridsens_algo::{compute_exchange, sign_exchange, DcPowerFlow, Exchange, NetworkConditioner};
use gridsens_core::{
    ConvertersMode, HvdcAngleDroopActivePowerControl, LoadFlowParameters, Network, PowerFlowSolver,
};

fn exchange_after_load_flow(mut network: Network) -> Exchange {
    NetworkConditioner::default().apply(&mut network);
    let result = DcPowerFlow::default()
        .run(&mut network, &LoadFlowParameters::default())
        .unwrap();
    assert!(result.converged());
    let signed = sign_exchange(&network, FR, ES);
    compute_exchange(&network, &signed, FR, ES)
}

#[test]
fn ac_only_exchange() {
    let import = 500.0;
    let mut network = six_bus_network();
    redispatch(
        &mut network,
        &[("ZEUS7G1_NGU_SM", import)],
        &[("ULYSS7_LOAD", import)],
    );
    for hvdc in [HVDC_1, HVDC_2] {
        network.set_hvdc_connected(hvdc, false).unwrap();
    }
    for line in AC_BORDER_SOUTH {
        network.set_branch_connected(line, false).unwrap();
    }

    let exchange = exchange_after_load_flow(network);
    assert!(approx_eq(exchange.ac_exchange, -import), "{exchange:?}");
    assert_eq!(exchange.hvdc_exchange, 0.0);
    assert!(approx_eq(exchange.total_exchange, -import));
}

#[test]
fn hvdc_only_exchange() {
    let export = 400.0;
    let mut network = six_bus_network();
    disable_droop(&mut network);
    redispatch(&mut network, &[(GENERATOR, export)], &[("AJAX7_LOAD", export)]);
    for hvdc in [HVDC_1, HVDC_2] {
        network.hvdc_lines.get_mut(hvdc).unwrap().target_p = export / 2.0;
    }
    for line in AC_BORDER_NORTH.iter().chain(AC_BORDER_SOUTH.iter()) {
        network.set_branch_connected(line, false).unwrap();
    }

    let exchange = exchange_after_load_flow(network);
    assert_eq!(exchange.ac_exchange, 0.0);
    assert!(approx_eq(exchange.hvdc_exchange, export), "{exchange:?}");
    assert!(approx_eq(exchange.total_exchange, export));
}

#[test]
fn hvdc_only_exchange_with_inverted_converters() {
    let import = 400.0;
    let mut network = six_bus_network();
    disable_droop(&mut network);
    redispatch(&mut network, &[("ZEUS7G1_NGU_SM", import)], &[("ULYSS7_LOAD", import)]);
    for hvdc in [HVDC_1, HVDC_2] {
        let line = network.hvdc_lines.get_mut(hvdc).unwrap();
        line.converters_mode = ConvertersMode::Side1InverterSide2Rectifier;
        line.target_p = import / 2.0;
    }
    for line in AC_BORDER_NORTH.iter().chain(AC_BORDER_SOUTH.iter()) {
        network.set_branch_connected(line, false).unwrap();
    }

    let exchange = exchange_after_load_flow(network);
    assert_eq!(exchange.ac_exchange, 0.0);
    assert!(approx_eq(exchange.hvdc_exchange, -import), "{exchange:?}");
    assert!(approx_eq(exchange.total_exchange, -import));
}

#[test]
fn mixed_exchange_with_emulated_hvdc() {
    let export = 600.0;
    let mut network = six_bus_network();
    redispatch(&mut network, &[(GENERATOR, export)], &[("AJAX7_LOAD", export)]);
    for hvdc in [HVDC_1, HVDC_2] {
        network
            .extensions
            .hvdc_angle_droop
            .insert(hvdc.to_string(), HvdcAngleDroopActivePowerControl::new(50.0, 100.0));
    }
    for line in AC_BORDER_NORTH {
        network.set_branch_connected(line, false).unwrap();
    }

    let exchange = exchange_after_load_flow(network);
    assert!(exchange.ac_exchange > 0.0, "{exchange:?}");
    assert!(exchange.hvdc_exchange > 200.0, "{exchange:?}");
    assert!(approx_eq(
        exchange.total_exchange,
        exchange.ac_exchange + exchange.hvdc_exchange
    ));
    // everything produced in FR is consumed in ES
    assert!(approx_eq(exchange.total_exchange, export));
}
