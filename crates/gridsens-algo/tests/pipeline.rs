//! End-to-end sensitivity run on the FR/ES system

use gridsens_algo::contingency::{ContingencySpec, ElementKind};
use gridsens_algo::test_utils::{
    disable_droop, six_bus_network, AC_BORDER_NORTH, ES, FR, GENERATOR, HVDC_1, HVDC_2, MONITORED, PST,
};
use gridsens_algo::{
    SensitivityInputs, SensitivityPipeline, SlackBus, BASE_CASE, COUNTER_TRADING_KEY, REFERENCE_KEY,
};
use gridsens_core::{GridError, LoadFlowParameters, SolverKind};

fn inputs() -> SensitivityInputs {
    SensitivityInputs {
        monitored_branches: MONITORED.iter().map(|s| s.to_string()).collect(),
        contingencies: vec![
            ContingencySpec::new(AC_BORDER_NORTH[0], ElementKind::AcLine),
            ContingencySpec::new(HVDC_2, ElementKind::HvdcLine),
            ContingencySpec::new(PST, ElementKind::Transformer),
            ContingencySpec::new("NOT_IN_NETWORK", ElementKind::AcLine),
        ],
        active_hvdcs: vec![HVDC_1.to_string(), HVDC_2.to_string()],
        active_psts: vec![PST.to_string()],
        redispatchable_generators: vec![GENERATOR.to_string()],
        max_counter_trading: 500.0,
        ..Default::default()
    }
}

fn pipeline() -> SensitivityPipeline {
    SensitivityPipeline::dc(SolverKind::Gauss, LoadFlowParameters::default())
}

#[test]
fn ac_emulation_run_reports_every_case() {
    let output = pipeline().run(six_bus_network(), &inputs()).unwrap();
    assert!(output.ac_emulation());
    assert!(output.unconverged.is_empty());

    let report = &output.report;
    assert_eq!(report.situation_description.country1, FR);
    assert_eq!(report.situation_description.country2, ES);
    assert!(report.situation_description.total_exchange.is_finite());

    let branch = &report.sensitivities.branch;
    assert_eq!(branch.functions().collect::<Vec<_>>(), {
        let mut ids = MONITORED.to_vec();
        ids.sort();
        ids
    });
    for function in MONITORED {
        let mut cases: Vec<&str> = branch.cases(function).collect();
        cases.sort();
        let mut expected = vec![BASE_CASE, AC_BORDER_NORTH[0], HVDC_2, PST];
        expected.sort();
        assert_eq!(cases, expected);

        let levers = branch.levers(function, BASE_CASE).unwrap();
        for lever in [GENERATOR, HVDC_1, PST, COUNTER_TRADING_KEY, REFERENCE_KEY] {
            assert!(levers.contains_key(lever), "{function} lacks {lever}");
        }
        // terminal generators are folded into the HVDC lever
        assert!(levers.keys().all(|k| !k.contains("_fict_hvdc_gen")));
    }

    let hvdc = &report.sensitivities.hvdc;
    assert_eq!(hvdc.functions().collect::<Vec<_>>(), vec![HVDC_1, HVDC_2]);
    // an outaged HVDC line carries nothing on its equivalent line
    assert_eq!(hvdc.get(HVDC_2, HVDC_2, REFERENCE_KEY), 0.0);
    assert_ne!(hvdc.get(HVDC_1, BASE_CASE, REFERENCE_KEY), 0.0);
}

#[test]
fn lever_metadata() {
    let output = pipeline().run(six_bus_network(), &inputs()).unwrap();
    let vars = &output.report.elem_vars;

    assert_eq!(vars.hvdc.len(), 1);
    let merged = vars.hvdc[HVDC_1];
    assert_eq!((merged.min, merged.max), (-2000.0, 2000.0));
    assert_eq!(merged.reference_setpoint, 300.0);

    let pst = vars.pst[PST];
    assert_eq!((pst.min, pst.max, pst.reference_setpoint), (-10.0, 10.0, 0.0));

    let ct = &vars.counter_trading[COUNTER_TRADING_KEY];
    assert_eq!((ct.min, ct.max), (-500.0, 500.0));

    for branch in MONITORED {
        assert_eq!(output.report.quads[branch]["permanent_limit"], 2000.0);
    }
}

#[test]
fn setpoint_run_has_no_hvdc_table() {
    let mut inputs = inputs();
    inputs.force_setpoint = true;
    inputs.hvdc_target = Some(200.0);
    let output = pipeline().run(six_bus_network(), &inputs).unwrap();

    assert!(!output.ac_emulation());
    assert!(output.report.sensitivities.hvdc.is_empty());
    assert_eq!(output.report.elem_vars.hvdc[HVDC_1].reference_setpoint, 400.0);
    let hvdc_exchange = output.report.situation_description.hvdc_exchange;
    assert!((hvdc_exchange - 400.0).abs() < 1e-6, "{hvdc_exchange}");
}

#[test]
fn run_without_droop_keeps_ac_emulation_mode() {
    let mut network = six_bus_network();
    disable_droop(&mut network);
    let output = pipeline().run(network, &inputs()).unwrap();

    assert!(output.equivalent_hvdcs.is_empty());
    assert!(output.ac_emulation());
    assert!(output.report.sensitivities.hvdc.is_empty());
}

#[test]
fn slack_bus_is_honoured() {
    let mut inputs = inputs();
    inputs.slack_bus = Some(SlackBus {
        voltage_level_id: "ATHEN7".into(),
        bus_id: "ATHEN7_0".into(),
    });
    let output = pipeline().run(six_bus_network(), &inputs).unwrap();
    assert!(output.unconverged.is_empty());
}

#[test]
fn counter_trading_disabled_reports_no_pool() {
    let mut inputs = inputs();
    inputs.max_counter_trading = 0.0;
    let output = pipeline().run(six_bus_network(), &inputs).unwrap();
    for function in MONITORED {
        assert_eq!(
            output
                .report
                .sensitivities
                .branch
                .get(function, BASE_CASE, COUNTER_TRADING_KEY),
            0.0
        );
    }
}

#[test]
fn no_monitored_branch_is_rejected() {
    let mut inputs = inputs();
    inputs.monitored_branches = vec!["UNKNOWN_LINE".into()];
    let err = pipeline().run(six_bus_network(), &inputs).unwrap_err();
    assert!(matches!(err, GridError::Validation(_)));
}
