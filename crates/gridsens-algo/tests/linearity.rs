//! Sensitivities predict the flow change of a small lever move

use std::collections::BTreeMap;

use gridsens_algo::hvdc::{add_terminal_generators, force_setpoint, TerminalGenerators};
use gridsens_algo::pst::fix_pst_taps;
use gridsens_algo::test_utils::{six_bus_network, GENERATOR, HVDC_1, MONITORED, PST};
use gridsens_algo::{DcPowerFlow, DcSensitivityAnalysis, NetworkConditioner};
use gridsens_core::{
    LoadFlowParameters, Network, PowerFlowSolver, SensitivityFactorMatrix, SensitivityFunctionType,
    SensitivitySolver, SensitivityVariableType,
};

const STEPS: [f64; 4] = [-10.0, -1.0, 1.0, 10.0];

fn params(distributed_slack: bool) -> LoadFlowParameters {
    LoadFlowParameters {
        distributed_slack,
        read_slack_bus: false,
        ..Default::default()
    }
}

/// Setpoint-mode FR/ES system with frozen PST and HVDC terminal generators.
fn prepared() -> (Network, TerminalGenerators) {
    let mut network = six_bus_network();
    NetworkConditioner::default().apply(&mut network);
    force_setpoint(&mut network, &[HVDC_1.to_string()]);
    fix_pst_taps(&mut network, &[PST.to_string()]).unwrap();
    let mut terminals = add_terminal_generators(&mut network, &[HVDC_1.to_string()]).unwrap();
    let hvdc = terminals.remove(HVDC_1).unwrap();
    (network, hvdc)
}

fn currents(network: &mut Network, params: &LoadFlowParameters) -> BTreeMap<String, f64> {
    let result = DcPowerFlow::default().run(network, params).unwrap();
    assert!(result.converged());
    MONITORED
        .iter()
        .map(|id| (id.to_string(), network.branches[*id].flow.i1))
        .collect()
}

fn factors(
    network: &Network,
    variables: &[String],
    variable_type: SensitivityVariableType,
    params: &LoadFlowParameters,
) -> BTreeMap<(String, String), f64> {
    let factor = SensitivityFactorMatrix {
        name: "m".into(),
        function_ids: MONITORED.iter().map(|s| s.to_string()).collect(),
        variable_ids: variables.to_vec(),
        function_type: SensitivityFunctionType::BranchCurrent1,
        variable_type,
    };
    let result = DcSensitivityAnalysis::default()
        .run(network, &[factor], params)
        .unwrap();
    let matrix = result.matrix("m").unwrap();
    let mut values = BTreeMap::new();
    for variable in variables {
        for function in MONITORED {
            let value = matrix.value(variable, function).unwrap();
            values.insert((variable.clone(), function.to_string()), value);
        }
    }
    values
}

fn assert_predicted(
    before: &BTreeMap<String, f64>,
    after: &BTreeMap<String, f64>,
    sensitivity: impl Fn(&str) -> f64,
    delta: f64,
) {
    for function in MONITORED {
        let predicted = before[function] + sensitivity(function) * delta;
        let actual = after[function];
        assert!(
            (actual - predicted).abs() <= 1e-6 * (1.0 + actual.abs()),
            "{function}: predicted {predicted}, got {actual} (delta {delta})"
        );
    }
}

#[test]
fn generator_lever_is_linear() {
    for distributed in [false, true] {
        let params = params(distributed);
        let (mut network, _) = prepared();
        let s = factors(
            &network,
            &[GENERATOR.to_string()],
            SensitivityVariableType::InjectionActivePower,
            &params,
        );
        let before = currents(&mut network, &params);
        for delta in STEPS {
            let mut moved = network.clone();
            moved.generators.get_mut(GENERATOR).unwrap().target_p += delta;
            let after = currents(&mut moved, &params);
            assert_predicted(&before, &after, |f| s[&(GENERATOR.to_string(), f.to_string())], delta);
        }
    }
}

#[test]
fn hvdc_lever_is_end_minus_origin() {
    for distributed in [false, true] {
        let params = params(distributed);
        let (mut network, terminals) = prepared();
        let s = factors(
            &network,
            &[terminals.origin.clone(), terminals.end.clone()],
            SensitivityVariableType::InjectionActivePower,
            &params,
        );
        let lever = |f: &str| {
            s[&(terminals.end.clone(), f.to_string())] - s[&(terminals.origin.clone(), f.to_string())]
        };
        let before = currents(&mut network, &params);
        for delta in STEPS {
            let mut moved = network.clone();
            moved.hvdc_lines.get_mut(HVDC_1).unwrap().target_p += delta;
            let after = currents(&mut moved, &params);
            assert_predicted(&before, &after, lever, delta);
        }
    }
}

#[test]
fn pst_lever_is_per_degree() {
    for distributed in [false, true] {
        let params = params(distributed);
        let (mut network, _) = prepared();
        let s = factors(
            &network,
            &[PST.to_string()],
            SensitivityVariableType::TransformerPhase,
            &params,
        );
        let before = currents(&mut network, &params);
        for tap_step in [-1i32, 1] {
            let mut moved = network.clone();
            let alpha_before = moved.branches[PST].alpha().value();
            if let Some(changer) = moved.branches.get_mut(PST).unwrap().phase_tap_changer.as_mut() {
                changer.tap += tap_step;
            }
            let delta = moved.branches[PST].alpha().value() - alpha_before;
            assert_eq!(delta.abs(), 1.0);
            let after = currents(&mut moved, &params);
            assert_predicted(&before, &after, |f| s[&(PST.to_string(), f.to_string())], delta);
        }
    }
}
