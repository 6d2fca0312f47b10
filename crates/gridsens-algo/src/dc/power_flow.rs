use std::sync::Arc;

use gridsens_core::graph_utils::ElectricalIslands;
use gridsens_core::{
    BranchFlow, ComponentResult, ComponentStatus, GridResult, Kilovolts, LinearSystemBackend,
    LoadFlowParameters, LoadFlowResult, Megawatts, Network, PowerFlowSolver, Side, SolverKind,
};
use tracing::{debug, warn};

use super::model::DcModel;
use super::DcSolveError;

/// DC load flow; a singular system is reported as a `Failed` component, not an error.
pub struct DcPowerFlow {
    backend: Arc<dyn LinearSystemBackend>,
}

impl DcPowerFlow {
    pub fn new(kind: SolverKind) -> Self {
        Self {
            backend: kind.build(),
        }
    }

    pub fn with_backend(backend: Arc<dyn LinearSystemBackend>) -> Self {
        Self { backend }
    }

    fn solve(
        &self,
        network: &mut Network,
        params: &LoadFlowParameters,
    ) -> Result<LoadFlowResult, DcSolveError> {
        let model = DcModel::build(network, params)?;
        let mut p = model.injections(network);
        let mismatch = model.balance(&mut p);
        let theta = model.solve_angles(self.backend.as_ref(), &p)?;

        clear_results(network);
        let base = model.base_mva;

        for (id, &c) in &model.branch_coupling {
            let flow = model.coupling_flow(c, &theta) * base;
            let Some(branch) = network.branches.get(id) else {
                continue;
            };
            let v1 = nominal(network, &branch.terminal1.voltage_level_id);
            let v2 = nominal(network, &branch.terminal2.voltage_level_id);
            if let Some(branch) = network.branches.get_mut(id) {
                branch.flow = BranchFlow {
                    p1: flow,
                    p2: -flow,
                    i1: Megawatts(flow).to_amperes(v1).value(),
                    i2: Megawatts(-flow).to_amperes(v2).value(),
                };
            }
        }

        for hvdc in &model.hvdcs {
            let transfer = model.hvdc_flow(hvdc, &theta) * base;
            let line = network.hvdc_line(&hvdc.id)?;
            let rectifier = line.station_id(hvdc.rectifier_side).to_string();
            let inverter = line
                .station_id(match hvdc.rectifier_side {
                    Side::One => Side::Two,
                    Side::Two => Side::One,
                })
                .to_string();
            // load convention: the rectifier draws the transfer from its AC node
            if let Some(station) = network.converter_stations.get_mut(&rectifier) {
                station.p = transfer;
                station.q = 0.0;
            }
            if let Some(station) = network.converter_stations.get_mut(&inverter) {
                station.p = -transfer;
                station.q = 0.0;
            }
        }

        for gen in network.generators.values_mut() {
            if gen.terminal.connected && model.node(&gen.terminal.node).is_some() {
                gen.p = -gen.target_p;
            }
        }
        for (c, participants) in model.participation.iter().enumerate() {
            for part in participants {
                if let Some(gen) = network.generators.get_mut(&part.generator) {
                    gen.p += mismatch[c] * part.weight * base;
                }
            }
        }

        let mut components: Vec<ComponentResult> = model
            .slacks
            .iter()
            .enumerate()
            .map(|(c, &slack)| ComponentResult {
                component: c,
                status: ComponentStatus::Converged,
                slack_node: Some(model.nodes[slack].clone()),
                slack_mismatch: if model.participation[c].is_empty() {
                    -mismatch[c] * base
                } else {
                    0.0
                },
            })
            .collect();

        let outside = ElectricalIslands::analyse(network, params.connected_component_mode).outside;
        if !outside.is_empty() {
            debug!(nodes = outside.len(), "nodes outside the computed component");
            components.push(ComponentResult {
                component: components.len(),
                status: ComponentStatus::NoCalculation,
                slack_node: None,
                slack_mismatch: 0.0,
            });
        }

        Ok(LoadFlowResult { components })
    }
}

impl Default for DcPowerFlow {
    fn default() -> Self {
        Self::new(SolverKind::default())
    }
}

impl PowerFlowSolver for DcPowerFlow {
    fn name(&self) -> &str {
        "dc"
    }

    fn run(&self, network: &mut Network, params: &LoadFlowParameters) -> GridResult<LoadFlowResult> {
        match self.solve(network, params) {
            Ok(result) => Ok(result),
            Err(DcSolveError::Singular(reason)) => {
                warn!(%reason, "DC load flow failed");
                clear_results(network);
                Ok(LoadFlowResult::failed())
            }
            Err(err) => Err(err.into()),
        }
    }
}

fn nominal(network: &Network, voltage_level_id: &str) -> Kilovolts {
    network
        .nominal_v(voltage_level_id)
        .unwrap_or(Kilovolts(f64::NAN))
}

/// Reset every solved quantity to NaN.
fn clear_results(network: &mut Network) {
    for branch in network.branches.values_mut() {
        branch.flow = BranchFlow::default();
    }
    for station in network.converter_stations.values_mut() {
        station.p = f64::NAN;
        station.q = f64::NAN;
    }
    for gen in network.generators.values_mut() {
        gen.p = f64::NAN;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::three_bus_network;
    use gridsens_core::{ConnectedComponentMode, GaussSolver};

    #[test]
    fn test_three_bus_flows_written_back() {
        let mut network = three_bus_network();
        let result = DcPowerFlow::default()
            .run(&mut network, &LoadFlowParameters::default())
            .unwrap();
        assert!(result.converged());

        let ac = &network.branches["L_AC"].flow;
        assert!((ac.p1 - 100.0).abs() < 1e-6);
        assert!((ac.p2 + 100.0).abs() < 1e-6);
        // 100 MW at 400 kV
        assert!((ac.i1 - 144.337567).abs() < 1e-4);
        assert!((network.branches["L_AB"].flow.p1 - 50.0).abs() < 1e-6);
    }

    #[test]
    fn test_backends_give_same_flows() {
        let mut a = three_bus_network();
        let mut b = three_bus_network();
        DcPowerFlow::default()
            .run(&mut a, &LoadFlowParameters::default())
            .unwrap();
        DcPowerFlow::with_backend(Arc::new(GaussSolver))
            .run(&mut b, &LoadFlowParameters::default())
            .unwrap();
        for (id, branch) in &a.branches {
            assert!((branch.flow.p1 - b.branches[id].flow.p1).abs() < 1e-9);
        }
    }

    #[test]
    fn test_disconnected_branch_has_no_flow() {
        let mut network = three_bus_network();
        network.set_branch_connected("L_AC", false).unwrap();
        DcPowerFlow::default()
            .run(&mut network, &LoadFlowParameters::default())
            .unwrap();
        assert!(network.branches["L_AC"].flow.p1.is_nan());
        assert!((network.branches["L_BC"].flow.p1 - 150.0).abs() < 1e-6);
    }

    #[test]
    fn test_isolated_node_reported_without_calculation() {
        let mut network = three_bus_network();
        network.set_branch_connected("L_AC", false).unwrap();
        network.set_branch_connected("L_BC", false).unwrap();
        let result = DcPowerFlow::default()
            .run(&mut network, &LoadFlowParameters::default())
            .unwrap();
        assert!(result.converged());
        assert_eq!(
            result.components.last().map(|c| c.status),
            Some(ComponentStatus::NoCalculation)
        );

        let all = LoadFlowParameters {
            connected_component_mode: ConnectedComponentMode::All,
            ..Default::default()
        };
        let result = DcPowerFlow::default().run(&mut network, &all).unwrap();
        assert_eq!(result.components.len(), 2);
    }

    #[test]
    fn test_distributed_slack_moves_generator_output() {
        let mut network = three_bus_network();
        network.loads.get_mut("LOAD_C").unwrap().p0 = 250.0;
        let params = LoadFlowParameters {
            distributed_slack: true,
            ..Default::default()
        };
        DcPowerFlow::default().run(&mut network, &params).unwrap();
        // G_A (400 MW) and G_B (100 MW) share the 100 MW deficit 4:1
        assert!((network.generators["G_A"].p + 230.0).abs() < 1e-6);
        assert!((network.generators["G_B"].p + 20.0).abs() < 1e-6);
    }
}
