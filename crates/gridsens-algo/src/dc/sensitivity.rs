use std::sync::Arc;

use gridsens_core::{
    GridResult, Kilovolts, LinearSystemBackend, LoadFlowParameters, Megawatts, Network,
    SensitivityFactorMatrix, SensitivityFunctionType, SensitivityMatrix, SensitivityResult,
    SensitivitySolver, SensitivityVariableType, SolverKind,
};
use tracing::debug;

use super::model::{DcModel, RAD_PER_DEG};
use super::DcSolveError;

/// PTDF-based sensitivity analysis on the DC model.
///
/// Units: MW/MW or A/MW for injections, MW/° or A/° for phase shifters.
/// Functions or variables outside the computed component give NaN.
pub struct DcSensitivityAnalysis {
    backend: Arc<dyn LinearSystemBackend>,
}

enum Variable {
    Injection(Option<usize>),
    Phase(Option<usize>),
}

impl DcSensitivityAnalysis {
    pub fn new(kind: SolverKind) -> Self {
        Self {
            backend: kind.build(),
        }
    }

    pub fn with_backend(backend: Arc<dyn LinearSystemBackend>) -> Self {
        Self { backend }
    }

    fn compute(
        &self,
        network: &Network,
        factors: &[SensitivityFactorMatrix],
        params: &LoadFlowParameters,
    ) -> Result<SensitivityResult, DcSolveError> {
        let model = DcModel::build(network, params)?;
        let x = model.impedance(self.backend.as_ref())?;

        let mut p = model.injections(network);
        model.balance(&mut p);
        let theta = model.solve_angles(self.backend.as_ref(), &p)?;
        let base = model.base_mva;

        let mut result = SensitivityResult::default();
        for factor in factors {
            let functions = factor
                .function_ids
                .iter()
                .map(|id| {
                    let branch = network.branch(id)?;
                    let scale = match factor.function_type {
                        SensitivityFunctionType::BranchActivePower1 => 1.0,
                        SensitivityFunctionType::BranchCurrent1 => {
                            let v1 = network
                                .nominal_v(&branch.terminal1.voltage_level_id)
                                .unwrap_or(Kilovolts(f64::NAN));
                            Megawatts(1.0).to_amperes(v1).value()
                        }
                    };
                    Ok((model.branch_coupling.get(id).copied(), scale))
                })
                .collect::<Result<Vec<_>, DcSolveError>>()?;

            let variables = factor
                .variable_ids
                .iter()
                .map(|id| resolve_variable(network, &model, id, factor.variable_type))
                .collect::<Result<Vec<_>, DcSolveError>>()?;

            let reference_values = functions
                .iter()
                .map(|(coupling, scale)| match coupling {
                    Some(c) => model.coupling_flow(*c, &theta) * base * scale,
                    None => f64::NAN,
                })
                .collect();

            let values = variables
                .iter()
                .map(|variable| {
                    functions
                        .iter()
                        .map(|(coupling, scale)| {
                            let Some(l) = *coupling else {
                                return f64::NAN;
                            };
                            match variable {
                                Variable::Injection(Some(node)) => {
                                    model.injection_factor(&x, l, *node) * scale
                                }
                                Variable::Phase(Some(t)) => {
                                    model.phase_factor(&x, l, *t) * RAD_PER_DEG * base * scale
                                }
                                _ => f64::NAN,
                            }
                        })
                        .collect()
                })
                .collect();

            debug!(
                matrix = %factor.name,
                functions = factor.function_ids.len(),
                variables = factor.variable_ids.len(),
                "sensitivity matrix computed"
            );
            result.matrices.insert(
                factor.name.clone(),
                SensitivityMatrix {
                    function_ids: factor.function_ids.clone(),
                    variable_ids: factor.variable_ids.clone(),
                    values,
                    reference_values,
                },
            );
        }
        Ok(result)
    }
}

fn resolve_variable(
    network: &Network,
    model: &DcModel,
    id: &str,
    variable_type: SensitivityVariableType,
) -> Result<Variable, DcSolveError> {
    let injection_node = network
        .generators
        .get(id)
        .map(|g| &g.terminal)
        .or_else(|| network.batteries.get(id).map(|b| &b.terminal))
        .map(|t| if t.connected { model.node(&t.node) } else { None });
    let is_phase_shifter = network
        .branches
        .get(id)
        .map(|b| b.is_phase_shifter())
        .unwrap_or(false);

    match (variable_type, injection_node, is_phase_shifter) {
        (SensitivityVariableType::InjectionActivePower, Some(node), _)
        | (SensitivityVariableType::AutoDetect, Some(node), _) => Ok(Variable::Injection(node)),
        (SensitivityVariableType::TransformerPhase, _, true)
        | (SensitivityVariableType::AutoDetect, None, true) => {
            Ok(Variable::Phase(model.branch_coupling.get(id).copied()))
        }
        _ if network.branches.contains_key(id) || injection_node.is_some() => {
            Err(DcSolveError::UnsupportedVariable(id.to_string()))
        }
        _ => Err(DcSolveError::UnknownElement(id.to_string())),
    }
}

impl Default for DcSensitivityAnalysis {
    fn default() -> Self {
        Self::new(SolverKind::default())
    }
}

impl SensitivitySolver for DcSensitivityAnalysis {
    fn name(&self) -> &str {
        "dc"
    }

    fn run(
        &self,
        network: &Network,
        factors: &[SensitivityFactorMatrix],
        params: &LoadFlowParameters,
    ) -> GridResult<SensitivityResult> {
        Ok(self.compute(network, factors, params)?)
    }
}
