use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::{Duration, Instant};

use gridsens_core::{
    GridResult, LoadFlowParameters, Network, PowerFlowSolver, SensitivityFactorMatrix,
    SensitivityFunctionType, SensitivityResult, SensitivitySolver, SensitivityVariableType,
    WorkingVariant,
};
use tracing::{debug, info};

use super::retry::{CaseStatus, OutageProtocol};
use super::Case;

pub const GENERATORS_MATRIX: &str = "generators";
pub const PSTS_MATRIX: &str = "psts";
pub const GENERATORS_EQ_LINE_MATRIX: &str = "generators_ac_eq_line";
pub const PSTS_EQ_LINE_MATRIX: &str = "psts_ac_eq_line";

/// Functions and variables requested for every case.
#[derive(Debug, Clone, Default)]
pub struct CaseRequest {
    /// Monitored branches (current functions)
    pub monitored: Vec<String>,
    /// Equivalent AC lines of emulated HVDC lines (active power functions)
    pub equivalent_lines: Vec<String>,
    /// Generator variables: redispatchable, counter-trading pool, HVDC terminals
    pub generators: Vec<String>,
    pub psts: Vec<String>,
    /// HVDC lines owning an equivalent AC line
    pub equivalent_hvdcs: BTreeSet<String>,
}

impl CaseRequest {
    /// The four factor matrices; matrices with no function or no variable are left out.
    pub fn factor_matrices(&self) -> Vec<SensitivityFactorMatrix> {
        use SensitivityFunctionType::{BranchActivePower1, BranchCurrent1};
        use SensitivityVariableType::{InjectionActivePower, TransformerPhase};

        let mut factors = Vec::new();
        let mut push = |name: &str,
                        functions: &[String],
                        variables: &[String],
                        function_type: SensitivityFunctionType,
                        variable_type: SensitivityVariableType| {
            if functions.is_empty() || variables.is_empty() {
                return;
            }
            factors.push(SensitivityFactorMatrix {
                name: name.to_string(),
                function_ids: functions.to_vec(),
                variable_ids: variables.to_vec(),
                function_type,
                variable_type,
            });
        };
        push(GENERATORS_MATRIX, &self.monitored, &self.generators, BranchCurrent1, InjectionActivePower);
        push(PSTS_MATRIX, &self.monitored, &self.psts, BranchCurrent1, TransformerPhase);
        push(
            GENERATORS_EQ_LINE_MATRIX,
            &self.equivalent_lines,
            &self.generators,
            BranchActivePower1,
            InjectionActivePower,
        );
        push(
            PSTS_EQ_LINE_MATRIX,
            &self.equivalent_lines,
            &self.psts,
            BranchActivePower1,
            TransformerPhase,
        );
        factors
    }
}

#[derive(Debug, Clone)]
pub struct SolvedCase {
    pub case_id: String,
    pub retried: bool,
    pub result: SensitivityResult,
}

#[derive(Debug, Clone, Default)]
pub struct OrchestratorReport {
    /// Solved cases in case order
    pub cases: Vec<SolvedCase>,
    pub unconverged: Vec<String>,
    pub timings: Vec<(String, Duration)>,
}

/// Runs every case on its own working variant of the baseline.
pub struct ContingencyOrchestrator {
    power_flow: Arc<dyn PowerFlowSolver>,
    sensitivity: Arc<dyn SensitivitySolver>,
    params: LoadFlowParameters,
}

impl ContingencyOrchestrator {
    pub fn new(
        power_flow: Arc<dyn PowerFlowSolver>,
        sensitivity: Arc<dyn SensitivitySolver>,
        params: LoadFlowParameters,
    ) -> Self {
        Self {
            power_flow,
            sensitivity,
            params,
        }
    }

    pub fn run(&self, baseline: &Network, cases: &[Case], request: &CaseRequest) -> GridResult<OrchestratorReport> {
        let factors = request.factor_matrices();
        let mut report = OrchestratorReport::default();
        let protocol = OutageProtocol::new(
            self.power_flow.as_ref(),
            &self.params,
            &request.equivalent_hvdcs,
        );

        for case in cases {
            let start = Instant::now();
            let mut variant = WorkingVariant::new(baseline, &case.id);
            let status = protocol.run(variant.network_mut(), case)?;
            match status {
                CaseStatus::Solved { retried } => {
                    let result = self
                        .sensitivity
                        .run(variant.network(), &factors, &self.params)?;
                    debug!(case = %case.id, matrices = result.matrices.len(), "sensitivities computed");
                    report.cases.push(SolvedCase {
                        case_id: case.id.clone(),
                        retried,
                        result,
                    });
                }
                CaseStatus::Unconverged => report.unconverged.push(case.id.clone()),
            }
            drop(variant);
            let elapsed = start.elapsed();
            info!(case = %case.id, elapsed_ms = elapsed.as_millis() as u64, ?status, "case done");
            report.timings.push((case.id.clone(), elapsed));
        }
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contingency::{build_cases, ContingencySpec, ElementKind};
    use crate::dc::{DcPowerFlow, DcSensitivityAnalysis};
    use crate::test_utils::three_bus_network;

    fn orchestrator() -> ContingencyOrchestrator {
        ContingencyOrchestrator::new(
            Arc::new(DcPowerFlow::default()),
            Arc::new(DcSensitivityAnalysis::default()),
            LoadFlowParameters::default(),
        )
    }

    fn request() -> CaseRequest {
        CaseRequest {
            monitored: vec!["L_AB".into(), "L_AC".into()],
            generators: vec!["G_B".into()],
            ..Default::default()
        }
    }

    #[test]
    fn test_matrices_without_variables_are_skipped() {
        let names: Vec<String> = request().factor_matrices().into_iter().map(|f| f.name).collect();
        assert_eq!(names, vec![GENERATORS_MATRIX.to_string()]);
    }

    #[test]
    fn test_cases_leave_baseline_untouched() {
        let baseline = three_bus_network();
        let cases = build_cases(
            &baseline,
            &[ContingencySpec::new("L_AC", ElementKind::AcLine)],
        );
        let report = orchestrator().run(&baseline, &cases, &request()).unwrap();

        assert_eq!(report.cases.len(), 2);
        assert_eq!(report.timings.len(), 2);
        assert!(report.unconverged.is_empty());
        assert!(baseline.branches["L_AC"].is_connected());
        assert!(baseline.branches["L_AB"].flow.p1.is_nan());

        let n = report.cases[0].result.matrix(GENERATORS_MATRIX).unwrap();
        let outage = report.cases[1].result.matrix(GENERATORS_MATRIX).unwrap();
        assert!(n.value("G_B", "L_AC").unwrap().is_finite());
        assert!(outage.value("G_B", "L_AC").unwrap().is_nan());
        assert_ne!(n.value("G_B", "L_AB"), outage.value("G_B", "L_AB"));
    }

    #[test]
    fn test_islanding_outage_still_solves_main_component() {
        let mut baseline = three_bus_network();
        baseline.set_branch_connected("L_BC", false).unwrap();
        let cases = build_cases(
            &baseline,
            &[ContingencySpec::new("L_AB", ElementKind::AcLine)],
        );
        let report = orchestrator().run(&baseline, &cases, &request()).unwrap();
        assert_eq!(report.cases.len(), 2);
        // G_B sits on the island cut off from the slack
        let outage = report.cases[1].result.matrix(GENERATORS_MATRIX).unwrap();
        assert!(outage.value("G_B", "L_AC").unwrap().is_nan());
        assert!(outage.reference_value("L_AC").unwrap().is_finite());
    }
}
