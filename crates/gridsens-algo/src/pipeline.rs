//! End-to-end sensitivity run.
//!
//! Stages, in order:
//!
//! 1. condition the network and convert emulated HVDC lines to equivalent AC lines
//!    (unless setpoint mode is forced), then switch the active lines to setpoint
//! 2. derive the border countries, apply the HVDC target override, select the
//!    monitored branches and the contingency cases
//! 3. build the counter-trading pool, freeze the PSTs, set the slack bus
//! 4. solve the base case and compute the exchange
//! 5. derive lever metadata, add the HVDC terminal generators, collect limits
//! 6. run every case and fold the results into the report

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use gridsens_core::{
    Diagnostics, GridError, GridResult, LoadFlowParameters, Network, PowerFlowSolver,
    SensitivitySolver, SolverKind, WorkingVariant,
};

use crate::conditioning::NetworkConditioner;
use crate::contingency::{build_cases, CaseRequest, ContingencyOrchestrator, ContingencySpec};
use crate::counter_trading::{counter_trading_info, proportional_redispatch_keys};
use crate::dc::{DcPowerFlow, DcSensitivityAnalysis};
use crate::exchange::{border_countries, compute_exchange, sign_exchange, Exchange};
use crate::hvdc::{
    add_terminal_generators, build_equivalent_lines, equivalent_line_id, force_setpoint,
    infer_lever_groups, merge_parallel_levers, LeverGroup,
};
use crate::limits::branch_limits;
use crate::output::{ElemVars, SensitivityReport, SituationDescription};
use crate::pst::{fix_pst_taps, pst_ranges};
use crate::sensitivity::{LeverLayout, SensitivityResultAssembler};
use crate::slack::define_slack_bus;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlackBus {
    pub voltage_level_id: String,
    pub bus_id: String,
}

/// Everything a run needs besides the network.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SensitivityInputs {
    pub monitored_branches: Vec<String>,
    pub contingencies: Vec<ContingencySpec>,
    pub active_hvdcs: Vec<String>,
    pub active_psts: Vec<String>,
    pub redispatchable_generators: Vec<String>,
    pub slack_bus: Option<SlackBus>,
    /// Setpoint (MW) applied to every active HVDC line
    pub hvdc_target: Option<f64>,
    /// Keep HVDC lines in setpoint mode instead of emulating them
    pub force_setpoint: bool,
    /// Counter-trading lever range (MW); 0 disables the pool
    pub max_counter_trading: f64,
    /// Explicit HVDC lever groups; inferred from line ids when absent
    pub lever_groups: Option<Vec<LeverGroup>>,
}

#[derive(Debug)]
pub struct PipelineOutput {
    pub report: SensitivityReport,
    pub diagnostics: Diagnostics,
    /// HVDC lines represented by an equivalent AC line
    pub equivalent_hvdcs: BTreeSet<String>,
    /// Setpoint mode was forced for every active HVDC line
    pub forced_setpoint: bool,
    pub unconverged: Vec<String>,
    pub timings: Vec<(String, Duration)>,
}

impl PipelineOutput {
    /// Run mode named in the output file: AC emulation unless setpoint mode was forced,
    /// even when no active line had an angle droop to emulate.
    pub fn ac_emulation(&self) -> bool {
        !self.forced_setpoint
    }
}

pub struct SensitivityPipeline {
    power_flow: Arc<dyn PowerFlowSolver>,
    sensitivity: Arc<dyn SensitivitySolver>,
    preview: Option<Arc<dyn PowerFlowSolver>>,
    params: LoadFlowParameters,
}

impl SensitivityPipeline {
    pub fn new(
        power_flow: Arc<dyn PowerFlowSolver>,
        sensitivity: Arc<dyn SensitivitySolver>,
        params: LoadFlowParameters,
    ) -> Self {
        Self {
            power_flow,
            sensitivity,
            preview: None,
            params,
        }
    }

    /// Bundled DC power flow and sensitivity analysis on the given linear backend.
    pub fn dc(kind: SolverKind, params: LoadFlowParameters) -> Self {
        Self::new(
            Arc::new(DcPowerFlow::new(kind)),
            Arc::new(DcSensitivityAnalysis::new(kind)),
            params,
        )
    }

    /// Run `solver` on a copy of the prepared network first and log the exchange it gives.
    pub fn with_preview(mut self, solver: Arc<dyn PowerFlowSolver>) -> Self {
        self.preview = Some(solver);
        self
    }

    pub fn run(&self, mut network: Network, inputs: &SensitivityInputs) -> GridResult<PipelineOutput> {
        let mut diagnostics = Diagnostics::new();
        network.validate_into(&mut diagnostics);
        NetworkConditioner::default().apply(&mut network);

        let active_hvdcs = existing(&inputs.active_hvdcs, "HVDC line", |id| {
            network.hvdc_lines.contains_key(id)
        });
        let equivalent_hvdcs = if inputs.force_setpoint {
            BTreeSet::new()
        } else {
            build_equivalent_lines(&mut network, &active_hvdcs)?
        };
        force_setpoint(&mut network, &active_hvdcs);

        let (country1, country2) = border_countries(&network, &active_hvdcs)?;
        info!(%country1, %country2, "border");

        if let Some(target) = inputs.hvdc_target {
            for id in &active_hvdcs {
                if let Some(hvdc) = network.hvdc_lines.get_mut(id) {
                    hvdc.target_p = target;
                }
            }
        }

        let monitored: BTreeSet<String> = existing(&inputs.monitored_branches, "branch", |id| {
            network.branches.contains_key(id)
        })
        .into_iter()
        .collect();
        if monitored.is_empty() {
            return Err(GridError::Validation("no monitored branch in the network".into()));
        }
        let cases = build_cases(&network, &inputs.contingencies);
        info!(monitored = monitored.len(), cases = cases.len(), "study scope");

        let counter_trading = if inputs.max_counter_trading > 0.0 {
            proportional_redispatch_keys(&network, &country1, &country2)
        } else {
            Default::default()
        };

        fix_pst_taps(&mut network, &inputs.active_psts)?;

        let mut params = self.params.clone();
        match &inputs.slack_bus {
            Some(slack) => {
                define_slack_bus(&mut network, &slack.voltage_level_id, &slack.bus_id)?;
            }
            None => params.read_slack_bus = false,
        }

        if let Some(preview) = &self.preview {
            let mut variant = WorkingVariant::new(&network, "preview");
            preview.run(variant.network_mut(), &params)?;
            let signed = sign_exchange(variant.network(), &country1, &country2);
            let exchange = compute_exchange(variant.network(), &signed, &country1, &country2);
            log_exchange("preview", &exchange);
        }

        let base = self.power_flow.run(&mut network, &params)?;
        if !base.converged() {
            warn!("base case load flow did not converge");
            diagnostics.add_warning("load_flow", "base case load flow did not converge");
        }
        let signed = sign_exchange(&network, &country1, &country2);
        let exchange = compute_exchange(&network, &signed, &country1, &country2);
        log_exchange("base case", &exchange);

        let groups = inputs
            .lever_groups
            .clone()
            .unwrap_or_else(|| infer_lever_groups(&signed, &active_hvdcs));
        let hvdc_bounds = merge_parallel_levers(&signed, &groups)?;
        let psts = pst_ranges(&network, &inputs.active_psts)?;

        let seeds: Vec<String> = groups
            .iter()
            .filter_map(|g| g.members.first().cloned())
            .collect();
        let terminals = add_terminal_generators(&mut network, &seeds)?;
        let hvdc_levers = groups
            .iter()
            .filter_map(|g| {
                let seed = g.members.first()?;
                Some((g.id.clone(), terminals.get(seed)?.clone()))
            })
            .collect();

        let quads = branch_limits(&network, &monitored, &mut diagnostics);

        let layout = LeverLayout {
            generators: existing(&inputs.redispatchable_generators, "generator", |id| {
                network.generators.contains_key(id)
            }),
            hvdc_levers,
            counter_trading: counter_trading.clone(),
            psts: inputs.active_psts.clone(),
        };
        let request = CaseRequest {
            monitored: monitored.iter().cloned().collect(),
            equivalent_lines: equivalent_hvdcs.iter().map(|id| equivalent_line_id(id)).collect(),
            generators: layout.generator_variables(),
            psts: layout.psts.clone(),
            equivalent_hvdcs: equivalent_hvdcs.clone(),
        };

        let orchestrator = ContingencyOrchestrator::new(
            Arc::clone(&self.power_flow),
            Arc::clone(&self.sensitivity),
            params,
        );
        let outcome = orchestrator.run(&network, &cases, &request)?;
        for case in &outcome.unconverged {
            diagnostics.add_warning_with_entity("load_flow", "case skipped, load flow diverged twice", case);
        }

        let mut assembler = SensitivityResultAssembler::new(layout);
        for case in &outcome.cases {
            assembler.assemble(&case.case_id, &case.result);
        }

        let report = SensitivityReport {
            situation_description: SituationDescription::new(exchange, &country1, &country2),
            sensitivities: assembler.finish(),
            elem_vars: ElemVars {
                hvdc: hvdc_bounds,
                pst: psts,
                counter_trading: counter_trading_info(inputs.max_counter_trading),
            },
            quads,
        };
        Ok(PipelineOutput {
            report,
            diagnostics,
            equivalent_hvdcs,
            forced_setpoint: inputs.force_setpoint,
            unconverged: outcome.unconverged,
            timings: outcome.timings,
        })
    }
}

/// Ids of `ids` accepted by `present`, in input order without duplicates; others are logged.
fn existing(ids: &[String], kind: &str, present: impl Fn(&str) -> bool) -> Vec<String> {
    let mut seen = BTreeSet::new();
    let mut kept = Vec::new();
    for id in ids {
        if !seen.insert(id.as_str()) {
            continue;
        }
        if present(id) {
            kept.push(id.clone());
        } else {
            warn!(%kind, %id, "not in network, ignored");
        }
    }
    kept
}

fn log_exchange(label: &str, exchange: &Exchange) {
    info!(
        total = exchange.total_exchange,
        ac = exchange.ac_exchange,
        hvdc = exchange.hvdc_exchange,
        "{label} exchange"
    );
}
