//! Linearised network model shared by the DC power flow and sensitivity solvers.
//!
//! Flows follow `p_ij = b_ij · (θ_i - θ_j + α_ij)` in per unit on the network
//! power base. Setpoint HVDC lines are a pair of opposite injections; HVDC
//! lines in angle-droop emulation are couplings of susceptance
//! `k = droop · 180/π / base` carrying `p0 + k · (θ_rectifier - θ_inverter)`.

use std::collections::{BTreeMap, HashMap};
use std::f64::consts::PI;

use gridsens_core::graph_utils::ElectricalIslands;
use gridsens_core::{
    HvdcMode, LinearSystemBackend, LoadFlowParameters, Network, Side,
};

use super::susceptance::{Coupling, SusceptanceMatrix};
use super::DcSolveError;

/// Power transfer of one HVDC line in the model.
#[derive(Debug, Clone)]
pub(crate) enum HvdcTransfer {
    Setpoint { p_pu: f64 },
    /// Index into `couplings`
    Droop { coupling: usize, p0_pu: f64 },
}

#[derive(Debug, Clone)]
pub(crate) struct ModelHvdc {
    pub id: String,
    pub rectifier: usize,
    pub inverter: usize,
    pub rectifier_side: Side,
    pub transfer: HvdcTransfer,
}

#[derive(Debug, Clone)]
pub(crate) struct Participant {
    pub generator: String,
    pub node: usize,
    /// Share of the component mismatch, summing to 1 per component
    pub weight: f64,
}

#[derive(Debug)]
pub(crate) struct DcModel {
    pub base_mva: f64,
    pub nodes: Vec<String>,
    pub index: HashMap<String, usize>,
    pub component: Vec<usize>,
    pub slacks: Vec<usize>,
    /// AC branches first, then droop couplings
    pub couplings: Vec<Coupling>,
    /// Phase shift per coupling (radians)
    pub alpha: Vec<f64>,
    pub branch_coupling: HashMap<String, usize>,
    pub hvdcs: Vec<ModelHvdc>,
    /// Per component: generators sharing the slack
    pub participation: Vec<Vec<Participant>>,
    pub susceptance: SusceptanceMatrix,
}

impl DcModel {
    pub fn build(network: &Network, params: &LoadFlowParameters) -> Result<Self, DcSolveError> {
        let islands = ElectricalIslands::analyse(network, params.connected_component_mode);
        let base_mva = network.base_mva;

        let mut nodes = Vec::new();
        let mut index = HashMap::new();
        let mut component = Vec::new();
        for (c, members) in islands.synchronous.iter().enumerate() {
            for id in members {
                index.insert(id.clone(), nodes.len());
                nodes.push(id.clone());
                component.push(c);
            }
        }

        let slacks = islands
            .synchronous
            .iter()
            .map(|members| select_slack(network, params, members, &index))
            .collect::<Vec<_>>();

        let mut couplings = Vec::new();
        let mut alpha = Vec::new();
        let mut branch_coupling = HashMap::new();
        for branch in network.branches.values().filter(|b| b.is_connected()) {
            let (Some(&from), Some(&to)) = (
                index.get(&branch.terminal1.node),
                index.get(&branch.terminal2.node),
            ) else {
                continue;
            };
            let v1 = network
                .nominal_v(&branch.terminal1.voltage_level_id)
                .ok_or_else(|| DcSolveError::UnknownElement(branch.terminal1.voltage_level_id.clone()))?;
            let v2 = network
                .nominal_v(&branch.terminal2.voltage_level_id)
                .ok_or_else(|| DcSolveError::UnknownElement(branch.terminal2.voltage_level_id.clone()))?;
            let x_pu = branch.x.to_per_unit(v1, v2, base_mva);
            if x_pu.abs() < 1e-12 {
                return Err(DcSolveError::ZeroReactance(branch.id.clone()));
            }
            branch_coupling.insert(branch.id.clone(), couplings.len());
            couplings.push(Coupling {
                id: branch.id.clone(),
                from,
                to,
                b: 1.0 / x_pu,
            });
            alpha.push(branch.alpha().to_radians().value());
        }

        let mut hvdcs = Vec::new();
        for hvdc in network.hvdc_lines.values() {
            let terminals = network.hvdc_terminals(&hvdc.id)?;
            if !terminals.both_connected() {
                continue;
            }
            let rectifier_side = hvdc.converters_mode.rectifier_side();
            let (Some(&rectifier), Some(&inverter)) = (
                index.get(&terminals.side(rectifier_side).node),
                index.get(&terminals.side(hvdc.converters_mode.inverter_side()).node),
            ) else {
                continue;
            };
            let transfer = match network.hvdc_mode(&hvdc.id)? {
                HvdcMode::Setpoint { target_p } => HvdcTransfer::Setpoint {
                    p_pu: target_p.to_per_unit(base_mva),
                },
                HvdcMode::DroopEmulation { droop, p0 } => {
                    let k = droop.to_per_unit_per_radian(base_mva);
                    couplings.push(Coupling {
                        id: hvdc.id.clone(),
                        from: rectifier,
                        to: inverter,
                        b: k,
                    });
                    alpha.push(0.0);
                    HvdcTransfer::Droop {
                        coupling: couplings.len() - 1,
                        p0_pu: p0.to_per_unit(base_mva),
                    }
                }
            };
            hvdcs.push(ModelHvdc {
                id: hvdc.id.clone(),
                rectifier,
                inverter,
                rectifier_side,
                transfer,
            });
        }

        let participation = if params.distributed_slack {
            participation_factors(network, &index, &component, islands.synchronous.len())
        } else {
            vec![Vec::new(); islands.synchronous.len()]
        };

        let susceptance = SusceptanceMatrix::assemble(nodes.len(), &couplings, &slacks)?;

        Ok(Self {
            base_mva,
            nodes,
            index,
            component,
            slacks,
            couplings,
            alpha,
            branch_coupling,
            hvdcs,
            participation,
            susceptance,
        })
    }

    pub fn node(&self, id: &str) -> Option<usize> {
        self.index.get(id).copied()
    }

    /// Net injections per node (per unit), HVDC transfers included.
    pub fn injections(&self, network: &Network) -> Vec<f64> {
        let mut p = vec![0.0; self.nodes.len()];
        let base = self.base_mva;
        let mut add = |node: &str, mw: f64| {
            if let Some(&i) = self.index.get(node) {
                p[i] += mw / base;
            }
        };
        for gen in network.generators.values().filter(|g| g.terminal.connected) {
            add(&gen.terminal.node, gen.target_p);
        }
        for load in network.loads.values().filter(|l| l.terminal.connected) {
            add(&load.terminal.node, -load.p0);
        }
        for battery in network.batteries.values().filter(|b| b.terminal.connected) {
            add(&battery.terminal.node, battery.target_p);
        }
        for hvdc in &self.hvdcs {
            let transfer = match hvdc.transfer {
                HvdcTransfer::Setpoint { p_pu } => p_pu,
                HvdcTransfer::Droop { p0_pu, .. } => p0_pu,
            };
            p[hvdc.rectifier] -= transfer;
            p[hvdc.inverter] += transfer;
        }
        p
    }

    /// Spread each component's mismatch over its participating generators.
    ///
    /// Returns the mismatch per component (per unit); components without
    /// participants leave it to their reference node.
    pub fn balance(&self, p: &mut [f64]) -> Vec<f64> {
        let mut mismatch = vec![0.0; self.slacks.len()];
        for (node, value) in p.iter().enumerate() {
            mismatch[self.component[node]] += value;
        }
        for (c, participants) in self.participation.iter().enumerate() {
            for part in participants {
                p[part.node] -= mismatch[c] * part.weight;
            }
        }
        mismatch
    }

    /// Solve angles for the given injections; reference nodes stay at zero.
    pub fn solve_angles(
        &self,
        backend: &dyn LinearSystemBackend,
        p: &[f64],
    ) -> Result<Vec<f64>, DcSolveError> {
        let mut rhs = vec![0.0; self.susceptance.dim()];
        for (node, value) in p.iter().enumerate() {
            if let Some(r) = self.susceptance.reduced_index(node) {
                rhs[r] += value;
            }
        }
        // phase shifters act as opposite injections b·α at both ends
        for (c, coupling) in self.couplings.iter().enumerate() {
            let shift = coupling.b * self.alpha[c];
            if shift == 0.0 {
                continue;
            }
            if let Some(r) = self.susceptance.reduced_index(coupling.from) {
                rhs[r] -= shift;
            }
            if let Some(r) = self.susceptance.reduced_index(coupling.to) {
                rhs[r] += shift;
            }
        }

        let reduced = backend
            .solve(&self.susceptance.to_dense(), &rhs)
            .map_err(|e| DcSolveError::Singular(e.to_string()))?;

        let mut theta = vec![0.0; self.nodes.len()];
        for (r, value) in reduced.into_iter().enumerate() {
            if let Some(node) = self.susceptance.node_of(r) {
                theta[node] = value;
            }
        }
        Ok(theta)
    }

    /// Full angle-injection matrix `X[node][node]`, zero on reference rows and columns.
    pub fn impedance(&self, backend: &dyn LinearSystemBackend) -> Result<Vec<Vec<f64>>, DcSolveError> {
        let n = self.susceptance.dim();
        let identity: Vec<Vec<f64>> = (0..n)
            .map(|j| (0..n).map(|i| if i == j { 1.0 } else { 0.0 }).collect())
            .collect();
        let columns = backend
            .solve_many(&self.susceptance.to_dense(), &identity)
            .map_err(|e| DcSolveError::Singular(e.to_string()))?;

        let mut x = vec![vec![0.0; self.nodes.len()]; self.nodes.len()];
        for (col, values) in columns.iter().enumerate() {
            let Some(j) = self.susceptance.node_of(col) else {
                continue;
            };
            for (row, value) in values.iter().enumerate() {
                if let Some(i) = self.susceptance.node_of(row) {
                    x[i][j] = *value;
                }
            }
        }
        Ok(x)
    }

    /// Per-unit flow on a coupling, from `from` to `to`.
    pub fn coupling_flow(&self, c: usize, theta: &[f64]) -> f64 {
        let coupling = &self.couplings[c];
        coupling.b * (theta[coupling.from] - theta[coupling.to] + self.alpha[c])
    }

    /// Per-unit transfer of an HVDC line, rectifier to inverter.
    pub fn hvdc_flow(&self, hvdc: &ModelHvdc, theta: &[f64]) -> f64 {
        match hvdc.transfer {
            HvdcTransfer::Setpoint { p_pu } => p_pu,
            HvdcTransfer::Droop { coupling, p0_pu } => p0_pu + self.coupling_flow(coupling, theta),
        }
    }

    /// d(flow on coupling `l`) / d(injection at `node`), slack compensation included.
    pub fn injection_factor(&self, x: &[Vec<f64>], l: usize, node: usize) -> f64 {
        let participants = &self.participation[self.component[node]];
        let mut factor = self.ptdf(x, l, node);
        for part in participants {
            factor -= part.weight * self.ptdf(x, l, part.node);
        }
        factor
    }

    /// d(flow on coupling `l`) / d(phase shift of coupling `t`), per unit per radian.
    pub fn phase_factor(&self, x: &[Vec<f64>], l: usize, t: usize) -> f64 {
        let shifter = &self.couplings[t];
        let mut factor = -shifter.b * (self.ptdf(x, l, shifter.from) - self.ptdf(x, l, shifter.to));
        if l == t {
            factor += shifter.b;
        }
        factor
    }

    fn ptdf(&self, x: &[Vec<f64>], l: usize, node: usize) -> f64 {
        let coupling = &self.couplings[l];
        coupling.b * (x[coupling.from][node] - x[coupling.to][node])
    }
}

/// Degrees to radians factor for phase sensitivities.
pub(crate) const RAD_PER_DEG: f64 = PI / 180.0;

fn select_slack(
    network: &Network,
    params: &LoadFlowParameters,
    members: &std::collections::BTreeSet<String>,
    index: &HashMap<String, usize>,
) -> usize {
    if params.read_slack_bus {
        if let Some(slack) = &network.extensions.slack_terminal {
            let node = network
                .loads
                .get(&slack.element_id)
                .map(|l| &l.terminal.node)
                .or_else(|| network.generators.get(&slack.element_id).map(|g| &g.terminal.node));
            if let Some(node) = node.filter(|n| members.contains(*n)) {
                if let Some(&i) = index.get(node) {
                    return i;
                }
            }
        }
    }

    // largest installed capacity, first node id on ties
    let mut capacity: BTreeMap<&str, f64> = BTreeMap::new();
    for gen in network
        .generators
        .values()
        .filter(|g| g.terminal.connected && !g.fictitious && g.max_p.is_finite())
    {
        if members.contains(&gen.terminal.node) {
            *capacity.entry(gen.terminal.node.as_str()).or_insert(0.0) += gen.max_p;
        }
    }
    let mut best: Option<(&str, f64)> = None;
    for (node, cap) in capacity {
        if best.map_or(true, |(_, b)| cap > b) {
            best = Some((node, cap));
        }
    }
    let chosen = best
        .map(|(node, _)| node)
        .or_else(|| members.iter().next().map(String::as_str));
    chosen.and_then(|n| index.get(n).copied()).unwrap_or(0)
}

fn participation_factors(
    network: &Network,
    index: &HashMap<String, usize>,
    component: &[usize],
    n_components: usize,
) -> Vec<Vec<Participant>> {
    let mut per_component: Vec<Vec<Participant>> = vec![Vec::new(); n_components];
    for gen in network.generators.values() {
        if !gen.terminal.connected || gen.fictitious || !gen.max_p.is_finite() || gen.max_p <= 0.0 {
            continue;
        }
        if let Some(&node) = index.get(&gen.terminal.node) {
            per_component[component[node]].push(Participant {
                generator: gen.id.clone(),
                node,
                weight: gen.max_p,
            });
        }
    }
    for participants in &mut per_component {
        let total: f64 = participants.iter().map(|p| p.weight).sum();
        if total > 0.0 {
            for part in participants.iter_mut() {
                part.weight /= total;
            }
        }
    }
    per_component
}
