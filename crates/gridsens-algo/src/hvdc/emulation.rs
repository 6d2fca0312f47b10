//! Equivalent AC lines for HVDC links in AC emulation.
//!
//! An HVDC line in angle-droop control transfers `p0 + k · Δθ`. The same flow
//! is obtained with the line held at setpoint `p0` plus a parallel AC line of
//! susceptance `k`, from the rectifier bus (origin) to the inverter bus (end):
//!
//! ```text
//! k[pu/rad] = droop[MW/°] · 180/π / 100
//! x[Ω]      = (1 / k) · V_origin · V_end / 100
//! ```

use std::collections::BTreeSet;
use std::f64::consts::PI;

use gridsens_core::{
    Branch, GridResult, HvdcMode, Kilovolts, MegawattsPerDegree, Network,
    NetworkError, Ohms, Terminal, TopologyKind,
};
use tracing::{info, warn};

pub const EQUIVALENT_LINE_PREFIX: &str = "ac_eq_line_";

pub fn equivalent_line_id(hvdc_id: &str) -> String {
    format!("{EQUIVALENT_LINE_PREFIX}{hvdc_id}")
}

/// Reactance (Ω) of the AC line reproducing a droop between two voltage levels.
pub fn equivalent_reactance(droop: MegawattsPerDegree, v_origin: Kilovolts, v_end: Kilovolts) -> Ohms {
    let droop_pu_per_rad = droop.value() * 180.0 / PI / 100.0;
    Ohms(1.0 / droop_pu_per_rad * v_origin.value() * v_end.value() / 100.0)
}

/// Where new equipment attaches next to a converter station.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Attachment {
    /// Bus of a bus-breaker voltage level
    Bus { voltage_level: String, bus: String },
    /// First busbar section of a node-breaker voltage level
    BusbarSection { voltage_level: String, section: String },
}

impl Attachment {
    pub fn terminal(&self) -> Terminal {
        match self {
            Attachment::Bus { voltage_level, bus } => Terminal::new(voltage_level, bus),
            Attachment::BusbarSection {
                voltage_level,
                section,
            } => Terminal::new(voltage_level, section),
        }
    }
}

/// Resolve where equipment next to `node` attaches.
///
/// Bus-breaker levels must list `node` among their buses; node-breaker levels
/// fall back to their first busbar section. Anything else is a topology error.
pub fn resolve_attachment(network: &Network, voltage_level_id: &str, node: &str) -> GridResult<Attachment> {
    let vl = network.voltage_level(voltage_level_id)?;
    match vl.topology_kind {
        TopologyKind::BusBreaker => network
            .buses_in(&vl.id)
            .find(|bus| bus.id == node)
            .map(|bus| Attachment::Bus {
                voltage_level: vl.id.clone(),
                bus: bus.id.clone(),
            })
            .ok_or_else(|| {
                NetworkError::UnresolvedBus {
                    voltage_level: vl.id.clone(),
                    node: node.to_string(),
                }
                .into()
            }),
        TopologyKind::NodeBreaker => network
            .first_busbar_section(&vl.id)
            .map(|section| Attachment::BusbarSection {
                voltage_level: vl.id.clone(),
                section: section.id.clone(),
            })
            .ok_or_else(|| {
                NetworkError::NoBusbarSection {
                    voltage_level: vl.id.clone(),
                }
                .into()
            }),
    }
}

/// Add an equivalent AC line for every active HVDC line in AC emulation.
///
/// Converted lines get their setpoint set to the droop `p0`. Returns the ids of
/// the converted HVDC lines; an empty set when none is emulated.
pub fn build_equivalent_lines(
    network: &mut Network,
    active_hvdc_ids: &[String],
) -> GridResult<BTreeSet<String>> {
    let mut converted = BTreeSet::new();
    for id in active_hvdc_ids {
        let HvdcMode::DroopEmulation { droop, p0 } = network.hvdc_mode(id)? else {
            continue;
        };
        let terminals = network.hvdc_terminals(id)?;
        if !terminals.both_connected() {
            warn!(hvdc = %id, "disconnected HVDC line left out of AC emulation");
            continue;
        }
        let hvdc = network.hvdc_line(id)?;
        let origin = terminals.side(hvdc.converters_mode.rectifier_side()).clone();
        let end = terminals.side(hvdc.converters_mode.inverter_side()).clone();

        let x = equivalent_reactance(droop, origin.nominal_v, end.nominal_v);
        let origin_at = resolve_attachment(network, &origin.voltage_level_id, &origin.node)?;
        let end_at = resolve_attachment(network, &end.voltage_level_id, &end.node)?;
        let line_id = equivalent_line_id(id);
        let line = Branch::line(&line_id, origin_at.terminal(), end_at.terminal(), Ohms(0.0), x);
        match (&origin_at, &end_at) {
            (Attachment::Bus { .. }, Attachment::Bus { .. }) => network.create_line(line)?,
            (
                Attachment::BusbarSection { section: s1, .. },
                Attachment::BusbarSection { section: s2, .. },
            ) => network.create_line_bays(line, s1, s2)?,
            _ => network.add_branch(line)?,
        }

        if let Some(hvdc) = network.hvdc_lines.get_mut(id) {
            hvdc.target_p = p0.value();
        }
        info!(hvdc = %id, line = %line_id, x = x.value(), p0 = p0.value(), "equivalent AC line created");
        converted.insert(id.clone());
    }
    Ok(converted)
}

/// Disable AC emulation on the active HVDC lines; returns the lines switched to setpoint.
pub fn force_setpoint(network: &mut Network, active_hvdc_ids: &[String]) -> Vec<String> {
    let mut switched = Vec::new();
    for id in active_hvdc_ids {
        if let Some(droop) = network.extensions.hvdc_angle_droop.get_mut(id) {
            if droop.enabled {
                droop.enabled = false;
                switched.push(id.clone());
            }
        }
    }
    switched
}
