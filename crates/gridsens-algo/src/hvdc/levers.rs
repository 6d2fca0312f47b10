//! HVDC setpoints as sensitivity levers.
//!
//! A pair of fictitious generators at the two converter buses turns an HVDC
//! setpoint change into injections the sensitivity solver understands: moving
//! the lever by 1 MW is +1 MW at the side-2 generator and -1 MW at the side-1
//! generator, so its sensitivity row is `row(end) - row(origin)`.
//!
//! Parallel circuits leaving the same voltage level move together and are
//! reported as one merged lever.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use tracing::debug;

use gridsens_core::{Generator, GridError, GridResult, HvdcTerminal, Network};

use crate::exchange::SignedHvdc;
use crate::hvdc::emulation::{resolve_attachment, Attachment};

pub const FICTITIOUS_GENERATOR_SUFFIX: &str = "_fict_hvdc_gen";

/// Symmetric active power bound of the fictitious generators (MW).
pub const FICTITIOUS_GENERATOR_BOUND: f64 = 1000.0;

/// Trailing marker of the circuit that names a group of parallel HVDC lines.
pub const PRIMARY_SUFFIX: &str = "1";

pub fn fictitious_generator_id(voltage_level_id: &str) -> String {
    format!("{voltage_level_id}{FICTITIOUS_GENERATOR_SUFFIX}")
}

/// Fictitious generators standing for the two ends of one HVDC line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TerminalGenerators {
    /// At converter station 1
    pub origin: String,
    /// At converter station 2
    pub end: String,
}

/// Add (or reuse) a fictitious generator at both converter stations of each line.
pub fn add_terminal_generators(
    network: &mut Network,
    hvdc_ids: &[String],
) -> GridResult<BTreeMap<String, TerminalGenerators>> {
    let mut mapping = BTreeMap::new();
    for id in hvdc_ids {
        let terminals = network.hvdc_terminals(id)?;
        let origin = ensure_generator(network, &terminals.side1)?;
        let end = ensure_generator(network, &terminals.side2)?;
        debug!(hvdc = %id, %origin, %end, "terminal generators");
        mapping.insert(id.clone(), TerminalGenerators { origin, end });
    }
    Ok(mapping)
}

fn ensure_generator(network: &mut Network, terminal: &HvdcTerminal) -> GridResult<String> {
    let id = fictitious_generator_id(&terminal.voltage_level_id);
    if network.generators.contains_key(&id) {
        return Ok(id);
    }
    let attachment = resolve_attachment(network, &terminal.voltage_level_id, &terminal.node)?;
    let mut generator = Generator::new(&id, attachment.terminal())
        .with_p_limits(-FICTITIOUS_GENERATOR_BOUND, FICTITIOUS_GENERATOR_BOUND)
        .with_target_p(0.0);
    generator.target_q = 0.0;
    generator.voltage_regulator_on = false;
    generator.fictitious = true;
    match attachment {
        Attachment::Bus { .. } => network.create_generator(generator)?,
        Attachment::BusbarSection { section, .. } => {
            network.create_generator_bay(generator, &section)?
        }
    }
    Ok(id)
}

/// HVDC lines moved as one lever, named after `id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeverGroup {
    pub id: String,
    pub members: Vec<String>,
}

/// Group active border HVDC lines by origin voltage level.
///
/// Each active line whose id ends in [`PRIMARY_SUFFIX`] names the group of all
/// active lines sharing its origin voltage level. Lines left outside every
/// group become single-member levers.
pub fn infer_lever_groups(signed_hvdcs: &[SignedHvdc], active_hvdc_ids: &[String]) -> Vec<LeverGroup> {
    let active: BTreeSet<&str> = active_hvdc_ids.iter().map(String::as_str).collect();
    let candidates: Vec<&SignedHvdc> = signed_hvdcs
        .iter()
        .filter(|h| active.contains(h.id.as_str()))
        .collect();

    let mut groups = Vec::new();
    let mut grouped: BTreeSet<String> = BTreeSet::new();
    for primary in candidates.iter().filter(|h| h.id.ends_with(PRIMARY_SUFFIX)) {
        if grouped.contains(primary.id.as_str()) {
            continue;
        }
        let members: Vec<String> = candidates
            .iter()
            .filter(|h| h.voltage_level_or == primary.voltage_level_or)
            .filter(|h| !grouped.contains(h.id.as_str()))
            .map(|h| h.id.clone())
            .collect();
        for member in &members {
            grouped.insert(member.clone());
        }
        groups.push(LeverGroup {
            id: primary.id.clone(),
            members,
        });
    }
    for hvdc in candidates {
        if !grouped.contains(hvdc.id.as_str()) {
            groups.push(LeverGroup {
                id: hvdc.id.clone(),
                members: vec![hvdc.id.clone()],
            });
        }
    }
    groups
}

/// Bounds and reference of a lever, MW or degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LeverBounds {
    pub min: f64,
    pub max: f64,
    #[serde(rename = "referenceSetpoint")]
    pub reference_setpoint: f64,
}

/// Bounds of each merged lever: `∓Σ max_p`, reference `Σ target_p · exchange_sign`.
pub fn merge_parallel_levers(
    signed_hvdcs: &[SignedHvdc],
    groups: &[LeverGroup],
) -> GridResult<BTreeMap<String, LeverBounds>> {
    let by_id: BTreeMap<&str, &SignedHvdc> =
        signed_hvdcs.iter().map(|h| (h.id.as_str(), h)).collect();
    let mut merged = BTreeMap::new();
    for group in groups {
        let mut max_p = 0.0;
        let mut reference = 0.0;
        for member in &group.members {
            let hvdc = by_id.get(member.as_str()).ok_or_else(|| {
                GridError::Validation(format!(
                    "lever group '{}' member '{}' is not a connected border HVDC line",
                    group.id, member
                ))
            })?;
            max_p += hvdc.max_p;
            reference += hvdc.signed_target();
        }
        merged.insert(
            group.id.clone(),
            LeverBounds {
                min: -max_p,
                max: max_p,
                reference_setpoint: reference,
            },
        );
    }
    Ok(merged)
}
