//! Cross-border exchange between two countries.
//!
//! Exchange is positive from `country1` to `country2` and measured on the
//! `country1` side of every border element:
//!
//! - an AC branch contributes `p1` when its side 1 lies in `country1`, `p2` otherwise;
//! - an HVDC line contributes the active power of its `country1` converter
//!   station (load convention, so a rectifier exporting from `country1` counts positive).
//!
//! A branch ending in a dead-end voltage level (fewer than two branches) is a
//! tie to an unmodelled network, not an interconnector: before filtering, its
//! stub end takes the country of the other end.

use serde::{Deserialize, Serialize};
use tracing::debug;

use gridsens_core::{ConvertersMode, GridError, GridResult, Network, Side};

/// Border HVDC line with its exchange sign.
#[derive(Debug, Clone, PartialEq)]
pub struct SignedHvdc {
    pub id: String,
    /// Voltage level of converter station 1
    pub voltage_level_or: String,
    pub voltage_level_end: String,
    pub country_or: String,
    pub country_end: String,
    pub converters_mode: ConvertersMode,
    pub target_p: f64,
    pub max_p: f64,
    /// Station powers, load convention
    pub p_or: f64,
    pub p_end: f64,
    /// +1 when a positive setpoint moves power from country1 to country2, -1 otherwise
    pub exchange_sign: f64,
}

impl SignedHvdc {
    /// Power sent from country1 to country2 at the current setpoint.
    pub fn signed_target(&self) -> f64 {
        self.target_p * self.exchange_sign
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Exchange {
    pub total_exchange: f64,
    pub ac_exchange: f64,
    pub hvdc_exchange: f64,
}

/// AC branch crossing the border, with its flow from country1 to country2 (MW).
#[derive(Debug, Clone, PartialEq)]
pub struct BorderBranch {
    pub id: String,
    pub flow: f64,
}

/// Countries at the two ends of the first connected active HVDC line.
pub fn border_countries(network: &Network, active_hvdc_ids: &[String]) -> GridResult<(String, String)> {
    for id in active_hvdc_ids {
        let Ok(terminals) = network.hvdc_terminals(id) else {
            continue;
        };
        if !terminals.both_connected() {
            continue;
        }
        if let (Some(c1), Some(c2)) = (&terminals.side1.country, &terminals.side2.country) {
            return Ok((c1.clone(), c2.clone()));
        }
    }
    Err(GridError::Validation(
        "no connected active HVDC line to derive the border countries from".into(),
    ))
}

/// Connected HVDC lines joining `country1` and `country2`, with their exchange sign.
pub fn sign_exchange(network: &Network, country1: &str, country2: &str) -> Vec<SignedHvdc> {
    let mut signed = Vec::new();
    for hvdc in network.hvdc_lines.values() {
        let Ok(terminals) = network.hvdc_terminals(&hvdc.id) else {
            continue;
        };
        if !terminals.both_connected() {
            continue;
        }
        let (Some(country_or), Some(country_end)) =
            (terminals.side1.country.clone(), terminals.side2.country.clone())
        else {
            continue;
        };
        let mut exchange_sign = if country_or == country1 && country_end == country2 {
            1.0
        } else if country_or == country2 && country_end == country1 {
            -1.0
        } else {
            continue;
        };
        // positive flow runs rectifier to inverter
        if hvdc.converters_mode.rectifier_side() == Side::Two {
            exchange_sign = -exchange_sign;
        }
        signed.push(SignedHvdc {
            id: hvdc.id.clone(),
            voltage_level_or: terminals.side1.voltage_level_id.clone(),
            voltage_level_end: terminals.side2.voltage_level_id.clone(),
            country_or,
            country_end,
            converters_mode: hvdc.converters_mode,
            target_p: hvdc.target_p,
            max_p: hvdc.max_p,
            p_or: terminals.side1.p,
            p_end: terminals.side2.p,
            exchange_sign,
        });
    }
    signed
}

/// AC branches crossing the border after the false-border correction.
pub fn border_branches(network: &Network, country1: &str, country2: &str) -> Vec<BorderBranch> {
    let pair = [country1, country2];
    let mut border = Vec::new();
    for branch in network.branches.values() {
        let vl1 = &branch.terminal1.voltage_level_id;
        let vl2 = &branch.terminal2.voltage_level_id;
        let (Some(mut c1), Some(mut c2)) = (network.country_of(vl1), network.country_of(vl2)) else {
            continue;
        };
        if c1 != c2 && pair.contains(&c1) && pair.contains(&c2) {
            if network.branch_degree(vl2) < 2 {
                debug!(branch = %branch.id, voltage_level = %vl2, "false border");
                c2 = c1;
            } else if network.branch_degree(vl1) < 2 {
                debug!(branch = %branch.id, voltage_level = %vl1, "false border");
                c1 = c2;
            }
        }
        if c1 == c2 || !pair.contains(&c1) || !pair.contains(&c2) {
            continue;
        }
        let flow = if c1 == country1 {
            branch.flow.p1
        } else {
            branch.flow.p2
        };
        border.push(BorderBranch {
            id: branch.id.clone(),
            flow,
        });
    }
    border
}

/// Exchange from `country1` to `country2` with the flows currently stored in the network.
///
/// Elements without a solved flow (disconnected, outside the computed area) are skipped.
pub fn compute_exchange(
    network: &Network,
    signed_hvdcs: &[SignedHvdc],
    country1: &str,
    country2: &str,
) -> Exchange {
    let ac_exchange: f64 = border_branches(network, country1, country2)
        .iter()
        .map(|b| b.flow)
        .filter(|p| p.is_finite())
        .sum();
    let hvdc_exchange: f64 = signed_hvdcs
        .iter()
        .map(|h| if h.country_or == country1 { h.p_or } else { h.p_end })
        .filter(|p| p.is_finite())
        .sum();
    Exchange {
        total_exchange: ac_exchange + hvdc_exchange,
        ac_exchange,
        hvdc_exchange,
    }
}
