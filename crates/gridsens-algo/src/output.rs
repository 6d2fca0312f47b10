//! Result payload of a sensitivity run.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::counter_trading::CounterTradingBounds;
use crate::exchange::Exchange;
use crate::hvdc::LeverBounds;
use crate::limits::BranchLimits;
use crate::sensitivity::SensitivityTable;

/// Base-case exchange between the two border countries (MW).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SituationDescription {
    pub total_exchange: f64,
    pub ac_exchange: f64,
    pub hvdc_exchange: f64,
    pub country1: String,
    pub country2: String,
}

impl SituationDescription {
    pub fn new(exchange: Exchange, country1: &str, country2: &str) -> Self {
        Self {
            total_exchange: exchange.total_exchange,
            ac_exchange: exchange.ac_exchange,
            hvdc_exchange: exchange.hvdc_exchange,
            country1: country1.to_string(),
            country2: country2.to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Sensitivities {
    /// Monitored branches, current per lever unit (A/MW, A/°)
    pub branch: SensitivityTable,
    /// Emulated HVDC lines, equivalent AC line power per lever unit (MW/MW, MW/°)
    pub hvdc: SensitivityTable,
}

/// Bounds and reference of every reported lever.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ElemVars {
    pub hvdc: BTreeMap<String, LeverBounds>,
    pub pst: BTreeMap<String, LeverBounds>,
    #[serde(rename = "counterTrading")]
    pub counter_trading: BTreeMap<String, CounterTradingBounds>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensitivityReport {
    #[serde(rename = "situationDescription")]
    pub situation_description: SituationDescription,
    pub sensitivities: Sensitivities,
    #[serde(rename = "elemVars")]
    pub elem_vars: ElemVars,
    /// Current limits of the monitored branches
    pub quads: BranchLimits,
}

/// `{network_stem}_{rounded total exchange}{setpoint|ac_emulation}.json`
pub fn output_file_name(network_stem: &str, total_exchange: f64, ac_emulation: bool) -> String {
    let mode = if ac_emulation { "ac_emulation" } else { "setpoint" };
    format!("{}_{}{}.json", network_stem, total_exchange.round() as i64, mode)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_output_file_name() {
        assert_eq!(output_file_name("6_bus_system", 1234.56, true), "6_bus_system_1235ac_emulation.json");
        assert_eq!(output_file_name("net", -99.4, false), "net_-99setpoint.json");
    }

    #[test]
    fn test_payload_field_names() {
        let report = SensitivityReport {
            situation_description: SituationDescription::new(Exchange::default(), "FR", "ES"),
            sensitivities: Sensitivities::default(),
            elem_vars: ElemVars::default(),
            quads: BranchLimits::new(),
        };
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["situationDescription"]["country1"], "FR");
        assert!(json["sensitivities"]["branch"].is_object());
        assert!(json["elemVars"]["counterTrading"].is_object());
        assert!(json["quads"].is_object());
    }
}
