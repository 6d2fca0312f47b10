//! Extension stores attached to a [`Network`](crate::Network).

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::units::{Megawatts, MegawattsPerDegree};

/// HVDC active-power control emulating an AC line.
///
/// When enabled, the transmitted power is `p0 + droop · (θ_rectifier - θ_inverter)`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HvdcAngleDroopActivePowerControl {
    pub enabled: bool,
    pub droop: MegawattsPerDegree,
    pub p0: Megawatts,
}

impl HvdcAngleDroopActivePowerControl {
    pub fn new(droop: f64, p0: f64) -> Self {
        Self {
            enabled: true,
            droop: MegawattsPerDegree(droop),
            p0: Megawatts(p0),
        }
    }
}

/// Element whose connection node is the reference for angles.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlackTerminal {
    pub voltage_level_id: String,
    pub element_id: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Extensions {
    /// Keyed by HVDC line id
    #[serde(default)]
    pub hvdc_angle_droop: BTreeMap<String, HvdcAngleDroopActivePowerControl>,
    #[serde(default)]
    pub slack_terminal: Option<SlackTerminal>,
}

/// How an HVDC line sets its transmitted power.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum HvdcMode {
    /// Fixed `target_p`, rectifier to inverter.
    Setpoint { target_p: Megawatts },
    /// AC emulation through the angle droop.
    DroopEmulation {
        droop: MegawattsPerDegree,
        p0: Megawatts,
    },
}

impl HvdcMode {
    pub fn is_emulated(&self) -> bool {
        matches!(self, HvdcMode::DroopEmulation { .. })
    }
}
