//! Network conditioning ahead of linearised analysis.
//!
//! - HVDC line resistance is zeroed (lossless transfer).
//! - Converter stations lose their loss factor and voltage regulation.
//! - Batteries are disconnected.
//! - Branch reactances smaller than [`MIN_IMPEDANCE`] in magnitude are raised
//!   to `±MIN_IMPEDANCE`, keeping the sign (zero counts as positive).
//!
//! Conditioning is idempotent: a second pass changes nothing.

use gridsens_core::{Network, Ohms};
use tracing::{debug, info};

/// Smallest reactance magnitude kept on a branch (Ω).
pub const MIN_IMPEDANCE: f64 = 1e-5;

/// Raise `x` to `±floor` when its magnitude is below `floor`.
pub fn floor_reactance(x: f64, floor: f64) -> f64 {
    if x.abs() < floor {
        if x >= 0.0 {
            floor
        } else {
            -floor
        }
    } else {
        x
    }
}

/// What a conditioning pass touched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConditioningReport {
    pub hvdc_lines: usize,
    pub converter_stations: usize,
    pub batteries_disconnected: usize,
    /// Branches whose reactance was raised to the floor
    pub floored_branches: Vec<String>,
}

#[derive(Debug, Clone, Copy)]
pub struct NetworkConditioner {
    pub min_impedance: f64,
}

impl Default for NetworkConditioner {
    fn default() -> Self {
        Self {
            min_impedance: MIN_IMPEDANCE,
        }
    }
}

impl NetworkConditioner {
    pub fn apply(&self, network: &mut Network) -> ConditioningReport {
        let mut report = ConditioningReport::default();

        for hvdc in network.hvdc_lines.values_mut() {
            hvdc.r = Ohms(0.0);
            report.hvdc_lines += 1;
        }

        for station in network.converter_stations.values_mut() {
            station.loss_factor = 0.0;
            station.voltage_regulator_on = false;
            report.converter_stations += 1;
        }

        for battery in network.batteries.values_mut() {
            if battery.terminal.connected {
                battery.terminal.connected = false;
                report.batteries_disconnected += 1;
            }
        }

        for branch in network.branches.values_mut() {
            let floored = floor_reactance(branch.x.value(), self.min_impedance);
            if floored != branch.x.value() {
                debug!(branch = %branch.id, x = branch.x.value(), floored, "reactance floored");
                branch.x = Ohms(floored);
                report.floored_branches.push(branch.id.clone());
            }
        }

        info!(
            hvdc_lines = report.hvdc_lines,
            converter_stations = report.converter_stations,
            batteries = report.batteries_disconnected,
            floored = report.floored_branches.len(),
            "network conditioned"
        );
        report
    }
}
