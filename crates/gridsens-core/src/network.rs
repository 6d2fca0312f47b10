//! The [`Network`] container: element tables, mutations and lookups.
//!
//! Elements reference each other by id. Every `add_*` method validates those
//! references before inserting, so a `Network` built through this API never
//! holds a dangling terminal.
//!
//! The `create_*` family mirrors how equipment is added during a study:
//! `create_line`, `create_generator` and `create_load` attach to buses of a
//! bus-breaker voltage level and refuse node-breaker levels with
//! [`NetworkError::NodeBreakerTopology`]; the `*_bay` variants attach to busbar
//! sections instead.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

use crate::diagnostics::Diagnostics;
use crate::extensions::{Extensions, HvdcMode, SlackTerminal};
use crate::units::{Kilovolts, Megawatts, BASE_MVA};
use crate::{
    Battery, Branch, BranchKind, Bus, BusbarSection, Generator, HvdcLine, Load, Side, Substation,
    Terminal, TopologyKind, VoltageLevel, VscConverterStation,
};

/// Errors raised by element table mutations and lookups.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum NetworkError {
    #[error("{kind} '{id}' already exists")]
    DuplicateId { kind: &'static str, id: String },

    #[error("unknown {kind} '{id}'")]
    UnknownElement { kind: &'static str, id: String },

    #[error("voltage level '{voltage_level}' uses node-breaker topology, attach through a busbar section")]
    NodeBreakerTopology { voltage_level: String },

    #[error("voltage level '{voltage_level}' uses bus-breaker topology, attach to a bus")]
    BusBreakerTopology { voltage_level: String },

    #[error("voltage level '{voltage_level}' has no busbar section")]
    NoBusbarSection { voltage_level: String },

    #[error("node '{node}' is not a connection point of voltage level '{voltage_level}'")]
    UnresolvedBus { voltage_level: String, node: String },
}

fn default_base_mva() -> f64 {
    BASE_MVA
}

/// Grid model made of id-keyed element tables.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Network {
    pub id: String,
    #[serde(default = "default_base_mva")]
    pub base_mva: f64,
    #[serde(default)]
    pub substations: BTreeMap<String, Substation>,
    #[serde(default)]
    pub voltage_levels: BTreeMap<String, VoltageLevel>,
    #[serde(default)]
    pub buses: BTreeMap<String, Bus>,
    #[serde(default)]
    pub busbar_sections: BTreeMap<String, BusbarSection>,
    /// Lines and two-winding transformers
    #[serde(default)]
    pub branches: BTreeMap<String, Branch>,
    #[serde(default)]
    pub hvdc_lines: BTreeMap<String, HvdcLine>,
    #[serde(default)]
    pub converter_stations: BTreeMap<String, VscConverterStation>,
    #[serde(default)]
    pub generators: BTreeMap<String, Generator>,
    #[serde(default)]
    pub loads: BTreeMap<String, Load>,
    #[serde(default)]
    pub batteries: BTreeMap<String, Battery>,
    #[serde(default)]
    pub extensions: Extensions,
}

/// Converter station view of one HVDC side.
#[derive(Debug, Clone, PartialEq)]
pub struct HvdcTerminal {
    pub station_id: String,
    pub voltage_level_id: String,
    pub node: String,
    pub nominal_v: Kilovolts,
    pub country: Option<String>,
    pub connected: bool,
    /// Measured active power, load convention
    pub p: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct HvdcTerminals {
    pub side1: HvdcTerminal,
    pub side2: HvdcTerminal,
}

impl HvdcTerminals {
    pub fn side(&self, side: Side) -> &HvdcTerminal {
        match side {
            Side::One => &self.side1,
            Side::Two => &self.side2,
        }
    }

    pub fn both_connected(&self) -> bool {
        self.side1.connected && self.side2.connected
    }
}

fn insert_unique<T>(
    table: &mut BTreeMap<String, T>,
    kind: &'static str,
    id: &str,
    value: T,
) -> Result<(), NetworkError> {
    if table.contains_key(id) {
        return Err(NetworkError::DuplicateId {
            kind,
            id: id.to_string(),
        });
    }
    table.insert(id.to_string(), value);
    Ok(())
}

fn unknown(kind: &'static str, id: &str) -> NetworkError {
    NetworkError::UnknownElement {
        kind,
        id: id.to_string(),
    }
}

impl Network {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            base_mva: BASE_MVA,
            substations: BTreeMap::new(),
            voltage_levels: BTreeMap::new(),
            buses: BTreeMap::new(),
            busbar_sections: BTreeMap::new(),
            branches: BTreeMap::new(),
            hvdc_lines: BTreeMap::new(),
            converter_stations: BTreeMap::new(),
            generators: BTreeMap::new(),
            loads: BTreeMap::new(),
            batteries: BTreeMap::new(),
            extensions: Extensions::default(),
        }
    }

    // =========================================================================
    // Table insertion
    // =========================================================================

    pub fn add_substation(&mut self, substation: Substation) -> Result<(), NetworkError> {
        let id = substation.id.clone();
        insert_unique(&mut self.substations, "substation", &id, substation)
    }

    pub fn add_voltage_level(&mut self, vl: VoltageLevel) -> Result<(), NetworkError> {
        if !self.substations.contains_key(&vl.substation_id) {
            return Err(unknown("substation", &vl.substation_id));
        }
        let id = vl.id.clone();
        insert_unique(&mut self.voltage_levels, "voltage level", &id, vl)
    }

    pub fn add_bus(&mut self, bus: Bus) -> Result<(), NetworkError> {
        let vl = self.voltage_level(&bus.voltage_level_id)?;
        if vl.topology_kind == TopologyKind::NodeBreaker {
            return Err(NetworkError::NodeBreakerTopology {
                voltage_level: vl.id.clone(),
            });
        }
        self.ensure_node_free(&bus.id)?;
        let id = bus.id.clone();
        insert_unique(&mut self.buses, "bus", &id, bus)
    }

    pub fn add_busbar_section(&mut self, section: BusbarSection) -> Result<(), NetworkError> {
        let vl = self.voltage_level(&section.voltage_level_id)?;
        if vl.topology_kind == TopologyKind::BusBreaker {
            return Err(NetworkError::BusBreakerTopology {
                voltage_level: vl.id.clone(),
            });
        }
        self.ensure_node_free(&section.id)?;
        let id = section.id.clone();
        insert_unique(&mut self.busbar_sections, "busbar section", &id, section)
    }

    pub fn add_branch(&mut self, branch: Branch) -> Result<(), NetworkError> {
        self.check_terminal(&branch.terminal1)?;
        self.check_terminal(&branch.terminal2)?;
        let id = branch.id.clone();
        insert_unique(&mut self.branches, "branch", &id, branch)
    }

    pub fn add_converter_station(
        &mut self,
        station: VscConverterStation,
    ) -> Result<(), NetworkError> {
        self.check_terminal(&station.terminal)?;
        let id = station.id.clone();
        insert_unique(&mut self.converter_stations, "converter station", &id, station)
    }

    pub fn add_hvdc_line(&mut self, hvdc: HvdcLine) -> Result<(), NetworkError> {
        for station in [&hvdc.converter_station1_id, &hvdc.converter_station2_id] {
            if !self.converter_stations.contains_key(station) {
                return Err(unknown("converter station", station));
            }
        }
        let id = hvdc.id.clone();
        insert_unique(&mut self.hvdc_lines, "HVDC line", &id, hvdc)
    }

    pub fn add_generator(&mut self, generator: Generator) -> Result<(), NetworkError> {
        self.check_terminal(&generator.terminal)?;
        let id = generator.id.clone();
        insert_unique(&mut self.generators, "generator", &id, generator)
    }

    pub fn add_load(&mut self, load: Load) -> Result<(), NetworkError> {
        self.check_terminal(&load.terminal)?;
        let id = load.id.clone();
        insert_unique(&mut self.loads, "load", &id, load)
    }

    pub fn add_battery(&mut self, battery: Battery) -> Result<(), NetworkError> {
        self.check_terminal(&battery.terminal)?;
        let id = battery.id.clone();
        insert_unique(&mut self.batteries, "battery", &id, battery)
    }

    // =========================================================================
    // Study-time creation (bus vs bay attachment)
    // =========================================================================

    /// Add a line between two buses of bus-breaker voltage levels.
    pub fn create_line(&mut self, line: Branch) -> Result<(), NetworkError> {
        self.require_bus_breaker(&line.terminal1.voltage_level_id)?;
        self.require_bus_breaker(&line.terminal2.voltage_level_id)?;
        self.add_branch(line)
    }

    /// Add a line between two busbar sections; the terminals of `line` are replaced.
    pub fn create_line_bays(
        &mut self,
        mut line: Branch,
        busbar_section1: &str,
        busbar_section2: &str,
    ) -> Result<(), NetworkError> {
        line.terminal1 = self.bay_terminal(busbar_section1)?;
        line.terminal2 = self.bay_terminal(busbar_section2)?;
        self.add_branch(line)
    }

    pub fn create_generator(&mut self, generator: Generator) -> Result<(), NetworkError> {
        self.require_bus_breaker(&generator.terminal.voltage_level_id)?;
        self.add_generator(generator)
    }

    pub fn create_generator_bay(
        &mut self,
        mut generator: Generator,
        busbar_section: &str,
    ) -> Result<(), NetworkError> {
        generator.terminal = self.bay_terminal(busbar_section)?;
        self.add_generator(generator)
    }

    pub fn create_load(&mut self, load: Load) -> Result<(), NetworkError> {
        self.require_bus_breaker(&load.terminal.voltage_level_id)?;
        self.add_load(load)
    }

    pub fn create_load_bay(&mut self, mut load: Load, busbar_section: &str) -> Result<(), NetworkError> {
        load.terminal = self.bay_terminal(busbar_section)?;
        self.add_load(load)
    }

    // =========================================================================
    // Updates
    // =========================================================================

    pub fn set_branch_connected(&mut self, id: &str, connected: bool) -> Result<(), NetworkError> {
        let branch = self
            .branches
            .get_mut(id)
            .ok_or_else(|| unknown("branch", id))?;
        branch.terminal1.connected = connected;
        branch.terminal2.connected = connected;
        Ok(())
    }

    /// Connect or disconnect both converter stations of an HVDC line.
    pub fn set_hvdc_connected(&mut self, id: &str, connected: bool) -> Result<(), NetworkError> {
        let hvdc = self.hvdc_lines.get(id).ok_or_else(|| unknown("HVDC line", id))?;
        let stations = [
            hvdc.converter_station1_id.clone(),
            hvdc.converter_station2_id.clone(),
        ];
        for station_id in &stations {
            let station = self
                .converter_stations
                .get_mut(station_id)
                .ok_or_else(|| unknown("converter station", station_id))?;
            station.terminal.connected = connected;
        }
        Ok(())
    }

    pub fn set_slack_terminal(&mut self, slack: SlackTerminal) -> Result<(), NetworkError> {
        self.voltage_level(&slack.voltage_level_id)?;
        self.extensions.slack_terminal = Some(slack);
        Ok(())
    }

    // =========================================================================
    // Lookups
    // =========================================================================

    pub fn voltage_level(&self, id: &str) -> Result<&VoltageLevel, NetworkError> {
        self.voltage_levels
            .get(id)
            .ok_or_else(|| unknown("voltage level", id))
    }

    pub fn branch(&self, id: &str) -> Result<&Branch, NetworkError> {
        self.branches.get(id).ok_or_else(|| unknown("branch", id))
    }

    pub fn hvdc_line(&self, id: &str) -> Result<&HvdcLine, NetworkError> {
        self.hvdc_lines.get(id).ok_or_else(|| unknown("HVDC line", id))
    }

    pub fn country_of(&self, voltage_level_id: &str) -> Option<&str> {
        let vl = self.voltage_levels.get(voltage_level_id)?;
        self.substations.get(&vl.substation_id)?.country.as_deref()
    }

    pub fn nominal_v(&self, voltage_level_id: &str) -> Option<Kilovolts> {
        self.voltage_levels.get(voltage_level_id).map(|vl| vl.nominal_v)
    }

    /// Buses of a bus-breaker voltage level, in id order.
    pub fn buses_in<'a>(&'a self, voltage_level_id: &'a str) -> impl Iterator<Item = &'a Bus> + 'a {
        self.buses
            .values()
            .filter(move |b| b.voltage_level_id == voltage_level_id)
    }

    /// First busbar section of a voltage level, in id order.
    pub fn first_busbar_section(&self, voltage_level_id: &str) -> Option<&BusbarSection> {
        self.busbar_sections
            .values()
            .find(|s| s.voltage_level_id == voltage_level_id)
    }

    /// Whether `node` is a bus or busbar section.
    pub fn is_connection_node(&self, node: &str) -> bool {
        self.buses.contains_key(node) || self.busbar_sections.contains_key(node)
    }

    /// Number of branches with a terminal in the voltage level, connected or not.
    pub fn branch_degree(&self, voltage_level_id: &str) -> usize {
        self.branches
            .values()
            .filter(|b| {
                b.terminal1.voltage_level_id == voltage_level_id
                    || b.terminal2.voltage_level_id == voltage_level_id
            })
            .count()
    }

    /// Two-winding transformers carrying a phase tap changer.
    pub fn phase_shifters(&self) -> impl Iterator<Item = &Branch> {
        self.branches.values().filter(|b| {
            b.kind == BranchKind::TwoWindingsTransformer && b.phase_tap_changer.is_some()
        })
    }

    pub fn hvdc_terminals(&self, id: &str) -> Result<HvdcTerminals, NetworkError> {
        let hvdc = self.hvdc_line(id)?;
        Ok(HvdcTerminals {
            side1: self.station_view(&hvdc.converter_station1_id)?,
            side2: self.station_view(&hvdc.converter_station2_id)?,
        })
    }

    pub fn hvdc_mode(&self, id: &str) -> Result<HvdcMode, NetworkError> {
        let hvdc = self.hvdc_line(id)?;
        Ok(match self.extensions.hvdc_angle_droop.get(id) {
            Some(droop) if droop.enabled => HvdcMode::DroopEmulation {
                droop: droop.droop,
                p0: droop.p0,
            },
            _ => HvdcMode::Setpoint {
                target_p: Megawatts(hvdc.target_p),
            },
        })
    }

    pub fn stats(&self) -> NetworkStats {
        let mut stats = NetworkStats {
            num_voltage_levels: self.voltage_levels.len(),
            num_buses: self.buses.len() + self.busbar_sections.len(),
            num_branches: self.branches.len(),
            num_phase_shifters: self.phase_shifters().count(),
            num_hvdc_lines: self.hvdc_lines.len(),
            num_gens: self.generators.len(),
            num_loads: self.loads.len(),
            ..Default::default()
        };
        for gen in self.generators.values().filter(|g| !g.fictitious) {
            stats.total_gen_target_mw += gen.target_p;
        }
        for load in self.loads.values() {
            stats.total_load_mw += load.p0;
        }
        stats
    }

    /// Record data issues that make the sensitivity study meaningless or fragile.
    pub fn validate_into(&self, diag: &mut Diagnostics) {
        let stats = self.stats();

        if stats.num_buses == 0 {
            diag.add_error("structure", "Network has no connection nodes");
            return;
        }
        if stats.num_gens == 0 {
            diag.add_error("structure", "Network has no generators");
        }
        if stats.num_branches == 0 && stats.num_buses > 1 {
            diag.add_error("structure", "Network has multiple buses but no branches");
        }

        for hvdc_id in self.extensions.hvdc_angle_droop.keys() {
            if !self.hvdc_lines.contains_key(hvdc_id) {
                diag.add_warning_with_entity(
                    "reference",
                    "Angle droop extension references an unknown HVDC line",
                    hvdc_id,
                );
            }
        }

        for sub in self.substations.values() {
            if sub.country.is_none() {
                diag.add_warning_with_entity("data", "Substation has no country", &sub.id);
            }
        }

        for branch in self.branches.values() {
            if branch.x.value().abs() < 1e-12 {
                diag.add_warning_with_entity(
                    "physical",
                    "Branch has zero reactance",
                    &branch.id,
                );
            }
        }
    }

    // =========================================================================
    // Internals
    // =========================================================================

    fn ensure_node_free(&self, id: &str) -> Result<(), NetworkError> {
        if self.is_connection_node(id) {
            return Err(NetworkError::DuplicateId {
                kind: "connection node",
                id: id.to_string(),
            });
        }
        Ok(())
    }

    fn check_terminal(&self, terminal: &Terminal) -> Result<(), NetworkError> {
        let vl = self.voltage_level(&terminal.voltage_level_id)?;
        let node_vl = match vl.topology_kind {
            TopologyKind::BusBreaker => self.buses.get(&terminal.node).map(|b| &b.voltage_level_id),
            TopologyKind::NodeBreaker => self
                .busbar_sections
                .get(&terminal.node)
                .map(|s| &s.voltage_level_id),
        };
        match node_vl {
            Some(v) if *v == vl.id => Ok(()),
            _ => Err(NetworkError::UnresolvedBus {
                voltage_level: vl.id.clone(),
                node: terminal.node.clone(),
            }),
        }
    }

    fn require_bus_breaker(&self, voltage_level_id: &str) -> Result<(), NetworkError> {
        let vl = self.voltage_level(voltage_level_id)?;
        if vl.topology_kind == TopologyKind::NodeBreaker {
            return Err(NetworkError::NodeBreakerTopology {
                voltage_level: vl.id.clone(),
            });
        }
        Ok(())
    }

    fn bay_terminal(&self, busbar_section: &str) -> Result<Terminal, NetworkError> {
        let section = self
            .busbar_sections
            .get(busbar_section)
            .ok_or_else(|| unknown("busbar section", busbar_section))?;
        Ok(Terminal::new(&section.voltage_level_id, &section.id))
    }

    fn station_view(&self, station_id: &str) -> Result<HvdcTerminal, NetworkError> {
        let station = self
            .converter_stations
            .get(station_id)
            .ok_or_else(|| unknown("converter station", station_id))?;
        let vl_id = &station.terminal.voltage_level_id;
        Ok(HvdcTerminal {
            station_id: station.id.clone(),
            voltage_level_id: vl_id.clone(),
            node: station.terminal.node.clone(),
            nominal_v: self.voltage_level(vl_id)?.nominal_v,
            country: self.country_of(vl_id).map(str::to_string),
            connected: station.terminal.connected,
            p: station.p,
        })
    }
}

/// Statistics about a network's size and dispatch
#[derive(Debug, Clone, Default)]
pub struct NetworkStats {
    pub num_voltage_levels: usize,
    /// Buses plus busbar sections
    pub num_buses: usize,
    pub num_branches: usize,
    pub num_phase_shifters: usize,
    pub num_hvdc_lines: usize,
    pub num_gens: usize,
    pub num_loads: usize,
    pub total_gen_target_mw: f64,
    pub total_load_mw: f64,
}

impl std::fmt::Display for NetworkStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} nodes, {} branches ({} PST), {} HVDC, {} gens ({:.0} MW), {} loads ({:.0} MW)",
            self.num_buses,
            self.num_branches,
            self.num_phase_shifters,
            self.num_hvdc_lines,
            self.num_gens,
            self.total_gen_target_mw,
            self.num_loads,
            self.total_load_mw
        )
    }
}
