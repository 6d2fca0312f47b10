//! # gridsens-core: Network model for cross-border sensitivity studies
//!
//! Provides the element tables, extension stores and solver contracts used by
//! the sensitivity pipeline in `gridsens-algo`.
//!
//! ## Design Philosophy
//!
//! A [`Network`] is a set of id-keyed element tables (substations, voltage
//! levels, buses, busbar sections, branches, HVDC lines, converter stations,
//! generators, loads, batteries) plus extension stores (HVDC angle droop,
//! slack terminal). Tables are `BTreeMap`s so every iteration order is
//! deterministic.
//!
//! - Values are stored in native units (MW, kV, Ω, A, degrees); per-unit
//!   conversion happens inside solvers with [`Network::base_mva`].
//! - Elements attach to a connection node: a bus in a bus-breaker voltage level
//!   or a busbar section in a node-breaker voltage level.
//! - Case studies never mutate the baseline: they go through a
//!   [`WorkingVariant`], a copy-on-write view released on drop.
//!
//! ## Quick Start
//!
//! ```rust
//! use gridsens_core::*;
//!
//! let mut network = Network::new("two_bus");
//! network.add_substation(Substation::new("S1", "FR")).unwrap();
//! network
//!     .add_voltage_level(VoltageLevel::bus_breaker("VL1", "S1", Kilovolts(400.0)))
//!     .unwrap();
//! network.add_bus(Bus::new("B1", "VL1")).unwrap();
//! network.add_bus(Bus::new("B2", "VL1")).unwrap();
//! network
//!     .add_branch(Branch::line(
//!         "L1",
//!         Terminal::new("VL1", "B1"),
//!         Terminal::new("VL1", "B2"),
//!         Ohms(0.0),
//!         Ohms(10.0),
//!     ))
//!     .unwrap();
//! network
//!     .add_generator(Generator::new("G1", Terminal::new("VL1", "B1")).with_p_limits(0.0, 500.0))
//!     .unwrap();
//!
//! assert_eq!(network.stats().num_branches, 1);
//! assert_eq!(network.country_of("VL1"), Some("FR"));
//! ```
//!
//! ## Modules
//!
//! - [`network`] - the [`Network`] container and its mutation API
//! - [`extensions`] - HVDC droop control and slack terminal stores
//! - [`variant`] - copy-on-write working variants
//! - [`graph_utils`] - synchronous islands and connected components
//! - [`solver`] - power-flow and sensitivity contracts, dense linear backends
//! - [`diagnostics`] - data-quality reporting

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub mod diagnostics;
pub mod error;
pub mod extensions;
pub mod graph_utils;
pub mod network;
pub mod solver;
pub mod units;
pub mod variant;

pub use diagnostics::{DiagnosticIssue, Diagnostics, Severity};
pub use error::{GridError, GridResult};
pub use extensions::{Extensions, HvdcAngleDroopActivePowerControl, HvdcMode, SlackTerminal};
pub use graph_utils::{ElectricalIslands, TopologyGraph};
pub use network::{HvdcTerminal, HvdcTerminals, Network, NetworkError, NetworkStats};
pub use solver::*;
pub use units::{
    Amperes, Degrees, Kilovolts, Megawatts, MegawattsPerDegree, Ohms, Radians, BASE_MVA,
};
pub use variant::WorkingVariant;

fn unsolved() -> f64 {
    f64::NAN
}

fn default_true() -> bool {
    true
}

/// Physical arrangement of a voltage level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TopologyKind {
    /// Elements connect to named buses.
    BusBreaker,
    /// Elements connect to busbar sections through bays.
    NodeBreaker,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Substation {
    pub id: String,
    /// ISO country code, e.g. "FR"
    #[serde(default)]
    pub country: Option<String>,
}

impl Substation {
    pub fn new(id: impl Into<String>, country: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            country: Some(country.into()),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VoltageLevel {
    pub id: String,
    pub substation_id: String,
    pub nominal_v: Kilovolts,
    pub topology_kind: TopologyKind,
}

impl VoltageLevel {
    pub fn bus_breaker(
        id: impl Into<String>,
        substation_id: impl Into<String>,
        nominal_v: Kilovolts,
    ) -> Self {
        Self {
            id: id.into(),
            substation_id: substation_id.into(),
            nominal_v,
            topology_kind: TopologyKind::BusBreaker,
        }
    }

    pub fn node_breaker(
        id: impl Into<String>,
        substation_id: impl Into<String>,
        nominal_v: Kilovolts,
    ) -> Self {
        Self {
            topology_kind: TopologyKind::NodeBreaker,
            ..Self::bus_breaker(id, substation_id, nominal_v)
        }
    }
}

/// Bus of the bus-breaker view.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Bus {
    pub id: String,
    pub voltage_level_id: String,
}

impl Bus {
    pub fn new(id: impl Into<String>, voltage_level_id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            voltage_level_id: voltage_level_id.into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BusbarSection {
    pub id: String,
    pub voltage_level_id: String,
}

impl BusbarSection {
    pub fn new(id: impl Into<String>, voltage_level_id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            voltage_level_id: voltage_level_id.into(),
        }
    }
}

/// Attachment of an element side to a connection node (bus or busbar section).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Terminal {
    pub voltage_level_id: String,
    pub node: String,
    #[serde(default = "default_true")]
    pub connected: bool,
}

impl Terminal {
    pub fn new(voltage_level_id: impl Into<String>, node: impl Into<String>) -> Self {
        Self {
            voltage_level_id: voltage_level_id.into(),
            node: node.into(),
            connected: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BranchKind {
    Line,
    TwoWindingsTransformer,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RegulationMode {
    FixedTap,
    ActivePowerControl,
    CurrentLimiter,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PhaseTapStep {
    /// Phase shift applied from side 1 to side 2
    pub alpha: Degrees,
    #[serde(default = "unit_ratio")]
    pub rho: f64,
}

fn unit_ratio() -> f64 {
    1.0
}

impl PhaseTapStep {
    pub fn new(alpha: Degrees) -> Self {
        Self { alpha, rho: 1.0 }
    }
}

/// Phase tap changer of a phase-shifting transformer (PST).
///
/// Tap positions run from `low_tap` to `low_tap + steps.len() - 1`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PhaseTapChanger {
    pub low_tap: i32,
    pub tap: i32,
    pub steps: Vec<PhaseTapStep>,
    #[serde(default)]
    pub regulating: bool,
    pub regulation_mode: RegulationMode,
    #[serde(default)]
    pub regulation_value: f64,
}

impl PhaseTapChanger {
    /// Fixed-tap changer with one step per angle, starting at `low_tap`.
    pub fn fixed(low_tap: i32, tap: i32, alphas: &[f64]) -> Self {
        Self {
            low_tap,
            tap,
            steps: alphas.iter().map(|&a| PhaseTapStep::new(Degrees(a))).collect(),
            regulating: false,
            regulation_mode: RegulationMode::FixedTap,
            regulation_value: 0.0,
        }
    }

    pub fn high_tap(&self) -> i32 {
        self.low_tap + self.steps.len() as i32 - 1
    }

    pub fn step(&self, tap: i32) -> Option<&PhaseTapStep> {
        if tap < self.low_tap {
            return None;
        }
        self.steps.get((tap - self.low_tap) as usize)
    }

    pub fn current_alpha(&self) -> Option<Degrees> {
        self.step(self.tap).map(|s| s.alpha)
    }
}

/// Solved quantities of a branch; NaN until a power flow ran.
#[derive(Debug, Clone, Copy)]
pub struct BranchFlow {
    pub p1: f64,
    pub p2: f64,
    pub i1: f64,
    pub i2: f64,
}

impl Default for BranchFlow {
    fn default() -> Self {
        Self {
            p1: f64::NAN,
            p2: f64::NAN,
            i1: f64::NAN,
            i2: f64::NAN,
        }
    }
}

/// AC line or two-winding transformer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Branch {
    pub id: String,
    pub kind: BranchKind,
    pub terminal1: Terminal,
    pub terminal2: Terminal,
    /// Series resistance
    pub r: Ohms,
    /// Series reactance
    pub x: Ohms,
    #[serde(default)]
    pub phase_tap_changer: Option<PhaseTapChanger>,
    /// Current limits by name ("permanent_limit", temporary limit names), amperes
    #[serde(default)]
    pub current_limits: BTreeMap<String, f64>,
    #[serde(skip)]
    pub flow: BranchFlow,
}

impl Branch {
    pub fn line(
        id: impl Into<String>,
        terminal1: Terminal,
        terminal2: Terminal,
        r: Ohms,
        x: Ohms,
    ) -> Self {
        Self {
            id: id.into(),
            kind: BranchKind::Line,
            terminal1,
            terminal2,
            r,
            x,
            phase_tap_changer: None,
            current_limits: BTreeMap::new(),
            flow: BranchFlow::default(),
        }
    }

    pub fn transformer(
        id: impl Into<String>,
        terminal1: Terminal,
        terminal2: Terminal,
        r: Ohms,
        x: Ohms,
    ) -> Self {
        Self {
            kind: BranchKind::TwoWindingsTransformer,
            ..Self::line(id, terminal1, terminal2, r, x)
        }
    }

    pub fn with_phase_tap_changer(mut self, ptc: PhaseTapChanger) -> Self {
        self.phase_tap_changer = Some(ptc);
        self
    }

    pub fn with_limit(mut self, name: impl Into<String>, value: f64) -> Self {
        self.current_limits.insert(name.into(), value);
        self
    }

    pub fn is_connected(&self) -> bool {
        self.terminal1.connected && self.terminal2.connected
    }

    pub fn is_phase_shifter(&self) -> bool {
        self.phase_tap_changer.is_some()
    }

    /// Phase shift at the current tap, zero for branches without a tap changer.
    pub fn alpha(&self) -> Degrees {
        self.phase_tap_changer
            .as_ref()
            .and_then(|ptc| ptc.current_alpha())
            .unwrap_or(Degrees(0.0))
    }
}

/// Converter side of an HVDC line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Side {
    One,
    Two,
}

/// Which converter station rectifies; positive flow runs rectifier to inverter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConvertersMode {
    #[serde(rename = "SIDE_1_RECTIFIER_SIDE_2_INVERTER")]
    Side1RectifierSide2Inverter,
    #[serde(rename = "SIDE_1_INVERTER_SIDE_2_RECTIFIER")]
    Side1InverterSide2Rectifier,
}

impl ConvertersMode {
    pub fn rectifier_side(self) -> Side {
        match self {
            ConvertersMode::Side1RectifierSide2Inverter => Side::One,
            ConvertersMode::Side1InverterSide2Rectifier => Side::Two,
        }
    }

    pub fn inverter_side(self) -> Side {
        match self.rectifier_side() {
            Side::One => Side::Two,
            Side::Two => Side::One,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HvdcLine {
    pub id: String,
    pub converter_station1_id: String,
    pub converter_station2_id: String,
    pub converters_mode: ConvertersMode,
    /// Setpoint in MW, rectifier to inverter
    pub target_p: f64,
    pub max_p: f64,
    #[serde(default)]
    pub r: Ohms,
    pub nominal_v: Kilovolts,
}

impl HvdcLine {
    pub fn new(
        id: impl Into<String>,
        station1: impl Into<String>,
        station2: impl Into<String>,
        converters_mode: ConvertersMode,
    ) -> Self {
        Self {
            id: id.into(),
            converter_station1_id: station1.into(),
            converter_station2_id: station2.into(),
            converters_mode,
            target_p: 0.0,
            max_p: 0.0,
            r: Ohms(0.0),
            nominal_v: Kilovolts(320.0),
        }
    }

    pub fn with_target_p(mut self, target_p: f64) -> Self {
        self.target_p = target_p;
        self
    }

    pub fn with_max_p(mut self, max_p: f64) -> Self {
        self.max_p = max_p;
        self
    }

    pub fn station_id(&self, side: Side) -> &str {
        match side {
            Side::One => &self.converter_station1_id,
            Side::Two => &self.converter_station2_id,
        }
    }
}

/// VSC converter station; `p`/`q` follow the load convention (positive = drawn from the AC grid).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VscConverterStation {
    pub id: String,
    pub terminal: Terminal,
    #[serde(default)]
    pub loss_factor: f64,
    #[serde(default)]
    pub voltage_regulator_on: bool,
    #[serde(skip, default = "unsolved")]
    pub p: f64,
    #[serde(skip, default = "unsolved")]
    pub q: f64,
}

impl VscConverterStation {
    pub fn new(id: impl Into<String>, terminal: Terminal) -> Self {
        Self {
            id: id.into(),
            terminal,
            loss_factor: 0.0,
            voltage_regulator_on: false,
            p: f64::NAN,
            q: f64::NAN,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Generator {
    pub id: String,
    pub terminal: Terminal,
    pub target_p: f64,
    pub min_p: f64,
    pub max_p: f64,
    #[serde(default)]
    pub target_q: f64,
    #[serde(default)]
    pub voltage_regulator_on: bool,
    /// Created by the pipeline; never part of the physical dispatch.
    #[serde(default)]
    pub fictitious: bool,
    #[serde(skip, default = "unsolved")]
    pub p: f64,
}

impl Generator {
    pub fn new(id: impl Into<String>, terminal: Terminal) -> Self {
        Self {
            id: id.into(),
            terminal,
            target_p: 0.0,
            min_p: 0.0,
            max_p: 0.0,
            target_q: 0.0,
            voltage_regulator_on: false,
            fictitious: false,
            p: f64::NAN,
        }
    }

    /// Set active power limits (MW)
    pub fn with_p_limits(mut self, min_p: f64, max_p: f64) -> Self {
        self.min_p = min_p;
        self.max_p = max_p;
        self
    }

    pub fn with_target_p(mut self, target_p: f64) -> Self {
        self.target_p = target_p;
        self
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Load {
    pub id: String,
    pub terminal: Terminal,
    /// Active power demand (MW)
    pub p0: f64,
    #[serde(default)]
    pub q0: f64,
}

impl Load {
    pub fn new(id: impl Into<String>, terminal: Terminal, p0: f64) -> Self {
        Self {
            id: id.into(),
            terminal,
            p0,
            q0: 0.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Battery {
    pub id: String,
    pub terminal: Terminal,
    pub target_p: f64,
    #[serde(default)]
    pub min_p: f64,
    #[serde(default)]
    pub max_p: f64,
}
