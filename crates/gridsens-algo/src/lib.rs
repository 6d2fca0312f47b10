//! # gridsens-algo: Cross-border sensitivity pipeline
//!
//! Computes how the current on monitored branches, and the flow on emulated
//! HVDC lines, reacts to each lever of a two-country border: redispatchable
//! generators, HVDC setpoints (merged per parallel circuit group), PST taps and
//! a counter-trading pool. Sensitivities are computed for the base case "N"
//! and for every single-element contingency.
//!
//! ## Stages
//!
//! | Stage | Module |
//! |-------|--------|
//! | Remove losses, floor reactances, disconnect batteries | [`conditioning`] |
//! | HVDC in AC emulation → setpoint + equivalent AC line | [`hvdc::emulation`] |
//! | Border countries and exchange split (AC / HVDC) | [`exchange`] |
//! | HVDC levers, merged bounds, fictitious terminal generators | [`hvdc::levers`] |
//! | PST angle ranges, counter-trading keys, limits, slack bus | [`pst`], [`counter_trading`], [`limits`], [`slack`] |
//! | Case loop with retry on divergence | [`contingency`] |
//! | Folding raw matrices into per-lever tables | [`sensitivity`] |
//! | Driver | [`pipeline`] |
//!
//! The solvers are reached through the `PowerFlowSolver` and
//! `SensitivitySolver` contracts of `gridsens-core`; [`dc`] provides a
//! linearised implementation of both.
//!
//! ## Example
//!
//! ```ignore
//! use gridsens_algo::{SensitivityInputs, SensitivityPipeline};
//! use gridsens_core::{LoadFlowParameters, SolverKind};
//!
//! let pipeline = SensitivityPipeline::dc(SolverKind::Faer, LoadFlowParameters::default());
//! let output = pipeline.run(network, &inputs)?;
//! println!("exchange: {:.1} MW", output.report.situation_description.total_exchange);
//! ```

pub mod conditioning;
pub mod contingency;
pub mod counter_trading;
pub mod dc;
pub mod exchange;
pub mod hvdc;
pub mod limits;
pub mod output;
pub mod pipeline;
pub mod pst;
pub mod sensitivity;
pub mod slack;
pub mod test_utils;

pub use conditioning::{NetworkConditioner, MIN_IMPEDANCE};
pub use contingency::{
    build_cases, Case, CaseStatus, ContingencyOrchestrator, ContingencySpec, ElementKind,
    OutageProtocol, OutageState, BASE_CASE,
};
pub use counter_trading::{proportional_redispatch_keys, COUNTER_TRADING_KEY};
pub use dc::{DcPowerFlow, DcSensitivityAnalysis};
pub use exchange::{compute_exchange, sign_exchange, Exchange, SignedHvdc};
pub use hvdc::{LeverBounds, LeverGroup};
pub use output::{output_file_name, SensitivityReport};
pub use pipeline::{PipelineOutput, SensitivityInputs, SensitivityPipeline, SlackBus};
pub use sensitivity::{round_sensitivity, SensitivityTable, REFERENCE_KEY};
