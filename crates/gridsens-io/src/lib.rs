//! # gridsens-io: inputs and outputs of a sensitivity run
//!
//! - [`inputs`]: the CSV lists a study is described by (monitored branches,
//!   contingencies, active HVDC lines and PSTs, redispatchable generators,
//!   slack bus, HVDC lever groups), gathered into a
//!   [`SensitivityInputs`](gridsens_algo::SensitivityInputs)
//! - [`network_json`]: network model load/save
//! - [`report`]: the JSON result payload, written next to the network
//!
//! ```rust,no_run
//! use gridsens_io::{load_network, InputFiles};
//!
//! fn main() -> anyhow::Result<()> {
//!     let network = load_network("data/6_bus_system.json".as_ref())?;
//!     let inputs = InputFiles::in_folder("data").load()?;
//!     println!("{} monitored branches on {}", inputs.monitored_branches.len(), network.id);
//!     Ok(())
//! }
//! ```

pub mod inputs;
pub mod network_json;
pub mod report;

pub use inputs::{
    read_active_hvdc_lines, read_active_psts, read_contingencies, read_lever_groups,
    read_monitored_branches, read_redispatchable_generators, read_slack_bus, InputFiles,
};
pub use network_json::{load_network, network_stem, save_network};
pub use report::{report_to_string, write_report};
