//! Linearised (DC) implementations of the power-flow and sensitivity contracts.
//!
//! - [`DcPowerFlow`] writes branch flows, currents and converter powers back
//!   into the network.
//! - [`DcSensitivityAnalysis`] computes factor matrices from the PTDF of the
//!   same model, so predicted deltas match re-solved flows exactly.
//!
//! Both pick the linear backend through [`SolverKind`](gridsens_core::SolverKind).

mod model;
pub mod power_flow;
pub mod sensitivity;
pub mod susceptance;

use gridsens_core::{GridError, NetworkError};
use thiserror::Error;

pub use power_flow::DcPowerFlow;
pub use sensitivity::DcSensitivityAnalysis;
pub use susceptance::{SusceptanceError, SusceptanceMatrix};

#[derive(Debug, Error)]
pub enum DcSolveError {
    #[error("susceptance matrix error: {0}")]
    Susceptance(#[from] SusceptanceError),

    #[error("network error: {0}")]
    Network(#[from] NetworkError),

    #[error("branch {0} has zero reactance")]
    ZeroReactance(String),

    #[error("singular susceptance matrix: {0}")]
    Singular(String),

    #[error("unknown element {0}")]
    UnknownElement(String),

    #[error("{0} is neither a generator, a battery nor a phase shifter")]
    UnsupportedVariable(String),
}

impl From<DcSolveError> for GridError {
    fn from(err: DcSolveError) -> Self {
        match err {
            DcSolveError::Network(inner) => inner.into(),
            DcSolveError::UnknownElement(_) | DcSolveError::UnsupportedVariable(_) => {
                GridError::Validation(err.to_string())
            }
            other => GridError::Solver(other.to_string()),
        }
    }
}
