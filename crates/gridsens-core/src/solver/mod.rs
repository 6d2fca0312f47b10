//! Solver contracts and dense linear backends.
//!
//! [`PowerFlowSolver`] and [`SensitivitySolver`] are the two seams the
//! pipeline calls through; `gridsens-algo` ships a DC implementation of both.

pub mod backend;
pub mod loadflow;
pub mod registry;
pub mod sensitivity;

pub use backend::{FaerSolver, GaussSolver, LinearSystemBackend};
pub use loadflow::{
    ComponentResult, ComponentStatus, ConnectedComponentMode, LoadFlowParameters, LoadFlowResult,
    PowerFlowSolver,
};
pub use registry::SolverKind;
pub use sensitivity::{
    SensitivityFactorMatrix, SensitivityFunctionType, SensitivityMatrix, SensitivityResult,
    SensitivitySolver, SensitivityVariableType,
};
