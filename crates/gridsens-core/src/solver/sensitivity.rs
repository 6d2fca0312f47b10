//! Sensitivity analysis contract: named factor matrices in, value matrices out.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::loadflow::LoadFlowParameters;
use crate::error::{GridError, GridResult};
use crate::network::Network;

/// Monitored quantity on each function branch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SensitivityFunctionType {
    /// Active power at side 1 (MW)
    BranchActivePower1,
    /// Current at side 1 (A), signed like the active power
    BranchCurrent1,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SensitivityVariableType {
    /// Generators are injections, phase shifters are phase variables
    AutoDetect,
    InjectionActivePower,
    /// Per degree of phase shift
    TransformerPhase,
}

/// A request for `d function / d variable` over all pairs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SensitivityFactorMatrix {
    pub name: String,
    pub function_ids: Vec<String>,
    pub variable_ids: Vec<String>,
    pub function_type: SensitivityFunctionType,
    pub variable_type: SensitivityVariableType,
}

impl SensitivityFactorMatrix {
    pub fn branch_current(
        name: impl Into<String>,
        function_ids: Vec<String>,
        variable_ids: Vec<String>,
    ) -> Self {
        Self {
            name: name.into(),
            function_ids,
            variable_ids,
            function_type: SensitivityFunctionType::BranchCurrent1,
            variable_type: SensitivityVariableType::AutoDetect,
        }
    }
}

/// Values of one factor matrix; `values[variable][function]`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SensitivityMatrix {
    pub function_ids: Vec<String>,
    pub variable_ids: Vec<String>,
    pub values: Vec<Vec<f64>>,
    /// Base-case value of each function (NaN when not computed)
    pub reference_values: Vec<f64>,
}

impl SensitivityMatrix {
    pub fn value(&self, variable_id: &str, function_id: &str) -> Option<f64> {
        let v = self.variable_ids.iter().position(|id| id == variable_id)?;
        let f = self.function_ids.iter().position(|id| id == function_id)?;
        Some(self.values[v][f])
    }

    pub fn row(&self, variable_id: &str) -> Option<&[f64]> {
        let v = self.variable_ids.iter().position(|id| id == variable_id)?;
        Some(&self.values[v])
    }

    pub fn reference_value(&self, function_id: &str) -> Option<f64> {
        let f = self.function_ids.iter().position(|id| id == function_id)?;
        Some(self.reference_values[f])
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SensitivityResult {
    pub matrices: BTreeMap<String, SensitivityMatrix>,
}

impl SensitivityResult {
    pub fn matrix(&self, name: &str) -> GridResult<&SensitivityMatrix> {
        self.matrices
            .get(name)
            .ok_or_else(|| GridError::Solver(format!("sensitivity matrix '{}' missing", name)))
    }
}

pub trait SensitivitySolver: Send + Sync {
    fn name(&self) -> &str;

    fn run(
        &self,
        network: &Network,
        factors: &[SensitivityFactorMatrix],
        params: &LoadFlowParameters,
    ) -> GridResult<SensitivityResult>;
}
