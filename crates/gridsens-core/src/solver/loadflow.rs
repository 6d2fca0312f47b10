//! Load-flow contract consumed by the sensitivity pipeline.

use serde::{Deserialize, Serialize};

use crate::error::GridResult;
use crate::network::Network;

/// Which connected components a load flow computes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ConnectedComponentMode {
    /// Only the component holding the most connection nodes
    #[default]
    Main,
    All,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoadFlowParameters {
    /// Spread the slack over generators in proportion to `max_p`
    pub distributed_slack: bool,
    /// Use the slack terminal extension when it is set
    pub read_slack_bus: bool,
    pub max_iterations: usize,
    pub connected_component_mode: ConnectedComponentMode,
}

impl Default for LoadFlowParameters {
    fn default() -> Self {
        Self {
            distributed_slack: false,
            read_slack_bus: true,
            max_iterations: 500,
            connected_component_mode: ConnectedComponentMode::Main,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ComponentStatus {
    Converged,
    Failed,
    MaxIterationReached,
    NoCalculation,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComponentResult {
    /// Index of the synchronous component, 0 is the one holding the slack of the main component
    pub component: usize,
    pub status: ComponentStatus,
    pub slack_node: Option<String>,
    /// Active power picked up by the slack (MW)
    pub slack_mismatch: f64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoadFlowResult {
    pub components: Vec<ComponentResult>,
}

impl LoadFlowResult {
    pub fn failed() -> Self {
        Self {
            components: vec![ComponentResult {
                component: 0,
                status: ComponentStatus::Failed,
                slack_node: None,
                slack_mismatch: 0.0,
            }],
        }
    }

    /// True when the first computed component converged.
    pub fn converged(&self) -> bool {
        self.components
            .iter()
            .find(|c| c.status != ComponentStatus::NoCalculation)
            .map(|c| c.status == ComponentStatus::Converged)
            .unwrap_or(false)
    }
}

/// Computes branch flows and converter powers in place.
pub trait PowerFlowSolver: Send + Sync {
    fn name(&self) -> &str;

    fn run(&self, network: &mut Network, params: &LoadFlowParameters) -> GridResult<LoadFlowResult>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn component(status: ComponentStatus) -> ComponentResult {
        ComponentResult {
            component: 0,
            status,
            slack_node: None,
            slack_mismatch: 0.0,
        }
    }

    #[test]
    fn test_converged_skips_uncalculated_components() {
        let result = LoadFlowResult {
            components: vec![
                component(ComponentStatus::NoCalculation),
                component(ComponentStatus::Converged),
            ],
        };
        assert!(result.converged());
        assert!(!LoadFlowResult::failed().converged());
        assert!(!LoadFlowResult::default().converged());
    }

    #[test]
    fn test_default_parameters() {
        let params = LoadFlowParameters::default();
        assert!(!params.distributed_slack);
        assert!(params.read_slack_bus);
        assert_eq!(params.connected_component_mode, ConnectedComponentMode::Main);
    }
}
