//! Contingency cases: the base case "N" plus single-element outages.
//!
//! Each case is solved on its own [`WorkingVariant`](gridsens_core::WorkingVariant)
//! so an outage never reaches the baseline or the next case. Outages of an
//! HVDC line converted to AC emulation open its equivalent AC line with it.

pub mod orchestrator;
pub mod retry;

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::warn;

use gridsens_core::{BranchKind, GridError, GridResult, Network};

use crate::hvdc::equivalent_line_id;

pub use orchestrator::{CaseRequest, ContingencyOrchestrator, OrchestratorReport, SolvedCase};
pub use retry::{CaseStatus, OutageProtocol, OutageState};

/// Id of the case without outage.
pub const BASE_CASE: &str = "N";

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ElementKind {
    AcLine,
    Transformer,
    HvdcLine,
}

impl ElementKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ElementKind::AcLine => "ac_line",
            ElementKind::Transformer => "transformer",
            ElementKind::HvdcLine => "hvdc_line",
        }
    }
}

impl fmt::Display for ElementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ElementKind {
    type Err = GridError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "ac_line" => Ok(ElementKind::AcLine),
            "transformer" => Ok(ElementKind::Transformer),
            "hvdc_line" => Ok(ElementKind::HvdcLine),
            other => Err(GridError::Validation(format!(
                "unknown contingency element type '{other}' (expected ac_line, transformer or hvdc_line)"
            ))),
        }
    }
}

/// One row of the contingency list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContingencySpec {
    pub element_id: String,
    pub kind: ElementKind,
}

impl ContingencySpec {
    pub fn new(element_id: impl Into<String>, kind: ElementKind) -> Self {
        Self {
            element_id: element_id.into(),
            kind,
        }
    }
}

/// A case to solve; `kind` is `None` for the base case.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Case {
    pub id: String,
    pub kind: Option<ElementKind>,
}

impl Case {
    pub fn base() -> Self {
        Self {
            id: BASE_CASE.to_string(),
            kind: None,
        }
    }

    pub fn outage(element_id: impl Into<String>, kind: ElementKind) -> Self {
        Self {
            id: element_id.into(),
            kind: Some(kind),
        }
    }

    pub fn is_base(&self) -> bool {
        self.kind.is_none()
    }
}

fn exists(network: &Network, spec: &ContingencySpec) -> bool {
    match spec.kind {
        ElementKind::AcLine => network
            .branches
            .get(&spec.element_id)
            .is_some_and(|b| b.kind == BranchKind::Line),
        ElementKind::Transformer => network
            .branches
            .get(&spec.element_id)
            .is_some_and(|b| b.kind == BranchKind::TwoWindingsTransformer),
        ElementKind::HvdcLine => network.hvdc_lines.contains_key(&spec.element_id),
    }
}

/// Ordered case list: "N", then AC lines, HVDC lines and transformers, each in id order.
///
/// Contingencies naming an element the network does not hold (or holds with
/// another kind) are dropped with a warning.
pub fn build_cases(network: &Network, contingencies: &[ContingencySpec]) -> Vec<Case> {
    let mut cases = vec![Case::base()];
    for kind in [ElementKind::AcLine, ElementKind::HvdcLine, ElementKind::Transformer] {
        let ids: BTreeSet<&str> = contingencies
            .iter()
            .filter(|spec| spec.kind == kind)
            .filter(|spec| {
                let found = exists(network, spec);
                if !found {
                    warn!(element = %spec.element_id, kind = %kind, "contingency element not in network");
                }
                found
            })
            .map(|spec| spec.element_id.as_str())
            .collect();
        cases.extend(ids.into_iter().map(|id| Case::outage(id, kind)));
    }
    cases
}

/// Open (`connected = false`) or close the element of `case`.
///
/// `equivalent_hvdcs` lists the HVDC lines with an equivalent AC line; both
/// switch together.
pub fn apply_outage(
    network: &mut Network,
    case: &Case,
    equivalent_hvdcs: &BTreeSet<String>,
    connected: bool,
) -> GridResult<()> {
    match case.kind {
        None => {}
        Some(ElementKind::AcLine) | Some(ElementKind::Transformer) => {
            network.set_branch_connected(&case.id, connected)?;
        }
        Some(ElementKind::HvdcLine) => {
            network.set_hvdc_connected(&case.id, connected)?;
            if equivalent_hvdcs.contains(&case.id) {
                network.set_branch_connected(&equivalent_line_id(&case.id), connected)?;
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hvdc::build_equivalent_lines;
    use crate::test_utils::{six_bus_network, HVDC_1, HVDC_2, PST};

    #[test]
    fn test_kind_parsing() {
        assert_eq!("ac_line".parse::<ElementKind>().unwrap(), ElementKind::AcLine);
        assert_eq!(" hvdc_line".parse::<ElementKind>().unwrap(), ElementKind::HvdcLine);
        assert!(matches!(
            "generator".parse::<ElementKind>(),
            Err(GridError::Validation(_))
        ));
    }

    #[test]
    fn test_cases_are_ordered_and_filtered() {
        let network = six_bus_network();
        let specs = vec![
            ContingencySpec::new(PST, ElementKind::Transformer),
            ContingencySpec::new(HVDC_2, ElementKind::HvdcLine),
            ContingencySpec::new("ZEUSL62ULYSS_ACLS", ElementKind::AcLine),
            ContingencySpec::new("ZEUSL61ULYSS_ACLS", ElementKind::AcLine),
            ContingencySpec::new("ZEUSL61ULYSS_ACLS", ElementKind::AcLine),
            ContingencySpec::new("MISSING", ElementKind::AcLine),
            ContingencySpec::new("ZEUSL61ULYSS_ACLS", ElementKind::Transformer),
        ];
        let ids: Vec<String> = build_cases(&network, &specs).into_iter().map(|c| c.id).collect();
        assert_eq!(
            ids,
            vec!["N", "ZEUSL61ULYSS_ACLS", "ZEUSL62ULYSS_ACLS", HVDC_2, PST]
        );
    }

    #[test]
    fn test_hvdc_outage_opens_equivalent_line() {
        let mut network = six_bus_network();
        let converted =
            build_equivalent_lines(&mut network, &[HVDC_1.to_string(), HVDC_2.to_string()]).unwrap();
        let case = Case::outage(HVDC_1, ElementKind::HvdcLine);

        apply_outage(&mut network, &case, &converted, false).unwrap();
        assert!(!network.hvdc_terminals(HVDC_1).unwrap().both_connected());
        assert!(!network.branches[&equivalent_line_id(HVDC_1)].is_connected());
        assert!(network.branches[&equivalent_line_id(HVDC_2)].is_connected());

        apply_outage(&mut network, &case, &converted, true).unwrap();
        assert!(network.hvdc_terminals(HVDC_1).unwrap().both_connected());
        assert!(network.branches[&equivalent_line_id(HVDC_1)].is_connected());
    }
}
