//! Current limits of the monitored branches.

use std::collections::{BTreeMap, BTreeSet};

use gridsens_core::{Diagnostics, Network};
use tracing::warn;

pub const PERMANENT_LIMIT: &str = "permanent_limit";

/// Permanent limit assumed when a branch declares none (A); only compared, never reported.
pub const DEFAULT_PERMANENT_LIMIT: f64 = 10000.0;

/// Limits per monitored branch, `branch -> limit name -> A`.
pub type BranchLimits = BTreeMap<String, BTreeMap<String, f64>>;

/// Collect the current limits of the monitored branches.
///
/// A permanent limit (declared, or the default when absent) above the smallest
/// other declared limit is written as that minimum.
/// Branches without any limit are reported and left out.
pub fn branch_limits(
    network: &Network,
    monitored: &BTreeSet<String>,
    diagnostics: &mut Diagnostics,
) -> BranchLimits {
    let mut quads = BTreeMap::new();
    for id in monitored {
        let Some(branch) = network.branches.get(id) else {
            continue;
        };
        if branch.current_limits.is_empty() {
            diagnostics.add_warning_with_entity("limits", "branch has no current limits", id);
            continue;
        }
        let mut limits = branch.current_limits.clone();
        let minimum = limits
            .iter()
            .filter(|(name, _)| name.as_str() != PERMANENT_LIMIT)
            .map(|(_, v)| *v)
            .fold(f64::INFINITY, f64::min);
        let permanent = limits
            .get(PERMANENT_LIMIT)
            .copied()
            .unwrap_or(DEFAULT_PERMANENT_LIMIT);
        if permanent > minimum {
            warn!(branch = %id, permanent, minimum, "permanent limit above temporary limit");
            diagnostics.add_warning_with_entity(
                "limits",
                &format!("permanent limit {} lowered to {}", permanent, minimum),
                id,
            );
            limits.insert(PERMANENT_LIMIT.to_string(), minimum);
        }
        quads.insert(id.clone(), limits);
    }
    let missing = monitored.len() - quads.len();
    if missing > 0 {
        warn!(missing, "monitored branches without limits");
    }
    quads
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{six_bus_network, PST};

    fn set(ids: &[&str]) -> BTreeSet<String> {
        ids.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_consistent_limits_are_kept() {
        let network = six_bus_network();
        let mut diagnostics = Diagnostics::new();
        let quads = branch_limits(&network, &set(&["AJAXL71HADES_ACLS", PST]), &mut diagnostics);
        assert_eq!(quads["AJAXL71HADES_ACLS"]["permanent_limit"], 2000.0);
        assert_eq!(quads["AJAXL71HADES_ACLS"]["IST"], 2500.0);
        assert_eq!(quads[PST].len(), 1);
        assert!(diagnostics.is_empty());
    }

    #[test]
    fn test_permanent_limit_lowered_to_minimum() {
        let mut network = six_bus_network();
        let limits = &mut network.branches.get_mut("AJAXL71HADES_ACLS").unwrap().current_limits;
        limits.insert("IT20".into(), 1800.0);
        limits.remove("permanent_limit");
        let mut diagnostics = Diagnostics::new();
        let quads = branch_limits(&network, &set(&["AJAXL71HADES_ACLS"]), &mut diagnostics);
        assert_eq!(quads["AJAXL71HADES_ACLS"]["permanent_limit"], 1800.0);
        assert_eq!(diagnostics.warning_count(), 1);
    }

    #[test]
    fn test_missing_permanent_limit_stays_absent_when_consistent() {
        let mut network = six_bus_network();
        let limits = &mut network.branches.get_mut("AJAXL71HADES_ACLS").unwrap().current_limits;
        limits.clear();
        limits.insert("IT20".into(), 12000.0);
        let mut diagnostics = Diagnostics::new();
        let quads = branch_limits(&network, &set(&["AJAXL71HADES_ACLS"]), &mut diagnostics);
        assert_eq!(quads["AJAXL71HADES_ACLS"].len(), 1);
        assert_eq!(quads["AJAXL71HADES_ACLS"]["IT20"], 12000.0);
        assert!(!quads["AJAXL71HADES_ACLS"].contains_key(PERMANENT_LIMIT));
        assert!(diagnostics.is_empty());
    }

    #[test]
    fn test_branch_without_limits_is_reported() {
        let mut network = six_bus_network();
        network
            .branches
            .get_mut("ATHENL71HERA_ACLS")
            .unwrap()
            .current_limits
            .clear();
        let mut diagnostics = Diagnostics::new();
        let quads = branch_limits(&network, &set(&["ATHENL71HERA_ACLS"]), &mut diagnostics);
        assert!(quads.is_empty());
        assert_eq!(diagnostics.warning_count(), 1);
    }
}
