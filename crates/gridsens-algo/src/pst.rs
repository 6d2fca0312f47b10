//! Phase-shifting transformers as levers.

use std::collections::BTreeMap;

use gridsens_core::{Branch, GridError, GridResult, Network, PhaseTapChanger, RegulationMode};

use crate::hvdc::LeverBounds;

fn active_pst<'a>(network: &'a Network, id: &str) -> GridResult<&'a PhaseTapChanger> {
    network
        .branches
        .get(id)
        .and_then(|b: &Branch| b.phase_tap_changer.as_ref())
        .ok_or_else(|| GridError::Validation(format!("active PST '{id}' is not a phase shifter of the network")))
}

/// Freeze the active PSTs on their current tap.
pub fn fix_pst_taps(network: &mut Network, pst_ids: &[String]) -> GridResult<()> {
    for id in pst_ids {
        active_pst(network, id)?;
        if let Some(ptc) = network
            .branches
            .get_mut(id)
            .and_then(|b| b.phase_tap_changer.as_mut())
        {
            ptc.regulating = false;
            ptc.regulation_mode = RegulationMode::FixedTap;
            ptc.regulation_value = 0.0;
        }
    }
    Ok(())
}

/// Angle range (degrees) of each active PST: low tap, high tap and current tap.
pub fn pst_ranges(network: &Network, pst_ids: &[String]) -> GridResult<BTreeMap<String, LeverBounds>> {
    let mut ranges = BTreeMap::new();
    for id in pst_ids {
        let ptc = active_pst(network, id)?;
        let alpha = |tap: i32| {
            ptc.step(tap)
                .map(|s| s.alpha.value())
                .ok_or_else(|| GridError::Validation(format!("PST '{id}' has no step at tap {tap}")))
        };
        let low = alpha(ptc.low_tap)?;
        let high = alpha(ptc.high_tap())?;
        ranges.insert(
            id.clone(),
            LeverBounds {
                min: low.min(high),
                max: low.max(high),
                reference_setpoint: alpha(ptc.tap)?,
            },
        );
    }
    Ok(ranges)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{six_bus_network, PST};

    #[test]
    fn test_ranges_of_fixture_pst() {
        let network = six_bus_network();
        let ranges = pst_ranges(&network, &[PST.to_string()]).unwrap();
        assert_eq!(
            ranges[PST],
            LeverBounds {
                min: -10.0,
                max: 10.0,
                reference_setpoint: 0.0
            }
        );
    }

    #[test]
    fn test_inverted_table_is_swapped() {
        let mut network = six_bus_network();
        let ptc = network
            .branches
            .get_mut(PST)
            .and_then(|b| b.phase_tap_changer.as_mut())
            .unwrap();
        ptc.steps.reverse();
        ptc.tap = 12;
        let range = pst_ranges(&network, &[PST.to_string()]).unwrap()[PST];
        assert_eq!((range.min, range.max), (-10.0, 10.0));
        assert_eq!(range.reference_setpoint, -2.0);
    }

    #[test]
    fn test_fix_taps_stops_regulation() {
        let mut network = six_bus_network();
        {
            let ptc = network
                .branches
                .get_mut(PST)
                .and_then(|b| b.phase_tap_changer.as_mut())
                .unwrap();
            ptc.regulating = true;
            ptc.regulation_mode = RegulationMode::ActivePowerControl;
            ptc.regulation_value = 250.0;
        }
        fix_pst_taps(&mut network, &[PST.to_string()]).unwrap();
        let ptc = network.branches[PST].phase_tap_changer.as_ref().unwrap();
        assert!(!ptc.regulating);
        assert_eq!(ptc.regulation_mode, RegulationMode::FixedTap);
        assert_eq!(ptc.regulation_value, 0.0);
    }

    #[test]
    fn test_unknown_pst_is_validation_error() {
        let mut network = six_bus_network();
        assert!(matches!(
            fix_pst_taps(&mut network, &["AJAXL71HADES_ACLS".to_string()]),
            Err(GridError::Validation(_))
        ));
        assert!(matches!(
            pst_ranges(&network, &["NOPE".to_string()]),
            Err(GridError::Validation(_))
        ));
    }
}
