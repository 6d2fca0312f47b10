//! Slack bus designation.

use gridsens_core::{GridResult, Load, Network, SlackTerminal};
use tracing::info;

use crate::hvdc::{resolve_attachment, Attachment};

pub fn slack_load_id(bus_id: &str) -> String {
    format!("{bus_id}_slack_load")
}

/// Make `bus_id` the angle reference through a zero load registered as slack terminal.
///
/// Any previous slack terminal is dropped. On node-breaker voltage levels the
/// load goes to the first busbar section. Returns the id of the slack load.
pub fn define_slack_bus(network: &mut Network, voltage_level_id: &str, bus_id: &str) -> GridResult<String> {
    network.extensions.slack_terminal = None;

    let attachment = resolve_attachment(network, voltage_level_id, bus_id)?;
    let id = slack_load_id(bus_id);
    if !network.loads.contains_key(&id) {
        let load = Load::new(&id, attachment.terminal(), 0.0);
        match &attachment {
            Attachment::Bus { .. } => network.create_load(load)?,
            Attachment::BusbarSection { section, .. } => network.create_load_bay(load, section)?,
        }
    }
    network.set_slack_terminal(SlackTerminal {
        voltage_level_id: voltage_level_id.to_string(),
        element_id: id.clone(),
    })?;
    info!(voltage_level = %voltage_level_id, bus = %bus_id, load = %id, "slack bus defined");
    Ok(id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dc::DcPowerFlow;
    use crate::test_utils::six_bus_network;
    use gridsens_core::{GridError, LoadFlowParameters, PowerFlowSolver};

    #[test]
    fn test_slack_load_becomes_reference() {
        let mut network = six_bus_network();
        network.extensions.slack_terminal = Some(SlackTerminal {
            voltage_level_id: "ZEUS7".into(),
            element_id: "ZEUS7G1_NGU_SM".into(),
        });
        let id = define_slack_bus(&mut network, "ATHEN7", "ATHEN7_0").unwrap();
        assert_eq!(id, "ATHEN7_0_slack_load");
        assert_eq!(network.loads[&id].p0, 0.0);
        assert_eq!(
            network.extensions.slack_terminal,
            Some(SlackTerminal {
                voltage_level_id: "ATHEN7".into(),
                element_id: id,
            })
        );

        let result = DcPowerFlow::default()
            .run(&mut network, &LoadFlowParameters::default())
            .unwrap();
        assert_eq!(result.components[0].slack_node.as_deref(), Some("ATHEN7_0"));
    }

    #[test]
    fn test_unknown_bus_is_topology_error() {
        let mut network = six_bus_network();
        assert!(matches!(
            define_slack_bus(&mut network, "ATHEN7", "HERA7_0"),
            Err(GridError::Topology(_))
        ));
    }
}
