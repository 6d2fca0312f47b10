//! Connectivity analysis over connection nodes (buses and busbar sections).
//!
//! Two notions of connectivity matter for a DC study:
//!
//! - *connected* components join nodes through AC branches and any connected
//!   HVDC line; the load flow computes only the main one;
//! - *synchronous* components join nodes through AC branches and HVDC lines in
//!   angle-droop emulation only. Each synchronous component has its own slack.

use petgraph::graph::{NodeIndex, UnGraph};
use petgraph::visit::Bfs;
use std::collections::{BTreeSet, HashMap};

use crate::extensions::HvdcMode;
use crate::solver::ConnectedComponentMode;
use crate::Network;

/// Edge payload: the element joining two connection nodes.
#[derive(Debug, Clone, PartialEq)]
pub enum Link {
    Branch(String),
    Hvdc(String),
}

/// Which HVDC lines become graph edges.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HvdcLinks {
    None,
    /// Only lines whose angle droop is enabled
    Emulated,
    All,
}

pub struct TopologyGraph {
    pub graph: UnGraph<String, Link>,
    index: HashMap<String, NodeIndex>,
}

impl TopologyGraph {
    pub fn build(network: &Network, hvdc_links: HvdcLinks) -> Self {
        let mut graph = UnGraph::new_undirected();
        let mut index = HashMap::new();
        for id in network.buses.keys().chain(network.busbar_sections.keys()) {
            index.insert(id.clone(), graph.add_node(id.clone()));
        }

        for branch in network.branches.values().filter(|b| b.is_connected()) {
            if let (Some(&a), Some(&b)) = (
                index.get(&branch.terminal1.node),
                index.get(&branch.terminal2.node),
            ) {
                graph.add_edge(a, b, Link::Branch(branch.id.clone()));
            }
        }

        if hvdc_links != HvdcLinks::None {
            for hvdc_id in network.hvdc_lines.keys() {
                let Ok(terminals) = network.hvdc_terminals(hvdc_id) else {
                    continue;
                };
                if !terminals.both_connected() {
                    continue;
                }
                let emulated = network
                    .hvdc_mode(hvdc_id)
                    .map(|m| m.is_emulated())
                    .unwrap_or(false);
                if hvdc_links == HvdcLinks::Emulated && !emulated {
                    continue;
                }
                if let (Some(&a), Some(&b)) = (
                    index.get(&terminals.side1.node),
                    index.get(&terminals.side2.node),
                ) {
                    graph.add_edge(a, b, Link::Hvdc(hvdc_id.clone()));
                }
            }
        }

        Self { graph, index }
    }

    pub fn node(&self, id: &str) -> Option<NodeIndex> {
        self.index.get(id).copied()
    }

    /// Components as sorted id sets, largest first (ties broken by smallest id).
    pub fn components(&self) -> Vec<BTreeSet<String>> {
        let mut seen = vec![false; self.graph.node_count()];
        let mut components = Vec::new();
        for start in self.graph.node_indices() {
            if seen[start.index()] {
                continue;
            }
            let mut members = BTreeSet::new();
            let mut bfs = Bfs::new(&self.graph, start);
            while let Some(node) = bfs.next(&self.graph) {
                seen[node.index()] = true;
                members.insert(self.graph[node].clone());
            }
            components.push(members);
        }
        components.sort_by(|a, b| {
            b.len()
                .cmp(&a.len())
                .then_with(|| a.iter().next().cmp(&b.iter().next()))
        });
        components
    }
}

/// Partition of the nodes a load flow computes.
#[derive(Debug, Clone, Default)]
pub struct ElectricalIslands {
    /// Synchronous components of the computed area, largest first
    pub synchronous: Vec<BTreeSet<String>>,
    /// Nodes left out of the computation
    pub outside: BTreeSet<String>,
}

impl ElectricalIslands {
    pub fn analyse(network: &Network, mode: ConnectedComponentMode) -> Self {
        let connected = TopologyGraph::build(network, HvdcLinks::All).components();
        let (computed, outside): (BTreeSet<String>, BTreeSet<String>) = match mode {
            ConnectedComponentMode::All => (connected.into_iter().flatten().collect(), BTreeSet::new()),
            ConnectedComponentMode::Main => {
                let mut iter = connected.into_iter();
                let main = iter.next().unwrap_or_default();
                (main, iter.flatten().collect())
            }
        };

        let synchronous = TopologyGraph::build(network, HvdcLinks::Emulated)
            .components()
            .into_iter()
            .filter(|c| c.iter().next().map_or(false, |id| computed.contains(id)))
            .collect();

        Self {
            synchronous,
            outside,
        }
    }

    /// Index of the synchronous component holding `node`.
    pub fn component_of(&self, node: &str) -> Option<usize> {
        self.synchronous.iter().position(|c| c.contains(node))
    }
}

/// True when the HVDC line is emulating an AC link.
pub fn is_emulated(network: &Network, hvdc_id: &str) -> bool {
    matches!(
        network.hvdc_mode(hvdc_id),
        Ok(HvdcMode::DroopEmulation { .. })
    )
}
