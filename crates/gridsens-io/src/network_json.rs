//! Network model as JSON.

use std::fs::{self, File};
use std::io::BufWriter;
use std::path::Path;

use anyhow::{Context, Result};
use gridsens_core::Network;

pub fn load_network(path: &Path) -> Result<Network> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("reading network file '{}'", path.display()))?;
    let network: Network = serde_json::from_str(&content)
        .with_context(|| format!("parsing network JSON from '{}'", path.display()))?;
    Ok(network)
}

pub fn save_network(network: &Network, path: &Path) -> Result<()> {
    let file = File::create(path)
        .with_context(|| format!("creating network file '{}'", path.display()))?;
    serde_json::to_writer_pretty(BufWriter::new(file), network)
        .with_context(|| format!("writing network JSON to '{}'", path.display()))?;
    Ok(())
}

/// File name up to its first dot: `data/6_bus_system.v2.json` gives `6_bus_system`.
pub fn network_stem(path: &Path) -> String {
    path.file_name()
        .and_then(|name| name.to_str())
        .and_then(|name| name.split('.').next())
        .unwrap_or("network")
        .to_string()
}
