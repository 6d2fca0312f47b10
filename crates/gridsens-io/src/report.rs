//! Result payload writer.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Serialize;
use serde_json::ser::PrettyFormatter;

use gridsens_algo::{output_file_name, SensitivityReport};

/// Payload as JSON text, 4-space indented with sorted keys.
pub fn report_to_string(report: &SensitivityReport) -> Result<String> {
    // going through Value sorts every object by key
    let value = serde_json::to_value(report).context("converting report to JSON")?;
    let mut buffer = Vec::new();
    let mut serializer =
        serde_json::Serializer::with_formatter(&mut buffer, PrettyFormatter::with_indent(b"    "));
    value
        .serialize(&mut serializer)
        .context("serialising report")?;
    String::from_utf8(buffer).context("report is not UTF-8")
}

/// Write the payload to `{folder}/{stem}_{round(total)}{setpoint|ac_emulation}.json`.
pub fn write_report(
    report: &SensitivityReport,
    folder: &Path,
    network_stem: &str,
    ac_emulation: bool,
) -> Result<PathBuf> {
    let name = output_file_name(
        network_stem,
        report.situation_description.total_exchange,
        ac_emulation,
    );
    let path = folder.join(name);
    let text = report_to_string(report)?;
    fs::write(&path, text).with_context(|| format!("writing report to '{}'", path.display()))?;
    Ok(path)
}
