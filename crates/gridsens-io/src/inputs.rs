//! CSV study inputs.
//!
//! Every file has a header row. Expected columns:
//!
//! | file | columns |
//! |------|---------|
//! | `monitored_branches.csv` | `branch_id` |
//! | `contingencies.csv` | `element_id`, `element_type` (`ac_line`, `transformer`, `hvdc_line`) |
//! | `active_hvdc_lines.csv` | `hvdc_line_id` |
//! | `active_psts.csv` | `pst_id` |
//! | `redispatchable_generators.csv` | `generator_id` |
//! | `slack_bus.csv` | `voltage_level_id`, `bus_id` (first row used) |
//! | `hvdc_lever_groups.csv` | `lever_id`, `hvdc_line_id` |
//!
//! Extra columns are ignored.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use csv::ReaderBuilder;
use serde::de::DeserializeOwned;
use serde::Deserialize;

use gridsens_algo::{ContingencySpec, ElementKind, LeverGroup, SensitivityInputs, SlackBus};

pub const MONITORED_BRANCHES_FILE: &str = "monitored_branches.csv";
pub const CONTINGENCIES_FILE: &str = "contingencies.csv";
pub const ACTIVE_HVDC_LINES_FILE: &str = "active_hvdc_lines.csv";
pub const ACTIVE_PSTS_FILE: &str = "active_psts.csv";
pub const SLACK_BUS_FILE: &str = "slack_bus.csv";
pub const REDISPATCHABLE_GENERATORS_FILE: &str = "redispatchable_generators.csv";
pub const LEVER_GROUPS_FILE: &str = "hvdc_lever_groups.csv";

#[derive(Debug, Deserialize)]
struct BranchRecord {
    branch_id: String,
}

#[derive(Debug, Deserialize)]
struct ContingencyRecord {
    element_id: String,
    element_type: String,
}

#[derive(Debug, Deserialize)]
struct HvdcLineRecord {
    hvdc_line_id: String,
}

#[derive(Debug, Deserialize)]
struct PstRecord {
    pst_id: String,
}

#[derive(Debug, Deserialize)]
struct GeneratorRecord {
    generator_id: String,
}

#[derive(Debug, Deserialize)]
struct SlackBusRecord {
    voltage_level_id: String,
    bus_id: String,
}

#[derive(Debug, Deserialize)]
struct LeverGroupRecord {
    lever_id: String,
    hvdc_line_id: String,
}

fn read_records<R: DeserializeOwned>(path: &Path, what: &str) -> Result<Vec<R>> {
    let mut rdr = ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_path(path)
        .with_context(|| format!("opening {what} CSV '{}'", path.display()))?;
    let mut records = Vec::new();
    for result in rdr.deserialize() {
        let record: R =
            result.with_context(|| format!("parsing {what} record in '{}'", path.display()))?;
        records.push(record);
    }
    Ok(records)
}

pub fn read_monitored_branches(path: &Path) -> Result<Vec<String>> {
    Ok(read_records::<BranchRecord>(path, "monitored branches")?
        .into_iter()
        .map(|r| r.branch_id)
        .collect())
}

/// Contingency list; an unknown `element_type` fails the whole file.
pub fn read_contingencies(path: &Path) -> Result<Vec<ContingencySpec>> {
    read_records::<ContingencyRecord>(path, "contingencies")?
        .into_iter()
        .map(|r| {
            let kind: ElementKind = r
                .element_type
                .parse()
                .with_context(|| format!("contingency '{}' in '{}'", r.element_id, path.display()))?;
            Ok(ContingencySpec::new(r.element_id, kind))
        })
        .collect()
}

pub fn read_active_hvdc_lines(path: &Path) -> Result<Vec<String>> {
    Ok(read_records::<HvdcLineRecord>(path, "active HVDC lines")?
        .into_iter()
        .map(|r| r.hvdc_line_id)
        .collect())
}

pub fn read_active_psts(path: &Path) -> Result<Vec<String>> {
    Ok(read_records::<PstRecord>(path, "active PSTs")?
        .into_iter()
        .map(|r| r.pst_id)
        .collect())
}

pub fn read_redispatchable_generators(path: &Path) -> Result<Vec<String>> {
    Ok(read_records::<GeneratorRecord>(path, "redispatchable generators")?
        .into_iter()
        .map(|r| r.generator_id)
        .collect())
}

/// First row of the slack bus file; `None` when the file has no data row.
pub fn read_slack_bus(path: &Path) -> Result<Option<SlackBus>> {
    Ok(read_records::<SlackBusRecord>(path, "slack bus")?
        .into_iter()
        .next()
        .map(|r| SlackBus {
            voltage_level_id: r.voltage_level_id,
            bus_id: r.bus_id,
        }))
}

/// Lever groups in order of first appearance; members keep file order.
pub fn read_lever_groups(path: &Path) -> Result<Vec<LeverGroup>> {
    let mut groups: Vec<LeverGroup> = Vec::new();
    for record in read_records::<LeverGroupRecord>(path, "HVDC lever groups")? {
        match groups.iter_mut().find(|g| g.id == record.lever_id) {
            Some(group) => {
                if !group.members.contains(&record.hvdc_line_id) {
                    group.members.push(record.hvdc_line_id);
                }
            }
            None => groups.push(LeverGroup {
                id: record.lever_id,
                members: vec![record.hvdc_line_id],
            }),
        }
    }
    Ok(groups)
}

/// Locations of the study CSV files.
///
/// Monitored branches, contingencies and active HVDC lines are required; the
/// other files are read only when they exist.
#[derive(Debug, Clone)]
pub struct InputFiles {
    pub monitored_branches: PathBuf,
    pub contingencies: PathBuf,
    pub active_hvdc_lines: PathBuf,
    pub active_psts: PathBuf,
    pub slack_bus: PathBuf,
    pub redispatchable_generators: PathBuf,
    pub lever_groups: PathBuf,
}

impl InputFiles {
    /// Conventional file names inside `folder`.
    pub fn in_folder(folder: impl AsRef<Path>) -> Self {
        let folder = folder.as_ref();
        Self {
            monitored_branches: folder.join(MONITORED_BRANCHES_FILE),
            contingencies: folder.join(CONTINGENCIES_FILE),
            active_hvdc_lines: folder.join(ACTIVE_HVDC_LINES_FILE),
            active_psts: folder.join(ACTIVE_PSTS_FILE),
            slack_bus: folder.join(SLACK_BUS_FILE),
            redispatchable_generators: folder.join(REDISPATCHABLE_GENERATORS_FILE),
            lever_groups: folder.join(LEVER_GROUPS_FILE),
        }
    }

    /// Read every file into run inputs; run options keep their defaults.
    pub fn load(&self) -> Result<SensitivityInputs> {
        Ok(SensitivityInputs {
            monitored_branches: read_monitored_branches(&self.monitored_branches)?,
            contingencies: read_contingencies(&self.contingencies)?,
            active_hvdcs: read_active_hvdc_lines(&self.active_hvdc_lines)?,
            active_psts: optional(&self.active_psts, read_active_psts)?.unwrap_or_default(),
            redispatchable_generators: optional(
                &self.redispatchable_generators,
                read_redispatchable_generators,
            )?
            .unwrap_or_default(),
            slack_bus: optional(&self.slack_bus, read_slack_bus)?.flatten(),
            lever_groups: optional(&self.lever_groups, read_lever_groups)?,
            ..Default::default()
        })
    }
}

fn optional<T>(path: &Path, read: impl FnOnce(&Path) -> Result<T>) -> Result<Option<T>> {
    if path.is_file() {
        read(path).map(Some)
    } else {
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn write(dir: &Path, name: &str, content: &str) -> PathBuf {
        let path = dir.join(name);
        fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn test_contingency_kinds() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(
            dir.path(),
            CONTINGENCIES_FILE,
            "element_id,element_type\nL1,ac_line\nT1, transformer\nH1,hvdc_line\n",
        );
        let specs = read_contingencies(&path).unwrap();
        assert_eq!(
            specs,
            vec![
                ContingencySpec::new("L1", ElementKind::AcLine),
                ContingencySpec::new("T1", ElementKind::Transformer),
                ContingencySpec::new("H1", ElementKind::HvdcLine),
            ]
        );
    }

    #[test]
    fn test_unknown_contingency_kind_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(dir.path(), CONTINGENCIES_FILE, "element_id,element_type\nG1,generator\n");
        let err = read_contingencies(&path).unwrap_err();
        assert!(format!("{err:#}").contains("G1"));
    }

    #[test]
    fn test_lever_groups_keep_file_order() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(
            dir.path(),
            LEVER_GROUPS_FILE,
            "lever_id,hvdc_line_id\nB,H3\nA,H1\nA,H2\nA,H1\n",
        );
        let groups = read_lever_groups(&path).unwrap();
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].id, "B");
        assert_eq!(groups[1].members, vec!["H1", "H2"]);
    }

    #[test]
    fn test_missing_column_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(dir.path(), MONITORED_BRANCHES_FILE, "id\nL1\n");
        let err = read_monitored_branches(&path).unwrap_err();
        assert!(format!("{err:#}").contains("monitored branches"));
    }
}
