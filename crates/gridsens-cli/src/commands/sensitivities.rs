use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use gridsens_algo::{DcPowerFlow, SensitivityPipeline};
use gridsens_cli::cli::Commands;
use gridsens_core::{LoadFlowParameters, SolverKind};
use gridsens_io::{load_network, network_stem, write_report, InputFiles};
use tracing::{debug, error, info, warn};

pub fn handle(command: &Commands) -> Result<()> {
    match command {
        Commands::Sensitivities {
            network,
            solver,
            force_setpoint,
            hvdc_target,
            max_counter_trading,
            distributed_slack,
            preview,
            output_dir,
            monitored_branches,
            contingencies,
            active_hvdc_lines,
            active_psts,
            slack_bus,
            redispatchable_generators,
            lever_groups,
        } => {
            let start = Instant::now();
            let solver_kind = solver.parse::<SolverKind>()?;
            let network_path = Path::new(network);
            let folder = data_folder(network_path);

            let mut files = InputFiles::in_folder(&folder);
            for (path, given) in [
                (&mut files.monitored_branches, monitored_branches),
                (&mut files.contingencies, contingencies),
                (&mut files.active_hvdc_lines, active_hvdc_lines),
                (&mut files.active_psts, active_psts),
                (&mut files.slack_bus, slack_bus),
                (&mut files.redispatchable_generators, redispatchable_generators),
                (&mut files.lever_groups, lever_groups),
            ] {
                if let Some(given) = given {
                    *path = PathBuf::from(given);
                }
            }
            let mut inputs = files.load()?;
            inputs.force_setpoint = *force_setpoint;
            inputs.hvdc_target = *hvdc_target;
            inputs.max_counter_trading = *max_counter_trading;

            let params = LoadFlowParameters {
                distributed_slack: *distributed_slack,
                ..Default::default()
            };
            let grid = load_network(network_path)?;
            info!(
                "Running sensitivities on {} ({} contingencies, solver {})",
                network,
                inputs.contingencies.len(),
                solver_kind.as_str()
            );

            let mut pipeline = SensitivityPipeline::dc(solver_kind, params);
            if *preview {
                pipeline = pipeline.with_preview(Arc::new(DcPowerFlow::new(solver_kind)));
            }
            let output = pipeline.run(grid, &inputs)?;

            for issue in output.diagnostics.errors() {
                error!(category = %issue.category, entity = ?issue.entity, "{}", issue.message);
            }
            for issue in output.diagnostics.warnings() {
                warn!(category = %issue.category, entity = ?issue.entity, "{}", issue.message);
            }
            if !output.diagnostics.is_empty() {
                info!("{}", output.diagnostics.summary());
            }
            log_timings(&output.timings);

            let out_dir = output_dir.as_deref().map(PathBuf::from).unwrap_or(folder);
            let path = write_report(
                &output.report,
                &out_dir,
                &network_stem(network_path),
                output.ac_emulation(),
            )?;
            let situation = serde_json::to_string(&output.report.situation_description)
                .context("serialising situation description")?;
            println!("{situation}");
            println!("File written at {}", path.display());
            info!(
                elapsed_ms = start.elapsed().as_millis() as u64,
                "sensitivities finished"
            );
            Ok(())
        }
    }
}

/// Folder holding the network file; the current directory for a bare file name.
fn data_folder(network_path: &Path) -> PathBuf {
    match network_path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

fn log_timings(timings: &[(String, Duration)]) {
    for (case, elapsed) in timings {
        debug!(case = %case, elapsed_ms = elapsed.as_secs_f64() * 1e3, "case timing");
    }
    if timings.is_empty() {
        return;
    }
    let total: Duration = timings.iter().map(|(_, d)| *d).sum();
    info!(
        cases = timings.len(),
        total_ms = total.as_secs_f64() * 1e3,
        mean_ms = total.as_secs_f64() * 1e3 / timings.len() as f64,
        "case loop timing"
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_data_folder() {
        assert_eq!(data_folder(Path::new("net.json")), PathBuf::from("."));
        assert_eq!(data_folder(Path::new("data/net.json")), PathBuf::from("data"));
    }
}
