use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Set the logging level
    #[arg(long, default_value = "info")]
    pub log_level: tracing::Level,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Compute cross-border sensitivities on the base case and every contingency
    ///
    /// Input CSV files default to their conventional names next to the network file.
    Sensitivities {
        /// Path to the network file (JSON)
        network: String,
        /// Linear solver to use (gauss, faer)
        #[arg(long, default_value = "gauss")]
        solver: String,
        /// Keep HVDC lines in setpoint mode instead of emulating them as AC lines;
        /// the report file is named `...setpoint.json` instead of `...ac_emulation.json`
        #[arg(long)]
        force_setpoint: bool,
        /// Setpoint (MW) applied to every active HVDC line
        #[arg(long)]
        hvdc_target: Option<f64>,
        /// Counter-trading lever range in MW; 0 disables the pool
        #[arg(long, default_value_t = 500.0)]
        max_counter_trading: f64,
        /// Share the slack over generators in proportion to their maximum power
        #[arg(long)]
        distributed_slack: bool,
        /// Log the exchange of a preview load flow before the main one
        #[arg(long)]
        preview: bool,
        /// Folder the result is written to (default: the network folder)
        #[arg(long)]
        output_dir: Option<String>,
        /// Monitored branches CSV (`branch_id`)
        #[arg(long)]
        monitored_branches: Option<String>,
        /// Contingencies CSV (`element_id,element_type`)
        #[arg(long)]
        contingencies: Option<String>,
        /// Active HVDC lines CSV (`hvdc_line_id`)
        #[arg(long)]
        active_hvdc_lines: Option<String>,
        /// Active PSTs CSV (`pst_id`), optional
        #[arg(long)]
        active_psts: Option<String>,
        /// Slack bus CSV (`voltage_level_id,bus_id`), optional
        #[arg(long)]
        slack_bus: Option<String>,
        /// Redispatchable generators CSV (`generator_id`), optional
        #[arg(long)]
        redispatchable_generators: Option<String>,
        /// HVDC lever groups CSV (`lever_id,hvdc_line_id`), optional
        #[arg(long)]
        lever_groups: Option<String>,
    },
}
