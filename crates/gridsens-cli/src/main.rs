use clap::Parser;
use gridsens_cli::cli::{Cli, Commands};
use tracing::{error, info};
use tracing_subscriber::FmtSubscriber;

mod commands;

use crate::commands::sensitivities;

fn main() {
    let cli = Cli::parse();

    let subscriber = FmtSubscriber::builder()
        .with_max_level(cli.log_level)
        .with_writer(std::io::stderr)
        .finish();
    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("setting default subscriber failed: {e}");
    }

    let result = match &cli.command {
        command @ Commands::Sensitivities { .. } => sensitivities::handle(command),
    };
    match result {
        Ok(()) => info!("Sensitivities command successful!"),
        Err(e) => {
            error!("Sensitivities command failed: {:?}", e);
            std::process::exit(1);
        }
    }
}
