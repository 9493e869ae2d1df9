mod agents;
mod changes;
mod cli;
mod error;
mod github;
mod repository;
mod requirements;
mod settings;
mod source;
mod utils;
mod version;
mod workflow;

use agents::DeliveryOutcome;
use clap::Parser;
use cli::{Cli, Commands};
use colored::Colorize;
use std::process;
use tracing_subscriber::EnvFilter;

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result = match cli.command {
        Commands::Update {
            merge,
            repository,
            allow_rejected,
        } => workflow::execute_update(&cli.path, merge, repository.as_deref()).map(|outcome| {
            matches!(outcome, Some(DeliveryOutcome::Rejected { .. })) && !allow_rejected
        }),
        Commands::Check => workflow::execute_check(&cli.path).map(|_| false),
    };

    match result {
        Ok(false) => {}
        Ok(true) => process::exit(1),
        Err(e) => {
            eprintln!("{} {}", "Error:".red().bold(), e);
            process::exit(1);
        }
    }
}
