//! Quarry CLI - tiered curation of streaming text records.

mod cli;
mod commands;

use clap::Parser;
use cli::{Cli, Commands};
use quarry::observability::init_logging;

fn main() {
    let cli = Cli::parse();

    init_logging(cli.log_format, if cli.verbose { "debug" } else { "info" });

    let result = match cli.command {
        Commands::Run(args) => commands::run::run(args, cli.verbose),

        Commands::History {
            manifest,
            config,
            json,
            limit,
        } => commands::history::run(manifest, config, json, limit, cli.verbose),

        Commands::Inspect {
            run_ts,
            manifest,
            config,
            samples,
            json,
        } => commands::inspect::run(run_ts, manifest, config, samples, json, cli.verbose),

        Commands::Check {
            file,
            config,
            failed_only,
            json,
        } => commands::check::run(file, config, failed_only, json, cli.verbose),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
