//! CLI argument definitions using clap.

use clap::{Args, Parser, Subcommand};
use quarry::observability::LogFormat;
use quarry::{GoldPolicy, PartitionFormat};
use std::path::PathBuf;

/// Quarry: quality-tiered curation of streaming text records
#[derive(Parser)]
#[command(name = "quarry")]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose output (debug logging)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Log output format (pretty or json)
    #[arg(long, global = true, default_value = "pretty")]
    pub log_format: LogFormat,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Drain the input topic once and write every tier
    Run(RunArgs),

    /// List past runs from the manifest
    History {
        /// Path to the manifest log (default: from config)
        #[arg(short, long)]
        manifest: Option<PathBuf>,

        /// Pipeline configuration file
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Output as JSON
        #[arg(long)]
        json: bool,

        /// Show only the most recent N runs
        #[arg(short = 'n', long)]
        limit: Option<usize>,
    },

    /// Show one run's manifest entry and the state of its partitions
    Inspect {
        /// Run identifier, e.g. 20240501T103000
        #[arg(value_name = "RUN_TS")]
        run_ts: String,

        /// Path to the manifest log (default: from config)
        #[arg(short, long)]
        manifest: Option<PathBuf>,

        /// Pipeline configuration file
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Number of rejected records to print
        #[arg(long, default_value = "5")]
        samples: usize,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Validate a file of queue messages without writing anything
    Check {
        /// JSON Lines file, one message per line
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// Pipeline configuration file
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Show only failing records
        #[arg(long)]
        failed_only: bool,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

/// Arguments for `quarry run`. Flags override the configuration file.
#[derive(Args, Debug, Default)]
pub struct RunArgs {
    /// Pipeline configuration file (TOML)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Base directory for partitions and the manifest
    #[arg(long)]
    pub data_dir: Option<PathBuf>,

    /// Directory holding topic logs and consumer offsets
    #[arg(long)]
    pub queue_dir: Option<PathBuf>,

    /// Topic to drain
    #[arg(long)]
    pub topic: Option<String>,

    /// Maximum records per batch
    #[arg(long)]
    pub max_records: Option<usize>,

    /// Intake time budget in seconds
    #[arg(long)]
    pub timeout_secs: Option<u64>,

    /// Partition file format (jsonl or parquet)
    #[arg(short, long)]
    pub format: Option<PartitionFormat>,

    /// Same-day gold behaviour (replace or accumulate)
    #[arg(long)]
    pub gold_policy: Option<GoldPolicy>,

    /// Print only the manifest entry as JSON
    #[arg(long)]
    pub json: bool,
}
