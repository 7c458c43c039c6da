//! Run command - drain the topic once and write every tier.

use colored::Colorize;
use quarry::{Pipeline, PipelineConfig};

use crate::cli::RunArgs;

pub fn run(args: RunArgs, verbose: bool) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = super::load_config(args.config.as_deref())?;
    apply_overrides(&mut config, &args);

    let pipeline = Pipeline::from_config(&config)?;
    if verbose {
        eprintln!(
            "{} {} -> {}",
            "Draining".cyan(),
            config.intake.queue_dir.join(format!("{}.jsonl", config.intake.topic)).display(),
            config.storage.data_dir.display()
        );
    }

    let report = pipeline.run_topic()?;
    let entry = &report.entry;

    if args.json {
        println!("{}", serde_json::to_string_pretty(entry)?);
        return Ok(());
    }

    println!("{} {}", "Run".cyan().bold(), entry.run_ts.to_string().white().bold());
    println!(
        "  In: {}  Passed: {}  Rejected: {}  ({:.1}% pass)",
        entry.ingested.to_string().white(),
        entry.passed.to_string().green(),
        entry.rejected.to_string().red(),
        entry.pass_rate() * 100.0
    );
    if report.intake.malformed + report.intake.queue_errors > 0 {
        println!(
            "  Skipped: {} malformed, {} queue errors",
            report.intake.malformed.to_string().yellow(),
            report.intake.queue_errors.to_string().yellow()
        );
    }
    match report.tiers.gold_records {
        Some(n) => println!("  Gold: {} records in {}", n.to_string().green(), entry.gold_path),
        None => println!("  Gold: {}", "unchanged (no passed records)".dimmed()),
    }
    println!();
    println!("{}", serde_json::to_string_pretty(entry)?);

    Ok(())
}

fn apply_overrides(config: &mut PipelineConfig, args: &RunArgs) {
    if let Some(dir) = &args.data_dir {
        config.storage.data_dir = dir.clone();
    }
    if let Some(dir) = &args.queue_dir {
        config.intake.queue_dir = dir.clone();
    }
    if let Some(topic) = &args.topic {
        config.intake.topic = topic.clone();
    }
    if let Some(n) = args.max_records {
        config.intake.max_records = n;
    }
    if let Some(secs) = args.timeout_secs {
        config.intake.timeout_secs = secs;
    }
    if let Some(format) = args.format {
        config.storage.format = format;
    }
    if let Some(policy) = args.gold_policy {
        config.storage.gold_policy = policy;
    }
}
