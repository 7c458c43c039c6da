//! Inspect command - one run's manifest entry and partition state.

use std::path::{Path, PathBuf};

use colored::Colorize;
use quarry::storage::{read_partition, Partition, Tier};
use quarry::{CuratedRecord, ManifestLog, Record, RejectedRecord, RunId};

pub fn run(
    run_ts: String,
    manifest: Option<PathBuf>,
    config: Option<PathBuf>,
    samples: usize,
    json_output: bool,
    _verbose: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let run: RunId = run_ts.parse()?;
    let path = super::manifest_path(manifest, config.as_deref())?;
    let entry = ManifestLog::new(&path).find(&run)?.ok_or_else(|| {
        format!("Run {} not found in manifest {}", run, path.display())
    })?;

    let bronze = read_partition::<Record>(Path::new(&entry.bronze_path), Tier::Bronze)?;
    let silver = read_partition::<CuratedRecord>(Path::new(&entry.silver_path), Tier::Silver)?;
    let rejects = read_partition::<RejectedRecord>(Path::new(&entry.rejects_path), Tier::Rejects)?;
    let gold = read_partition::<CuratedRecord>(Path::new(&entry.gold_path), Tier::Gold)?;

    let rejected_samples: Vec<&RejectedRecord> = match &rejects {
        Partition::Records(records) => records.iter().take(samples).collect(),
        Partition::Empty | Partition::Missing => Vec::new(),
    };

    if json_output {
        let out = serde_json::json!({
            "entry": entry,
            "partitions": {
                "bronze": bronze.describe(),
                "silver": silver.describe(),
                "rejects": rejects.describe(),
                "gold": gold.describe(),
            },
            "rejected_samples": rejected_samples,
        });
        println!("{}", serde_json::to_string_pretty(&out)?);
        return Ok(());
    }

    println!("{} {}", "Run".cyan().bold(), entry.run_ts.to_string().white().bold());
    println!();
    println!(
        "  In: {}  Passed: {}  Rejected: {}  ({:.1}% pass)",
        entry.ingested.to_string().white(),
        entry.passed.to_string().green(),
        entry.rejected.to_string().red(),
        entry.pass_rate() * 100.0
    );
    println!("  Reasons: {}", super::history::format_reasons(&entry));
    println!();

    println!("{}", "Partitions:".yellow().bold());
    print_partition("bronze", &entry.bronze_path, &bronze, Some(entry.ingested));
    print_partition("silver", &entry.silver_path, &silver, Some(entry.passed));
    print_partition("rejects", &entry.rejects_path, &rejects, Some(entry.rejected));
    // Gold is shared by every run that day, so its size need not match.
    print_partition("gold", &entry.gold_path, &gold, None);

    if !rejected_samples.is_empty() {
        println!();
        println!("{}", "Rejected samples:".yellow().bold());
        for record in rejected_samples {
            println!(
                "  {} {} {}",
                record.record.id.as_deref().unwrap_or("-").dimmed(),
                format!("[{}]", record.failure_reason).red(),
                super::preview(record.record.text(), 60)
            );
        }
    }

    Ok(())
}

fn print_partition<T>(name: &str, path: &str, partition: &Partition<T>, expected: Option<usize>) {
    let state = match partition {
        Partition::Missing => partition.describe().red(),
        Partition::Empty => partition.describe().dimmed(),
        Partition::Records(_) => partition.describe().green(),
    };
    let mismatch = match expected {
        Some(n) if !matches!(partition, Partition::Missing) && partition.len() != n => {
            format!(" (manifest says {})", n).yellow().to_string()
        }
        _ => String::new(),
    };
    println!("  {:<8} {:<12} {}{}", name, state, path, mismatch);
}
