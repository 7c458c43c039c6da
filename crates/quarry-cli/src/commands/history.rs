//! History command - list past runs from the manifest.

use std::path::PathBuf;

use colored::Colorize;
use quarry::{ManifestEntry, ManifestLog};

pub fn run(
    manifest: Option<PathBuf>,
    config: Option<PathBuf>,
    json_output: bool,
    limit: Option<usize>,
    _verbose: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let path = super::manifest_path(manifest, config.as_deref())?;
    let log = ManifestLog::new(&path);
    let entries = log.entries()?;
    let shown = most_recent(&entries, limit);

    if json_output {
        println!("{}", serde_json::to_string_pretty(shown)?);
        return Ok(());
    }

    if entries.is_empty() {
        println!("No runs recorded in {}", path.display());
        return Ok(());
    }

    println!(
        "{} {} ({} runs)",
        "Run history for".cyan().bold(),
        path.display().to_string().white(),
        entries.len()
    );
    println!();
    println!(
        "{:<17} {:>7} {:>7} {:>8} {:>7}  {}",
        "RUN_TS", "IN", "PASSED", "REJECTED", "PASS%", "REASONS"
    );

    for entry in shown {
        let rate = entry.pass_rate() * 100.0;
        let rate_text = format!("{:>6.1}%", rate);
        let rate_colored = if entry.ingested == 0 {
            rate_text.dimmed()
        } else if rate >= 80.0 {
            rate_text.green()
        } else if rate >= 50.0 {
            rate_text.yellow()
        } else {
            rate_text.red()
        };

        println!(
            "{:<17} {:>7} {:>7} {:>8} {}  {}",
            entry.run_ts.to_string(),
            entry.ingested,
            entry.passed,
            entry.rejected,
            rate_colored,
            format_reasons(entry)
        );
    }

    let unbalanced = shown.iter().filter(|e| !e.is_balanced()).count();
    if unbalanced > 0 {
        println!();
        println!(
            "{} {} entries where passed + rejected != in",
            "Warning:".yellow().bold(),
            unbalanced
        );
    }

    Ok(())
}

fn most_recent(entries: &[ManifestEntry], limit: Option<usize>) -> &[ManifestEntry] {
    match limit {
        Some(n) if n < entries.len() => &entries[entries.len() - n..],
        _ => entries,
    }
}

pub(crate) fn format_reasons(entry: &ManifestEntry) -> String {
    if entry.reasons.is_empty() {
        return "-".to_string();
    }
    entry
        .reasons
        .iter()
        .map(|(code, count)| format!("{}={}", code, count))
        .collect::<Vec<_>>()
        .join(", ")
}
