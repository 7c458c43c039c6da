//! Check command - dry-run validation of a message file.

use std::fs;
use std::path::PathBuf;

use colored::Colorize;
use quarry::validation::DuplicateTracker;
use quarry::{Batch, CuratedRecord, Record, ReasonCode, RejectedRecord, ValidationReport, Validator};

/// Records decoded from a message file, plus how many lines were skipped.
#[derive(Debug, Default)]
struct Decoded {
    batch: Batch,
    malformed: usize,
}

/// One record's verdict.
#[derive(Debug, PartialEq, Eq)]
struct Checked {
    id: Option<String>,
    /// Comma-joined failure reasons; `None` when the record passed.
    reasons: Option<String>,
    text: String,
}

pub fn run(
    file: PathBuf,
    config: Option<PathBuf>,
    failed_only: bool,
    json_output: bool,
    verbose: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let config = super::load_config(config.as_deref())?;
    let contents = fs::read_to_string(&file)
        .map_err(|e| format!("Failed to read '{}': {}", file.display(), e))?;

    let decoded = decode_lines(&contents);
    let validator = Validator::with_defaults(config.validation)?;
    if verbose {
        eprintln!("{} {:?}", "Using".cyan(), validator);
    }
    let (checked, report) = check_in_order(&validator, &decoded.batch);

    if json_output {
        let records: Vec<serde_json::Value> = checked
            .iter()
            .filter(|c| !failed_only || c.reasons.is_some())
            .map(|c| {
                serde_json::json!({
                    "id": c.id,
                    "passed": c.reasons.is_none(),
                    "failure_reason": c.reasons,
                    "text": c.text,
                })
            })
            .collect();
        let reasons: serde_json::Map<String, serde_json::Value> = report
            .reason_counts()
            .into_iter()
            .map(|(code, n)| (code.to_string(), n.into()))
            .collect();
        let out = serde_json::json!({
            "file": file.display().to_string(),
            "in": report.total(),
            "passed": report.passed.len(),
            "rejected": report.failed.len(),
            "malformed": decoded.malformed,
            "reasons": reasons,
            "records": records,
        });
        println!("{}", serde_json::to_string_pretty(&out)?);
        return Ok(());
    }

    println!("{} {}", "Checking".cyan().bold(), file.display().to_string().white());
    println!();

    for c in &checked {
        let id = c.id.as_deref().unwrap_or("-");
        match &c.reasons {
            Some(reasons) => println!(
                "  {} {:<10} {} {}",
                "FAIL".red().bold(),
                id,
                format!("[{}]", reasons).red(),
                super::preview(&c.text, 60)
            ),
            None if !failed_only => println!(
                "  {} {:<10} {}",
                "PASS".green().bold(),
                id,
                super::preview(&c.text, 60)
            ),
            None => {}
        }
    }

    println!();
    println!("{}", "Summary:".yellow().bold());
    println!("  Records:   {}", report.total().to_string().white());
    println!("  Passed:    {}", report.passed.len().to_string().green());
    println!("  Rejected:  {}", report.failed.len().to_string().red());
    if decoded.malformed > 0 {
        println!("  Malformed: {} (skipped)", decoded.malformed.to_string().yellow());
    }
    let counts = report.reason_counts();
    if !counts.is_empty() {
        println!();
        println!("{}", "Reasons:".yellow().bold());
        for (code, n) in &counts {
            let label = format!("{:<10}", code.to_string());
            let label = if *code == ReasonCode::Unknown {
                label.magenta()
            } else {
                label.normal()
            };
            println!("  {} {}", label, n);
        }
    }

    Ok(())
}

fn decode_lines(contents: &str) -> Decoded {
    let mut decoded = Decoded::default();
    for line in contents.lines().filter(|l| !l.trim().is_empty()) {
        match Record::decode(line.as_bytes()) {
            Some(record) => decoded.batch.push(record),
            None => decoded.malformed += 1,
        }
    }
    decoded
}

/// Validate record by record so verdicts follow the file's line order.
fn check_in_order(validator: &Validator, batch: &Batch) -> (Vec<Checked>, ValidationReport) {
    let mut tracker = DuplicateTracker::new();
    let mut checked = Vec::with_capacity(batch.len());
    let mut report = ValidationReport::default();

    for raw in batch {
        let record = CuratedRecord::from_record(raw);
        let outcome = validator.evaluate(&record, &mut tracker);
        checked.push(Checked {
            id: record.id.clone(),
            reasons: (!outcome.passed).then(|| outcome.reasons.to_string()),
            text: record.text().to_string(),
        });
        if outcome.passed {
            report.passed.push(record);
        } else {
            report.failed.push(RejectedRecord {
                record,
                failure_reason: outcome.reasons,
            });
        }
    }

    (checked, report)
}
