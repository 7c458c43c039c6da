//! Append-only run manifest.
//!
//! One compact JSON line per completed run, in the order runs finished:
//!
//! ```text
//! {"run_ts":"20240501T100000","in":3,"passed":2,"rejected":1,"reasons":{"length":1},...}
//! ```

use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{QuarryError, Result};
use crate::run_id::RunId;
use crate::storage::TierPaths;
use crate::validation::ValidationReport;

/// Summary of one completed run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestEntry {
    pub run_ts: RunId,
    /// Records ingested.
    #[serde(rename = "in")]
    pub ingested: usize,
    pub passed: usize,
    pub rejected: usize,
    /// Failed records carrying each reason code.
    pub reasons: IndexMap<String, usize>,
    pub bronze_path: String,
    pub silver_path: String,
    pub rejects_path: String,
    pub gold_path: String,
}

impl ManifestEntry {
    /// Build the entry for a run from its validation report and partitions.
    pub fn new(run: RunId, report: &ValidationReport, bronze: &Path, tiers: &TierPaths) -> Self {
        let reasons = report
            .reason_counts()
            .into_iter()
            .map(|(code, count)| (code.as_str().to_string(), count))
            .collect();

        Self {
            run_ts: run,
            ingested: report.total(),
            passed: report.passed.len(),
            rejected: report.failed.len(),
            reasons,
            bronze_path: bronze.display().to_string(),
            silver_path: tiers.silver.display().to_string(),
            rejects_path: tiers.rejects.display().to_string(),
            gold_path: tiers.gold.display().to_string(),
        }
    }

    /// Fraction of ingested records that passed (0.0 for an empty run).
    pub fn pass_rate(&self) -> f64 {
        self.passed as f64 / self.ingested.max(1) as f64
    }

    /// Whether the counts add up.
    pub fn is_balanced(&self) -> bool {
        self.passed + self.rejected == self.ingested
    }
}

/// The manifest log file.
#[derive(Debug, Clone)]
pub struct ManifestLog {
    path: PathBuf,
}

impl ManifestLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one entry and flush it to disk.
    ///
    /// Existing lines are never touched.
    pub fn append(&self, entry: &ManifestEntry) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent).map_err(|e| {
                    QuarryError::Persistence(format!(
                        "Failed to create directory '{}': {}",
                        parent.display(),
                        e
                    ))
                })?;
            }
        }

        let mut line = serde_json::to_vec(entry)?;
        line.push(b'\n');

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| {
                QuarryError::Persistence(format!(
                    "Failed to open manifest '{}': {}",
                    self.path.display(),
                    e
                ))
            })?;
        file.write_all(&line).map_err(|e| QuarryError::io(&self.path, e))?;
        file.sync_data().map_err(|e| QuarryError::io(&self.path, e))?;

        info!(
            run_ts = %entry.run_ts,
            path = %self.path.display(),
            "manifest entry appended"
        );
        Ok(())
    }

    /// Every entry, oldest first. A missing log has no entries.
    pub fn entries(&self) -> Result<Vec<ManifestEntry>> {
        let file = match File::open(&self.path) {
            Ok(file) => file,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => {
                return Err(QuarryError::Persistence(format!(
                    "Failed to open manifest '{}': {}",
                    self.path.display(),
                    e
                )));
            }
        };

        let mut entries = Vec::new();
        for (idx, line) in BufReader::new(file).lines().enumerate() {
            let line = line.map_err(|e| QuarryError::io(&self.path, e))?;
            if line.trim().is_empty() {
                continue;
            }
            let entry = serde_json::from_str(&line).map_err(|e| {
                QuarryError::Persistence(format!(
                    "Failed to parse manifest '{}' line {}: {}",
                    self.path.display(),
                    idx + 1,
                    e
                ))
            })?;
            entries.push(entry);
        }
        Ok(entries)
    }

    /// The entry for `run`, if it was recorded.
    pub fn find(&self, run: &RunId) -> Result<Option<ManifestEntry>> {
        Ok(self.entries()?.into_iter().find(|e| &e.run_ts == run))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{CuratedRecord, Record, RejectedRecord};
    use crate::validation::{ReasonCode, ReasonSet};
    use tempfile::TempDir;

    fn entry(ts: &str) -> ManifestEntry {
        let curated = |text: &str| CuratedRecord::from_record(&Record::new(text));
        let report = ValidationReport {
            passed: vec![curated("a passing record of decent length")],
            failed: vec![RejectedRecord {
                record: curated("short"),
                failure_reason: ReasonSet::from_codes([ReasonCode::Length, ReasonCode::Language]),
            }],
        };
        let tiers = TierPaths {
            silver: PathBuf::from(format!("data/silver/run_ts={}", ts)),
            rejects: PathBuf::from(format!("data/rejects/run_ts={}", ts)),
            gold: PathBuf::from("data/gold/ds=2024-05-01"),
            gold_records: Some(1),
        };
        ManifestEntry::new(
            ts.parse().unwrap(),
            &report,
            Path::new(&format!("data/bronze/run_ts={}", ts)),
            &tiers,
        )
    }

    #[test]
    fn test_entry_counts() {
        let entry = entry("20240501T100000");
        assert_eq!(entry.ingested, 2);
        assert_eq!(entry.passed, 1);
        assert_eq!(entry.rejected, 1);
        assert!(entry.is_balanced());
        assert_eq!(entry.reasons.get("length"), Some(&1));
        assert_eq!(entry.reasons.get("language"), Some(&1));
        assert!((entry.pass_rate() - 0.5).abs() < f64::EPSILON);
    }

    #[test]
    fn test_wire_format() {
        let json = serde_json::to_value(entry("20240501T100000")).unwrap();
        assert_eq!(json["run_ts"], "20240501T100000");
        assert_eq!(json["in"], 2);
        assert_eq!(json["reasons"]["length"], 1);
        assert_eq!(json["bronze_path"], "data/bronze/run_ts=20240501T100000");
        assert_eq!(json["gold_path"], "data/gold/ds=2024-05-01");
    }

    #[test]
    fn test_append_preserves_order() {
        let dir = TempDir::new().unwrap();
        let log = ManifestLog::new(dir.path().join("manifests").join("versions.jsonl"));

        for ts in ["20240501T100000", "20240501T110000", "20240501T120000"] {
            log.append(&entry(ts)).unwrap();
        }

        let runs: Vec<String> = log
            .entries()
            .unwrap()
            .iter()
            .map(|e| e.run_ts.to_string())
            .collect();
        assert_eq!(runs, vec!["20240501T100000", "20240501T110000", "20240501T120000"]);

        let contents = fs::read_to_string(log.path()).unwrap();
        assert_eq!(contents.lines().count(), 3);
    }

    #[test]
    fn test_missing_log_is_empty() {
        let dir = TempDir::new().unwrap();
        let log = ManifestLog::new(dir.path().join("versions.jsonl"));
        assert!(log.entries().unwrap().is_empty());
    }

    #[test]
    fn test_find() {
        let dir = TempDir::new().unwrap();
        let log = ManifestLog::new(dir.path().join("versions.jsonl"));
        log.append(&entry("20240501T100000")).unwrap();

        assert!(log.find(&"20240501T100000".parse().unwrap()).unwrap().is_some());
        assert!(log.find(&"20240502T100000".parse().unwrap()).unwrap().is_none());
    }

    #[test]
    fn test_corrupt_line_is_reported() {
        let dir = TempDir::new().unwrap();
        let log = ManifestLog::new(dir.path().join("versions.jsonl"));
        log.append(&entry("20240501T100000")).unwrap();
        let mut file = OpenOptions::new().append(true).open(log.path()).unwrap();
        file.write_all(b"\n{oops\n").unwrap();

        let err = log.entries().unwrap_err();
        assert!(err.to_string().contains("line 3"));
    }
}
