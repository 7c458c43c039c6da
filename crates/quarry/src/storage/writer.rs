//! Append-only partition writers.
//!
//! Run-keyed partitions (bronze, silver, rejects) are written exactly
//! once: the `run_ts=T` directory is created non-recursively and data
//! files are opened create-new, so an existing partition is never
//! overwritten. Gold is the one partition that is rewritten, through a
//! temp file and rename.

use std::fs::{self, File};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{QuarryError, Result};
use crate::model::{Batch, CuratedRecord, Record, RejectedRecord};
use crate::run_id::RunId;
use crate::validation::ValidationReport;

use super::format::{PartitionFormat, PartitionRecord};
use super::layout::{Layout, Tier, EMPTY_MARKER};
use super::reader::{read_partition, Partition};

/// How same-day runs contribute to the gold partition.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GoldPolicy {
    /// Each run's gold write replaces the day's file. Earlier same-day
    /// contributions are lost.
    #[default]
    Replace,
    /// Each run appends its passed records to the day's file.
    Accumulate,
}

impl std::str::FromStr for GoldPolicy {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "replace" => Ok(GoldPolicy::Replace),
            "accumulate" | "append" => Ok(GoldPolicy::Accumulate),
            _ => Err(format!("Unknown gold policy: {}. Use replace or accumulate.", s)),
        }
    }
}

impl std::fmt::Display for GoldPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GoldPolicy::Replace => write!(f, "replace"),
            GoldPolicy::Accumulate => write!(f, "accumulate"),
        }
    }
}

/// Create a run partition directory, failing if a run already owns it.
fn create_run_dir(dir: &Path, run: &RunId) -> Result<()> {
    if let Some(parent) = dir.parent() {
        fs::create_dir_all(parent).map_err(|e| {
            QuarryError::Persistence(format!(
                "Failed to create directory '{}': {}",
                parent.display(),
                e
            ))
        })?;
    }

    match fs::create_dir(dir) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == ErrorKind::AlreadyExists => Err(QuarryError::RunCollision {
            run_ts: run.to_string(),
        }),
        Err(e) => Err(QuarryError::Persistence(format!(
            "Failed to create directory '{}': {}",
            dir.display(),
            e
        ))),
    }
}

fn create_new(path: &Path) -> Result<File> {
    File::create_new(path).map_err(|e| {
        QuarryError::Persistence(format!("Failed to create file '{}': {}", path.display(), e))
    })
}

/// Write one run-keyed partition: records, or the `EMPTY` marker.
///
/// Returns the partition directory.
fn write_run_partition<T: PartitionRecord>(
    layout: &Layout,
    format: PartitionFormat,
    tier: Tier,
    run: &RunId,
    records: &[T],
) -> Result<PathBuf> {
    let dir = layout.run_dir(tier, run);
    create_run_dir(&dir, run)?;

    if records.is_empty() {
        let marker = dir.join(EMPTY_MARKER);
        let file = create_new(&marker)?;
        file.sync_all().map_err(|e| QuarryError::io(&marker, e))?;
    } else {
        let path = dir.join(tier.file_name(format));
        let file = create_new(&path)?;
        format.encode(file, &path, records)?;
    }

    info!(tier = %tier, records = records.len(), path = %dir.display(), "partition written");
    Ok(dir)
}

/// Persists each batch as received, before validation.
#[derive(Debug, Clone)]
pub struct BronzeWriter {
    layout: Layout,
    format: PartitionFormat,
}

impl BronzeWriter {
    pub fn new(layout: Layout, format: PartitionFormat) -> Self {
        Self { layout, format }
    }

    /// Write `batch` under `bronze/run_ts=T`, or an `EMPTY` marker.
    pub fn write(&self, batch: &Batch, run: &RunId) -> Result<PathBuf> {
        write_run_partition::<Record>(&self.layout, self.format, Tier::Bronze, run, batch.records())
    }
}

/// Where a run's validated output landed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TierPaths {
    pub silver: PathBuf,
    pub rejects: PathBuf,
    /// Gold partition directory for the run's date, written or not.
    pub gold: PathBuf,
    /// Records in the gold file after this run, or `None` when the run
    /// had nothing to publish and gold was left untouched.
    pub gold_records: Option<usize>,
}

/// Writes silver, rejects, and the day's gold partition.
#[derive(Debug, Clone)]
pub struct TierWriter {
    layout: Layout,
    format: PartitionFormat,
    gold_policy: GoldPolicy,
}

impl TierWriter {
    pub fn new(layout: Layout, format: PartitionFormat, gold_policy: GoldPolicy) -> Self {
        Self {
            layout,
            format,
            gold_policy,
        }
    }

    /// Write every partition for a validated batch.
    pub fn write(&self, report: &ValidationReport, run: &RunId) -> Result<TierPaths> {
        let silver = self.write_silver(&report.passed, run)?;
        let rejects = self.write_rejects(&report.failed, run)?;
        let (gold, gold_records) = self.write_gold(&report.passed, run)?;

        Ok(TierPaths {
            silver,
            rejects,
            gold,
            gold_records,
        })
    }

    /// Write passed records under `silver/run_ts=T`, or an `EMPTY` marker.
    pub fn write_silver(&self, passed: &[CuratedRecord], run: &RunId) -> Result<PathBuf> {
        write_run_partition(&self.layout, self.format, Tier::Silver, run, passed)
    }

    /// Write failed records under `rejects/run_ts=T`, or an `EMPTY` marker.
    pub fn write_rejects(&self, failed: &[RejectedRecord], run: &RunId) -> Result<PathBuf> {
        write_run_partition(&self.layout, self.format, Tier::Rejects, run, failed)
    }

    /// Curate `gold/ds=D` from this run's passed records.
    ///
    /// Nothing is written when `passed` is empty. Under
    /// [`GoldPolicy::Replace`] the day's file holds only this run's
    /// records afterwards; under [`GoldPolicy::Accumulate`] they are
    /// appended to what earlier runs that day published.
    pub fn write_gold(
        &self,
        passed: &[CuratedRecord],
        run: &RunId,
    ) -> Result<(PathBuf, Option<usize>)> {
        let dir = self.layout.gold_dir(&run.ds());
        if passed.is_empty() {
            return Ok((dir, None));
        }

        fs::create_dir_all(&dir).map_err(|e| {
            QuarryError::Persistence(format!(
                "Failed to create directory '{}': {}",
                dir.display(),
                e
            ))
        })?;

        let mut records: Vec<CuratedRecord> = match self.gold_policy {
            GoldPolicy::Replace => Vec::with_capacity(passed.len()),
            GoldPolicy::Accumulate => match read_partition::<CuratedRecord>(&dir, Tier::Gold)? {
                Partition::Records(existing) => existing,
                Partition::Empty | Partition::Missing => Vec::new(),
            },
        };
        records.extend_from_slice(passed);

        let target = dir.join(Tier::Gold.file_name(self.format));
        let staging = dir.join(format!(".{}.{}.tmp", Tier::Gold.file_name(self.format), run));
        let file = File::create(&staging).map_err(|e| {
            QuarryError::Persistence(format!(
                "Failed to create file '{}': {}",
                staging.display(),
                e
            ))
        })?;
        self.format.encode(file, &staging, &records)?;
        fs::rename(&staging, &target).map_err(|e| {
            QuarryError::Persistence(format!(
                "Failed to publish '{}': {}",
                target.display(),
                e
            ))
        })?;

        info!(
            tier = %Tier::Gold,
            policy = %self.gold_policy,
            records = records.len(),
            path = %dir.display(),
            "partition written"
        );
        Ok((dir, Some(records.len())))
    }
}
