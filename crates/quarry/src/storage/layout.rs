//! On-disk layout of the tiered partitions.
//!
//! ```text
//! data/
//! ├── bronze/run_ts=20240501T103000/raw.jsonl     # as received (or EMPTY)
//! ├── silver/run_ts=20240501T103000/good.jsonl    # passed (or EMPTY)
//! ├── rejects/run_ts=20240501T103000/bad.jsonl    # failed + failure_reason (or EMPTY)
//! ├── gold/ds=2024-05-01/gold.jsonl               # curated for the day
//! └── manifests/versions.jsonl                    # one line per run
//! ```

use std::fmt;
use std::path::{Path, PathBuf};

use crate::run_id::RunId;

use super::format::PartitionFormat;

/// Sentinel written instead of a data file when a partition has no records.
pub const EMPTY_MARKER: &str = "EMPTY";

/// Quality tier a partition belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Tier {
    /// Unvalidated batch, exactly as ingested.
    Bronze,
    /// Records that passed every rule.
    Silver,
    /// Records that failed, with reasons.
    Rejects,
    /// Curated subset published per UTC day.
    Gold,
}

impl Tier {
    /// Top-level directory name.
    pub fn dir_name(&self) -> &'static str {
        match self {
            Tier::Bronze => "bronze",
            Tier::Silver => "silver",
            Tier::Rejects => "rejects",
            Tier::Gold => "gold",
        }
    }

    /// Data file stem inside a partition directory.
    pub fn file_stem(&self) -> &'static str {
        match self {
            Tier::Bronze => "raw",
            Tier::Silver => "good",
            Tier::Rejects => "bad",
            Tier::Gold => "gold",
        }
    }

    /// Data file name for a given encoding, e.g. `good.jsonl`.
    pub fn file_name(&self, format: PartitionFormat) -> String {
        format!("{}.{}", self.file_stem(), format.extension())
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.dir_name())
    }
}

/// Resolves partition paths under a base data directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Layout {
    root: PathBuf,
}

impl Layout {
    /// Layout rooted at `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Base data directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory of a run-keyed partition, e.g. `silver/run_ts=T`.
    pub fn run_dir(&self, tier: Tier, run: &RunId) -> PathBuf {
        self.root
            .join(tier.dir_name())
            .join(format!("run_ts={}", run))
    }

    /// Directory of the gold partition for a UTC date key, e.g. `gold/ds=D`.
    pub fn gold_dir(&self, ds: &str) -> PathBuf {
        self.root
            .join(Tier::Gold.dir_name())
            .join(format!("ds={}", ds))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_dirs() {
        let layout = Layout::new("data");
        let run: RunId = "20240501T103000".parse().unwrap();

        assert_eq!(
            layout.run_dir(Tier::Bronze, &run),
            PathBuf::from("data/bronze/run_ts=20240501T103000")
        );
        assert_eq!(
            layout.run_dir(Tier::Rejects, &run),
            PathBuf::from("data/rejects/run_ts=20240501T103000")
        );
        assert_eq!(
            layout.gold_dir(&run.ds()),
            PathBuf::from("data/gold/ds=2024-05-01")
        );
    }

    #[test]
    fn test_file_names() {
        assert_eq!(Tier::Bronze.file_name(PartitionFormat::JsonLines), "raw.jsonl");
        assert_eq!(Tier::Silver.file_name(PartitionFormat::JsonLines), "good.jsonl");
        assert_eq!(Tier::Rejects.file_name(PartitionFormat::JsonLines), "bad.jsonl");
        assert_eq!(Tier::Gold.file_name(PartitionFormat::JsonLines), "gold.jsonl");
    }
}
