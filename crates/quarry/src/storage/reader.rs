//! Read-only access to written partitions.

use std::fs::File;
use std::path::Path;

use crate::error::{QuarryError, Result};

use super::format::{PartitionFormat, PartitionRecord};
use super::layout::{Tier, EMPTY_MARKER};

/// What a reader finds in a partition directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Partition<T> {
    /// No data file and no marker: never written, or the write failed.
    Missing,
    /// The run ingested but had no records for this tier.
    Empty,
    /// Records, in the order they were written.
    Records(Vec<T>),
}

impl<T> Partition<T> {
    /// Number of records (0 for missing or empty partitions).
    pub fn len(&self) -> usize {
        match self {
            Partition::Records(records) => records.len(),
            Partition::Empty | Partition::Missing => 0,
        }
    }

    /// True unless the partition holds records.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Short human-readable state, e.g. `EMPTY` or `12 records`.
    pub fn describe(&self) -> String {
        match self {
            Partition::Missing => "missing".to_string(),
            Partition::Empty => EMPTY_MARKER.to_string(),
            Partition::Records(records) => format!("{} records", records.len()),
        }
    }
}

/// Read a partition directory written by a [`BronzeWriter`] or [`TierWriter`].
///
/// The data file's encoding is taken from its extension.
///
/// [`BronzeWriter`]: super::BronzeWriter
/// [`TierWriter`]: super::TierWriter
pub fn read_partition<T: PartitionRecord>(dir: &Path, tier: Tier) -> Result<Partition<T>> {
    for format in PartitionFormat::available() {
        let path = dir.join(tier.file_name(*format));
        if path.is_file() {
            let file = File::open(&path).map_err(|e| QuarryError::io(&path, e))?;
            return format.decode(file, &path).map(Partition::Records);
        }
    }

    if dir.join(EMPTY_MARKER).is_file() {
        Ok(Partition::Empty)
    } else {
        Ok(Partition::Missing)
    }
}
