//! Partition file encodings and the row shape shared across them.

use std::fmt;
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;
use std::str::FromStr;

use indexmap::IndexMap;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::{QuarryError, Result};
use crate::model::{CuratedRecord, Record, RejectedRecord};
use crate::validation::ReasonSet;

/// Encoding used for partition data files.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PartitionFormat {
    /// One JSON object per line (`.jsonl`).
    #[default]
    #[serde(rename = "jsonl")]
    JsonLines,
    /// Apache Parquet (`.parquet`).
    #[cfg(feature = "parquet")]
    #[serde(rename = "parquet")]
    Parquet,
}

impl PartitionFormat {
    /// Every encoding compiled into this build.
    pub fn available() -> &'static [PartitionFormat] {
        &[
            PartitionFormat::JsonLines,
            #[cfg(feature = "parquet")]
            PartitionFormat::Parquet,
        ]
    }

    /// File extension, without the dot.
    pub fn extension(&self) -> &'static str {
        match self {
            PartitionFormat::JsonLines => "jsonl",
            #[cfg(feature = "parquet")]
            PartitionFormat::Parquet => "parquet",
        }
    }

    /// Encode `records` into `file` and flush it to disk.
    pub fn encode<T: PartitionRecord>(&self, file: File, path: &Path, records: &[T]) -> Result<()> {
        match self {
            PartitionFormat::JsonLines => write_json_lines(file, path, records),
            #[cfg(feature = "parquet")]
            PartitionFormat::Parquet => {
                let rows = records
                    .iter()
                    .map(PartitionRecord::to_row)
                    .collect::<Result<Vec<PartitionRow>>>()?;
                super::parquet::write_rows(file, path, T::COLUMNS, &rows)
            }
        }
    }

    /// Decode every record in `file`.
    pub fn decode<T: PartitionRecord>(&self, file: File, path: &Path) -> Result<Vec<T>> {
        match self {
            PartitionFormat::JsonLines => read_json_lines(file, path),
            #[cfg(feature = "parquet")]
            PartitionFormat::Parquet => super::parquet::read_rows(file)?
                .into_iter()
                .map(T::from_row)
                .collect(),
        }
    }
}

impl fmt::Display for PartitionFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

impl FromStr for PartitionFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "jsonl" | "json" | "ndjson" => Ok(PartitionFormat::JsonLines),
            #[cfg(feature = "parquet")]
            "parquet" => Ok(PartitionFormat::Parquet),
            #[cfg(not(feature = "parquet"))]
            "parquet" => Err("Parquet support not enabled. Rebuild with --features parquet".to_string()),
            _ => Err(format!("Unknown format: {}. Use jsonl or parquet.", s)),
        }
    }
}

/// Optional columns written after the six canonical ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Column {
    /// Character count of the trimmed text.
    TextLen,
    /// Comma-joined reason codes.
    FailureReason,
    /// Non-canonical keys, as a JSON object string.
    Extra,
}

impl Column {
    pub fn name(&self) -> &'static str {
        match self {
            Column::TextLen => "text_len",
            Column::FailureReason => "failure_reason",
            Column::Extra => "extra",
        }
    }
}

/// Flat row covering every column any partition writes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PartitionRow {
    pub id: Option<String>,
    pub ts: Option<String>,
    pub text: Option<String>,
    pub source: Option<String>,
    pub domain: Option<String>,
    pub category: Option<String>,
    pub text_len: Option<u64>,
    pub failure_reason: Option<String>,
    pub extra: Option<String>,
}

impl PartitionRow {
    /// Value of a canonical column by name.
    pub fn canonical(&self, name: &str) -> Option<&str> {
        match name {
            "id" => self.id.as_deref(),
            "ts" => self.ts.as_deref(),
            "text" => self.text.as_deref(),
            "source" => self.source.as_deref(),
            "domain" => self.domain.as_deref(),
            "category" => self.category.as_deref(),
            _ => None,
        }
    }

    fn into_curated(self) -> Result<CuratedRecord> {
        let text_len = self
            .text_len
            .ok_or_else(|| QuarryError::Persistence("row is missing text_len".to_string()))?;
        Ok(CuratedRecord {
            id: self.id,
            ts: self.ts,
            text: self.text,
            source: self.source,
            domain: self.domain,
            category: self.category,
            text_len: usize::try_from(text_len)
                .map_err(|_| QuarryError::Persistence(format!("text_len {} out of range", text_len)))?,
        })
    }
}

/// A record type that can be stored in a partition.
///
/// JSON Lines uses the serde representation directly; columnar formats
/// go through [`PartitionRow`].
pub trait PartitionRecord: Serialize + DeserializeOwned {
    /// Columns written after the canonical six.
    const COLUMNS: &'static [Column];

    /// Flatten into a row.
    fn to_row(&self) -> Result<PartitionRow>;

    /// Rebuild from a row.
    fn from_row(row: PartitionRow) -> Result<Self>;
}

impl PartitionRecord for Record {
    const COLUMNS: &'static [Column] = &[Column::Extra];

    fn to_row(&self) -> Result<PartitionRow> {
        let extra = if self.extra.is_empty() {
            None
        } else {
            Some(serde_json::to_string(&self.extra)?)
        };
        Ok(PartitionRow {
            id: self.id.clone(),
            ts: self.ts.clone(),
            text: self.text.clone(),
            source: self.source.clone(),
            domain: self.domain.clone(),
            category: self.category.clone(),
            text_len: None,
            failure_reason: None,
            extra,
        })
    }

    fn from_row(row: PartitionRow) -> Result<Self> {
        let extra = match row.extra.as_deref() {
            Some(raw) => serde_json::from_str::<IndexMap<String, serde_json::Value>>(raw)?,
            None => IndexMap::new(),
        };
        Ok(Record {
            id: row.id,
            ts: row.ts,
            text: row.text,
            source: row.source,
            domain: row.domain,
            category: row.category,
            extra,
        })
    }
}

impl PartitionRecord for CuratedRecord {
    const COLUMNS: &'static [Column] = &[Column::TextLen];

    fn to_row(&self) -> Result<PartitionRow> {
        Ok(PartitionRow {
            id: self.id.clone(),
            ts: self.ts.clone(),
            text: self.text.clone(),
            source: self.source.clone(),
            domain: self.domain.clone(),
            category: self.category.clone(),
            text_len: Some(self.text_len as u64),
            failure_reason: None,
            extra: None,
        })
    }

    fn from_row(row: PartitionRow) -> Result<Self> {
        row.into_curated()
    }
}

impl PartitionRecord for RejectedRecord {
    const COLUMNS: &'static [Column] = &[Column::TextLen, Column::FailureReason];

    fn to_row(&self) -> Result<PartitionRow> {
        Ok(PartitionRow {
            failure_reason: Some(self.failure_reason.to_string()),
            ..self.record.to_row()?
        })
    }

    fn from_row(mut row: PartitionRow) -> Result<Self> {
        let failure_reason = row
            .failure_reason
            .take()
            .ok_or_else(|| QuarryError::Persistence("row is missing failure_reason".to_string()))?
            .parse::<ReasonSet>()
            .map_err(QuarryError::Persistence)?;
        Ok(RejectedRecord {
            record: row.into_curated()?,
            failure_reason,
        })
    }
}

fn write_json_lines<T: Serialize>(file: File, path: &Path, records: &[T]) -> Result<()> {
    let mut writer = BufWriter::new(file);
    for record in records {
        serde_json::to_writer(&mut writer, record)?;
        writer.write_all(b"\n").map_err(|e| QuarryError::io(path, e))?;
    }
    let file = writer
        .into_inner()
        .map_err(|e| QuarryError::io(path, e.into_error()))?;
    file.sync_all().map_err(|e| QuarryError::io(path, e))
}

fn read_json_lines<T: DeserializeOwned>(file: File, path: &Path) -> Result<Vec<T>> {
    let reader = BufReader::new(file);
    let mut records = Vec::new();
    for (idx, line) in reader.lines().enumerate() {
        let line = line.map_err(|e| QuarryError::io(path, e))?;
        if line.trim().is_empty() {
            continue;
        }
        let record = serde_json::from_str(&line).map_err(|e| {
            QuarryError::Persistence(format!(
                "Failed to parse line {} of '{}': {}",
                idx + 1,
                path.display(),
                e
            ))
        })?;
        records.push(record);
    }
    Ok(records)
}
