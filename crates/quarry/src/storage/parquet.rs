//! Parquet encoding for partitions.
//!
//! Canonical fields, `failure_reason` and `extra` are nullable Utf8
//! columns; `text_len` is a nullable UInt64 column.

use std::fs::File;
use std::path::Path;
use std::sync::Arc;

use arrow::array::{Array, ArrayRef, StringArray, UInt64Array};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use parquet::arrow::ArrowWriter;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;

use crate::error::{QuarryError, Result};
use crate::model::CANONICAL_FIELDS;

use super::format::{Column, PartitionRow};

fn parquet_error(e: impl std::fmt::Display) -> QuarryError {
    QuarryError::Parquet(e.to_string())
}

pub(super) fn write_rows(file: File, path: &Path, columns: &[Column], rows: &[PartitionRow]) -> Result<()> {
    let mut fields = Vec::with_capacity(CANONICAL_FIELDS.len() + columns.len());
    let mut arrays: Vec<ArrayRef> = Vec::with_capacity(fields.capacity());

    for name in CANONICAL_FIELDS {
        fields.push(Field::new(name, DataType::Utf8, true));
        let values: Vec<Option<&str>> = rows.iter().map(|r| r.canonical(name)).collect();
        arrays.push(Arc::new(StringArray::from(values)));
    }

    for column in columns {
        match column {
            Column::TextLen => {
                fields.push(Field::new(column.name(), DataType::UInt64, true));
                let values: Vec<Option<u64>> = rows.iter().map(|r| r.text_len).collect();
                arrays.push(Arc::new(UInt64Array::from(values)));
            }
            Column::FailureReason => {
                fields.push(Field::new(column.name(), DataType::Utf8, true));
                let values: Vec<Option<&str>> =
                    rows.iter().map(|r| r.failure_reason.as_deref()).collect();
                arrays.push(Arc::new(StringArray::from(values)));
            }
            Column::Extra => {
                fields.push(Field::new(column.name(), DataType::Utf8, true));
                let values: Vec<Option<&str>> = rows.iter().map(|r| r.extra.as_deref()).collect();
                arrays.push(Arc::new(StringArray::from(values)));
            }
        }
    }

    let schema = Arc::new(Schema::new(fields));
    let batch = RecordBatch::try_new(schema.clone(), arrays).map_err(parquet_error)?;

    let mut writer = ArrowWriter::try_new(file, schema, None).map_err(parquet_error)?;
    writer.write(&batch).map_err(parquet_error)?;
    let file = writer.into_inner().map_err(parquet_error)?;
    file.sync_all().map_err(|e| QuarryError::io(path, e))
}

pub(super) fn read_rows(file: File) -> Result<Vec<PartitionRow>> {
    let reader = ParquetRecordBatchReaderBuilder::try_new(file)
        .map_err(parquet_error)?
        .build()
        .map_err(parquet_error)?;

    let mut rows = Vec::new();
    for batch in reader {
        let batch = batch.map_err(parquet_error)?;
        let id = string_column(&batch, "id");
        let ts = string_column(&batch, "ts");
        let text = string_column(&batch, "text");
        let source = string_column(&batch, "source");
        let domain = string_column(&batch, "domain");
        let category = string_column(&batch, "category");
        let failure_reason = string_column(&batch, Column::FailureReason.name());
        let extra = string_column(&batch, Column::Extra.name());
        let text_len = batch
            .column_by_name(Column::TextLen.name())
            .and_then(|c| c.as_any().downcast_ref::<UInt64Array>());

        for i in 0..batch.num_rows() {
            rows.push(PartitionRow {
                id: string_at(id, i),
                ts: string_at(ts, i),
                text: string_at(text, i),
                source: string_at(source, i),
                domain: string_at(domain, i),
                category: string_at(category, i),
                text_len: text_len.filter(|c| c.is_valid(i)).map(|c| c.value(i)),
                failure_reason: string_at(failure_reason, i),
                extra: string_at(extra, i),
            });
        }
    }

    Ok(rows)
}

fn string_column<'a>(batch: &'a RecordBatch, name: &str) -> Option<&'a StringArray> {
    batch
        .column_by_name(name)
        .and_then(|c| c.as_any().downcast_ref::<StringArray>())
}

fn string_at(column: Option<&StringArray>, i: usize) -> Option<String> {
    column
        .filter(|c| c.is_valid(i))
        .map(|c| c.value(i).to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{CuratedRecord, Record, RejectedRecord};
    use crate::storage::{PartitionFormat, PartitionRecord};
    use crate::validation::{ReasonCode, ReasonSet};
    use tempfile::TempDir;

    fn round_trip<T: PartitionRecord + PartialEq + std::fmt::Debug>(records: &[T]) {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("data.parquet");

        let file = File::create(&path).unwrap();
        PartitionFormat::Parquet.encode(file, &path, records).unwrap();

        let file = File::open(&path).unwrap();
        let back: Vec<T> = PartitionFormat::Parquet.decode(file, &path).unwrap();
        assert_eq!(back, records);
    }

    #[test]
    fn test_bronze_round_trip() {
        let mut with_extra = Record::new("hello").with_id("1");
        with_extra
            .extra
            .insert("lang_hint".to_string(), serde_json::json!("en"));
        round_trip(&[with_extra, Record::default()]);
    }

    #[test]
    fn test_rejects_round_trip() {
        let record = CuratedRecord::from_record(&Record::new("tiny").with_source("web"));
        round_trip(&[RejectedRecord {
            record,
            failure_reason: ReasonSet::from_codes([ReasonCode::Length]),
        }]);
    }
}
