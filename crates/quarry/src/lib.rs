//! Quarry: quality-tiered curation of streaming text records.
//!
//! Each run drains a bounded batch from an input queue, snapshots it
//! as-received (bronze), classifies every record against a fixed rule set,
//! and writes passed records (silver, gold) and failed records with their
//! reasons (rejects) before appending one line to an append-only manifest.
//!
//! # Core Principles
//!
//! - **Exhaustive**: every ingested record lands in exactly one of silver or rejects
//! - **Explainable**: every rejected record carries the rules it failed
//! - **Immutable history**: run partitions and manifest lines are never rewritten
//!
//! # Example
//!
//! ```no_run
//! use quarry::{Pipeline, PipelineConfig};
//!
//! let config = PipelineConfig::load("quarry.toml").unwrap();
//! let pipeline = Pipeline::from_config(&config).unwrap();
//! let report = pipeline.run_topic().unwrap();
//!
//! println!("run {}: {} in, {} passed", report.entry.run_ts, report.entry.ingested, report.entry.passed);
//! ```

pub mod config;
pub mod error;
pub mod intake;
pub mod manifest;
pub mod model;
pub mod observability;
pub mod storage;
pub mod validation;

mod pipeline;
mod run_id;

pub use config::{IntakeConfig, PipelineConfig, StorageConfig, ValidationConfig};
pub use error::{QuarryError, Result};
pub use intake::{BatchIntake, FileTopic, MemoryQueue, MessageQueue};
pub use manifest::{ManifestEntry, ManifestLog};
pub use model::{Batch, CuratedRecord, Record, RejectedRecord};
pub use pipeline::{Pipeline, RunError, RunReport, Stage};
pub use run_id::{RunId, DS_FORMAT, RUN_TS_FORMAT};
pub use storage::{GoldPolicy, PartitionFormat};
pub use validation::{ReasonCode, ReasonSet, ValidationReport, Validator};
