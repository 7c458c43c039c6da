//! One run: intake, bronze, validate, tiers, manifest.

use std::fmt;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use thiserror::Error;
use tracing::{info, warn};

use crate::config::{IntakeConfig, PipelineConfig, StorageConfig};
use crate::error::QuarryError;
use crate::intake::{BatchIntake, FileTopic, IntakeStats, MessageQueue};
use crate::manifest::{ManifestEntry, ManifestLog};
use crate::observability::run_span;
use crate::run_id::RunId;
use crate::storage::{BronzeWriter, Layout, TierPaths, TierWriter};
use crate::validation::{ValidationReport, Validator};

/// Pipeline stage, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Intake,
    Bronze,
    Validate,
    Tiers,
    Manifest,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Intake => "intake",
            Stage::Bronze => "bronze",
            Stage::Validate => "validate",
            Stage::Tiers => "tiers",
            Stage::Manifest => "manifest",
        };
        f.write_str(name)
    }
}

/// A run that aborted. Partitions written before `stage` stay on disk
/// and the run has no manifest entry.
#[derive(Debug, Error)]
#[error("run {run_ts} failed at {stage} stage: {source}")]
pub struct RunError {
    pub run_ts: RunId,
    pub stage: Stage,
    #[source]
    pub source: QuarryError,
}

impl RunError {
    fn at(run_ts: RunId, stage: Stage) -> impl FnOnce(QuarryError) -> Self {
        move |source| Self {
            run_ts,
            stage,
            source,
        }
    }
}

/// Outcome of a successful run.
#[derive(Debug, Clone)]
pub struct RunReport {
    /// The line appended to the manifest.
    pub entry: ManifestEntry,
    /// Messages intake skipped.
    pub intake: IntakeStats,
    /// Every record with its classification.
    pub validation: ValidationReport,
    /// Partition directories, and the gold record count.
    pub tiers: TierPaths,
}

impl RunReport {
    pub fn run_ts(&self) -> RunId {
        self.entry.run_ts
    }
}

/// Sequences the stages of a run.
///
/// Stages run strictly in order and the first failure aborts the run.
#[derive(Debug)]
pub struct Pipeline {
    intake: BatchIntake,
    bronze: BronzeWriter,
    validator: Validator,
    tiers: TierWriter,
    manifest: ManifestLog,
    layout: Layout,
    topic: Option<IntakeConfig>,
}

impl Pipeline {
    /// Assemble a pipeline from its parts, writing under `storage`.
    pub fn new(intake: BatchIntake, validator: Validator, storage: &StorageConfig) -> Self {
        let layout = Layout::new(&storage.data_dir);
        Self {
            intake,
            bronze: BronzeWriter::new(layout.clone(), storage.format),
            validator,
            tiers: TierWriter::new(layout.clone(), storage.format, storage.gold_policy),
            manifest: ManifestLog::new(storage.manifest_path()),
            layout,
            topic: None,
        }
    }

    /// Build a pipeline with the default detectors, reading from the
    /// configured file topic.
    pub fn from_config(config: &PipelineConfig) -> crate::Result<Self> {
        config.validate()?;
        let validator = Validator::with_defaults(config.validation.clone())?;
        Ok(Self::new(BatchIntake::from_config(&config.intake), validator, &config.storage)
            .with_topic(config.intake.clone()))
    }

    /// Topic drained by [`run_topic`](Self::run_topic).
    pub fn with_topic(mut self, topic: IntakeConfig) -> Self {
        self.topic = Some(topic);
        self
    }

    pub fn layout(&self) -> &Layout {
        &self.layout
    }

    pub fn manifest(&self) -> &ManifestLog {
        &self.manifest
    }

    pub fn validator(&self) -> &Validator {
        &self.validator
    }

    /// Run once against `queue`, identified by the current time.
    pub fn run(&self, queue: &mut dyn MessageQueue) -> Result<RunReport, RunError> {
        self.run_at(queue, Utc::now())
    }

    /// Run once against the configured file topic.
    pub fn run_topic(&self) -> Result<RunReport, RunError> {
        let started = Utc::now();
        let run = RunId::from_datetime(started);
        let config = self.topic.as_ref().ok_or_else(|| {
            RunError::at(run, Stage::Intake)(QuarryError::Config(
                "no input topic configured".to_string(),
            ))
        })?;
        let mut queue = FileTopic::from_config(config).map_err(RunError::at(run, Stage::Intake))?;
        self.run_at(&mut queue, started)
    }

    /// Run once with the identity derived from `started`.
    pub fn run_at(
        &self,
        queue: &mut dyn MessageQueue,
        started: DateTime<Utc>,
    ) -> Result<RunReport, RunError> {
        let run = RunId::from_datetime(started);
        let span = run_span(&run);
        let _guard = span.enter();
        info!(data_dir = %self.layout.root().display(), "run started");

        let (batch, mut intake) = self.intake.drain_with_stats(queue);

        let bronze: PathBuf = self
            .bronze
            .write(&batch, &run)
            .map_err(RunError::at(run, Stage::Bronze))?;

        // Only acknowledge what bronze holds; an uncommitted batch is redelivered.
        match queue.commit() {
            Ok(()) => intake.committed = true,
            Err(e) => warn!(queue = queue.name(), error = %e, "failed to commit queue offset"),
        }

        let validation = self.validator.validate(&batch);
        info!(
            stage = %Stage::Validate,
            passed = validation.passed.len(),
            rejected = validation.failed.len(),
            "batch validated"
        );

        let tiers = self
            .tiers
            .write(&validation, &run)
            .map_err(RunError::at(run, Stage::Tiers))?;

        let entry = ManifestEntry::new(run, &validation, &bronze, &tiers);
        self.manifest
            .append(&entry)
            .map_err(RunError::at(run, Stage::Manifest))?;

        info!(
            ingested = entry.ingested,
            passed = entry.passed,
            rejected = entry.rejected,
            "run complete"
        );

        Ok(RunReport {
            entry,
            intake,
            validation,
            tiers,
        })
    }
}
