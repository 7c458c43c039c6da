//! Pipeline configuration, supplied at startup.
//!
//! Every field has a default, so an empty TOML file (or no file at all)
//! yields a working configuration:
//!
//! ```toml
//! [storage]
//! data_dir = "data"
//! format = "jsonl"
//! gold_policy = "replace"
//!
//! [intake]
//! queue_dir = "queue"
//! topic = "raw_text"
//! max_records = 1500
//! timeout_secs = 30
//!
//! [validation]
//! min_text_len = 20
//! max_text_len = 4000
//! target_language = "eng"
//! candidate_languages = ["eng", "fra", "ita", "por", "rus", "cmn", "jpn", "ara", "hin"]
//! min_language_confidence = 0.0
//! ```

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{QuarryError, Result};
use crate::storage::{GoldPolicy, PartitionFormat};

/// Top-level configuration for a pipeline run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PipelineConfig {
    /// Where partitions and the manifest live.
    pub storage: StorageConfig,
    /// Queue location and intake bounds.
    pub intake: IntakeConfig,
    /// Rule thresholds and detector resources.
    pub validation: ValidationConfig,
}

/// Storage configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StorageConfig {
    /// Base directory for the bronze/silver/rejects/gold partitions.
    pub data_dir: PathBuf,
    /// Manifest log location (default: `<data_dir>/manifests/versions.jsonl`).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub manifest_path: Option<PathBuf>,
    /// Encoding for partition data files.
    pub format: PartitionFormat,
    /// How same-day runs contribute to the gold partition.
    pub gold_policy: GoldPolicy,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            manifest_path: None,
            format: PartitionFormat::default(),
            gold_policy: GoldPolicy::default(),
        }
    }
}

impl StorageConfig {
    /// Resolved manifest log path.
    pub fn manifest_path(&self) -> PathBuf {
        self.manifest_path.clone().unwrap_or_else(|| {
            self.data_dir.join("manifests").join("versions.jsonl")
        })
    }
}

/// Intake configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct IntakeConfig {
    /// Directory holding topic logs and consumer offsets.
    pub queue_dir: PathBuf,
    /// Topic to drain.
    pub topic: String,
    /// Consumer group whose offset is advanced.
    pub group: String,
    /// Maximum records per batch.
    pub max_records: usize,
    /// Wall-clock budget for one intake, in seconds.
    pub timeout_secs: u64,
    /// Longest single wait on the queue, in milliseconds.
    pub poll_interval_ms: u64,
}

impl Default for IntakeConfig {
    fn default() -> Self {
        Self {
            queue_dir: PathBuf::from("queue"),
            topic: "raw_text".to_string(),
            group: "dq".to_string(),
            max_records: 1500,
            timeout_secs: 30,
            poll_interval_ms: 200,
        }
    }
}

impl IntakeConfig {
    /// Intake time budget.
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Single-poll wait.
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(1))
    }
}

/// Default detector candidates. Latin-script texts in other languages
/// classify as the closest of these, so they still miss an `eng` target.
pub const DEFAULT_CANDIDATE_LANGUAGES: &[&str] =
    &["eng", "fra", "ita", "por", "rus", "cmn", "jpn", "ara", "hin"];

/// Validation thresholds and detector resources.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ValidationConfig {
    /// Shortest accepted trimmed text, inclusive.
    pub min_text_len: usize,
    /// Longest accepted trimmed text, inclusive.
    pub max_text_len: usize,
    /// ISO 639-3 code texts must classify as.
    pub target_language: String,
    /// Languages the detector chooses between (ISO 639-3). Empty means
    /// every language the detector knows.
    pub candidate_languages: Vec<String>,
    /// Classifications below this confidence (0.0-1.0) count as ambiguous.
    pub min_language_confidence: f64,
    /// Newline-delimited profanity word list (built-in list when absent).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub profanity_words: Option<PathBuf>,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            min_text_len: 20,
            max_text_len: 4000,
            target_language: "eng".to_string(),
            candidate_languages: DEFAULT_CANDIDATE_LANGUAGES
                .iter()
                .map(|code| code.to_string())
                .collect(),
            min_language_confidence: 0.0,
            profanity_words: None,
        }
    }
}

impl ValidationConfig {
    /// Check that the thresholds make sense.
    pub fn validate(&self) -> Result<()> {
        if self.min_text_len > self.max_text_len {
            return Err(QuarryError::Config(format!(
                "min_text_len ({}) exceeds max_text_len ({})",
                self.min_text_len, self.max_text_len
            )));
        }
        if self.target_language.trim().is_empty() {
            return Err(QuarryError::Config(
                "target_language must not be empty".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&self.min_language_confidence) {
            return Err(QuarryError::Config(format!(
                "min_language_confidence ({}) must be between 0.0 and 1.0",
                self.min_language_confidence
            )));
        }
        if !self.candidate_languages.is_empty()
            && !self.candidate_languages.contains(&self.target_language)
        {
            return Err(QuarryError::Config(format!(
                "target_language '{}' is not among candidate_languages",
                self.target_language
            )));
        }
        Ok(())
    }
}

impl PipelineConfig {
    /// Parse configuration from TOML text.
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        let config: PipelineConfig = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|e| QuarryError::io(path, e))?;
        Self::from_toml_str(&contents)
    }

    /// Check the whole configuration for values no run could use.
    pub fn validate(&self) -> Result<()> {
        if self.intake.max_records == 0 {
            return Err(QuarryError::Config(
                "intake.max_records must be at least 1".to_string(),
            ));
        }
        if self.intake.topic.trim().is_empty() {
            return Err(QuarryError::Config("intake.topic must not be empty".to_string()));
        }
        self.validation.validate()
    }
}
