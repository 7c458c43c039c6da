//! Per-record rule engine.

use std::collections::HashSet;
use std::sync::Arc;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::{debug, warn};

use crate::config::ValidationConfig;
use crate::error::Result;
use crate::model::{Batch, CuratedRecord, RejectedRecord};

use super::detectors::{LanguageDetector, ProfanityDetector, WhatlangDetector, WordListFilter};
use super::reason::{ReasonCode, ReasonSet};

/// Decision for one record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationOutcome {
    /// True iff no rule failed.
    pub passed: bool,
    /// Failed rules, in rule order. Empty iff `passed`.
    pub reasons: ReasonSet,
}

/// Result of validating a batch.
///
/// Every input record lands in exactly one of the two lists, in the
/// order it appeared in the batch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationReport {
    pub passed: Vec<CuratedRecord>,
    pub failed: Vec<RejectedRecord>,
}

impl ValidationReport {
    /// Number of records validated.
    pub fn total(&self) -> usize {
        self.passed.len() + self.failed.len()
    }

    /// Count of failed records carrying each reason code.
    ///
    /// Keys appear in rule order; codes nobody failed are omitted.
    pub fn reason_counts(&self) -> IndexMap<ReasonCode, usize> {
        let mut counts: IndexMap<ReasonCode, usize> = IndexMap::new();
        for code in ReasonCode::RULES.into_iter().chain(std::iter::once(ReasonCode::Unknown)) {
            let n = self
                .failed
                .iter()
                .filter(|r| r.failure_reason.contains(code))
                .count();
            if n > 0 {
                counts.insert(code, n);
            }
        }
        counts
    }
}

/// Rule results for one record, each evaluated independently.
#[derive(Debug, Clone, Copy)]
struct RuleChecks {
    length_ok: bool,
    language_ok: bool,
    profane: bool,
    duplicate: bool,
}

impl RuleChecks {
    fn all_pass(&self) -> bool {
        self.length_ok && self.language_ok && !self.profane && !self.duplicate
    }

    fn reasons(&self) -> ReasonSet {
        let mut reasons = ReasonSet::new();
        if !self.length_ok {
            reasons.insert(ReasonCode::Length);
        }
        if !self.language_ok {
            reasons.insert(ReasonCode::Language);
        }
        if self.profane {
            reasons.insert(ReasonCode::Profanity);
        }
        if self.duplicate {
            reasons.insert(ReasonCode::Duplicate);
        }
        reasons
    }
}

/// Tracks `(source, text)` keys seen earlier in the current batch.
#[derive(Debug, Default)]
pub struct DuplicateTracker {
    seen: HashSet<[u8; 32]>,
}

impl DuplicateTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the key; returns true if it was already seen.
    pub fn observe(&mut self, source: Option<&str>, text: Option<&str>) -> bool {
        !self.seen.insert(fingerprint(source, text))
    }
}

fn fingerprint(source: Option<&str>, text: Option<&str>) -> [u8; 32] {
    let mut hasher = Sha256::new();
    for part in [source, text] {
        match part {
            Some(value) => {
                hasher.update([1u8]);
                hasher.update((value.len() as u64).to_le_bytes());
                hasher.update(value.as_bytes());
            }
            None => hasher.update([0u8]),
        }
    }
    hasher.finalize().into()
}

/// Classifies records pass/fail against the length, language, profanity,
/// and in-batch duplicate rules.
///
/// Detection capabilities are injected at construction, so independent
/// validators can run side by side with different resources.
pub struct Validator {
    config: ValidationConfig,
    language: Arc<dyn LanguageDetector>,
    profanity: Arc<dyn ProfanityDetector>,
}

impl Validator {
    /// Create a validator with explicit detectors.
    pub fn new(
        config: ValidationConfig,
        language: impl LanguageDetector + 'static,
        profanity: impl ProfanityDetector + 'static,
    ) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            language: Arc::new(language),
            profanity: Arc::new(profanity),
        })
    }

    /// Create a validator with the default detectors.
    ///
    /// Loads the profanity word list named in the configuration, or the
    /// built-in list when none is configured. Language detection uses the
    /// configured candidate languages and confidence threshold.
    pub fn with_defaults(config: ValidationConfig) -> Result<Self> {
        config.validate()?;
        let language = WhatlangDetector::from_config(&config)?;
        let profanity = match &config.profanity_words {
            Some(path) => WordListFilter::from_file(path)?,
            None => WordListFilter::builtin()?,
        };
        Self::new(config, language, profanity)
    }

    /// Thresholds in use.
    pub fn config(&self) -> &ValidationConfig {
        &self.config
    }

    /// Length rule: inclusive bounds on the trimmed character count.
    pub fn check_length(&self, text_len: usize) -> bool {
        (self.config.min_text_len..=self.config.max_text_len).contains(&text_len)
    }

    /// Language rule. Ambiguous text and detector errors both fail.
    pub fn check_language(&self, text: &str) -> bool {
        match self.language.detect(text) {
            Ok(Some(lang)) => lang == self.config.target_language,
            Ok(None) => false,
            Err(e) => {
                debug!(detector = self.language.name(), error = %e, "language detection failed");
                false
            }
        }
    }

    /// Profanity rule: true when the text is clean.
    pub fn check_profanity(&self, text: &str) -> bool {
        !self.profanity.contains_profanity(text)
    }

    /// Evaluate one record against every rule.
    ///
    /// The duplicate rule depends on what `tracker` has already seen, so
    /// records must be evaluated in batch order.
    pub fn evaluate(&self, record: &CuratedRecord, tracker: &mut DuplicateTracker) -> ValidationOutcome {
        let text = record.text();
        let checks = RuleChecks {
            length_ok: self.check_length(record.text_len),
            language_ok: self.check_language(text),
            profane: !self.check_profanity(text),
            duplicate: tracker.observe(record.source.as_deref(), record.text.as_deref()),
        };

        let passed = checks.all_pass();
        let mut reasons = checks.reasons();
        if !passed && reasons.is_empty() {
            warn!(id = ?record.id, "record excluded without a named reason");
            reasons.insert(ReasonCode::Unknown);
        }

        ValidationOutcome { passed, reasons }
    }

    /// Validate a batch, splitting it into passed and failed records.
    pub fn validate(&self, batch: &Batch) -> ValidationReport {
        let mut tracker = DuplicateTracker::new();
        let mut report = ValidationReport::default();

        for raw in batch {
            let record = CuratedRecord::from_record(raw);
            let outcome = self.evaluate(&record, &mut tracker);
            if outcome.passed {
                report.passed.push(record);
            } else {
                report.failed.push(RejectedRecord {
                    record,
                    failure_reason: outcome.reasons,
                });
            }
        }

        report
    }
}

impl std::fmt::Debug for Validator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Validator")
            .field("config", &self.config)
            .field("language", &self.language.name())
            .field("profanity", &self.profanity.name())
            .finish()
    }
}
