//! Records after validation: the silver/gold and rejects shapes.

use serde::{Deserialize, Serialize};

use crate::validation::ReasonSet;

use super::record::Record;

/// A validated record carrying the fields downstream consumers need.
///
/// The text is whitespace-trimmed and `text_len` counts its characters.
/// Non-canonical keys seen at intake are not carried past bronze.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CuratedRecord {
    pub id: Option<String>,
    pub ts: Option<String>,
    pub text: Option<String>,
    pub source: Option<String>,
    pub domain: Option<String>,
    pub category: Option<String>,
    /// Character count of the trimmed text (0 when the text is missing).
    pub text_len: usize,
}

impl CuratedRecord {
    /// Normalize a raw record: trim the text and derive its length.
    pub fn from_record(record: &Record) -> Self {
        let text = record.text.as_deref().map(|t| t.trim().to_string());
        let text_len = text.as_deref().map_or(0, |t| t.chars().count());

        Self {
            id: record.id.clone(),
            ts: record.ts.clone(),
            text,
            source: record.source.clone(),
            domain: record.domain.clone(),
            category: record.category.clone(),
            text_len,
        }
    }

    /// The trimmed text, or an empty string when missing.
    pub fn text(&self) -> &str {
        self.text.as_deref().unwrap_or_default()
    }
}

/// A record that failed at least one rule, with the reasons it failed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RejectedRecord {
    #[serde(flatten)]
    pub record: CuratedRecord,
    /// Comma-joined reason codes, in rule order.
    pub failure_reason: ReasonSet,
}
