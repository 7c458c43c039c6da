//! Deterministic language detector for testing.

use crate::error::{QuarryError, Result};

use super::detectors::LanguageDetector;

#[derive(Debug, Clone)]
enum MockOutcome {
    Language(String),
    Ambiguous,
    Failure,
}

/// Language detector that returns predictable answers for testing.
///
/// Every text classifies as the default language unless it contains one
/// of the configured markers, in which case the first matching marker's
/// outcome wins.
#[derive(Debug, Clone)]
pub struct MockLanguageDetector {
    default: Option<String>,
    overrides: Vec<(String, MockOutcome)>,
}

impl MockLanguageDetector {
    /// Classify everything as `language`.
    pub fn new(language: impl Into<String>) -> Self {
        Self {
            default: Some(language.into()),
            overrides: Vec::new(),
        }
    }

    /// Classify nothing: every text is ambiguous.
    pub fn ambiguous() -> Self {
        Self {
            default: None,
            overrides: Vec::new(),
        }
    }

    /// Texts containing `marker` classify as `language`.
    pub fn with_language(mut self, marker: impl Into<String>, language: impl Into<String>) -> Self {
        self.overrides
            .push((marker.into(), MockOutcome::Language(language.into())));
        self
    }

    /// Texts containing `marker` are ambiguous.
    pub fn with_ambiguous(mut self, marker: impl Into<String>) -> Self {
        self.overrides.push((marker.into(), MockOutcome::Ambiguous));
        self
    }

    /// Texts containing `marker` make the detector fail.
    pub fn with_failure(mut self, marker: impl Into<String>) -> Self {
        self.overrides.push((marker.into(), MockOutcome::Failure));
        self
    }
}

impl Default for MockLanguageDetector {
    fn default() -> Self {
        Self::new("eng")
    }
}

impl LanguageDetector for MockLanguageDetector {
    fn detect(&self, text: &str) -> Result<Option<String>> {
        let outcome = self
            .overrides
            .iter()
            .find(|(marker, _)| text.contains(marker.as_str()))
            .map(|(_, outcome)| outcome);

        match outcome {
            Some(MockOutcome::Language(lang)) => Ok(Some(lang.clone())),
            Some(MockOutcome::Ambiguous) => Ok(None),
            Some(MockOutcome::Failure) => Err(QuarryError::Detector(format!(
                "mock detector refused: {}",
                text
            ))),
            None => Ok(self.default.clone()),
        }
    }

    fn name(&self) -> &str {
        "mock"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_language() {
        let detector = MockLanguageDetector::default();
        assert_eq!(detector.detect("anything").unwrap().as_deref(), Some("eng"));
    }

    #[test]
    fn test_overrides() {
        let detector = MockLanguageDetector::new("eng")
            .with_language("hola", "spa")
            .with_ambiguous("???")
            .with_failure("boom");

        assert_eq!(detector.detect("hola amigo").unwrap().as_deref(), Some("spa"));
        assert_eq!(detector.detect("what ???").unwrap(), None);
        assert!(detector.detect("boom").is_err());
        assert!(MockLanguageDetector::ambiguous().detect("x").unwrap().is_none());
    }
}
