//! Validation: classifies every record pass/fail with reasons.

mod detectors;
mod mock;
mod reason;
mod validator;

pub use detectors::{
    parse_word_list, LanguageDetector, ProfanityDetector, WhatlangDetector, WordListFilter,
};
pub use mock::MockLanguageDetector;
pub use reason::{ReasonCode, ReasonSet};
pub use validator::{DuplicateTracker, ValidationOutcome, ValidationReport, Validator};
