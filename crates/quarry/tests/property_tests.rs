//! Property-based tests for batch validation.
//!
//! These tests use proptest to generate random batches and verify that
//! classification keeps its invariants for any input.
//!
//! # Running Property Tests
//!
//! ```bash
//! cargo test -p quarry --test property_tests
//!
//! # More cases
//! PROPTEST_CASES=10000 cargo test -p quarry --test property_tests
//! ```

use std::collections::HashSet;

use proptest::prelude::*;

use quarry::validation::{MockLanguageDetector, WordListFilter};
use quarry::{Batch, ReasonCode, ReasonSet, Record, ValidationConfig, Validator};

// =============================================================================
// Test Strategies
// =============================================================================

/// Texts around the default length bounds, with some French and profanity.
fn text() -> impl Strategy<Value = Option<String>> {
    let text = prop_oneof![
        "[a-z ]{0,25}",
        "[a-zA-Z ,.]{15,80}",
        " {0,4}[a-z]{17,23} {0,4}",
        Just("bonjour mes amis du monde entier".to_string()),
        Just("what a darn shame this sentence is".to_string()),
        Just("Valid English sentence of sufficient length for passing.".to_string()),
    ];
    prop::option::weighted(0.95, text)
}

fn source() -> impl Strategy<Value = Option<String>> {
    prop::option::of(prop_oneof![Just("web".to_string()), Just("doc".to_string())])
}

/// Batches whose records carry their position as `id`.
fn batch() -> impl Strategy<Value = Batch> {
    prop::collection::vec((text(), source()), 0..40).prop_map(|rows| {
        rows.into_iter()
            .enumerate()
            .map(|(i, (text, source))| Record {
                id: Some(i.to_string()),
                text,
                source,
                ..Record::default()
            })
            .collect()
    })
}

fn validator(min_text_len: usize, max_text_len: usize) -> Validator {
    let config = ValidationConfig {
        min_text_len,
        max_text_len,
        ..ValidationConfig::default()
    };
    Validator::new(
        config,
        MockLanguageDetector::new("eng")
            .with_language("bonjour", "fra")
            .with_ambiguous("zzz"),
        WordListFilter::new(["darn"]).unwrap(),
    )
    .unwrap()
}

fn ids<'a>(ids: impl Iterator<Item = Option<&'a str>>) -> Vec<usize> {
    ids.map(|id| id.unwrap().parse().unwrap()).collect()
}

// =============================================================================
// Properties
// =============================================================================

proptest! {
    /// Every record lands in exactly one output, in batch order.
    #[test]
    fn prop_every_record_classified_once(batch in batch()) {
        let report = validator(20, 4000).validate(&batch);

        prop_assert_eq!(report.total(), batch.len());

        let passed = ids(report.passed.iter().map(|r| r.id.as_deref()));
        let failed = ids(report.failed.iter().map(|r| r.record.id.as_deref()));
        prop_assert!(passed.windows(2).all(|w| w[0] < w[1]));
        prop_assert!(failed.windows(2).all(|w| w[0] < w[1]));

        let mut all: Vec<usize> = passed.into_iter().chain(failed).collect();
        all.sort_unstable();
        prop_assert_eq!(all, (0..batch.len()).collect::<Vec<_>>());
    }

    /// Failed records always name at least one rule, and never `unknown`.
    #[test]
    fn prop_failures_have_named_reasons(batch in batch()) {
        let report = validator(20, 4000).validate(&batch);

        for rejected in &report.failed {
            prop_assert!(!rejected.failure_reason.is_empty());
            prop_assert!(!rejected.failure_reason.contains(ReasonCode::Unknown));
        }
    }

    /// Same batch, same decisions.
    #[test]
    fn prop_validation_is_deterministic(batch in batch()) {
        let validator = validator(20, 4000);
        prop_assert_eq!(validator.validate(&batch), validator.validate(&batch));
    }

    /// Out-of-range length always shows up as `length`, whatever else failed.
    #[test]
    fn prop_length_rule(batch in batch(), min in 0usize..40, span in 0usize..60) {
        let max = min + span;
        let report = validator(min, max).validate(&batch);

        for record in &report.passed {
            prop_assert!(record.text_len >= min && record.text_len <= max);
        }
        for rejected in &report.failed {
            let len = rejected.record.text_len;
            let out_of_range = len < min || len > max;
            prop_assert_eq!(rejected.failure_reason.contains(ReasonCode::Length), out_of_range);
        }
    }

    /// Only repeats of an earlier `(source, text)` are duplicates.
    #[test]
    fn prop_duplicates_counted_by_key(batch in batch()) {
        let report = validator(20, 4000).validate(&batch);

        let distinct: HashSet<(Option<String>, Option<String>)> = report
            .passed
            .iter()
            .map(|r| (r.source.clone(), r.text.clone()))
            .chain(report.failed.iter().map(|r| (r.record.source.clone(), r.record.text.clone())))
            .collect();
        let duplicates = report
            .failed
            .iter()
            .filter(|r| r.failure_reason.contains(ReasonCode::Duplicate))
            .count();

        prop_assert_eq!(duplicates, batch.len() - distinct.len());
    }

    /// The written form of a reason set reads back unchanged.
    #[test]
    fn prop_reason_set_text_form(codes in prop::collection::vec(0usize..4, 0..6)) {
        let set = ReasonSet::from_codes(codes.into_iter().map(|i| ReasonCode::RULES[i]));
        let text = set.to_string();
        prop_assert_eq!(text.parse::<ReasonSet>().unwrap(), set);
    }
}
