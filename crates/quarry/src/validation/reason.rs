//! Reason codes explaining why a record failed validation.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Fixed vocabulary of failure reasons.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReasonCode {
    /// Trimmed text length outside the configured bounds.
    Length,
    /// Text did not classify as the target language.
    Language,
    /// Text matched the profanity detector.
    Profanity,
    /// A record with the same `(source, text)` appeared earlier in the batch.
    Duplicate,
    /// Excluded without any named rule failing. Never expected.
    Unknown,
}

impl ReasonCode {
    /// The named rules, in evaluation order.
    pub const RULES: [ReasonCode; 4] = [
        ReasonCode::Length,
        ReasonCode::Language,
        ReasonCode::Profanity,
        ReasonCode::Duplicate,
    ];

    /// Wire form of the code.
    pub fn as_str(&self) -> &'static str {
        match self {
            ReasonCode::Length => "length",
            ReasonCode::Language => "language",
            ReasonCode::Profanity => "profanity",
            ReasonCode::Duplicate => "duplicate",
            ReasonCode::Unknown => "unknown",
        }
    }
}

impl fmt::Display for ReasonCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReasonCode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "length" => Ok(ReasonCode::Length),
            "language" => Ok(ReasonCode::Language),
            "profanity" => Ok(ReasonCode::Profanity),
            "duplicate" => Ok(ReasonCode::Duplicate),
            "unknown" => Ok(ReasonCode::Unknown),
            other => Err(format!("Unknown reason code: {}", other)),
        }
    }
}

/// Ordered, duplicate-free set of reason codes.
///
/// Codes are kept sorted in rule order so the joined form is stable
/// (`"length,language,profanity,duplicate"`). Serialized as that joined
/// string, which is how rejects partitions store `failure_reason`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct ReasonSet {
    codes: Vec<ReasonCode>,
}

impl ReasonSet {
    /// Create an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a set from codes in any order.
    pub fn from_codes(codes: impl IntoIterator<Item = ReasonCode>) -> Self {
        let mut set = Self::new();
        for code in codes {
            set.insert(code);
        }
        set
    }

    /// Add a code, keeping rule order and ignoring repeats.
    pub fn insert(&mut self, code: ReasonCode) {
        if let Err(pos) = self.codes.binary_search(&code) {
            self.codes.insert(pos, code);
        }
    }

    /// True when no rule failed.
    pub fn is_empty(&self) -> bool {
        self.codes.is_empty()
    }

    /// Number of codes.
    pub fn len(&self) -> usize {
        self.codes.len()
    }

    /// Check membership.
    pub fn contains(&self, code: ReasonCode) -> bool {
        self.codes.binary_search(&code).is_ok()
    }

    /// Codes in rule order.
    pub fn iter(&self) -> impl Iterator<Item = ReasonCode> + '_ {
        self.codes.iter().copied()
    }

    /// True when the set is exactly `{unknown}`.
    pub fn is_unknown(&self) -> bool {
        self.codes == [ReasonCode::Unknown]
    }
}

impl fmt::Display for ReasonSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, code) in self.codes.iter().enumerate() {
            if i > 0 {
                f.write_str(",")?;
            }
            f.write_str(code.as_str())?;
        }
        Ok(())
    }
}

impl FromStr for ReasonSet {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.split(',')
            .filter(|part| !part.trim().is_empty())
            .map(ReasonCode::from_str)
            .collect::<Result<Vec<_>, _>>()
            .map(Self::from_codes)
    }
}

impl Serialize for ReasonSet {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for ReasonSet {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_are_kept_in_rule_order() {
        let set = ReasonSet::from_codes([
            ReasonCode::Duplicate,
            ReasonCode::Length,
            ReasonCode::Duplicate,
        ]);

        assert_eq!(set.len(), 2);
        assert_eq!(set.to_string(), "length,duplicate");
    }

    #[test]
    fn test_parse_joined_form() {
        let set: ReasonSet = "language,profanity".parse().unwrap();
        assert!(set.contains(ReasonCode::Language));
        assert!(set.contains(ReasonCode::Profanity));
        assert!(!set.contains(ReasonCode::Length));

        assert!("".parse::<ReasonSet>().unwrap().is_empty());
        assert!("length,bogus".parse::<ReasonSet>().is_err());
    }

    #[test]
    fn test_unknown_detection() {
        assert!(ReasonSet::from_codes([ReasonCode::Unknown]).is_unknown());
        assert!(!ReasonSet::from_codes([ReasonCode::Length]).is_unknown());
        assert!(!ReasonSet::new().is_unknown());
    }

    #[test]
    fn test_serde_uses_joined_string() {
        let set = ReasonSet::from_codes([ReasonCode::Profanity, ReasonCode::Length]);
        let json = serde_json::to_string(&set).unwrap();
        assert_eq!(json, "\"length,profanity\"");

        let back: ReasonSet = serde_json::from_str(&json).unwrap();
        assert_eq!(back, set);
    }
}
