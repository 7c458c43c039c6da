//! Pluggable detection capabilities used by the language and profanity rules.

use std::fs;
use std::path::Path;

use regex::Regex;
use whatlang::{Detector, Lang};

use crate::config::ValidationConfig;
use crate::error::{QuarryError, Result};

/// Identifies the language of a text.
///
/// Implementations must be thread-safe (Send + Sync) so one validator
/// can be shared across runs.
pub trait LanguageDetector: Send + Sync {
    /// Detect the language of `text`.
    ///
    /// # Returns
    /// The ISO 639-3 code (e.g. `"eng"`), or `None` when the text is too
    /// short or ambiguous to classify.
    fn detect(&self, text: &str) -> Result<Option<String>>;

    /// Name of this detector (for logging/debugging).
    fn name(&self) -> &str;
}

/// Decides whether a text contains profane content.
pub trait ProfanityDetector: Send + Sync {
    /// True when `text` contains profanity.
    fn contains_profanity(&self, text: &str) -> bool;

    /// Name of this detector (for logging/debugging).
    fn name(&self) -> &str;
}

/// Trigram-based language identification backed by `whatlang`.
///
/// Classification can be restricted to a set of candidate languages. A
/// text in some other language classifies as the closest candidate.
#[derive(Debug, Clone)]
pub struct WhatlangDetector {
    detector: Detector,
    min_confidence: f64,
}

impl WhatlangDetector {
    /// Create a detector over every language `whatlang` knows that
    /// accepts any classification.
    pub fn new() -> Self {
        Self {
            detector: Detector::new(),
            min_confidence: 0.0,
        }
    }

    /// Create a detector that only chooses between `codes` (ISO 639-3).
    ///
    /// An empty list means every language. Unknown codes are a
    /// configuration error.
    pub fn with_candidates<I, S>(codes: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut langs = Vec::new();
        for code in codes {
            let code = code.as_ref().trim();
            let lang = Lang::from_code(code).ok_or_else(|| {
                QuarryError::Config(format!("unknown language code '{}'", code))
            })?;
            langs.push(lang);
        }

        let detector = if langs.is_empty() {
            Detector::new()
        } else {
            Detector::with_allowlist(langs)
        };
        Ok(Self {
            detector,
            min_confidence: 0.0,
        })
    }

    /// Build the detector described by the validation settings.
    pub fn from_config(config: &ValidationConfig) -> Result<Self> {
        Ok(Self::with_candidates(&config.candidate_languages)?
            .with_min_confidence(config.min_language_confidence))
    }

    /// Treat classifications below `confidence` (0.0-1.0) as ambiguous.
    pub fn with_min_confidence(mut self, confidence: f64) -> Self {
        self.min_confidence = confidence.clamp(0.0, 1.0);
        self
    }
}

impl Default for WhatlangDetector {
    fn default() -> Self {
        Self::new()
    }
}

impl LanguageDetector for WhatlangDetector {
    fn detect(&self, text: &str) -> Result<Option<String>> {
        Ok(self
            .detector
            .detect(text)
            .filter(|info| info.confidence() >= self.min_confidence)
            .map(|info| info.lang().code().to_string()))
    }

    fn name(&self) -> &str {
        "whatlang"
    }
}

/// Words flagged by [`WordListFilter::builtin`].
const BUILTIN_WORDS: &[&str] = &[
    "arse",
    "arsehole",
    "asshole",
    "bastard",
    "bitch",
    "bollocks",
    "bullshit",
    "cunt",
    "dickhead",
    "fuck",
    "fucked",
    "fucker",
    "fucking",
    "motherfucker",
    "piss",
    "pissed",
    "shit",
    "shitty",
    "slut",
    "twat",
    "wanker",
    "whore",
];

/// Whole-word, case-insensitive matcher over a fixed word list.
///
/// The list is loaded once when the filter is built and injected into
/// the validator; nothing is read from global state.
#[derive(Debug, Clone)]
pub struct WordListFilter {
    pattern: Option<Regex>,
    word_count: usize,
}

impl WordListFilter {
    /// Build a filter from a list of words.
    ///
    /// Blank entries are ignored. An empty list never matches.
    pub fn new<I, S>(words: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut words: Vec<String> = words
            .into_iter()
            .map(|w| w.as_ref().trim().to_lowercase())
            .filter(|w| !w.is_empty())
            .collect();
        words.sort();
        words.dedup();
        // Longest first so alternation prefers the most specific word.
        words.sort_by(|a, b| b.len().cmp(&a.len()).then_with(|| a.cmp(b)));

        let word_count = words.len();
        if words.is_empty() {
            return Ok(Self {
                pattern: None,
                word_count,
            });
        }

        let alternation = words
            .iter()
            .map(|w| regex::escape(w))
            .collect::<Vec<_>>()
            .join("|");
        let pattern = Regex::new(&format!(r"(?i)\b(?:{})\b", alternation))?;

        Ok(Self {
            pattern: Some(pattern),
            word_count,
        })
    }

    /// Filter using the built-in English word list.
    pub fn builtin() -> Result<Self> {
        Self::new(BUILTIN_WORDS.iter().copied())
    }

    /// Load a newline-delimited word list. Lines starting with `#` are comments.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|e| QuarryError::io(path, e))?;
        Self::new(parse_word_list(&contents))
    }

    /// Number of distinct words in the list.
    pub fn word_count(&self) -> usize {
        self.word_count
    }
}

impl ProfanityDetector for WordListFilter {
    fn contains_profanity(&self, text: &str) -> bool {
        self.pattern.as_ref().is_some_and(|p| p.is_match(text))
    }

    fn name(&self) -> &str {
        "word_list"
    }
}

/// Split word-list file contents into entries, skipping comments and blanks.
pub fn parse_word_list(contents: &str) -> Vec<String> {
    contents
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(str::to_string)
        .collect()
}
