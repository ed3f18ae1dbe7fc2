//! Character-composition heuristics for telling real text from OCR noise.
//!
//! The checks are tuned for Latin-script prose. They are approximate: a
//! `Good` verdict means "looks like language", not "is correct".

use serde::{Deserialize, Serialize};

/// Punctuation and symbols that appear in ordinary prose and are never
/// counted as unusual.
const COMMON_PUNCTUATION: &[char] = &[
    '.', ',', ';', ':', '!', '?', '\'', '"', '(', ')', '[', ']', '{', '}', '-', '_', '/', '\\',
    '%', '&', '+', '=', '*', '#', '@', '$', '<', '>', '|', '«', '»', '‘', '’', '“', '”', '–',
    '—', '…', '€', '°', '§',
];

/// Thresholds for [`assess_with`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QualityThresholds {
    /// Minimum number of non-whitespace characters.
    pub min_chars: usize,
    /// Minimum share of alphanumeric characters among non-whitespace ones.
    pub min_alnum_ratio: f64,
    /// Token checks only run when the text has more tokens than this.
    pub fragment_token_count: usize,
    /// Maximum share of tokens no longer than `short_token_len`.
    pub max_short_token_ratio: f64,
    pub short_token_len: usize,
    /// Maximum share of unusual symbols over the whole text length.
    pub max_unusual_ratio: f64,
}

impl Default for QualityThresholds {
    fn default() -> Self {
        Self {
            min_chars: 20,
            min_alnum_ratio: 0.60,
            fragment_token_count: 10,
            max_short_token_ratio: 0.50,
            short_token_len: 2,
            max_unusual_ratio: 0.05,
        }
    }
}

/// Outcome of a quality assessment. Only `Good` passes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum QualityVerdict {
    Good,
    TooShort,
    Garbled,
    Fragmented,
    Corrupted,
}

impl QualityVerdict {
    pub fn is_good(self) -> bool {
        self == QualityVerdict::Good
    }
}

/// Whitespace-delimited token count.
pub fn word_count(text: &str) -> usize {
    text.split_whitespace().count()
}

/// Assess `text` against the default thresholds.
pub fn assess(text: &str) -> bool {
    assess_with(text, &QualityThresholds::default()).is_good()
}

/// Run the checks in order; the first failure decides the verdict.
pub fn assess_with(text: &str, thresholds: &QualityThresholds) -> QualityVerdict {
    let mut visible = 0usize;
    let mut alnum = 0usize;
    let mut unusual = 0usize;
    let mut total = 0usize;

    for c in text.chars() {
        total += 1;
        if c.is_whitespace() {
            continue;
        }
        visible += 1;
        if c.is_alphanumeric() {
            alnum += 1;
        } else if !COMMON_PUNCTUATION.contains(&c) {
            unusual += 1;
        }
    }

    if visible < thresholds.min_chars {
        return QualityVerdict::TooShort;
    }

    if (alnum as f64) / (visible as f64) < thresholds.min_alnum_ratio {
        return QualityVerdict::Garbled;
    }

    let tokens: Vec<&str> = text.split_whitespace().collect();
    if tokens.len() > thresholds.fragment_token_count {
        let short = tokens
            .iter()
            .filter(|t| t.chars().count() <= thresholds.short_token_len)
            .count();
        if (short as f64) / (tokens.len() as f64) > thresholds.max_short_token_ratio {
            return QualityVerdict::Fragmented;
        }

        if (unusual as f64) / (total as f64) > thresholds.max_unusual_ratio {
            return QualityVerdict::Corrupted;
        }
    }

    QualityVerdict::Good
}
