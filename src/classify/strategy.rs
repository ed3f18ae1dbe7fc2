//! Document-level choice between passing native text through and
//! resolving flagged pages with OCR.

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;

use super::{PageFlag, PageRecord};
use crate::config::ExtractionConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Strategy {
    /// Every page's native text is used as-is.
    Native,
    /// Native text for clean pages, OCR resolution for flagged ones.
    Hybrid,
}

impl std::fmt::Display for Strategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Strategy::Native => write!(f, "native"),
            Strategy::Hybrid => write!(f, "hybrid"),
        }
    }
}

/// The outcome of [`decide`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OcrDecision {
    pub strategy: Strategy,
    /// Flagged page indexes with their reasons.
    pub flagged: BTreeMap<usize, Vec<PageFlag>>,
    pub avg_words_per_page: f64,
    pub low_word_pages: usize,
}

impl OcrDecision {
    pub fn ocr_pages(&self) -> BTreeSet<usize> {
        self.flagged.keys().copied().collect()
    }

    pub fn is_native(&self) -> bool {
        self.strategy == Strategy::Native
    }
}

/// Aggregate page records into a document strategy.
///
/// The document is native only when no page is flagged, the average word
/// count reaches `min_words_per_page`, and low-word pages stay below
/// `low_quality_page_ratio` of the page count. Anything else is hybrid.
pub fn decide(records: &[PageRecord], config: &ExtractionConfig) -> OcrDecision {
    let min_words = config.min_words_per_page;
    let page_count = records.len();

    let flagged: BTreeMap<usize, Vec<PageFlag>> = records
        .iter()
        .filter_map(|r| {
            let flags = r.flags(min_words);
            (!flags.is_empty()).then_some((r.index, flags))
        })
        .collect();

    let total_words: usize = records.iter().map(|r| r.word_count).sum();
    let avg_words_per_page = if page_count == 0 {
        0.0
    } else {
        total_words as f64 / page_count as f64
    };
    let low_word_pages = records.iter().filter(|r| r.word_count < min_words).count();

    let native = page_count > 0
        && flagged.is_empty()
        && avg_words_per_page >= min_words as f64
        && (low_word_pages as f64) < page_count as f64 * config.low_quality_page_ratio;

    let strategy = if native {
        Strategy::Native
    } else {
        Strategy::Hybrid
    };

    tracing::info!(
        strategy = %strategy,
        pages = page_count,
        flagged = flagged.len(),
        avg_words = avg_words_per_page,
        "Classified document ({} low-text pages out of {})",
        low_word_pages,
        page_count
    );

    OcrDecision {
        strategy,
        flagged,
        avg_words_per_page,
        low_word_pages,
    }
}
