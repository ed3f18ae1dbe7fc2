//! Per-page classification: native word count, quality and declared rotation.
//!
//! Classification never runs an OCR engine, so it is cheap enough to run on
//! every page of every document.

mod strategy;

pub use strategy::{decide, OcrDecision, Strategy};

use serde::Serialize;

use crate::config::ExtractionConfig;
use crate::pdf::{PageSource, PdfError, Rotation};
use crate::quality::{assess_with, word_count};

/// Why a page was routed to OCR.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PageFlag {
    LowWords,
    PoorQuality,
    Rotated,
}

impl PageFlag {
    pub fn as_str(&self) -> &'static str {
        match self {
            PageFlag::LowWords => "low_words",
            PageFlag::PoorQuality => "poor_quality",
            PageFlag::Rotated => "rotated",
        }
    }
}

impl std::fmt::Display for PageFlag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// What classification learned about one page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageRecord {
    pub index: usize,
    pub word_count: usize,
    pub native_text: String,
    /// Declared in the document, not detected.
    pub rotation: Rotation,
    pub quality_good: bool,
}

impl PageRecord {
    /// Reasons this page needs OCR, in a fixed order.
    pub fn flags(&self, min_words: usize) -> Vec<PageFlag> {
        let mut flags = Vec::new();
        if self.word_count < min_words {
            flags.push(PageFlag::LowWords);
        }
        if !self.quality_good {
            flags.push(PageFlag::PoorQuality);
        }
        if !self.rotation.is_upright() {
            flags.push(PageFlag::Rotated);
        }
        flags
    }

    pub fn needs_ocr(&self, min_words: usize) -> bool {
        !self.flags(min_words).is_empty()
    }
}

/// Build the record for a single page from its native text and declared rotation.
pub fn classify_page(
    index: usize,
    native_text: String,
    rotation: Rotation,
    config: &ExtractionConfig,
) -> PageRecord {
    PageRecord {
        index,
        word_count: word_count(&native_text),
        quality_good: assess_with(&native_text, &config.quality).is_good(),
        native_text,
        rotation,
    }
}

/// Classify every page of an open document.
///
/// A page whose text layer cannot be read is classified with empty text,
/// which flags it for OCR. A page whose rotation cannot be read is treated
/// as upright.
pub fn classify_document(
    source: &dyn PageSource,
    config: &ExtractionConfig,
) -> Result<Vec<PageRecord>, PdfError> {
    let page_count = source.page_count();
    if page_count == 0 {
        return Err(PdfError::Parse("document has no pages".to_string()));
    }

    let records = (0..page_count)
        .map(|index| {
            let text = source.native_text(index).unwrap_or_else(|e| {
                tracing::warn!(page = index, "Native text unavailable: {}", e);
                String::new()
            });
            let rotation = source.rotation(index).unwrap_or_else(|e| {
                tracing::warn!(page = index, "Rotation unavailable: {}", e);
                Rotation::default()
            });
            classify_page(index, text, rotation, config)
        })
        .collect();

    Ok(records)
}
