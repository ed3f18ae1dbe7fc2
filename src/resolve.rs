//! Per-page OCR resolution.
//!
//! A flagged page is resolved in strict order: OCR of the page's embedded
//! raster images, then OCR of a full-page render with orientation
//! correction, then the page's own native text. A candidate only replaces
//! native text when it is a strict improvement.

use std::collections::BTreeSet;
use std::path::PathBuf;
use std::sync::Arc;

use image::DynamicImage;
use serde::Serialize;

use crate::classify::PageRecord;
use crate::config::ExtractionConfig;
use crate::error::{ExtractionError, Result};
use crate::ocr::OcrBackend;
use crate::pdf::{DocumentOpener, PageSource, Rotation};
use crate::quality::{assess_with, word_count};
use crate::scheduler::PageTaskRunner;

/// Everything a worker needs to resolve one page.
///
/// Tasks own their data so they can move onto any worker thread; each
/// worker opens its own handle to `file_path`.
#[derive(Debug, Clone)]
pub struct WorkerTask {
    pub file_path: PathBuf,
    pub page_index: usize,
    pub word_count: usize,
    pub native_text: String,
    pub rotation: Rotation,
    pub quality_good: bool,
    pub ocr_pages: Arc<BTreeSet<usize>>,
}

impl WorkerTask {
    pub fn from_record(
        file_path: PathBuf,
        record: &PageRecord,
        ocr_pages: Arc<BTreeSet<usize>>,
    ) -> Self {
        Self {
            file_path,
            page_index: record.index,
            word_count: record.word_count,
            native_text: record.native_text.clone(),
            rotation: record.rotation,
            quality_good: record.quality_good,
            ocr_pages,
        }
    }

    pub fn needs_ocr(&self) -> bool {
        self.ocr_pages.contains(&self.page_index)
    }
}

/// Where a page's final text came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PageSourceKind {
    /// Page was not flagged.
    Native,
    EmbeddedImages,
    FullPage,
    /// Flagged, but no candidate beat the native text.
    KeptNative,
    /// Resolution did not finish in time; native text was used.
    TimedOut,
}

/// A recognized text and the facts the adoption rules look at.
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    pub text: String,
    pub words: usize,
    pub quality_good: bool,
}

impl Candidate {
    pub fn assess(text: String, config: &ExtractionConfig) -> Self {
        Self {
            words: word_count(&text),
            quality_good: assess_with(&text, &config.quality).is_good(),
            text,
        }
    }

    /// Embedded-image text must have more words than native and pass the
    /// quality check.
    pub fn beats_for_embedded(&self, task: &WorkerTask) -> bool {
        self.words > task.word_count && self.quality_good
    }

    /// Full-page text must have more words than native, or pass the quality
    /// check where native failed. Ties keep native.
    ///
    /// A full-page result that passes quality is not adopted on quality alone
    /// when native text also passes; it still needs more words.
    pub fn beats_for_full_page(&self, task: &WorkerTask) -> bool {
        self.words > task.word_count || (self.quality_good && !task.quality_good)
    }
}

/// Final text of one page.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PageOutcome {
    pub index: usize,
    #[serde(skip)]
    pub text: String,
    pub source: PageSourceKind,
    pub words: usize,
}

impl PageOutcome {
    /// Outcome that keeps the task's native text.
    pub fn native(task: &WorkerTask, source: PageSourceKind) -> Self {
        Self {
            index: task.page_index,
            text: task.native_text.clone(),
            source,
            words: task.word_count,
        }
    }

    fn adopted(task: &WorkerTask, candidate: Candidate, source: PageSourceKind) -> Self {
        Self {
            index: task.page_index,
            words: candidate.words,
            text: candidate.text,
            source,
        }
    }
}

/// Resolves flagged pages against an injected document opener and OCR engine.
pub struct PageResolver {
    opener: Arc<dyn DocumentOpener>,
    engine: Arc<dyn OcrBackend>,
    config: Arc<ExtractionConfig>,
}

impl PageResolver {
    pub fn new(
        opener: Arc<dyn DocumentOpener>,
        engine: Arc<dyn OcrBackend>,
        config: Arc<ExtractionConfig>,
    ) -> Self {
        Self {
            opener,
            engine,
            config,
        }
    }

    /// Resolve a single page. Never fails: every error ends in native text.
    pub fn resolve(&self, task: &WorkerTask) -> PageOutcome {
        if !task.needs_ocr() {
            return PageOutcome::native(task, PageSourceKind::Native);
        }

        match self.try_resolve(task) {
            Ok(outcome) => outcome,
            Err(e) => {
                tracing::warn!(
                    page = task.page_index,
                    "OCR resolution failed, keeping native text: {}",
                    e
                );
                PageOutcome::native(task, PageSourceKind::KeptNative)
            }
        }
    }

    fn try_resolve(&self, task: &WorkerTask) -> Result<PageOutcome> {
        let doc = self.opener.open(&task.file_path)?;
        let mut rejected: Option<(Candidate, PageSourceKind)> = None;

        match self.embedded_candidate(doc.as_ref(), task) {
            Ok(candidate) if candidate.beats_for_embedded(task) => {
                tracing::debug!(
                    page = task.page_index,
                    words = candidate.words,
                    native_words = task.word_count,
                    "Adopted embedded image OCR"
                );
                return Ok(PageOutcome::adopted(
                    task,
                    candidate,
                    PageSourceKind::EmbeddedImages,
                ));
            }
            Ok(candidate) => {
                tracing::debug!(
                    page = task.page_index,
                    words = candidate.words,
                    quality_good = candidate.quality_good,
                    "Embedded image OCR did not improve on native text"
                );
                rejected = Some((candidate, PageSourceKind::EmbeddedImages));
            }
            Err(e) => tracing::debug!(page = task.page_index, "No embedded image text: {}", e),
        }

        match self.full_page_candidate(doc.as_ref(), task) {
            Ok(candidate) if candidate.beats_for_full_page(task) => {
                tracing::debug!(
                    page = task.page_index,
                    words = candidate.words,
                    native_words = task.word_count,
                    "Adopted full-page OCR"
                );
                return Ok(PageOutcome::adopted(task, candidate, PageSourceKind::FullPage));
            }
            Ok(candidate) => {
                tracing::debug!(
                    page = task.page_index,
                    words = candidate.words,
                    native_words = task.word_count,
                    "Full-page OCR did not improve on native text"
                );
                if rejected.as_ref().map_or(true, |(best, _)| candidate.words > best.words) {
                    rejected = Some((candidate, PageSourceKind::FullPage));
                }
            }
            Err(e) => tracing::warn!(page = task.page_index, "Full-page OCR failed: {}", e),
        }

        Ok(Self::fallback(task, rejected))
    }

    /// Native text, unless it is empty and a rejected candidate has words.
    fn fallback(task: &WorkerTask, rejected: Option<(Candidate, PageSourceKind)>) -> PageOutcome {
        match rejected {
            Some((candidate, source)) if task.word_count == 0 && candidate.words > 0 => {
                tracing::debug!(
                    page = task.page_index,
                    words = candidate.words,
                    "Native text is empty, using best OCR candidate"
                );
                PageOutcome::adopted(task, candidate, source)
            }
            _ => PageOutcome::native(task, PageSourceKind::KeptNative),
        }
    }

    fn embedded_candidate(&self, doc: &dyn PageSource, task: &WorkerTask) -> Result<Candidate> {
        let images = doc.embedded_images(
            task.page_index,
            self.config.min_image_width,
            self.config.min_image_height,
        )?;
        if images.is_empty() {
            return Err(ExtractionError::NoCandidate("no embedded images"));
        }

        let mut parts = Vec::new();
        for (n, image) in images.into_iter().enumerate() {
            let image = correct_orientation(self.engine.as_ref(), image, task.page_index);
            match self.engine.recognize(&image) {
                Ok(result) if !result.text.trim().is_empty() => parts.push(result.text),
                Ok(_) => {}
                Err(e) => tracing::debug!(page = task.page_index, image = n, "Image OCR failed: {}", e),
            }
        }

        if parts.is_empty() {
            return Err(ExtractionError::NoCandidate("embedded images produced no text"));
        }
        Ok(Candidate::assess(parts.join("\n"), &self.config))
    }

    fn full_page_candidate(&self, doc: &dyn PageSource, task: &WorkerTask) -> Result<Candidate> {
        let image = doc.render(task.page_index, self.config.render_zoom)?;
        let image = if task.rotation.is_upright() {
            correct_orientation(self.engine.as_ref(), image, task.page_index)
        } else {
            // Declared rotation wins over detection.
            task.rotation.apply(image)
        };
        let result = self.engine.recognize(&image)?;
        Ok(Candidate::assess(result.text, &self.config))
    }
}

/// Detect orientation with `engine` and rotate `image` upright.
///
/// Detection failures leave the image as it is.
pub fn correct_orientation(engine: &dyn OcrBackend, image: DynamicImage, page: usize) -> DynamicImage {
    match engine.detect_orientation(&image) {
        Ok(rotation) if !rotation.is_upright() => {
            tracing::debug!(page, rotation = %rotation, "Correcting detected orientation");
            rotation.apply(image)
        }
        Ok(_) => image,
        Err(e) => {
            tracing::debug!(page, "Orientation detection skipped: {}", e);
            image
        }
    }
}

impl PageTaskRunner for PageResolver {
    fn run(&self, task: &WorkerTask) -> PageOutcome {
        self.resolve(task)
    }
}
