use thiserror::Error;

use crate::ocr::OcrError;
use crate::pdf::PdfError;

/// Errors inside the extraction fallback chain.
///
/// None of these escape the public `process_*` entry points; each one ends
/// in a fallback and is logged.
#[derive(Debug, Error)]
pub enum ExtractionError {
    #[error("PDF error: {0}")]
    Pdf(#[from] PdfError),

    #[error("OCR error: {0}")]
    Ocr(#[from] OcrError),

    #[error("No candidate text: {0}")]
    NoCandidate(&'static str),

    #[error("Worker error: {0}")]
    Worker(String),

    #[error("Page {page} timed out after {secs}s")]
    Timeout { page: usize, secs: u64 },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, ExtractionError>;
