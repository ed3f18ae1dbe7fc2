//! docsift - text extraction from PDFs and scanned images.
//!
//! Each PDF page is classified by its embedded text layer. Documents whose
//! pages all read well keep their native text. Otherwise only the flagged
//! pages go through OCR, either of their embedded images or of a full-page
//! render, and the best candidate per page is kept. Image files are OCR'd
//! directly.
//!
//! ```no_run
//! use std::path::Path;
//! use std::sync::Arc;
//!
//! use docsift::{ExtractionConfig, Extractor, TesseractBackend};
//!
//! # async fn run() {
//! let extractor = Extractor::new(ExtractionConfig::default(), Arc::new(TesseractBackend::new()));
//! let result = extractor
//!     .process_document(Path::new("scan.pdf"), "application/pdf")
//!     .await;
//! println!("{} ({})", result.text, result.method);
//! # }
//! ```

pub mod classify;
pub mod config;
pub mod error;
pub mod ocr;
pub mod pdf;
pub mod pipeline;
pub mod quality;
pub mod resolve;
pub mod scheduler;

#[cfg(test)]
mod testing;

pub use classify::{OcrDecision, PageFlag, PageRecord, Strategy};
pub use config::{Config, ExtractionConfig};
pub use error::ExtractionError;
pub use ocr::{OcrBackend, OcrBackendType, TesseractBackend};
pub use pdf::{DocumentOpener, PageSource, PdfError, PopplerOpener, Rotation};
pub use pipeline::{ExtractionMethod, ExtractionReport, ExtractionResult, Extractor};
pub use resolve::{PageOutcome, PageSourceKind};
