//! Document extraction entry points.
//!
//! [`Extractor`] owns the injected collaborators (document opener, OCR
//! engines, scheduler) and routes a file to the PDF or image path. Nothing
//! here returns an error: every failure ends in a fallback, and the
//! [`ExtractionMethod`] of the result records which one produced the text.

mod image;

pub use self::image::process_image;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Serialize, Serializer};

use crate::classify::{classify_document, decide, OcrDecision, PageRecord};
use crate::config::{Config, ExtractionConfig};
use crate::error::ExtractionError;
use crate::ocr::{OcrBackend, OcrBackendType, TesseractBackend};
use crate::pdf::{DocumentOpener, PopplerOpener};
use crate::quality::word_count;
use crate::resolve::{correct_orientation, PageOutcome, PageResolver, PageSourceKind, WorkerTask};
use crate::scheduler::{
    assemble, default_isolated_workers, MemoryProbe, PageTaskRunner, Scheduler, SystemMemoryProbe,
};

/// Which strategy produced the extracted text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtractionMethod {
    Native,
    Hybrid,
    /// Whole-document OCR fallback.
    Ocr(OcrBackendType),
    /// Bare image document.
    OcrImage(OcrBackendType),
    Error,
}

impl ExtractionMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExtractionMethod::Native => "native",
            ExtractionMethod::Hybrid => "hybrid",
            ExtractionMethod::Ocr(OcrBackendType::Tesseract) => "ocr_tesseract",
            ExtractionMethod::Ocr(OcrBackendType::Ocrs) => "ocr_ocrs",
            ExtractionMethod::OcrImage(OcrBackendType::Tesseract) => "ocr_image_tesseract",
            ExtractionMethod::OcrImage(OcrBackendType::Ocrs) => "ocr_image_ocrs",
            ExtractionMethod::Error => "error",
        }
    }
}

impl std::fmt::Display for ExtractionMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl Serialize for ExtractionMethod {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// Extracted text and its provenance.
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractionResult {
    pub text: String,
    pub method: ExtractionMethod,
}

impl ExtractionResult {
    pub fn new(text: String, method: ExtractionMethod) -> Self {
        Self { text, method }
    }

    /// Every fallback was exhausted.
    pub fn error() -> Self {
        Self::new(String::new(), ExtractionMethod::Error)
    }
}

/// Per-page provenance of one extraction.
#[derive(Debug, Clone, Serialize)]
pub struct ExtractionReport {
    pub file: PathBuf,
    pub method: ExtractionMethod,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub decision: Option<OcrDecision>,
    pub pages: Vec<PageOutcome>,
}

impl ExtractionReport {
    fn new(file: &Path, method: ExtractionMethod) -> Self {
        Self {
            file: file.to_path_buf(),
            method,
            decision: None,
            pages: Vec::new(),
        }
    }
}

/// Route a MIME type: anything that is not an image goes down the PDF path.
fn is_image_mime(mime_type: &str) -> bool {
    let mime = mime_type.to_lowercase();
    !mime.contains("pdf") && mime.contains("image")
}

pub struct Extractor {
    config: Arc<ExtractionConfig>,
    opener: Arc<dyn DocumentOpener>,
    engine: Arc<dyn OcrBackend>,
    neural: Option<Arc<dyn OcrBackend>>,
    scheduler: Scheduler,
}

impl Extractor {
    /// Poppler-backed extractor with the system memory probe and the
    /// platform's isolated-worker default.
    pub fn new(config: ExtractionConfig, engine: Arc<dyn OcrBackend>) -> Self {
        let config = Arc::new(config);
        Self {
            scheduler: Scheduler::new(
                config.clone(),
                Arc::new(SystemMemoryProbe),
                default_isolated_workers(),
            ),
            config,
            opener: Arc::new(PopplerOpener),
            engine,
            neural: None,
        }
    }

    /// Extractor using Tesseract with the settings of a loaded config file.
    pub fn from_config(config: &Config) -> Self {
        let engine = Arc::new(TesseractBackend::with_config(config.extraction.ocr.clone()));
        let extractor = Self::new(config.extraction.clone(), engine);
        match config.supports_isolated_workers {
            Some(supported) => extractor.with_isolated_workers(supported),
            None => extractor,
        }
    }

    pub fn with_opener(mut self, opener: Arc<dyn DocumentOpener>) -> Self {
        self.opener = opener;
        self
    }

    pub fn with_memory_probe(mut self, memory: Arc<dyn MemoryProbe>) -> Self {
        self.scheduler = self.scheduler.with_memory_probe(memory);
        self
    }

    pub fn with_isolated_workers(mut self, supported: bool) -> Self {
        self.scheduler = self.scheduler.with_isolated_workers(supported);
        self
    }

    /// Engine tried first on image documents.
    pub fn with_neural_engine(mut self, engine: Arc<dyn OcrBackend>) -> Self {
        self.neural = Some(engine);
        self
    }

    pub fn config(&self) -> &ExtractionConfig {
        &self.config
    }

    /// Extract text from a PDF or image file.
    pub async fn process_document(&self, path: &Path, mime_type: &str) -> ExtractionResult {
        self.process_document_with_report(path, mime_type).await.0
    }

    /// Like [`Extractor::process_document`], also returning per-page provenance.
    pub async fn process_document_with_report(
        &self,
        path: &Path,
        mime_type: &str,
    ) -> (ExtractionResult, ExtractionReport) {
        if is_image_mime(mime_type) {
            let result = self.process_image(path).await;
            let report = ExtractionReport::new(path, result.method);
            (result, report)
        } else {
            self.pdf_with_report(path).await
        }
    }

    /// Extract text from a PDF.
    pub async fn process_pdf(&self, path: &Path) -> ExtractionResult {
        self.pdf_with_report(path).await.0
    }

    /// OCR an image file.
    pub async fn process_image(&self, path: &Path) -> ExtractionResult {
        let path = path.to_path_buf();
        let engine = self.engine.clone();
        let neural = self.neural.clone();
        let config = self.config.clone();

        tokio::task::spawn_blocking(move || {
            process_image(&path, engine.as_ref(), neural.as_deref(), &config)
        })
        .await
        .unwrap_or_else(|e| {
            tracing::warn!("Image worker failed: {}", e);
            ExtractionResult::error()
        })
    }

    /// Classify every page without running OCR. Empty when the document
    /// cannot be read.
    pub async fn get_page_word_counts(&self, path: &Path) -> Vec<PageRecord> {
        self.classify(path).await.unwrap_or_else(|e| {
            tracing::warn!("Error getting page word counts: {}", e);
            Vec::new()
        })
    }

    async fn classify(&self, path: &Path) -> Result<Vec<PageRecord>, ExtractionError> {
        let path = path.to_path_buf();
        let opener = self.opener.clone();
        let config = self.config.clone();

        let classify_all = move || -> Result<Vec<PageRecord>, ExtractionError> {
            let doc = opener.open(&path)?;
            Ok(classify_document(doc.as_ref(), &config)?)
        };

        tokio::task::spawn_blocking(classify_all)
            .await
            .map_err(|e| ExtractionError::Worker(e.to_string()))?
    }

    async fn pdf_with_report(&self, path: &Path) -> (ExtractionResult, ExtractionReport) {
        let records = match self.classify(path).await {
            Ok(records) => records,
            Err(e) => {
                tracing::warn!("Could not read PDF pages, falling back to whole-document OCR: {}", e);
                return self.whole_document_ocr(path).await;
            }
        };

        let decision = decide(&records, &self.config);
        let ocr_pages = Arc::new(decision.ocr_pages());
        let tasks: Vec<WorkerTask> = records
            .iter()
            .map(|r| WorkerTask::from_record(path.to_path_buf(), r, ocr_pages.clone()))
            .collect();

        let (outcomes, method) = if decision.is_native() {
            let outcomes = tasks
                .iter()
                .map(|t| PageOutcome::native(t, PageSourceKind::Native))
                .collect();
            (outcomes, ExtractionMethod::Native)
        } else {
            let runner: Arc<dyn PageTaskRunner> = Arc::new(PageResolver::new(
                self.opener.clone(),
                self.engine.clone(),
                self.config.clone(),
            ));
            (self.scheduler.run(tasks, runner).await, ExtractionMethod::Hybrid)
        };

        let result = ExtractionResult::new(assemble(&outcomes), method);
        let report = ExtractionReport {
            file: path.to_path_buf(),
            method,
            decision: Some(decision),
            pages: outcomes,
        };
        (result, report)
    }

    /// Render every page, correct orientation and OCR it.
    async fn whole_document_ocr(&self, path: &Path) -> (ExtractionResult, ExtractionReport) {
        let owned_path = path.to_path_buf();
        let opener = self.opener.clone();
        let engine = self.engine.clone();
        let zoom = self.config.fallback_render_zoom;

        let render_all = move || -> Result<Vec<PageOutcome>, ExtractionError> {
            let mut outcomes = Vec::new();
            let mut visit = |index: usize, page: ::image::DynamicImage| {
                let page = correct_orientation(engine.as_ref(), page, index);
                match engine.recognize(&page) {
                    Ok(result) => outcomes.push(PageOutcome {
                        index,
                        words: word_count(&result.text),
                        text: result.text,
                        source: PageSourceKind::FullPage,
                    }),
                    Err(e) => tracing::warn!(page = index, "Fallback OCR failed: {}", e),
                }
            };
            opener.for_each_rendered_page(&owned_path, zoom, &mut visit)?;
            Ok(outcomes)
        };

        let joined = tokio::task::spawn_blocking(render_all)
            .await
            .map_err(|e| ExtractionError::Worker(e.to_string()));

        let outcomes = match joined {
            Ok(Ok(outcomes)) if !outcomes.is_empty() => outcomes,
            Ok(Ok(_)) => {
                tracing::warn!("Whole-document OCR produced no pages");
                return (ExtractionResult::error(), ExtractionReport::new(path, ExtractionMethod::Error));
            }
            Ok(Err(e)) | Err(e) => {
                tracing::warn!("Whole-document OCR failed: {}", e);
                return (ExtractionResult::error(), ExtractionReport::new(path, ExtractionMethod::Error));
            }
        };

        let method = ExtractionMethod::Ocr(self.engine.backend_type());
        let result = ExtractionResult::new(assemble(&outcomes), method);
        let report = ExtractionReport {
            file: path.to_path_buf(),
            method,
            decision: None,
            pages: outcomes,
        };
        (result, report)
    }
}
