//! The recognition engine seam.
//!
//! [`OcrBackend`] turns an image into text and, for engines that can,
//! estimates the rotation needed to bring a page upright. The pipeline
//! only ever holds `Arc<dyn OcrBackend>` values built once at startup.

use std::path::{Path, PathBuf};
use std::time::Instant;

use image::DynamicImage;
use serde::{Deserialize, Serialize};
use tempfile::TempDir;
use thiserror::Error;

use crate::pdf::Rotation;

#[derive(Debug, Error)]
pub enum OcrError {
    #[error("Backend not available: {0}")]
    BackendNotAvailable(String),

    #[error("OCR failed: {0}")]
    OcrFailed(String),

    #[error("Model not found: {0}")]
    ModelNotFound(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Image error: {0}")]
    ImageError(String),
}

/// Recognized text of one image.
#[derive(Debug, Clone)]
pub struct OcrResult {
    pub text: String,
    pub backend: OcrBackendType,
    /// Wall time of the engine call.
    pub processing_time_ms: u64,
}

impl OcrResult {
    pub fn timed(text: String, backend: OcrBackendType, start: Instant) -> Self {
        Self {
            text,
            backend,
            processing_time_ms: start.elapsed().as_millis() as u64,
        }
    }
}

/// Engine identity; its name ends up in the extraction method string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OcrBackendType {
    Tesseract,
    Ocrs,
}

impl OcrBackendType {
    pub fn as_str(&self) -> &'static str {
        match self {
            OcrBackendType::Tesseract => "tesseract",
            OcrBackendType::Ocrs => "ocrs",
        }
    }

    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "tesseract" => Some(OcrBackendType::Tesseract),
            "ocrs" => Some(OcrBackendType::Ocrs),
            _ => None,
        }
    }
}

impl std::fmt::Display for OcrBackendType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Page segmentation setting passed to the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Segmentation {
    /// Let the engine choose.
    #[default]
    EngineDefault,
    /// Explicit mode, e.g. Tesseract `--psm 3`.
    Mode(u8),
}

pub trait OcrBackend: Send + Sync {
    fn backend_type(&self) -> OcrBackendType;

    /// Binaries installed and models present.
    fn is_available(&self) -> bool;

    /// What to install when [`OcrBackend::is_available`] is false.
    fn availability_hint(&self) -> String;

    /// Recognize an image file on disk.
    fn recognize_file(
        &self,
        image_path: &Path,
        segmentation: Segmentation,
    ) -> Result<OcrResult, OcrError>;

    /// Recognize an in-memory image with engine defaults.
    ///
    /// Engines that only read files get it through a temporary PNG.
    fn recognize(&self, image: &DynamicImage) -> Result<OcrResult, OcrError> {
        let temp_dir = TempDir::new()?;
        let path = temp_dir.path().join("page.png");
        image
            .save(&path)
            .map_err(|e| OcrError::ImageError(format!("Failed to write image: {}", e)))?;
        self.recognize_file(&path, Segmentation::EngineDefault)
    }

    /// Estimate the clockwise rotation that brings `image` upright.
    fn detect_orientation(&self, _image: &DynamicImage) -> Result<Rotation, OcrError> {
        Err(OcrError::BackendNotAvailable(format!(
            "{} does not detect orientation",
            self.backend_type()
        )))
    }
}

/// The `[extraction.ocr]` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OcrConfig {
    /// Tesseract language code.
    pub language: String,
    /// Tesseract `--psm` used first on image documents.
    pub image_segmentation: u8,
    /// Directory holding the ocrs models.
    pub model_path: Option<PathBuf>,
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self {
            language: "ita".to_string(),
            image_segmentation: 3,
            model_path: None,
        }
    }
}
