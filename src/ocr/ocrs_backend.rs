//! Neural OCR through the `ocrs` crate (feature `ocr-ocrs`).
//!
//! Used as the first engine on image documents. The models are loaded once
//! in [`OcrsBackend::load`]; the backend owns the engine and is shared
//! behind an `Arc`. Models are never downloaded: fetch
//! `text-detection.rten` and `text-recognition.rten` from
//! https://ocrs-models.s3-accelerate.amazonaws.com/ and point
//! `ocr.model_path` at them.

use std::path::Path;
use std::time::Instant;

use image::DynamicImage;

use super::backend::{OcrBackend, OcrBackendType, OcrConfig, OcrError, OcrResult, Segmentation};
use super::model_utils::{locate_models, DETECTION_MODEL, RECOGNITION_MODEL};

pub struct OcrsBackend {
    engine: ocrs::OcrEngine,
}

impl OcrsBackend {
    pub fn load(config: &OcrConfig) -> Result<Self, OcrError> {
        let model_dir = locate_models(config.model_path.as_deref()).map_err(|searched| {
            let searched: Vec<String> = searched.iter().map(|d| d.display().to_string()).collect();
            OcrError::ModelNotFound(format!(
                "{} and {} not found in {}",
                DETECTION_MODEL,
                RECOGNITION_MODEL,
                searched.join(", ")
            ))
        })?;

        let load = |name: &str| {
            rten::Model::load_file(model_dir.join(name))
                .map_err(|e| OcrError::OcrFailed(format!("Failed to load {}: {}", name, e)))
        };
        let detection_model = load(DETECTION_MODEL)?;
        let recognition_model = load(RECOGNITION_MODEL)?;

        let engine = ocrs::OcrEngine::new(ocrs::OcrEngineParams {
            detection_model: Some(detection_model),
            recognition_model: Some(recognition_model),
            ..Default::default()
        })
        .map_err(|e| OcrError::OcrFailed(format!("Failed to create OCR engine: {}", e)))?;

        tracing::debug!("Loaded OCRS models from {}", model_dir.display());
        Ok(Self { engine })
    }

    fn run_ocrs(&self, img: &DynamicImage) -> Result<String, OcrError> {
        let rgb_img = img.to_rgb8();
        let (width, height) = rgb_img.dimensions();

        let img_source = ocrs::ImageSource::from_bytes(rgb_img.as_raw(), (width, height))
            .map_err(|e| OcrError::ImageError(format!("Failed to convert image: {}", e)))?;

        let input = self
            .engine
            .prepare_input(img_source)
            .map_err(|e| OcrError::OcrFailed(format!("Failed to prepare input: {}", e)))?;

        self.engine
            .get_text(&input)
            .map_err(|e| OcrError::OcrFailed(format!("Failed to extract text: {}", e)))
    }
}

impl OcrBackend for OcrsBackend {
    fn backend_type(&self) -> OcrBackendType {
        OcrBackendType::Ocrs
    }

    fn is_available(&self) -> bool {
        // Models were loaded at construction.
        true
    }

    fn availability_hint(&self) -> String {
        "OCRS is available".to_string()
    }

    fn recognize_file(
        &self,
        image_path: &Path,
        _segmentation: Segmentation,
    ) -> Result<OcrResult, OcrError> {
        let start = Instant::now();
        let img = image::open(image_path)
            .map_err(|e| OcrError::ImageError(format!("Failed to load image: {}", e)))?;
        let text = self.run_ocrs(&img)?;
        Ok(OcrResult::timed(text, OcrBackendType::Ocrs, start))
    }

    fn recognize(&self, image: &DynamicImage) -> Result<OcrResult, OcrError> {
        let start = Instant::now();
        let text = self.run_ocrs(image)?;
        Ok(OcrResult::timed(text, OcrBackendType::Ocrs, start))
    }
}
