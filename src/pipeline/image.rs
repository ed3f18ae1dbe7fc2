//! Single-shot OCR for bare image documents.
//!
//! Images carry no rotation metadata and no text layer, so the only
//! choices are which engine and which segmentation mode to use.

use std::path::Path;

use crate::config::ExtractionConfig;
use crate::ocr::{OcrBackend, Segmentation};
use crate::quality::word_count;

use super::{ExtractionMethod, ExtractionResult};

/// OCR an image file.
///
/// A neural engine, when present, goes first and wins if it reads more than
/// `min_image_neural_words` words. Otherwise the primary engine runs with
/// the configured segmentation mode, then once more with engine defaults.
pub fn process_image(
    path: &Path,
    engine: &dyn OcrBackend,
    neural: Option<&dyn OcrBackend>,
    config: &ExtractionConfig,
) -> ExtractionResult {
    if let Some(neural) = neural {
        match neural.recognize_file(path, Segmentation::EngineDefault) {
            Ok(result) if word_count(&result.text) > config.min_image_neural_words => {
                tracing::info!(
                    engine = %neural.backend_type(),
                    words = word_count(&result.text),
                    ms = result.processing_time_ms,
                    "Image recognized by neural engine"
                );
                return ExtractionResult::new(
                    result.text,
                    ExtractionMethod::OcrImage(neural.backend_type()),
                );
            }
            Ok(result) => tracing::debug!(
                words = word_count(&result.text),
                "Neural engine read too little, trying {}",
                engine.backend_type()
            ),
            Err(e) => tracing::warn!(
                "{} image OCR failed, trying {}: {}",
                neural.backend_type(),
                engine.backend_type(),
                e
            ),
        }
    }

    let configured = Segmentation::Mode(config.ocr.image_segmentation);
    let result = engine.recognize_file(path, configured).or_else(|e| {
        tracing::warn!("Image OCR with {:?} failed, retrying with defaults: {}", configured, e);
        engine.recognize_file(path, Segmentation::EngineDefault)
    });

    match result {
        Ok(result) => ExtractionResult::new(
            result.text,
            ExtractionMethod::OcrImage(engine.backend_type()),
        ),
        Err(e) => {
            tracing::warn!("Image OCR failed completely: {}", e);
            ExtractionResult::error()
        }
    }
}
