//! OCR engine adapters.
//!
//! Tesseract is the default engine and the only one that performs
//! orientation detection. OCRS is an optional pure-Rust neural engine
//! (feature: ocr-ocrs), used first on bare image documents when loaded.

mod backend;
mod model_utils;
mod tesseract;

#[cfg(feature = "ocr-ocrs")]
mod ocrs_backend;

pub use backend::{OcrBackend, OcrBackendType, OcrConfig, OcrError, OcrResult, Segmentation};
pub use model_utils::check_binary;
pub use tesseract::{parse_osd_rotation, TesseractBackend, TESSERACT};

#[cfg(feature = "ocr-ocrs")]
pub use ocrs_backend::OcrsBackend;
