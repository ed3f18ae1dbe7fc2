//! The `tesseract` command-line engine.
//!
//! Text goes to stdout in the configured language. Orientation comes from
//! a separate `--psm 0 -l osd` run, so the `osd` traineddata must be
//! installed for rotation correction to work.

use std::path::Path;
use std::process::{Command, Output};
use std::time::Instant;

use image::DynamicImage;
use tempfile::TempDir;

use super::backend::{OcrBackend, OcrBackendType, OcrConfig, OcrError, OcrResult, Segmentation};
use super::model_utils::check_binary;
use crate::pdf::Rotation;

pub const TESSERACT: &str = "tesseract";

pub struct TesseractBackend {
    config: OcrConfig,
}

impl TesseractBackend {
    pub fn new() -> Self {
        Self {
            config: OcrConfig::default(),
        }
    }

    pub fn with_config(config: OcrConfig) -> Self {
        Self { config }
    }

    fn stdout_of(result: std::io::Result<Output>) -> Result<String, OcrError> {
        let output = result.map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => {
                OcrError::BackendNotAvailable(format!("{} is not on PATH", TESSERACT))
            }
            _ => OcrError::Io(e),
        })?;
        if !output.status.success() {
            return Err(OcrError::OcrFailed(format!(
                "tesseract exited with {}: {}",
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    fn run_tesseract(&self, image_path: &Path, segmentation: Segmentation) -> Result<String, OcrError> {
        let mut cmd = Command::new(TESSERACT);
        cmd.arg(image_path)
            .arg("stdout")
            .args(["-l", &self.config.language]);
        if let Segmentation::Mode(psm) = segmentation {
            cmd.args(["--psm", &psm.to_string()]);
        }
        Self::stdout_of(cmd.output())
    }

    fn run_osd(&self, image_path: &Path) -> Result<String, OcrError> {
        let output = Command::new(TESSERACT)
            .arg(image_path)
            .arg("stdout")
            .args(["--psm", "0", "-l", "osd"])
            .output();
        Self::stdout_of(output)
    }
}

impl Default for TesseractBackend {
    fn default() -> Self {
        Self::new()
    }
}

/// Read the `Rotate:` line of Tesseract OSD output.
///
/// The value is the clockwise rotation that uprights the image.
pub fn parse_osd_rotation(osd: &str) -> Result<Rotation, OcrError> {
    let value = osd
        .lines()
        .find_map(|line| line.trim().strip_prefix("Rotate:"))
        .ok_or_else(|| OcrError::OcrFailed("OSD output has no Rotate line".to_string()))?;
    let degrees: i32 = value
        .trim()
        .parse()
        .map_err(|_| OcrError::OcrFailed(format!("Invalid OSD rotation: {}", value.trim())))?;
    Rotation::from_degrees(degrees)
        .ok_or_else(|| OcrError::OcrFailed(format!("Unexpected OSD rotation: {}", degrees)))
}

impl OcrBackend for TesseractBackend {
    fn backend_type(&self) -> OcrBackendType {
        OcrBackendType::Tesseract
    }

    fn is_available(&self) -> bool {
        check_binary(TESSERACT)
    }

    fn availability_hint(&self) -> String {
        if !check_binary(TESSERACT) {
            "Tesseract not installed. Install with: apt install tesseract-ocr".to_string()
        } else {
            format!(
                "Tesseract is available (language data '{}' must be installed)",
                self.config.language
            )
        }
    }

    fn recognize_file(
        &self,
        image_path: &Path,
        segmentation: Segmentation,
    ) -> Result<OcrResult, OcrError> {
        let start = Instant::now();
        let text = self.run_tesseract(image_path, segmentation)?;
        Ok(OcrResult::timed(text, OcrBackendType::Tesseract, start))
    }

    fn detect_orientation(&self, image: &DynamicImage) -> Result<Rotation, OcrError> {
        let temp_dir = TempDir::new()?;
        let path = temp_dir.path().join("osd.png");
        image
            .save(&path)
            .map_err(|e| OcrError::ImageError(format!("Failed to write image: {}", e)))?;
        parse_osd_rotation(&self.run_osd(&path)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_osd_rotation() {
        let osd = "\
Page number: 0
Orientation in degrees: 270
Rotate: 90
Orientation confidence: 4.12
Script: Latin
Script confidence: 2.08
";
        assert_eq!(parse_osd_rotation(osd).unwrap(), Rotation::Deg90);
    }

    #[test]
    fn test_parse_osd_upright() {
        assert_eq!(
            parse_osd_rotation("Rotate: 0\n").unwrap(),
            Rotation::Deg0
        );
    }

    #[test]
    fn test_parse_osd_missing_line() {
        assert!(matches!(
            parse_osd_rotation("Too few characters. Skipping this page"),
            Err(OcrError::OcrFailed(_))
        ));
    }

    #[test]
    fn test_backend_reports_type() {
        let backend = TesseractBackend::default();
        assert_eq!(backend.backend_type(), OcrBackendType::Tesseract);
    }
}
