//! Engine discovery: external binaries on `PATH` and neural model files.

/// Whether `name` resolves to an executable on `PATH`.
pub fn check_binary(name: &str) -> bool {
    which::which(name).is_ok()
}

#[cfg(feature = "ocr-ocrs")]
pub use models::*;

#[cfg(feature = "ocr-ocrs")]
mod models {
    use std::path::{Path, PathBuf};

    pub const DETECTION_MODEL: &str = "text-detection.rten";
    pub const RECOGNITION_MODEL: &str = "text-recognition.rten";

    /// Directories searched for ocrs models, in priority order.
    ///
    /// The configured directory comes first, then the per-user data
    /// directory, the cache directory the `ocrs` CLI downloads into, and a
    /// system-wide location.
    pub fn model_search_path(configured: Option<&Path>) -> Vec<PathBuf> {
        let mut dirs = Vec::new();
        dirs.extend(configured.map(Path::to_path_buf));
        dirs.extend(dirs::data_dir().map(|d| d.join("docsift").join("ocrs")));
        dirs.extend(dirs::cache_dir().map(|d| d.join("ocrs")));
        dirs.push(PathBuf::from("/usr/share/ocrs/models"));
        dirs
    }

    fn has_models(dir: &Path) -> bool {
        dir.join(DETECTION_MODEL).is_file() && dir.join(RECOGNITION_MODEL).is_file()
    }

    /// First directory holding both models, or every directory searched.
    pub fn locate_models(configured: Option<&Path>) -> Result<PathBuf, Vec<PathBuf>> {
        let searched = model_search_path(configured);
        match searched.iter().find(|dir| has_models(dir)) {
            Some(dir) => Ok(dir.clone()),
            None => Err(searched),
        }
    }

}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_binary_missing() {
        assert!(!check_binary("docsift-no-such-binary-xyz"));
    }
}
