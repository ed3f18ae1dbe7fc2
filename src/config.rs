//! Configuration management for docsift using the prefer crate.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::ocr::OcrConfig;
use crate::quality::QualityThresholds;

/// Environment variable overriding the parallel worker cap.
pub const ENV_WORKERS: &str = "DOCSIFT_WORKERS";
/// Environment variable overriding the minimum words per page.
pub const ENV_MIN_WORDS: &str = "DOCSIFT_MIN_WORDS";
/// Environment variable overriding the OCR language.
pub const ENV_LANG: &str = "DOCSIFT_LANG";
/// Environment variable setting the per-page timeout in seconds.
pub const ENV_PAGE_TIMEOUT: &str = "DOCSIFT_PAGE_TIMEOUT";

const GIB: u64 = 1024 * 1024 * 1024;

/// Every tunable threshold of the extraction pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractionConfig {
    /// Pages with fewer native words than this need OCR.
    pub min_words_per_page: usize,
    /// A document stays native only while fewer than this share of its
    /// pages are low on words.
    pub low_quality_page_ratio: f64,
    /// Zoom factor for per-page renders (2.0 = 144 DPI).
    pub render_zoom: f32,
    /// Zoom factor for the whole-document OCR fallback (3.0 = 216 DPI).
    pub fallback_render_zoom: f32,
    /// Embedded images smaller than this in either dimension are skipped.
    pub min_image_width: u32,
    pub min_image_height: u32,
    /// Parallel execution requires at least this much available memory.
    pub memory_floor_bytes: u64,
    /// Parallel execution requires at least this many pages.
    pub min_pages_for_parallel: usize,
    /// Maximum number of pages resolved at once.
    pub worker_cap: usize,
    /// Per-page resolution timeout. `None` waits indefinitely.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page_timeout_secs: Option<u64>,
    /// The neural engine's image result is kept only above this word count.
    pub min_image_neural_words: usize,
    pub quality: QualityThresholds,
    pub ocr: OcrConfig,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            min_words_per_page: 50,
            low_quality_page_ratio: 0.30,
            render_zoom: 2.0,
            fallback_render_zoom: 3.0,
            min_image_width: 500,
            min_image_height: 500,
            memory_floor_bytes: 2 * GIB,
            min_pages_for_parallel: 10,
            worker_cap: 2,
            page_timeout_secs: None,
            min_image_neural_words: 5,
            quality: QualityThresholds::default(),
            ocr: OcrConfig::default(),
        }
    }
}

impl ExtractionConfig {
    /// Apply `DOCSIFT_*` environment overrides.
    pub fn with_env_overrides(self) -> Self {
        self.with_overrides_from(|key| std::env::var(key).ok())
    }

    /// Apply overrides from an arbitrary variable lookup.
    pub fn with_overrides_from<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|s| !s.trim().is_empty());

        if let Some(workers) = get(ENV_WORKERS).and_then(|s| s.trim().parse().ok()) {
            tracing::debug!("Using {} from environment: {}", ENV_WORKERS, workers);
            self.worker_cap = workers;
        }
        if let Some(min_words) = get(ENV_MIN_WORDS).and_then(|s| s.trim().parse().ok()) {
            tracing::debug!("Using {} from environment: {}", ENV_MIN_WORDS, min_words);
            self.min_words_per_page = min_words;
        }
        if let Some(lang) = get(ENV_LANG) {
            tracing::debug!("Using {} from environment: {}", ENV_LANG, lang);
            self.ocr.language = lang.trim().to_string();
        }
        if let Some(secs) = get(ENV_PAGE_TIMEOUT).and_then(|s| s.trim().parse().ok()) {
            tracing::debug!("Using {} from environment: {}", ENV_PAGE_TIMEOUT, secs);
            self.page_timeout_secs = Some(secs);
        }
        self
    }

    /// Reject values the pipeline cannot run with.
    pub fn validate(&self) -> Result<(), String> {
        if self.worker_cap == 0 {
            return Err("worker_cap must be at least 1".to_string());
        }
        if !(self.render_zoom > 0.0) || !(self.fallback_render_zoom > 0.0) {
            return Err("render zoom factors must be positive".to_string());
        }
        // A zero ratio would flag every document, even one with no low-word pages.
        if !(self.low_quality_page_ratio > 0.0) {
            return Err("low_quality_page_ratio must be greater than 0".to_string());
        }
        let ratios = [
            ("low_quality_page_ratio", self.low_quality_page_ratio),
            ("quality.min_alnum_ratio", self.quality.min_alnum_ratio),
            ("quality.max_short_token_ratio", self.quality.max_short_token_ratio),
            ("quality.max_unusual_ratio", self.quality.max_unusual_ratio),
        ];
        for (name, value) in ratios {
            if !(0.0..=1.0).contains(&value) {
                return Err(format!("{} must be between 0 and 1, got {}", name, value));
            }
        }
        if self.page_timeout_secs == Some(0) {
            return Err("page_timeout_secs must be positive when set".to_string());
        }
        if self.ocr.language.trim().is_empty() {
            return Err("ocr.language must not be empty".to_string());
        }
        Ok(())
    }
}

/// On-disk configuration file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub extraction: ExtractionConfig,
    /// Force parallel execution on or off. Unset means the platform default.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub supports_isolated_workers: Option<bool>,
    /// Path to the config file this was loaded from.
    #[serde(skip)]
    pub source_path: Option<PathBuf>,
}

impl Config {
    /// Discover `docsift.{toml,yaml,json}` with `prefer`, falling back to defaults.
    pub async fn load() -> Self {
        match prefer::load("docsift").await {
            Ok(pref_config) => {
                if let Some(path) = pref_config.source_path() {
                    match Self::load_from_path(path).await {
                        Ok(config) => config,
                        Err(e) => {
                            tracing::warn!("Ignoring config {}: {}", path.display(), e);
                            Self::default_with_env()
                        }
                    }
                } else {
                    Self::default_with_env()
                }
            }
            Err(_) => Self::default_with_env(),
        }
    }

    /// Defaults plus `DOCSIFT_*` overrides.
    pub fn default_with_env() -> Self {
        let mut config = Self::default();
        config.extraction = config.extraction.with_env_overrides();
        config
    }

    /// Read a config file, choosing the format by extension (JSON when unknown).
    pub async fn load_from_path(path: &Path) -> Result<Self, String> {
        let contents = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| format!("Failed to read config file: {}", e))?;

        let mut config = Self::parse(&contents, path)?;
        config.source_path = Some(path.to_path_buf());
        config.extraction = config.extraction.with_env_overrides();
        Ok(config)
    }

    fn parse(contents: &str, path: &Path) -> Result<Self, String> {
        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("json");

        match ext {
            "toml" => {
                toml::from_str(contents).map_err(|e| format!("Failed to parse TOML config: {}", e))
            }
            "yaml" | "yml" => serde_yaml::from_str(contents)
                .map_err(|e| format!("Failed to parse YAML config: {}", e)),
            _ => serde_json::from_str(contents)
                .map_err(|e| format!("Failed to parse JSON config: {}", e)),
        }
    }

    /// Render the effective configuration as TOML.
    pub fn to_toml(&self) -> Result<String, String> {
        toml::to_string_pretty(self).map_err(|e| format!("Failed to serialize config: {}", e))
    }
}
