//! CLI commands implementation.
//!
//! This module contains the CLI parser and dispatches to command-specific modules.

mod check;
mod config_cmd;
mod extract;
mod pages;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use docsift::config::Config;
use docsift::Extractor;

#[derive(Parser)]
#[command(name = "docsift")]
#[command(about = "Extract text from PDFs and scanned images")]
#[command(version)]
pub struct Cli {
    /// Config file path (overrides auto-discovery)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Maximum number of parallel OCR workers
    #[arg(short, long, global = true, env = "DOCSIFT_WORKERS")]
    workers: Option<usize>,

    /// OCR language (Tesseract language code)
    #[arg(short, long, global = true, env = "DOCSIFT_LANG")]
    lang: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

/// Check if verbose mode is enabled (for early logging setup).
pub fn is_verbose() -> bool {
    std::env::args().any(|arg| arg == "-v" || arg == "--verbose")
}

#[derive(Subcommand)]
enum Commands {
    /// Extract text from a PDF or image
    Extract {
        /// Document to extract
        file: PathBuf,
        /// MIME type (detected from content, then extension, when omitted)
        #[arg(short, long)]
        mime: Option<String>,
        /// Write text to this file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Print a per-page JSON provenance report to stderr
        #[arg(long)]
        report: bool,
    },

    /// Show per-page word counts and the OCR decision without running OCR
    Pages {
        /// PDF to inspect
        file: PathBuf,
    },

    /// Check that the external tools are installed
    Check,

    /// Print the effective configuration as TOML
    Config,
}

/// Load the config file and apply command-line overrides.
async fn load_config(cli: &Cli) -> anyhow::Result<Config> {
    let mut config = match &cli.config {
        Some(path) => {
            if !path.exists() {
                anyhow::bail!("Config file not found: {}", path.display());
            }
            Config::load_from_path(path)
                .await
                .map_err(|e| anyhow::anyhow!(e))?
        }
        None => Config::load().await,
    };

    if let Some(workers) = cli.workers {
        config.extraction.worker_cap = workers;
    }
    if let Some(lang) = &cli.lang {
        config.extraction.ocr.language = lang.clone();
    }

    config
        .extraction
        .validate()
        .map_err(|e| anyhow::anyhow!("Invalid configuration: {}", e))?;
    Ok(config)
}

/// Build the extractor, attaching the neural engine when its models load.
fn build_extractor(config: &Config) -> Extractor {
    let extractor = Extractor::from_config(config);

    #[cfg(feature = "ocr-ocrs")]
    let extractor = match docsift::ocr::OcrsBackend::load(&config.extraction.ocr) {
        Ok(ocrs) => extractor.with_neural_engine(std::sync::Arc::new(ocrs)),
        Err(e) => {
            tracing::info!("OCRS engine not loaded: {}", e);
            extractor
        }
    };

    extractor
}

/// Run the CLI.
pub async fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = load_config(&cli).await?;

    match cli.command {
        Commands::Extract {
            file,
            mime,
            output,
            report,
        } => {
            let extractor = build_extractor(&config);
            extract::cmd_extract(&extractor, &file, mime.as_deref(), output.as_deref(), report)
                .await
        }
        Commands::Pages { file } => {
            let extractor = build_extractor(&config);
            pages::cmd_pages(&extractor, &file).await
        }
        Commands::Check => check::cmd_check(&config).await,
        Commands::Config => config_cmd::cmd_config_show(&config).await,
    }
}
