//! Text extraction command.

use std::path::Path;

use console::style;

use docsift::{ExtractionMethod, Extractor};

use crate::cli::helpers::detect_mime;
use crate::cli::icons::{dim_arrow, error, success, warn};

/// Extract one document and print or save its text.
pub async fn cmd_extract(
    extractor: &Extractor,
    file: &Path,
    mime: Option<&str>,
    output: Option<&Path>,
    report: bool,
) -> anyhow::Result<()> {
    if !file.exists() {
        anyhow::bail!("File not found: {}", file.display());
    }

    let mime_type = match mime {
        Some(m) => m.to_string(),
        None => detect_mime(file),
    };
    tracing::info!(file = %file.display(), mime = %mime_type, "Extracting");

    let (result, extraction_report) = extractor
        .process_document_with_report(file, &mime_type)
        .await;

    let icon = match result.method {
        ExtractionMethod::Error => error(),
        ExtractionMethod::Native | ExtractionMethod::Hybrid => success(),
        _ => warn(),
    };
    eprintln!(
        "{} {} {}",
        icon,
        style(file.display()).bold(),
        style(result.method).cyan()
    );

    if report {
        eprintln!("{}", serde_json::to_string_pretty(&extraction_report)?);
    }

    match output {
        Some(path) => {
            tokio::fs::write(path, &result.text).await?;
            eprintln!("  {} Written to {}", dim_arrow(), path.display());
        }
        None => println!("{}", result.text),
    }

    if result.method == ExtractionMethod::Error {
        anyhow::bail!("No text could be extracted from {}", file.display());
    }
    Ok(())
}
