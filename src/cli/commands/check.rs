//! External tool availability check.

use console::style;

use docsift::config::Config;
use docsift::ocr::{check_binary, OcrBackend, TesseractBackend, TESSERACT};
use docsift::pdf::poppler::REQUIRED_TOOLS;

/// Availability of every external binary the pipeline shells out to.
pub fn check_tools() -> Vec<(String, bool)> {
    REQUIRED_TOOLS
        .iter()
        .chain(std::iter::once(&TESSERACT))
        .map(|tool| (tool.to_string(), check_binary(tool)))
        .collect()
}

/// Report which tools and OCR engines are usable.
pub async fn cmd_check(config: &Config) -> anyhow::Result<()> {
    println!("\n{}", style("Extraction Tool Status").bold());
    println!("{}", "-".repeat(50));

    println!("\n{}", style("External Tools:").cyan());
    let mut all_found = true;
    for (tool, available) in check_tools() {
        let status = if available {
            style("✓ found").green()
        } else {
            all_found = false;
            style("✗ not found").red()
        };
        println!("  {:<15} {}", tool, status);
    }

    println!("\n{}", style("OCR Engines:").cyan());
    let tesseract = TesseractBackend::with_config(config.extraction.ocr.clone());
    let status = if tesseract.is_available() {
        style("✓ available").green()
    } else {
        style("✗ not available").red()
    };
    println!("  {:<15} {}", "Tesseract", status);
    println!("                  {}", style(tesseract.availability_hint()).dim());

    #[cfg(feature = "ocr-ocrs")]
    {
        match docsift::ocr::OcrsBackend::load(&config.extraction.ocr) {
            Ok(_) => println!("  {:<15} {}", "OCRS", style("✓ models loaded").green()),
            Err(e) => {
                println!("  {:<15} {}", "OCRS", style("○ not loaded").yellow());
                println!("                  {}", style(e).dim());
            }
        }
    }

    println!();
    if all_found {
        println!("{}", style("All required tools are installed.").green());
    } else {
        println!(
            "{}",
            style("Some tools are missing. Install poppler-utils and tesseract-ocr.").yellow()
        );
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_tools_lists_every_binary() {
        let tools: Vec<String> = check_tools().into_iter().map(|(t, _)| t).collect();
        assert_eq!(
            tools,
            vec!["pdfinfo", "pdftotext", "pdftoppm", "pdfimages", "tesseract"]
        );
    }
}
