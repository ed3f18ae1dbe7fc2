//! Page classification command.

use std::path::Path;

use console::style;

use docsift::classify::decide;
use docsift::Extractor;

use crate::cli::helpers::truncate;
use crate::cli::icons::{dim_arrow, error};

/// Print each page's word count, flags and the document-level decision.
pub async fn cmd_pages(extractor: &Extractor, file: &Path) -> anyhow::Result<()> {
    let records = extractor.get_page_word_counts(file).await;
    if records.is_empty() {
        eprintln!("{} No readable pages in {}", error(), file.display());
        return Ok(());
    }

    let config = extractor.config();
    println!("\n{}", style(file.display()).bold());
    println!("{}", "-".repeat(78));
    println!(
        "{:>5} {:>7} {:>8} {:>8}  {:<20} {}",
        "page", "words", "rotation", "quality", "flags", "preview"
    );

    for record in &records {
        let flags = record.flags(config.min_words_per_page);
        let flags = if flags.is_empty() {
            "-".to_string()
        } else {
            flags
                .iter()
                .map(|f| f.as_str())
                .collect::<Vec<_>>()
                .join(",")
        };
        let quality = if record.quality_good {
            style("good").green()
        } else {
            style("poor").red()
        };
        let preview = record.native_text.split_whitespace().collect::<Vec<_>>().join(" ");

        println!(
            "{:>5} {:>7} {:>8} {:>8}  {:<20} {}",
            record.index + 1,
            record.word_count,
            record.rotation.to_string(),
            quality,
            flags,
            style(truncate(&preview, 30)).dim()
        );
    }

    let decision = decide(&records, config);
    println!();
    println!(
        "{} strategy {}, {:.1} words/page, {} of {} pages need OCR",
        dim_arrow(),
        style(decision.strategy).cyan(),
        decision.avg_words_per_page,
        decision.flagged.len(),
        records.len()
    );

    Ok(())
}
