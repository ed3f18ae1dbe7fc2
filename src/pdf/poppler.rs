//! Thin wrappers around the Poppler command-line tools.
//!
//! Every tool is invoked with an explicit page range so that each call
//! only touches the page it needs.

use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use super::PdfError;

pub const PDFINFO: &str = "pdfinfo";
pub const PDFTOTEXT: &str = "pdftotext";
pub const PDFTOPPM: &str = "pdftoppm";
pub const PDFIMAGES: &str = "pdfimages";

/// Tools the rasterizer shells out to.
pub const REQUIRED_TOOLS: [&str; 4] = [PDFINFO, PDFTOTEXT, PDFTOPPM, PDFIMAGES];

/// Stdout of a finished Poppler command.
///
/// A missing binary maps to [`PdfError::ToolNotFound`]; a non-zero exit to
/// [`PdfError::CommandFailed`] prefixed with `context`.
fn handle_cmd_output(
    result: std::io::Result<Output>,
    tool_name: &str,
    context: &str,
) -> Result<String, PdfError> {
    let output = result.map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => {
            PdfError::ToolNotFound(format!("{} (install poppler-utils)", tool_name))
        }
        _ => PdfError::Io(e),
    })?;
    if !output.status.success() {
        return Err(PdfError::CommandFailed(format!(
            "{}: {}",
            context,
            String::from_utf8_lossy(&output.stderr).trim()
        )));
    }
    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

/// Run `pdfinfo` over a page range so that per-page rotation lines are printed.
///
/// `pdfinfo` clamps the last page to the document length, so a large
/// upper bound covers every page in a single call.
pub fn pdfinfo(pdf_path: &Path) -> Result<String, PdfError> {
    let output = Command::new(PDFINFO)
        .args(["-f", "1", "-l", "99999"])
        .arg(pdf_path)
        .output();

    handle_cmd_output(output, PDFINFO, "pdfinfo failed")
}

/// Extract the text layer of a single page (1-based) in reading order.
pub fn pdftotext_page(pdf_path: &Path, page: u32) -> Result<String, PdfError> {
    let page_str = page.to_string();
    let output = Command::new(PDFTOTEXT)
        .args(["-enc", "UTF-8", "-f", &page_str, "-l", &page_str])
        .arg(pdf_path)
        .arg("-")
        .output();

    handle_cmd_output(
        output,
        PDFTOTEXT,
        &format!("pdftotext failed on page {}", page),
    )
}

/// Render one page (1-based) to PNG at the given resolution inside `output_dir`.
pub fn pdftoppm_page(
    pdf_path: &Path,
    page: u32,
    dpi: u32,
    output_dir: &Path,
) -> Result<PathBuf, PdfError> {
    let page_str = page.to_string();
    let dpi_str = dpi.to_string();
    let output = Command::new(PDFTOPPM)
        .args(["-png", "-r", &dpi_str, "-f", &page_str, "-l", &page_str])
        .arg(pdf_path)
        .arg(output_dir.join("page"))
        .output();

    handle_cmd_output(
        output,
        PDFTOPPM,
        &format!("pdftoppm failed to render page {}", page),
    )?;

    find_page_image(output_dir, page)
        .ok_or_else(|| PdfError::CommandFailed(format!("No image generated for page {}", page)))
}

/// Render every page of the document to PNG files inside `output_dir`.
///
/// Returns the generated files sorted by page.
pub fn pdftoppm_all(pdf_path: &Path, dpi: u32, output_dir: &Path) -> Result<Vec<PathBuf>, PdfError> {
    let dpi_str = dpi.to_string();
    let output = Command::new(PDFTOPPM)
        .args(["-png", "-r", &dpi_str])
        .arg(pdf_path)
        .arg(output_dir.join("page"))
        .output();

    handle_cmd_output(output, PDFTOPPM, "pdftoppm failed to convert PDF")?;

    let mut images: Vec<PathBuf> = std::fs::read_dir(output_dir)?
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| p.extension().map(|ext| ext == "png").unwrap_or(false))
        .collect();
    // Zero-padded names sort in page order.
    images.sort();

    if images.is_empty() {
        return Err(PdfError::CommandFailed(
            "No images generated from PDF".to_string(),
        ));
    }
    Ok(images)
}

/// List the images placed on a single page (1-based).
pub fn pdfimages_list(pdf_path: &Path, page: u32) -> Result<String, PdfError> {
    let page_str = page.to_string();
    let output = Command::new(PDFIMAGES)
        .args(["-list", "-f", &page_str, "-l", &page_str])
        .arg(pdf_path)
        .output();

    handle_cmd_output(
        output,
        PDFIMAGES,
        &format!("pdfimages failed to list page {}", page),
    )
}

/// Write every image of a single page (1-based) as PNG into `output_dir`.
///
/// Files are named `img-NNN.png`, where `NNN` matches the `num` column
/// of [`pdfimages_list`] for the same page range.
pub fn pdfimages_extract(pdf_path: &Path, page: u32, output_dir: &Path) -> Result<(), PdfError> {
    let page_str = page.to_string();
    let output = Command::new(PDFIMAGES)
        .args(["-png", "-f", &page_str, "-l", &page_str])
        .arg(pdf_path)
        .arg(output_dir.join("img"))
        .output();

    handle_cmd_output(
        output,
        PDFIMAGES,
        &format!("pdfimages failed to extract page {}", page),
    )
    .map(|_| ())
}

/// Path pdfimages uses for image `num` with the `img` prefix.
pub fn extracted_image_path(output_dir: &Path, num: u32) -> PathBuf {
    output_dir.join(format!("img-{:03}.png", num))
}

/// Locate the render of 1-based `page_num` inside `temp_path`.
///
/// `pdftoppm` zero-pads the page number to the width of the document's
/// page count, which a single-page render does not reveal.
pub fn find_page_image(temp_path: &Path, page_num: u32) -> Option<PathBuf> {
    for digits in [1, 2, 3, 4, 5] {
        let filename = format!("page-{:0width$}.png", page_num, width = digits);
        let path = temp_path.join(&filename);
        if path.exists() {
            return Some(path);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_find_page_image_tries_each_padding() {
        let temp = TempDir::new().unwrap();
        for name in ["page-3.png", "page-07.png", "page-012.png"] {
            std::fs::write(temp.path().join(name), b"png").unwrap();
        }

        assert_eq!(find_page_image(temp.path(), 3), Some(temp.path().join("page-3.png")));
        assert_eq!(find_page_image(temp.path(), 7), Some(temp.path().join("page-07.png")));
        assert_eq!(find_page_image(temp.path(), 12), Some(temp.path().join("page-012.png")));
        assert_eq!(find_page_image(temp.path(), 4), None);
    }

    #[test]
    fn test_extracted_image_path_padding() {
        let dir = Path::new("/tmp/x");
        assert_eq!(extracted_image_path(dir, 4), dir.join("img-004.png"));
        assert_eq!(extracted_image_path(dir, 1234), dir.join("img-1234.png"));
    }
}
