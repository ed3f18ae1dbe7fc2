//! Parsers for `pdfinfo` and `pdfimages -list` output.

use std::collections::BTreeMap;

use super::{PdfError, Rotation};

/// Document facts read from `pdfinfo`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PdfInfo {
    pub page_count: usize,
    /// Declared rotation per page, 0-indexed. Pages without a `rot:` line are upright.
    pub rotations: Vec<Rotation>,
}

/// Parse `pdfinfo -f 1 -l N` output.
pub fn parse_pdfinfo(stdout: &str) -> Result<PdfInfo, PdfError> {
    let mut page_count: Option<usize> = None;
    let mut declared: BTreeMap<usize, Rotation> = BTreeMap::new();

    for line in stdout.lines() {
        if let Some(rest) = line.strip_prefix("Pages:") {
            page_count = rest.trim().parse().ok();
            continue;
        }

        // "Page    3 rot:  90"
        let Some(rest) = line.strip_prefix("Page ") else {
            continue;
        };
        let mut parts = rest.split_whitespace();
        let (Some(num), Some("rot:"), Some(deg)) = (parts.next(), parts.next(), parts.next())
        else {
            continue;
        };
        let (Ok(num), Ok(deg)) = (num.parse::<usize>(), deg.parse::<i32>()) else {
            continue;
        };
        if num == 0 {
            continue;
        }
        let rotation = Rotation::from_degrees(deg).ok_or_else(|| {
            PdfError::Parse(format!("page {} declares invalid rotation {}", num, deg))
        })?;
        declared.insert(num - 1, rotation);
    }

    let page_count =
        page_count.ok_or_else(|| PdfError::Parse("pdfinfo reported no page count".to_string()))?;
    let rotations = (0..page_count)
        .map(|i| declared.get(&i).copied().unwrap_or_default())
        .collect();

    Ok(PdfInfo {
        page_count,
        rotations,
    })
}

/// One row of `pdfimages -list`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageListing {
    pub num: u32,
    pub width: u32,
    pub height: u32,
}

/// Parse `pdfimages -list` output, keeping only real raster images.
///
/// Soft masks, stencil masks and other helper entries are dropped.
pub fn parse_image_list(stdout: &str) -> Vec<ImageListing> {
    stdout
        .lines()
        .filter_map(|line| {
            let cols: Vec<&str> = line.split_whitespace().collect();
            // page num type width height ...
            if cols.len() < 5 || cols[2] != "image" {
                return None;
            }
            Some(ImageListing {
                num: cols[1].parse().ok()?,
                width: cols[3].parse().ok()?,
                height: cols[4].parse().ok()?,
            })
        })
        .collect()
}
