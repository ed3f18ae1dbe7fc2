//! PDF access: page count, native text layer, declared rotation,
//! embedded raster images and page rendering.
//!
//! The default implementation drives the Poppler utilities
//! (`pdfinfo`, `pdftotext`, `pdftoppm`, `pdfimages`). Everything above this
//! module talks to the [`DocumentOpener`] and [`PageSource`] traits so that
//! the pipeline can run against stub documents in tests.

mod images;
pub mod info;
pub mod poppler;

use std::path::{Path, PathBuf};

use image::DynamicImage;
use tempfile::TempDir;
use thiserror::Error;

pub use images::load_image;
pub use info::{ImageListing, PdfInfo};

/// Errors from PDF access.
#[derive(Debug, Error)]
pub enum PdfError {
    #[error("External tool not found: {0}")]
    ToolNotFound(String),

    #[error("Command failed: {0}")]
    CommandFailed(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Page {page} out of range (document has {page_count} pages)")]
    PageOutOfRange { page: usize, page_count: usize },

    #[error("Image error: {0}")]
    Image(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Declared or detected page rotation, clockwise.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Rotation {
    #[default]
    Deg0,
    Deg90,
    Deg180,
    Deg270,
}

impl Rotation {
    /// Normalize any multiple of 90 (negative values included).
    pub fn from_degrees(degrees: i32) -> Option<Self> {
        match degrees.rem_euclid(360) {
            0 => Some(Rotation::Deg0),
            90 => Some(Rotation::Deg90),
            180 => Some(Rotation::Deg180),
            270 => Some(Rotation::Deg270),
            _ => None,
        }
    }

    pub fn degrees(self) -> u16 {
        match self {
            Rotation::Deg0 => 0,
            Rotation::Deg90 => 90,
            Rotation::Deg180 => 180,
            Rotation::Deg270 => 270,
        }
    }

    pub fn is_upright(self) -> bool {
        self == Rotation::Deg0
    }

    /// Rotate `image` clockwise by this amount.
    pub fn apply(self, image: DynamicImage) -> DynamicImage {
        match self {
            Rotation::Deg0 => image,
            Rotation::Deg90 => image.rotate90(),
            Rotation::Deg180 => image.rotate180(),
            Rotation::Deg270 => image.rotate270(),
        }
    }
}

impl std::fmt::Display for Rotation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}°", self.degrees())
    }
}

/// An open document. Pages are 0-indexed.
pub trait PageSource: Send {
    fn page_count(&self) -> usize;

    /// Text layer of the page, without any recognition.
    fn native_text(&self, page: usize) -> Result<String, PdfError>;

    /// Rotation declared in the page dictionary.
    fn rotation(&self, page: usize) -> Result<Rotation, PdfError>;

    /// Raster images placed on the page whose pixel size is at least
    /// `min_width` x `min_height`.
    fn embedded_images(
        &self,
        page: usize,
        min_width: u32,
        min_height: u32,
    ) -> Result<Vec<DynamicImage>, PdfError>;

    /// Render the page at `zoom` times 72 DPI.
    fn render(&self, page: usize, zoom: f32) -> Result<DynamicImage, PdfError>;
}

/// Opens documents. Each caller gets its own handle.
pub trait DocumentOpener: Send + Sync {
    fn open(&self, path: &Path) -> Result<Box<dyn PageSource>, PdfError>;

    /// Render every page of a document that may not open cleanly, calling
    /// `visit` with each page index and image. Returns the number of pages visited.
    fn for_each_rendered_page(
        &self,
        path: &Path,
        zoom: f32,
        visit: &mut dyn FnMut(usize, DynamicImage),
    ) -> Result<usize, PdfError>;
}

/// Convert a zoom factor into the DPI Poppler expects.
pub fn zoom_to_dpi(zoom: f32) -> u32 {
    (72.0 * zoom).round().max(1.0) as u32
}

/// Poppler-backed opener.
#[derive(Debug, Clone, Copy, Default)]
pub struct PopplerOpener;

impl DocumentOpener for PopplerOpener {
    fn open(&self, path: &Path) -> Result<Box<dyn PageSource>, PdfError> {
        Ok(Box::new(PopplerDocument::open(path)?))
    }

    fn for_each_rendered_page(
        &self,
        path: &Path,
        zoom: f32,
        visit: &mut dyn FnMut(usize, DynamicImage),
    ) -> Result<usize, PdfError> {
        let temp_dir = TempDir::new()?;
        let pages = poppler::pdftoppm_all(path, zoom_to_dpi(zoom), temp_dir.path())?;
        let mut visited = 0;
        for (index, page_path) in pages.iter().enumerate() {
            match load_image(page_path) {
                Ok(image) => {
                    visit(index, image);
                    visited += 1;
                }
                Err(e) => tracing::warn!(page = index, "Skipping unreadable render: {}", e),
            }
        }
        Ok(visited)
    }
}

/// A PDF opened through Poppler.
#[derive(Debug, Clone)]
pub struct PopplerDocument {
    path: PathBuf,
    info: PdfInfo,
}

impl PopplerDocument {
    pub fn open(path: &Path) -> Result<Self, PdfError> {
        let info = info::parse_pdfinfo(&poppler::pdfinfo(path)?)?;
        Ok(Self {
            path: path.to_path_buf(),
            info,
        })
    }

    fn check_page(&self, page: usize) -> Result<u32, PdfError> {
        if page >= self.info.page_count {
            return Err(PdfError::PageOutOfRange {
                page,
                page_count: self.info.page_count,
            });
        }
        Ok(page as u32 + 1)
    }
}

impl PageSource for PopplerDocument {
    fn page_count(&self) -> usize {
        self.info.page_count
    }

    fn native_text(&self, page: usize) -> Result<String, PdfError> {
        let page_num = self.check_page(page)?;
        poppler::pdftotext_page(&self.path, page_num)
    }

    fn rotation(&self, page: usize) -> Result<Rotation, PdfError> {
        self.check_page(page)?;
        Ok(self.info.rotations[page])
    }

    fn embedded_images(
        &self,
        page: usize,
        min_width: u32,
        min_height: u32,
    ) -> Result<Vec<DynamicImage>, PdfError> {
        let page_num = self.check_page(page)?;
        let listing = info::parse_image_list(&poppler::pdfimages_list(&self.path, page_num)?);
        let wanted: Vec<ImageListing> = listing
            .into_iter()
            .filter(|img| img.width >= min_width && img.height >= min_height)
            .collect();
        if wanted.is_empty() {
            return Ok(Vec::new());
        }

        let temp_dir = TempDir::new()?;
        poppler::pdfimages_extract(&self.path, page_num, temp_dir.path())?;

        let mut images = Vec::with_capacity(wanted.len());
        for listed in wanted {
            let path = poppler::extracted_image_path(temp_dir.path(), listed.num);
            match load_image(&path) {
                Ok(image) => images.push(image),
                Err(e) => tracing::debug!(page, image = listed.num, "Skipping embedded image: {}", e),
            }
        }
        Ok(images)
    }

    fn render(&self, page: usize, zoom: f32) -> Result<DynamicImage, PdfError> {
        let page_num = self.check_page(page)?;
        let temp_dir = TempDir::new()?;
        let path = poppler::pdftoppm_page(&self.path, page_num, zoom_to_dpi(zoom), temp_dir.path())?;
        load_image(&path)
    }
}
