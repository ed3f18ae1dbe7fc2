//! Stub documents and engines for unit tests.
//!
//! Stub renders are landscape (`300 + page` x 200) so that tests can tell
//! from an image's shape whether a rotation was applied.

use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use image::DynamicImage;

use crate::ocr::{OcrBackend, OcrBackendType, OcrError, OcrResult, Segmentation};
use crate::pdf::{DocumentOpener, PageSource, PdfError, Rotation};

const VOCABULARY: &[&str] = &[
    "contratto",
    "fornitura",
    "servizi",
    "manutenzione",
    "ordinaria",
    "presso",
    "sede",
    "principale",
    "della",
    "società",
    "secondo",
    "condizioni",
    "economiche",
    "indicate",
    "allegato",
    "tecnico",
];

/// `words` words of plausible Italian prose.
pub fn prose(words: usize) -> String {
    (0..words)
        .map(|i| VOCABULARY[i % VOCABULARY.len()])
        .collect::<Vec<_>>()
        .join(" ")
}

pub const RENDER_HEIGHT: u32 = 200;

pub fn render_width(page: usize) -> u32 {
    300 + page as u32
}

#[derive(Debug, Clone)]
pub struct StubPage {
    pub text: String,
    pub rotation: Rotation,
    pub images: Vec<(u32, u32)>,
    pub text_fails: bool,
    pub render_fails: bool,
}

impl StubPage {
    pub fn native(text: String) -> Self {
        Self {
            text,
            rotation: Rotation::Deg0,
            images: Vec::new(),
            text_fails: false,
            render_fails: false,
        }
    }

    pub fn rotated(mut self, rotation: Rotation) -> Self {
        self.rotation = rotation;
        self
    }

    pub fn with_image(mut self, width: u32, height: u32) -> Self {
        self.images.push((width, height));
        self
    }

    pub fn text_fails(mut self) -> Self {
        self.text_fails = true;
        self
    }

    pub fn render_fails(mut self) -> Self {
        self.render_fails = true;
        self
    }
}

pub struct StubDocument {
    pages: Arc<Vec<StubPage>>,
}

impl StubDocument {
    pub fn new(pages: Vec<StubPage>) -> Self {
        Self {
            pages: Arc::new(pages),
        }
    }

    fn page(&self, page: usize) -> Result<&StubPage, PdfError> {
        self.pages.get(page).ok_or(PdfError::PageOutOfRange {
            page,
            page_count: self.pages.len(),
        })
    }
}

impl PageSource for StubDocument {
    fn page_count(&self) -> usize {
        self.pages.len()
    }

    fn native_text(&self, page: usize) -> Result<String, PdfError> {
        let stub = self.page(page)?;
        if stub.text_fails {
            return Err(PdfError::CommandFailed("pdftotext crashed".to_string()));
        }
        Ok(stub.text.clone())
    }

    fn rotation(&self, page: usize) -> Result<Rotation, PdfError> {
        Ok(self.page(page)?.rotation)
    }

    fn embedded_images(
        &self,
        page: usize,
        min_width: u32,
        min_height: u32,
    ) -> Result<Vec<DynamicImage>, PdfError> {
        Ok(self
            .page(page)?
            .images
            .iter()
            .filter(|(w, h)| *w >= min_width && *h >= min_height)
            .map(|(w, h)| DynamicImage::new_luma8(*w, *h))
            .collect())
    }

    fn render(&self, page: usize, _zoom: f32) -> Result<DynamicImage, PdfError> {
        if self.page(page)?.render_fails {
            return Err(PdfError::CommandFailed("pdftoppm crashed".to_string()));
        }
        Ok(DynamicImage::new_luma8(render_width(page), RENDER_HEIGHT))
    }
}

/// Opens the same in-memory pages for any path.
pub struct StubOpener {
    pages: Arc<Vec<StubPage>>,
    open_fails: bool,
    opens: AtomicUsize,
    zooms: Mutex<Vec<f32>>,
}

impl StubOpener {
    pub fn new(pages: Vec<StubPage>) -> Self {
        Self {
            pages: Arc::new(pages),
            open_fails: false,
            opens: AtomicUsize::new(0),
            zooms: Mutex::new(Vec::new()),
        }
    }

    /// `open` fails; whole-document rendering still works.
    pub fn failing_open(mut self) -> Self {
        self.open_fails = true;
        self
    }

    pub fn opens(&self) -> usize {
        self.opens.load(Ordering::SeqCst)
    }

    /// Zoom factors passed to `for_each_rendered_page`.
    pub fn fallback_zooms(&self) -> Vec<f32> {
        self.zooms.lock().map(|z| z.clone()).unwrap_or_default()
    }
}

impl DocumentOpener for StubOpener {
    fn open(&self, _path: &Path) -> Result<Box<dyn PageSource>, PdfError> {
        self.opens.fetch_add(1, Ordering::SeqCst);
        if self.open_fails {
            return Err(PdfError::CommandFailed("pdfinfo: Syntax Error".to_string()));
        }
        Ok(Box::new(StubDocument {
            pages: self.pages.clone(),
        }))
    }

    fn for_each_rendered_page(
        &self,
        _path: &Path,
        zoom: f32,
        visit: &mut dyn FnMut(usize, DynamicImage),
    ) -> Result<usize, PdfError> {
        if let Ok(mut zooms) = self.zooms.lock() {
            zooms.push(zoom);
        }
        if self.pages.is_empty() {
            return Err(PdfError::CommandFailed("No images generated from PDF".to_string()));
        }
        let mut visited = 0;
        for (index, page) in self.pages.iter().enumerate() {
            if page.render_fails {
                continue;
            }
            visit(index, DynamicImage::new_luma8(render_width(index), RENDER_HEIGHT));
            visited += 1;
        }
        Ok(visited)
    }
}

type RecognizeFn = dyn Fn(&DynamicImage) -> Result<String, OcrError> + Send + Sync;
type OrientationFn = dyn Fn(&DynamicImage) -> Result<Rotation, OcrError> + Send + Sync;
type FileFn = dyn Fn(Segmentation) -> Result<String, OcrError> + Send + Sync;

/// Engine driven by closures, counting its calls.
pub struct StubEngine {
    kind: OcrBackendType,
    recognize: Box<RecognizeFn>,
    orientation: Box<OrientationFn>,
    file: Option<Box<FileFn>>,
    calls: AtomicUsize,
    osd_calls: AtomicUsize,
    segmentations: Mutex<Vec<Segmentation>>,
}

impl StubEngine {
    pub fn new<F>(recognize: F) -> Self
    where
        F: Fn(&DynamicImage) -> Result<String, OcrError> + Send + Sync + 'static,
    {
        Self {
            kind: OcrBackendType::Tesseract,
            recognize: Box::new(recognize),
            orientation: Box::new(|_| Ok(Rotation::Deg0)),
            file: None,
            calls: AtomicUsize::new(0),
            osd_calls: AtomicUsize::new(0),
            segmentations: Mutex::new(Vec::new()),
        }
    }

    pub fn with_orientation<F>(mut self, orientation: F) -> Self
    where
        F: Fn(&DynamicImage) -> Result<Rotation, OcrError> + Send + Sync + 'static,
    {
        self.orientation = Box::new(orientation);
        self
    }

    /// Answer file recognition by segmentation mode instead of by image.
    pub fn with_file_results<F>(mut self, file: F) -> Self
    where
        F: Fn(Segmentation) -> Result<String, OcrError> + Send + Sync + 'static,
    {
        self.file = Some(Box::new(file));
        self
    }

    pub fn of_kind(mut self, kind: OcrBackendType) -> Self {
        self.kind = kind;
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn osd_calls(&self) -> usize {
        self.osd_calls.load(Ordering::SeqCst)
    }

    pub fn segmentations(&self) -> Vec<Segmentation> {
        self.segmentations
            .lock()
            .map(|s| s.clone())
            .unwrap_or_default()
    }

    fn result(&self, text: String) -> OcrResult {
        OcrResult {
            text,
            backend: self.kind,
            processing_time_ms: 0,
        }
    }
}

impl OcrBackend for StubEngine {
    fn backend_type(&self) -> OcrBackendType {
        self.kind
    }

    fn is_available(&self) -> bool {
        true
    }

    fn availability_hint(&self) -> String {
        "stub".to_string()
    }

    fn recognize_file(
        &self,
        image_path: &Path,
        segmentation: Segmentation,
    ) -> Result<OcrResult, OcrError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut seen) = self.segmentations.lock() {
            seen.push(segmentation);
        }
        if let Some(file) = &self.file {
            return file(segmentation).map(|text| self.result(text));
        }
        let image = image::open(image_path).map_err(|e| OcrError::ImageError(e.to_string()))?;
        (self.recognize)(&image).map(|text| self.result(text))
    }

    fn recognize(&self, image: &DynamicImage) -> Result<OcrResult, OcrError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        (self.recognize)(image).map(|text| self.result(text))
    }

    fn detect_orientation(&self, image: &DynamicImage) -> Result<Rotation, OcrError> {
        self.osd_calls.fetch_add(1, Ordering::SeqCst);
        (self.orientation)(image)
    }
}
