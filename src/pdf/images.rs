use std::path::Path;

use image::DynamicImage;

use super::PdfError;

/// Decode an image file produced by one of the Poppler tools.
pub fn load_image(path: &Path) -> Result<DynamicImage, PdfError> {
    image::open(path).map_err(|e| PdfError::Image(format!("{}: {}", path.display(), e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_load_image_rejects_garbage() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("page-1.png");
        std::fs::write(&path, b"not a png").unwrap();
        assert!(matches!(load_image(&path), Err(PdfError::Image(_))));
    }

    #[test]
    fn test_load_image_reads_png() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("page-1.png");
        DynamicImage::new_luma8(4, 3).save(&path).unwrap();
        let image = load_image(&path).unwrap();
        assert_eq!((image.width(), image.height()), (4, 3));
    }
}
