//! Document loading: split a [`Document`] into ordered page images.
//!
//! PDFs are rasterised through pdfium, one image per page in document order.
//! PNG/JPEG uploads are decoded with the `image` crate and become a single
//! page. pdfium wraps a C++ library that is not safe to drive from async
//! contexts, so PDF work runs on `tokio::task::spawn_blocking`.

use crate::config::ExtractionConfig;
use crate::document::{Document, MediaType};
use crate::error::InvoiceError;
use image::{DynamicImage, ImageFormat};
use pdfium_render::prelude::*;
use std::path::Path;
use tracing::{debug, info};

/// PDF user-space units per inch.
const POINTS_PER_INCH: f32 = 72.0;

/// One rasterised page.
#[derive(Debug, Clone)]
pub struct Page {
    /// 0-based position in the document.
    pub index: usize,
    pub image: DynamicImage,
}

impl Page {
    pub fn new(index: usize, image: DynamicImage) -> Self {
        Self { index, image }
    }

    /// 1-indexed page number used in every user-facing message.
    pub fn page_num(&self) -> usize {
        self.index + 1
    }
}

/// Split a document into pages.
///
/// Any decode failure is fatal for the run.
pub async fn load_pages(document: Document, config: &ExtractionConfig) -> Result<Vec<Page>, InvoiceError> {
    let label = document.label().to_string();
    let pages = match document.media_type {
        MediaType::Pdf => {
            let dpi = config.dpi;
            let max_pixels = config.max_rendered_pixels;
            let password = config.password.clone();
            let lib_path = config.pdfium_lib_path.clone();
            let bytes = document.bytes;

            tokio::task::spawn_blocking(move || {
                render_pdf_blocking(&bytes, dpi, max_pixels, password.as_deref(), lib_path.as_deref())
            })
            .await
            .map_err(|e| InvoiceError::Internal(format!("Render task panicked: {}", e)))??
        }
        MediaType::Png | MediaType::Jpeg => vec![decode_image(&document.bytes, document.media_type)?],
    };

    info!("{}: {} page(s)", label, pages.len());
    Ok(pages)
}

/// Count pages without rasterising anything.
pub async fn count_pages(document: &Document, config: &ExtractionConfig) -> Result<usize, InvoiceError> {
    match document.media_type {
        MediaType::Png | MediaType::Jpeg => Ok(1),
        MediaType::Pdf => {
            let bytes = document.bytes.clone();
            let password = config.password.clone();
            let lib_path = config.pdfium_lib_path.clone();
            tokio::task::spawn_blocking(move || {
                let pdfium = bind_pdfium(lib_path.as_deref())?;
                let doc = pdfium
                    .load_pdf_from_byte_slice(&bytes, password.as_deref())
                    .map_err(|e| map_load_error(e, password.is_some()))?;
                Ok::<_, InvoiceError>(doc.pages().len() as usize)
            })
            .await
            .map_err(|e| InvoiceError::Internal(format!("Page count task panicked: {}", e)))?
        }
    }
}

/// Decode a PNG/JPEG upload into a single page.
pub fn decode_image(bytes: &[u8], media_type: MediaType) -> Result<Page, InvoiceError> {
    let format = match media_type {
        MediaType::Png => ImageFormat::Png,
        MediaType::Jpeg => ImageFormat::Jpeg,
        MediaType::Pdf => {
            return Err(InvoiceError::Internal(
                "decode_image called with a PDF".to_string(),
            ))
        }
    };

    let image = image::load_from_memory_with_format(bytes, format).map_err(|e| {
        InvoiceError::ImageDecodeFailed {
            detail: e.to_string(),
        }
    })?;
    debug!("Decoded {} image → {}x{} px", media_type, image.width(), image.height());
    Ok(Page::new(0, image))
}

/// Bind to pdfium: explicit path, then the working directory, then the
/// system library search path.
fn bind_pdfium(lib_path: Option<&Path>) -> Result<Pdfium, InvoiceError> {
    if let Some(path) = lib_path {
        debug!("Binding pdfium from {}", path.display());
        return Pdfium::bind_to_library(path)
            .map(Pdfium::new)
            .map_err(|e| InvoiceError::PdfiumBindingFailed(format!("{}: {}", path.display(), e)));
    }

    let local = Pdfium::pdfium_platform_library_name_at_path("./");
    match Pdfium::bind_to_library(&local) {
        Ok(bindings) => {
            debug!("Bound pdfium from {:?}", local);
            return Ok(Pdfium::new(bindings));
        }
        Err(e) => debug!("No usable pdfium at {:?} ({}), trying system library", local, e),
    }

    Pdfium::bind_to_system_library()
        .map(Pdfium::new)
        .map_err(|e| InvoiceError::PdfiumBindingFailed(e.to_string()))
}

fn map_load_error(e: PdfiumError, password_given: bool) -> InvoiceError {
    let err_str = format!("{:?}", e);
    if err_str.to_lowercase().contains("password") {
        if password_given {
            InvoiceError::WrongPassword
        } else {
            InvoiceError::PasswordRequired
        }
    } else {
        InvoiceError::CorruptPdf { detail: err_str }
    }
}

/// Blocking implementation of PDF rasterisation.
fn render_pdf_blocking(
    bytes: &[u8],
    dpi: u32,
    max_pixels: u32,
    password: Option<&str>,
    lib_path: Option<&Path>,
) -> Result<Vec<Page>, InvoiceError> {
    let pdfium = bind_pdfium(lib_path)?;

    let document = pdfium
        .load_pdf_from_byte_slice(bytes, password)
        .map_err(|e| map_load_error(e, password.is_some()))?;

    let pages = document.pages();
    let total_pages = pages.len() as usize;
    if total_pages == 0 {
        return Err(InvoiceError::CorruptPdf {
            detail: "document has no pages".to_string(),
        });
    }
    debug!("PDF loaded: {} pages", total_pages);

    let render_config = PdfRenderConfig::new()
        .scale_page_by_factor(dpi as f32 / POINTS_PER_INCH)
        .set_maximum_width(max_pixels as i32)
        .set_maximum_height(max_pixels as i32);

    let mut results = Vec::with_capacity(total_pages);

    for (idx, page) in pages.iter().enumerate() {
        let bitmap = page.render_with_config(&render_config).map_err(|e| {
            InvoiceError::RasterisationFailed {
                page: idx + 1,
                detail: format!("{:?}", e),
            }
        })?;

        let image = bitmap.as_image();
        debug!(
            "Rendered page {} → {}x{} px",
            idx + 1,
            image.width(),
            image.height()
        );

        results.push(Page::new(idx, image));
    }

    Ok(results)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgba, RgbaImage};
    use std::io::Cursor;

    fn png_bytes(w: u32, h: u32) -> Vec<u8> {
        let img = DynamicImage::ImageRgba8(RgbaImage::from_pixel(w, h, Rgba([0, 128, 255, 255])));
        let mut buf = Vec::new();
        img.write_to(&mut Cursor::new(&mut buf), ImageFormat::Png).unwrap();
        buf
    }

    #[test]
    fn page_numbers_are_one_based() {
        let page = Page::new(0, DynamicImage::new_rgb8(1, 1));
        assert_eq!(page.page_num(), 1);
    }

    #[test]
    fn decode_png_upload() {
        let page = decode_image(&png_bytes(12, 7), MediaType::Png).unwrap();
        assert_eq!(page.index, 0);
        assert_eq!((page.image.width(), page.image.height()), (12, 7));
    }

    #[test]
    fn decode_corrupt_image_is_fatal() {
        let err = decode_image(b"\x89PNG garbage", MediaType::Png).unwrap_err();
        assert!(matches!(err, InvoiceError::ImageDecodeFailed { .. }));
    }

    #[test]
    fn decode_trusts_declared_type() {
        // PNG bytes declared as JPEG must not silently succeed.
        let err = decode_image(&png_bytes(4, 4), MediaType::Jpeg).unwrap_err();
        assert!(matches!(err, InvoiceError::ImageDecodeFailed { .. }));
    }

    #[test]
    fn explicit_library_path_that_cannot_load_is_reported() {
        let err = bind_pdfium(Some(Path::new("/nonexistent/dir/libpdfium.so"))).unwrap_err();
        match err {
            InvoiceError::PdfiumBindingFailed(detail) => {
                assert!(detail.contains("/nonexistent/dir/libpdfium.so"), "got: {detail}")
            }
            other => panic!("unexpected: {other}"),
        }
    }

    #[tokio::test]
    async fn image_document_is_one_page() {
        let doc = Document::new(png_bytes(3, 3), MediaType::Png);
        let config = ExtractionConfig::default();
        assert_eq!(count_pages(&doc, &config).await.unwrap(), 1);
        let pages = load_pages(doc, &config).await.unwrap();
        assert_eq!(pages.len(), 1);
        assert_eq!(pages[0].page_num(), 1);
    }
}
