//! Page rasterisation: render selected pages to `DynamicImage`.
//!
//! ## Why spawn_blocking?
//!
//! The `pdfium-render` crate wraps the pdfium C++ library, which uses
//! thread-local state internally and is not safe to call from async contexts.
//! [`render_pages`] moves the work onto tokio's blocking pool so the runtime's
//! worker threads keep serving storage I/O while pages render.
//!
//! Rendering sits behind [`PageRasterizer`] so the splitter can be driven by
//! another backend, and so tests run without a pdfium shared library.

use crate::error::SplitError;
use bytes::Bytes;
use image::DynamicImage;
use pdfium_render::prelude::*;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

/// Renders PDF pages to bitmaps.
pub trait PageRasterizer: Send + Sync {
    /// Render each of `page_indices` (0-based) of the PDF in `document`,
    /// scaled by `scale` relative to the page's size in points.
    ///
    /// Returns `(page_index, image)` pairs in the order requested.
    fn rasterize(
        &self,
        document: &[u8],
        page_indices: &[usize],
        scale: f32,
    ) -> Result<Vec<(usize, DynamicImage)>, SplitError>;
}

/// [`PageRasterizer`] backed by pdfium.
#[derive(Debug, Clone, Default)]
pub struct PdfiumRasterizer {
    library_path: Option<PathBuf>,
}

impl PdfiumRasterizer {
    /// Bind to libpdfium at `library_path` (a file, or a directory holding
    /// the platform library), or to the system library when None.
    pub fn new(library_path: Option<PathBuf>) -> Self {
        Self { library_path }
    }

    fn bind(&self) -> Result<Pdfium, SplitError> {
        let bindings = match self.library_path.as_deref() {
            Some(dir) if dir.is_dir() => {
                Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path(dir))
            }
            Some(file) => Pdfium::bind_to_library(file),
            None => Pdfium::bind_to_system_library(),
        }
        .map_err(|e| SplitError::PdfiumBindingFailed(format!("{:?}", e)))?;

        Ok(Pdfium::new(bindings))
    }

    pub fn library_path(&self) -> Option<&Path> {
        self.library_path.as_deref()
    }
}

impl PageRasterizer for PdfiumRasterizer {
    fn rasterize(
        &self,
        document: &[u8],
        page_indices: &[usize],
        scale: f32,
    ) -> Result<Vec<(usize, DynamicImage)>, SplitError> {
        let first = page_indices.first().copied().unwrap_or(0);
        let pdfium = self.bind()?;

        let document = pdfium
            .load_pdf_from_byte_slice(document, None)
            .map_err(|e| SplitError::RasterisationFailed {
                page: first,
                detail: format!("pdfium cannot open document: {:?}", e),
            })?;

        let pages = document.pages();
        info!("pdfium loaded document: {} pages", pages.len());

        let render_config = PdfRenderConfig::new().scale_page_by_factor(scale);
        let mut results = Vec::with_capacity(page_indices.len());

        for &idx in page_indices {
            let page = pages
                .get(pdfium_page_index(idx)?)
                .map_err(|e| SplitError::RasterisationFailed {
                    page: idx,
                    detail: format!("{:?}", e),
                })?;

            let bitmap = page.render_with_config(&render_config).map_err(|e| {
                SplitError::RasterisationFailed {
                    page: idx,
                    detail: format!("{:?}", e),
                }
            })?;

            let image = bitmap.as_image();
            debug!(
                "Rendered page {} → {}x{} px",
                idx,
                image.width(),
                image.height()
            );

            results.push((idx, image));
        }

        Ok(results)
    }
}

/// pdfium addresses pages with a `u16`; larger indices cannot be rendered.
fn pdfium_page_index(idx: usize) -> Result<PdfPageIndex, SplitError> {
    PdfPageIndex::try_from(idx).map_err(|_| SplitError::RasterisationFailed {
        page: idx,
        detail: format!("page index exceeds pdfium's limit of {}", PdfPageIndex::MAX),
    })
}

/// Rasterise `page_indices` on the blocking pool.
pub async fn render_pages(
    rasterizer: Arc<dyn PageRasterizer>,
    document: Bytes,
    page_indices: Vec<usize>,
    scale: f32,
) -> Result<Vec<(usize, DynamicImage)>, SplitError> {
    if page_indices.is_empty() {
        return Ok(Vec::new());
    }

    tokio::task::spawn_blocking(move || rasterizer.rasterize(&document, &page_indices, scale))
        .await
        .map_err(|e| SplitError::Internal(format!("Render task panicked: {}", e)))?
}
