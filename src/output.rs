//! Result types returned by a split job.

use crate::location::ObjectLocator;
use image::DynamicImage;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// How a page image was produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImageOrigin {
    /// Copied out of the PDF's embedded image without resampling.
    Extracted,
    /// Rendered from the page content and encoded as PNG.
    Rasterized,
    /// The source object itself (standalone image), uploaded unchanged.
    Passthrough,
}

/// One uploaded page.
///
/// The decoded `image` is kept for in-process consumers and skipped when the
/// result is serialised.
#[derive(Debug, Clone, Serialize)]
pub struct PageResult {
    /// The document the page came from.
    pub source: ObjectLocator,
    /// 0-indexed page number.
    pub page_number: usize,
    #[serde(skip)]
    pub image: DynamicImage,
    /// Extension of the uploaded file (`png`, `jpeg`, ...).
    pub image_extension: String,
    /// Where the page image was written.
    pub location: ObjectLocator,
    pub origin: ImageOrigin,
    /// Whatever the post-processing hook returned for this page.
    pub post_processing_result: Option<Value>,
}

impl PageResult {
    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }
}
