//! Source decoding: turn the bytes of a source object into a page plan.
//!
//! A PDF is parsed once with lopdf. Each page is classified from its own
//! text plus the text and images reachable through its resources (see
//! [`inventory`](crate::pipeline::inventory)), and pages that
//! are a lone embedded image are extracted losslessly right here. Every other
//! page is left as [`PagePlan::Rasterize`] for the render stage. A standalone
//! image is a single page whose bytes pass through untouched.
//!
//! Everything in this module is synchronous and CPU bound; the splitter runs
//! it on the blocking pool.

use crate::error::SplitError;
use crate::location::ObjectLocator;
use crate::output::ImageOrigin;
use crate::pipeline::classify::{classify_page, PageKind};
use crate::pipeline::extract::extract_embedded_image;
use crate::pipeline::inventory::inventory_page;
use bytes::Bytes;
use image::DynamicImage;
use lopdf::Document;
use tracing::{debug, info};

/// An encoded page image ready for upload.
#[derive(Debug, Clone)]
pub struct PageImage {
    /// 0-indexed page number.
    pub page_number: usize,
    /// Encoded bytes, written to storage as-is.
    pub bytes: Bytes,
    /// File extension matching `bytes`.
    pub extension: String,
    pub image: DynamicImage,
    pub origin: ImageOrigin,
}

/// What still has to happen to a PDF page before it can be uploaded.
#[derive(Debug, Clone)]
pub enum PagePlan {
    /// Extracted from the document; nothing left to do.
    Ready(PageImage),
    /// Needs rendering.
    Rasterize { page_number: usize },
}

impl PagePlan {
    pub fn page_number(&self) -> usize {
        match self {
            PagePlan::Ready(page) => page.page_number,
            PagePlan::Rasterize { page_number } => *page_number,
        }
    }
}

/// A decoded source object.
#[derive(Debug, Clone)]
pub enum SourcePages {
    /// A PDF, one plan per page in page order.
    Multipage { pages: Vec<PagePlan> },
    /// A single image; the whole object is page 0.
    Standalone { page: PageImage },
}

impl SourcePages {
    pub fn page_count(&self) -> usize {
        match self {
            SourcePages::Multipage { pages } => pages.len(),
            SourcePages::Standalone { .. } => 1,
        }
    }

    /// Page numbers that still need rasterising.
    pub fn pages_to_rasterize(&self) -> Vec<usize> {
        match self {
            SourcePages::Multipage { pages } => pages
                .iter()
                .filter_map(|plan| match plan {
                    PagePlan::Rasterize { page_number } => Some(*page_number),
                    PagePlan::Ready(_) => None,
                })
                .collect(),
            SourcePages::Standalone { .. } => Vec::new(),
        }
    }
}

/// Decode `bytes` read from `location`.
///
/// Fails with [`SplitError::Decode`] when the bytes are not a PDF (for a
/// multipage source) or not a decodable image (for a standalone source).
pub fn decode_source(
    bytes: Bytes,
    is_multipage: bool,
    location: &ObjectLocator,
) -> Result<SourcePages, SplitError> {
    if is_multipage {
        decode_pdf(&bytes, location)
    } else {
        decode_standalone(bytes, location)
    }
}

fn decode_pdf(bytes: &[u8], location: &ObjectLocator) -> Result<SourcePages, SplitError> {
    let doc = Document::load_mem(bytes).map_err(|e| SplitError::decode(location, e))?;
    let page_ids = doc.get_pages();
    info!("Parsed {}: {} pages", location, page_ids.len());

    let mut pages = Vec::with_capacity(page_ids.len());
    for (&number, &page_id) in &page_ids {
        let page_number = number as usize - 1;
        let inventory = inventory_page(&doc, page_id);
        let images = inventory.images;

        let kind = match doc.extract_text(&[number]) {
            Ok(text) => classify_page(&(text + &inventory.form_text), images.len()),
            Err(e) => {
                debug!("Page {}: text extraction failed ({}), rasterising", page_number, e);
                PageKind::Other
            }
        };

        let plan = match (kind, images.first()) {
            (PageKind::SingleImage, Some(&image_id)) => {
                match extract_embedded_image(&doc, image_id) {
                    Ok(extracted) => PagePlan::Ready(PageImage {
                        page_number,
                        bytes: Bytes::from(extracted.bytes),
                        extension: extracted.extension,
                        image: extracted.image,
                        origin: ImageOrigin::Extracted,
                    }),
                    Err(reason) => {
                        debug!("Page {}: cannot extract image ({}), rasterising", page_number, reason);
                        PagePlan::Rasterize { page_number }
                    }
                }
            }
            _ => PagePlan::Rasterize { page_number },
        };
        debug!("Page {} → {:?}", page_number, kind);
        pages.push(plan);
    }

    Ok(SourcePages::Multipage { pages })
}

fn decode_standalone(bytes: Bytes, location: &ObjectLocator) -> Result<SourcePages, SplitError> {
    let image = image::load_from_memory(&bytes).map_err(|e| SplitError::decode(location, e))?;
    debug!(
        "Decoded standalone image {}: {}x{}",
        location,
        image.width(),
        image.height()
    );
    Ok(SourcePages::Standalone {
        page: PageImage {
            page_number: 0,
            bytes,
            extension: location.extension().to_string(),
            image,
            origin: ImageOrigin::Passthrough,
        },
    })
}
