//! Image encoding: `DynamicImage` → PNG bytes.
//!
//! Every image this crate produces itself (rasterised pages, embedded images
//! stored as raw samples) is written as PNG. PNG is lossless, so the only
//! quality decision is the render scale.

use image::DynamicImage;
use std::io::Cursor;
use tracing::debug;

/// Extension used for every PNG this crate writes.
pub const PNG_EXTENSION: &str = "png";

/// Encode an image as PNG.
pub fn encode_png(img: &DynamicImage) -> Result<Vec<u8>, image::ImageError> {
    let mut buf = Vec::new();
    img.write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)?;
    debug!(
        "Encoded {}x{} image → {} bytes PNG",
        img.width(),
        img.height(),
        buf.len()
    );
    Ok(buf)
}

/// Content type for an image extension, as written to object storage.
pub fn content_type_for_extension(extension: &str) -> String {
    mime_guess::from_ext(extension)
        .first_or_octet_stream()
        .essence_str()
        .to_string()
}
