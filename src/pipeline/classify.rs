//! Page classification: lossless extraction or rasterisation?
//!
//! A page that is essentially one picture (a scan, a photo) is re-emitted
//! from its embedded image bytes. Anything else, including pages with two or
//! more images or with no image at all, is rasterised so the output shows
//! what the page actually looks like.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Most alphanumeric characters a page may carry and still count as a lone image.
pub const MAX_SINGLE_IMAGE_TEXT_CHARS: usize = 5;

/// Outcome of [`classify_page`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PageKind {
    /// Exactly one embedded image and (almost) no text.
    SingleImage,
    /// Text, vector content, several images or none.
    Other,
}

static RE_NON_ALPHANUMERIC: Lazy<Regex> = Lazy::new(|| Regex::new(r"[\W_]+").unwrap());

/// Number of characters left once everything but letters and digits is removed.
pub fn alphanumeric_len(text: &str) -> usize {
    RE_NON_ALPHANUMERIC.replace_all(text, "").chars().count()
}

/// Classify a page from its extracted text and its embedded image count.
pub fn classify_page(text: &str, image_count: usize) -> PageKind {
    if image_count == 1 && alphanumeric_len(text) <= MAX_SINGLE_IMAGE_TEXT_CHARS {
        PageKind::SingleImage
    } else {
        PageKind::Other
    }
}
