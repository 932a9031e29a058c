//! Error types for the page-splitter library.
//!
//! A split job either produces its complete, ordered list of
//! [`crate::output::PageResult`]s or fails with a [`SplitError`]. There is no
//! partial-success channel: pages uploaded before a failure stay in storage
//! but are not reported back to the caller.

use thiserror::Error;

/// All fatal errors returned by the page-splitter library.
#[derive(Debug, Error)]
pub enum SplitError {
    // ── Storage errors ────────────────────────────────────────────────────
    /// A read or write against object storage failed. Not retried.
    #[error("Storage {operation} failed for '{location}': {detail}")]
    Storage {
        operation: &'static str,
        location: String,
        detail: String,
    },

    /// The storage adapter has no backend registered for this bucket.
    #[error("No object store registered for bucket '{bucket}'")]
    UnknownBucket { bucket: String },

    // ── Document errors ───────────────────────────────────────────────────
    /// The source bytes do not parse as their declared content type.
    #[error("Cannot decode '{location}': {detail}")]
    Decode { location: String, detail: String },

    /// pdfium-render returned an error for a specific page (0-indexed).
    #[error("Rasterisation failed for page {page}: {detail}")]
    RasterisationFailed { page: usize, detail: String },

    // ── Path errors ───────────────────────────────────────────────────────
    /// A page image key has no `pages` segment, so its job path is unknown.
    #[error("Key '{key}' is not a page image path (no 'pages' segment)")]
    MalformedPath { key: String },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Pdfium binding errors ─────────────────────────────────────────────
    /// Could not bind to a pdfium library.
    #[error(
        "Failed to bind to pdfium library: {0}\n\
Set PDFIUM_LIB_PATH (or --pdfium-lib) to a directory containing libpdfium."
    )]
    PdfiumBindingFailed(String),

    // ── Serialisation ─────────────────────────────────────────────────────
    /// The job metadata record could not be (de)serialised.
    #[error("Metadata serialisation failed: {0}")]
    Serialization(#[from] serde_json::Error),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl SplitError {
    pub(crate) fn storage(
        operation: &'static str,
        location: impl ToString,
        detail: impl ToString,
    ) -> Self {
        SplitError::Storage {
            operation,
            location: location.to_string(),
            detail: detail.to_string(),
        }
    }

    pub(crate) fn decode(location: impl ToString, detail: impl ToString) -> Self {
        SplitError::Decode {
            location: location.to_string(),
            detail: detail.to_string(),
        }
    }

    /// True for failures of the storage transport (including unknown buckets).
    pub fn is_storage(&self) -> bool {
        matches!(
            self,
            SplitError::Storage { .. } | SplitError::UnknownBucket { .. }
        )
    }
}
