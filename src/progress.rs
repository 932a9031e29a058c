//! Progress-callback trait for per-page split events.
//!
//! Inject an [`Arc<dyn SplitProgressCallback>`] via
//! [`crate::config::SplitConfigBuilder::progress_callback`] to receive events
//! as the splitter uploads each page.
//!
//! # Example
//!
//! ```rust
//! use page_splitter::{ObjectLocator, SplitConfig, SplitProgressCallback};
//! use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
//!
//! struct CountingCallback {
//!     uploaded: AtomicUsize,
//! }
//!
//! impl SplitProgressCallback for CountingCallback {
//!     fn on_page_uploaded(&self, page_number: usize, total_pages: usize, location: &ObjectLocator) {
//!         self.uploaded.fetch_add(1, Ordering::SeqCst);
//!         eprintln!("page {}/{} -> {}", page_number + 1, total_pages, location);
//!     }
//! }
//!
//! let config = SplitConfig::builder()
//!     .progress_callback(Arc::new(CountingCallback { uploaded: AtomicUsize::new(0) }))
//!     .build()
//!     .unwrap();
//! ```

use crate::location::ObjectLocator;
use std::sync::Arc;

/// Called by the splitter as it processes a job.
///
/// All methods have default no-op implementations so callers only override
/// what they care about. Page numbers are 0-indexed.
pub trait SplitProgressCallback: Send + Sync {
    /// Called once the page count is known, before the metadata write.
    fn on_split_start(&self, total_pages: usize) {
        let _ = total_pages;
    }

    /// Called after a page image has been uploaded (before the post-processing hook).
    fn on_page_uploaded(&self, page_number: usize, total_pages: usize, location: &ObjectLocator) {
        let _ = (page_number, total_pages, location);
    }

    /// Called once after every page has been uploaded.
    fn on_split_complete(&self, total_pages: usize) {
        let _ = total_pages;
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl SplitProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::SplitConfig`].
pub type ProgressCallback = Arc<dyn SplitProgressCallback>;
