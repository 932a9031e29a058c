//! # page-splitter
//!
//! Split documents stored in object storage into one image per page.
//!
//! A PDF becomes one image per page; a standalone image becomes a single
//! page. Pages that are nothing but one embedded picture (scans, photos) are
//! copied out of the PDF without re-encoding; every other page is rasterised
//! with pdfium and stored as PNG. Each job writes a metadata record and its
//! page images below a common base path, and any page image path can be
//! turned back into that base path.
//!
//! ## Pipeline Overview
//!
//! ```text
//! source object
//!  │
//!  ├─ 1. Head     content type decides PDF vs. standalone image
//!  ├─ 2. Fetch    whole object, cached per splitter
//!  ├─ 3. Decode   lopdf parse + per-page classification (spawn_blocking)
//!  ├─ 4. Metadata {prefix}/{job_id}/metadata.json
//!  └─ 5. Per batch of pages:
//!        ├─ Render  rasterise non-image pages via pdfium (spawn_blocking)
//!        └─ Upload  {prefix}/{job_id}/pages/images/{n}.{ext}, hook per page
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use page_splitter::{split_upload_pages, BucketStore, ObjectLocator, SplitConfig};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let storage = Arc::new(BucketStore::s3_from_env(&["incoming", "pages"])?);
//!     let pages = split_upload_pages(
//!         storage,
//!         ObjectLocator::new("incoming", "input/report.pdf"),
//!         Some("job-42".to_string()),
//!         "pages",
//!         SplitConfig::default(),
//!         None,
//!     )
//!     .await?;
//!     for page in &pages {
//!         println!("{} -> {}", page.page_number, page.location);
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `page-split` binary (clap + anyhow + tracing-subscriber + indicatif) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! page-splitter = { version = "0.1", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod error;
pub mod hook;
pub mod location;
pub mod metadata;
pub mod output;
pub mod paths;
pub mod pipeline;
pub mod progress;
pub mod splitter;
pub mod storage;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{SplitConfig, SplitConfigBuilder, DEFAULT_RENDER_BATCH_PAGES, DEFAULT_RENDER_SCALE};
pub use error::SplitError;
pub use hook::PagePostProcessor;
pub use location::ObjectLocator;
pub use metadata::{read_job_metadata, JobMetadata};
pub use output::{ImageOrigin, PageResult};
pub use paths::{build_path, invert_page_path, invert_page_path_with_suffix};
pub use pipeline::render::{PageRasterizer, PdfiumRasterizer};
pub use progress::{NoopProgressCallback, ProgressCallback, SplitProgressCallback};
pub use splitter::{split_upload_pages, DocumentSplitter};
pub use storage::{BucketStore, ObjectHead, ObjectStorage};
