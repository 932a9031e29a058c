//! The document splitter: one source object in, one image per page out.
//!
//! A job runs strictly in this order:
//!
//! 1. fetch the source bytes (cached across calls, see [`DocumentSplitter::refresh`]),
//! 2. decode and classify every page,
//! 3. write the job metadata record,
//! 4. in batches of [`SplitConfig::render_batch_pages`], rasterise the pages
//!    that need it and upload each page in page order, running the
//!    post-processing hook after each successful upload.
//!
//! A source that is not a PDF or image fails in steps 1–2, before anything is
//! written. Rasterisation or storage failures in steps 3–4 abort the job;
//! pages already written stay where they are.

use crate::config::SplitConfig;
use crate::error::SplitError;
use crate::hook::PagePostProcessor;
use crate::location::ObjectLocator;
use crate::metadata::JobMetadata;
use crate::output::{ImageOrigin, PageResult};
use crate::paths::{build_path, metadata_location, page_image_suffix};
use crate::pipeline::document::{decode_source, PageImage, PagePlan, SourcePages};
use crate::pipeline::encode::{content_type_for_extension, encode_png, PNG_EXTENSION};
use crate::pipeline::render::{render_pages, PageRasterizer, PdfiumRasterizer};
use crate::storage::ObjectStorage;
use bytes::Bytes;
use image::DynamicImage;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Content type that marks a source as a multi-page PDF.
pub const PDF_CONTENT_TYPE: &str = "application/pdf";

/// Splits one source object into per-page images.
pub struct DocumentSplitter {
    storage: Arc<dyn ObjectStorage>,
    rasterizer: Arc<dyn PageRasterizer>,
    source: ObjectLocator,
    job_id: Option<String>,
    output_bucket: String,
    config: SplitConfig,
    content_type: String,
    is_multipage: bool,
    bytes: Option<Bytes>,
}

impl DocumentSplitter {
    /// Look up the source's content type and prepare a splitter for it.
    ///
    /// Issues exactly one `head` request. When the store keeps no content
    /// type, it is guessed from the key's extension.
    pub async fn open(
        storage: Arc<dyn ObjectStorage>,
        source: ObjectLocator,
        job_id: Option<String>,
        output_bucket: impl Into<String>,
        config: SplitConfig,
    ) -> Result<Self, SplitError> {
        let head = storage.head(&source).await?;
        let content_type = match head.content_type {
            Some(ct) => ct,
            None => {
                let guessed = mime_guess::from_path(&source.key)
                    .first_or_octet_stream()
                    .essence_str()
                    .to_string();
                debug!("{} has no stored content type, guessed {}", source, guessed);
                guessed
            }
        };
        let is_multipage = is_pdf_content_type(&content_type);
        info!(
            "Opened {} ({}, {} bytes, multipage={})",
            source, content_type, head.size, is_multipage
        );

        if job_id.is_none() {
            warn!("No job id for {}: outputs go directly below the prefix", source);
        }

        let rasterizer = Arc::new(PdfiumRasterizer::new(config.pdfium_library_path.clone()));
        Ok(Self {
            storage,
            rasterizer,
            source,
            job_id,
            output_bucket: output_bucket.into(),
            config,
            content_type,
            is_multipage,
            bytes: None,
        })
    }

    /// Render pages with `rasterizer` instead of pdfium.
    pub fn with_rasterizer(mut self, rasterizer: Arc<dyn PageRasterizer>) -> Self {
        self.rasterizer = rasterizer;
        self
    }

    pub fn source(&self) -> &ObjectLocator {
        &self.source
    }

    pub fn job_id(&self) -> Option<&str> {
        self.job_id.as_deref()
    }

    pub fn output_bucket(&self) -> &str {
        &self.output_bucket
    }

    pub fn content_type(&self) -> &str {
        &self.content_type
    }

    pub fn is_multipage(&self) -> bool {
        self.is_multipage
    }

    pub fn config(&self) -> &SplitConfig {
        &self.config
    }

    /// The base job path: `{prefix}/{job_id}` in the output bucket.
    pub fn base_location(&self) -> ObjectLocator {
        build_path(
            &self.output_bucket,
            &self.config.output_prefix,
            self.job_id.as_deref(),
            None,
        )
    }

    pub fn metadata_location(&self) -> ObjectLocator {
        metadata_location(
            &self.output_bucket,
            &self.config.output_prefix,
            self.job_id.as_deref(),
        )
    }

    /// Drop the cached source bytes and fetch them again.
    pub async fn refresh(&mut self) -> Result<Bytes, SplitError> {
        self.bytes = None;
        self.source_bytes().await
    }

    /// The source bytes, fetched on first use.
    pub async fn source_bytes(&mut self) -> Result<Bytes, SplitError> {
        if let Some(bytes) = &self.bytes {
            return Ok(bytes.clone());
        }
        let bytes = self.storage.get(&self.source).await?;
        info!("Fetched {} ({} bytes)", self.source, bytes.len());
        self.bytes = Some(bytes.clone());
        Ok(bytes)
    }

    /// Split the source, upload every page and return the ordered results.
    pub async fn split_upload_pages(
        &mut self,
        post_process: Option<&dyn PagePostProcessor>,
    ) -> Result<Vec<PageResult>, SplitError> {
        let start = Instant::now();
        info!("Splitting {}", self.source);

        // ── Step 1: Fetch ────────────────────────────────────────────────────
        let bytes = self.source_bytes().await?;

        // ── Step 2: Decode and classify ──────────────────────────────────────
        let source = self.source.clone();
        let is_multipage = self.is_multipage;
        let decode_bytes = bytes.clone();
        let decoded = tokio::task::spawn_blocking(move || {
            decode_source(decode_bytes, is_multipage, &source)
        })
        .await
        .map_err(|e| SplitError::Internal(format!("Decode task panicked: {}", e)))??;
        let total_pages = decoded.page_count();
        debug!(
            "{} of {} pages need rasterising",
            decoded.pages_to_rasterize().len(),
            total_pages
        );

        if let Some(ref cb) = self.config.progress_callback {
            cb.on_split_start(total_pages);
        }

        // ── Step 3: Metadata ─────────────────────────────────────────────────
        let metadata = JobMetadata::new(
            self.content_type.clone(),
            self.source.clone(),
            self.job_id.clone(),
        )
        .with_page_count(total_pages);
        metadata
            .persist(self.storage.as_ref(), &self.metadata_location())
            .await?;

        // ── Step 4: Render and upload, one batch at a time ──────────────────
        let mut results = Vec::with_capacity(total_pages);
        match decoded {
            SourcePages::Standalone { page } => {
                results.push(self.upload_page(page, total_pages, post_process).await?);
            }
            SourcePages::Multipage { pages } => {
                let mut plans = pages.into_iter().peekable();
                while plans.peek().is_some() {
                    let batch: Vec<PagePlan> =
                        plans.by_ref().take(self.config.render_batch_pages).collect();
                    for page in self.resolve_batch(batch, bytes.clone()).await? {
                        results.push(self.upload_page(page, total_pages, post_process).await?);
                    }
                }
            }
        }

        if let Some(ref cb) = self.config.progress_callback {
            cb.on_split_complete(total_pages);
        }

        info!(
            "Split {} into {} pages in {}ms",
            self.source,
            total_pages,
            start.elapsed().as_millis()
        );
        Ok(results)
    }

    /// Rasterise and encode the pages of `batch` that need it and return the
    /// whole batch in page order.
    async fn resolve_batch(
        &self,
        batch: Vec<PagePlan>,
        bytes: Bytes,
    ) -> Result<Vec<PageImage>, SplitError> {
        let wanted: Vec<usize> = batch
            .iter()
            .filter_map(|plan| match plan {
                PagePlan::Rasterize { page_number } => Some(*page_number),
                PagePlan::Ready(_) => None,
            })
            .collect();

        let rendered = render_pages(
            self.rasterizer.clone(),
            bytes,
            wanted,
            self.config.render_scale,
        )
        .await?;
        let mut encoded = tokio::task::spawn_blocking(move || encode_rendered(rendered))
            .await
            .map_err(|e| SplitError::Internal(format!("Encode task panicked: {}", e)))??;

        batch
            .into_iter()
            .map(|plan| match plan {
                PagePlan::Ready(page) => Ok(page),
                PagePlan::Rasterize { page_number } => {
                    encoded
                        .remove(&page_number)
                        .ok_or_else(|| SplitError::RasterisationFailed {
                            page: page_number,
                            detail: "rasterizer returned no image for this page".into(),
                        })
                }
            })
            .collect()
    }

    /// Write one page image, report it and run the hook on it.
    async fn upload_page(
        &self,
        page: PageImage,
        total_pages: usize,
        post_process: Option<&dyn PagePostProcessor>,
    ) -> Result<PageResult, SplitError> {
        let location = build_path(
            &self.output_bucket,
            &self.config.output_prefix,
            self.job_id.as_deref(),
            Some(page_image_suffix(page.page_number, &page.extension).as_str()),
        );
        let content_type = content_type_for_extension(&page.extension);
        self.storage
            .put(&location, page.bytes, Some(content_type.as_str()))
            .await?;
        debug!("Uploaded page {} → {}", page.page_number, location);

        if let Some(ref cb) = self.config.progress_callback {
            cb.on_page_uploaded(page.page_number, total_pages, &location);
        }

        let post_processing_result = match post_process {
            Some(hook) => hook.post_process(&location).await,
            None => None,
        };

        Ok(PageResult {
            source: self.source.clone(),
            page_number: page.page_number,
            image: page.image,
            image_extension: page.extension,
            location,
            origin: page.origin,
            post_processing_result,
        })
    }
}

fn encode_rendered(
    rendered: Vec<(usize, DynamicImage)>,
) -> Result<BTreeMap<usize, PageImage>, SplitError> {
    rendered
        .into_iter()
        .map(|(page_number, image)| {
            let png = encode_png(&image).map_err(|e| SplitError::RasterisationFailed {
                page: page_number,
                detail: format!("Image encoding failed: {}", e),
            })?;
            Ok((
                page_number,
                PageImage {
                    page_number,
                    bytes: Bytes::from(png),
                    extension: PNG_EXTENSION.to_string(),
                    image,
                    origin: ImageOrigin::Rasterized,
                },
            ))
        })
        .collect()
}

/// True for `application/pdf`, ignoring case and parameters.
pub fn is_pdf_content_type(content_type: &str) -> bool {
    content_type
        .split(';')
        .next()
        .map(|essence| essence.trim().eq_ignore_ascii_case(PDF_CONTENT_TYPE))
        .unwrap_or(false)
}

/// Open `source` and split it in one call.
pub async fn split_upload_pages(
    storage: Arc<dyn ObjectStorage>,
    source: ObjectLocator,
    job_id: Option<String>,
    output_bucket: impl Into<String>,
    config: SplitConfig,
    post_process: Option<&dyn PagePostProcessor>,
) -> Result<Vec<PageResult>, SplitError> {
    let mut splitter =
        DocumentSplitter::open(storage, source, job_id, output_bucket, config).await?;
    splitter.split_upload_pages(post_process).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::BucketStore;

    #[test]
    fn pdf_content_type_detection() {
        assert!(is_pdf_content_type("application/pdf"));
        assert!(is_pdf_content_type("Application/PDF; charset=binary"));
        assert!(!is_pdf_content_type("image/png"));
        assert!(!is_pdf_content_type(""));
    }

    #[tokio::test]
    async fn open_uses_stored_content_type() {
        let store = BucketStore::in_memory(&["in", "out"]);
        let source = ObjectLocator::new("in", "scans/page.bin");
        store
            .put(&source, Bytes::from_static(b"%PDF"), Some("application/pdf"))
            .await
            .unwrap();

        let splitter = DocumentSplitter::open(
            Arc::new(store),
            source,
            Some("job".into()),
            "out",
            SplitConfig::default(),
        )
        .await
        .unwrap();
        assert!(splitter.is_multipage());
        assert_eq!(splitter.content_type(), "application/pdf");
        assert_eq!(splitter.base_location(), ObjectLocator::new("out", "in_progress/job"));
        assert_eq!(
            splitter.metadata_location(),
            ObjectLocator::new("out", "in_progress/job/metadata.json")
        );
    }

    #[tokio::test]
    async fn open_guesses_missing_content_type() {
        let store = BucketStore::in_memory(&["in"]);
        let source = ObjectLocator::new("in", "scans/page.PNG");
        store
            .put(&source, Bytes::from_static(b"x"), None)
            .await
            .unwrap();

        let splitter =
            DocumentSplitter::open(Arc::new(store), source, None, "in", SplitConfig::default())
                .await
                .unwrap();
        assert_eq!(splitter.content_type(), "image/png");
        assert!(!splitter.is_multipage());
        assert_eq!(splitter.base_location(), ObjectLocator::new("in", "in_progress"));
    }

    #[tokio::test]
    async fn open_missing_source_fails() {
        let store = BucketStore::in_memory(&["in"]);
        let err = DocumentSplitter::open(
            Arc::new(store),
            ObjectLocator::new("in", "absent.pdf"),
            None,
            "in",
            SplitConfig::default(),
        )
        .await
        .err()
        .unwrap();
        assert!(err.is_storage());
    }
}
