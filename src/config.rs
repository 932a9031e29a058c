//! Configuration types for split jobs.
//!
//! All tunable behaviour lives in [`SplitConfig`], built via
//! [`SplitConfigBuilder`]. Callers set only what they care about and rely on
//! the documented defaults for the rest.

use crate::error::SplitError;
use crate::paths::{self, DEFAULT_OUTPUT_PREFIX};
use crate::progress::ProgressCallback;
use std::fmt;
use std::path::PathBuf;

/// Default page zoom factor used when rasterising.
pub const DEFAULT_RENDER_SCALE: f32 = 2.0;

/// Default number of pages rendered before they are uploaded.
pub const DEFAULT_RENDER_BATCH_PAGES: usize = 4;

/// Configuration for a split job.
///
/// # Example
/// ```rust
/// use page_splitter::SplitConfig;
///
/// let config = SplitConfig::builder()
///     .output_prefix("staging")
///     .render_scale(3.0)
///     .build()
///     .unwrap();
/// assert_eq!(config.output_prefix, "staging");
/// ```
#[derive(Clone)]
pub struct SplitConfig {
    /// First path component of every output key. Default: `in_progress`.
    ///
    /// Must not contain a `pages` segment, or page paths could not be
    /// inverted back to their job path.
    pub output_prefix: String,

    /// Zoom applied to both axes of the page's native point size when a page
    /// is rasterised. Range: 0.1–10. Default: 2.0.
    pub render_scale: f32,

    /// Pages rasterised per pdfium call. Each batch is encoded and uploaded
    /// before the next one renders, so this bounds how many rendered pages
    /// are waiting for upload. Default: 4.
    pub render_batch_pages: usize,

    /// Path to libpdfium (file or directory). If None, the system library is used.
    pub pdfium_library_path: Option<PathBuf>,

    /// Optional observer for per-page events.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for SplitConfig {
    fn default() -> Self {
        Self {
            output_prefix: DEFAULT_OUTPUT_PREFIX.to_string(),
            render_scale: DEFAULT_RENDER_SCALE,
            render_batch_pages: DEFAULT_RENDER_BATCH_PAGES,
            pdfium_library_path: None,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for SplitConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SplitConfig")
            .field("output_prefix", &self.output_prefix)
            .field("render_scale", &self.render_scale)
            .field("render_batch_pages", &self.render_batch_pages)
            .field("pdfium_library_path", &self.pdfium_library_path)
            .field(
                "progress_callback",
                &self
                    .progress_callback
                    .as_ref()
                    .map(|_| "<dyn SplitProgressCallback>"),
            )
            .finish()
    }
}

impl SplitConfig {
    /// Create a new builder for `SplitConfig`.
    pub fn builder() -> SplitConfigBuilder {
        SplitConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`SplitConfig`].
#[derive(Debug)]
pub struct SplitConfigBuilder {
    config: SplitConfig,
}

impl SplitConfigBuilder {
    pub fn output_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.config.output_prefix = prefix.into();
        self
    }

    pub fn render_scale(mut self, scale: f32) -> Self {
        self.config.render_scale = scale;
        self
    }

    pub fn render_batch_pages(mut self, pages: usize) -> Self {
        self.config.render_batch_pages = pages;
        self
    }

    pub fn pdfium_library_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.pdfium_library_path = Some(path.into());
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<SplitConfig, SplitError> {
        let c = &self.config;
        if !c.render_scale.is_finite() || !(0.1..=10.0).contains(&c.render_scale) {
            return Err(SplitError::InvalidConfig(format!(
                "render scale must be 0.1–10, got {}",
                c.render_scale
            )));
        }
        if c.render_batch_pages == 0 {
            return Err(SplitError::InvalidConfig(
                "render batch must hold at least one page".into(),
            ));
        }
        if paths::has_pages_segment(&c.output_prefix) {
            return Err(SplitError::InvalidConfig(format!(
                "output prefix '{}' contains a '{}' segment",
                c.output_prefix,
                paths::PAGES_SEGMENT
            )));
        }
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let c = SplitConfig::default();
        assert_eq!(c.output_prefix, "in_progress");
        assert_eq!(c.render_scale, 2.0);
        assert_eq!(c.render_batch_pages, 4);
        assert!(c.pdfium_library_path.is_none());
        assert!(c.progress_callback.is_none());
    }

    #[test]
    fn builder_sets_fields() {
        let c = SplitConfig::builder()
            .output_prefix("archive/2024")
            .render_scale(1.5)
            .render_batch_pages(1)
            .pdfium_library_path("/opt/pdfium/lib")
            .build()
            .unwrap();
        assert_eq!(c.output_prefix, "archive/2024");
        assert_eq!(c.render_scale, 1.5);
        assert_eq!(c.render_batch_pages, 1);
        assert_eq!(c.pdfium_library_path, Some(PathBuf::from("/opt/pdfium/lib")));
    }

    #[test]
    fn rejects_out_of_range_scale() {
        assert!(SplitConfig::builder().render_scale(0.0).build().is_err());
        assert!(SplitConfig::builder().render_scale(f32::NAN).build().is_err());
        assert!(SplitConfig::builder().render_scale(11.0).build().is_err());
    }

    #[test]
    fn rejects_empty_render_batch() {
        let err = SplitConfig::builder()
            .render_batch_pages(0)
            .build()
            .unwrap_err();
        assert!(matches!(err, SplitError::InvalidConfig(_)));
    }

    #[test]
    fn rejects_prefix_with_pages_segment() {
        let err = SplitConfig::builder()
            .output_prefix("out/pages")
            .build()
            .unwrap_err();
        assert!(matches!(err, SplitError::InvalidConfig(_)));
    }

    #[test]
    fn debug_hides_callback() {
        let c = SplitConfig::builder()
            .progress_callback(std::sync::Arc::new(crate::progress::NoopProgressCallback))
            .build()
            .unwrap();
        assert!(format!("{c:?}").contains("<dyn SplitProgressCallback>"));
    }
}
