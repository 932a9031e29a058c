//! Output path scheme for split jobs.
//!
//! Every job writes below one base path:
//!
//! ```text
//! {bucket}/{prefix}/{job_id}/metadata.json
//! {bucket}/{prefix}/{job_id}/pages/images/{page_number}.{ext}
//! ```
//!
//! [`invert_page_path`] recovers the base path from any page image location
//! by cutting the key at its first `pages` segment. [`PAGES_SEGMENT`] and
//! [`page_image_suffix`] must stay in step with that inverse.

use crate::error::SplitError;
use crate::location::ObjectLocator;

/// Default first path component of every job's output.
pub const DEFAULT_OUTPUT_PREFIX: &str = "in_progress";

/// Path segment that separates the base job path from page outputs.
pub const PAGES_SEGMENT: &str = "pages";

/// File name of the job metadata record, relative to the base job path.
pub const METADATA_FILE_NAME: &str = "metadata.json";

/// Join the non-empty components with `/` and strip leading/trailing `/`.
pub fn build_path(
    output_bucket: &str,
    prefix: &str,
    subpath: Option<&str>,
    suffix: Option<&str>,
) -> ObjectLocator {
    let key = [Some(prefix), subpath, suffix]
        .into_iter()
        .flatten()
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join("/");

    ObjectLocator::new(output_bucket, key.trim_matches('/'))
}

/// Suffix of a page image below the base job path.
pub fn page_image_suffix(page_number: usize, extension: &str) -> String {
    format!("{PAGES_SEGMENT}/images/{page_number}.{extension}")
}

/// Location of the metadata record for a job.
pub fn metadata_location(output_bucket: &str, prefix: &str, job_id: Option<&str>) -> ObjectLocator {
    build_path(output_bucket, prefix, job_id, Some(METADATA_FILE_NAME))
}

/// Recover the base job path from a page image location.
pub fn invert_page_path(page_image: &ObjectLocator) -> Result<ObjectLocator, SplitError> {
    invert_page_path_with_suffix(page_image, None)
}

/// Like [`invert_page_path`], with `suffix` appended to the base job path.
pub fn invert_page_path_with_suffix(
    page_image: &ObjectLocator,
    suffix: Option<&str>,
) -> Result<ObjectLocator, SplitError> {
    let segments: Vec<&str> = page_image.key.split('/').collect();
    let cut = segments
        .iter()
        .position(|s| *s == PAGES_SEGMENT)
        .ok_or_else(|| SplitError::MalformedPath {
            key: page_image.key.clone(),
        })?;

    let base = segments[..cut].join("/");
    Ok(build_path(&page_image.bucket, &base, None, suffix))
}

/// True when `prefix` has a segment that [`invert_page_path`] would cut at.
pub(crate) fn has_pages_segment(prefix: &str) -> bool {
    prefix.split('/').any(|s| s == PAGES_SEGMENT)
}
