//! The metadata record written next to a job's page images.
//!
//! ```json
//! {
//!   "content_type": "application/pdf",
//!   "document_location": {"S3Bucket": "in", "S3ObjectName": "input/a.pdf"},
//!   "message_object_id": "7f3c…",
//!   "page_count": 3
//! }
//! ```

use crate::error::SplitError;
use crate::location::ObjectLocator;
use crate::paths::{invert_page_path_with_suffix, METADATA_FILE_NAME};
use crate::storage::ObjectStorage;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use tracing::info;

/// Descriptor of one split job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobMetadata {
    /// Content type of the source object.
    pub content_type: String,
    /// The source object.
    pub document_location: ObjectLocator,
    /// The job id, if one was supplied.
    pub message_object_id: Option<String>,
    /// Number of pages; None until the source has been split.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page_count: Option<usize>,
}

impl JobMetadata {
    pub fn new(
        content_type: impl Into<String>,
        document_location: ObjectLocator,
        job_id: Option<String>,
    ) -> Self {
        Self {
            content_type: content_type.into(),
            document_location,
            message_object_id: job_id,
            page_count: None,
        }
    }

    /// A copy of this record with its page count set.
    pub fn with_page_count(&self, page_count: usize) -> Self {
        Self {
            page_count: Some(page_count),
            ..self.clone()
        }
    }

    pub fn to_json(&self) -> Result<Vec<u8>, SplitError> {
        Ok(serde_json::to_vec(self)?)
    }

    pub fn from_json(bytes: &[u8]) -> Result<Self, SplitError> {
        Ok(serde_json::from_slice(bytes)?)
    }

    /// Write this record to `location`.
    pub async fn persist(
        &self,
        storage: &dyn ObjectStorage,
        location: &ObjectLocator,
    ) -> Result<(), SplitError> {
        let body = Bytes::from(self.to_json()?);
        storage
            .put(location, body, Some("application/json"))
            .await?;
        info!(
            "Saved metadata to {} (page_count={:?})",
            location, self.page_count
        );
        Ok(())
    }

    pub async fn load(
        storage: &dyn ObjectStorage,
        location: &ObjectLocator,
    ) -> Result<Self, SplitError> {
        let body = storage.get(location).await?;
        Self::from_json(&body)
    }
}

/// Read the metadata record of the job that produced `page_image`.
pub async fn read_job_metadata(
    storage: &dyn ObjectStorage,
    page_image: &ObjectLocator,
) -> Result<JobMetadata, SplitError> {
    let location = invert_page_path_with_suffix(page_image, Some(METADATA_FILE_NAME))?;
    JobMetadata::load(storage, &location).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::BucketStore;
    use serde_json::json;

    fn sample() -> JobMetadata {
        JobMetadata::new(
            "application/pdf",
            ObjectLocator::new("in", "input/a.pdf"),
            Some("job-1".into()),
        )
    }

    #[test]
    fn json_layout() {
        let value: serde_json::Value =
            serde_json::from_slice(&sample().with_page_count(3).to_json().unwrap()).unwrap();
        assert_eq!(
            value,
            json!({
                "content_type": "application/pdf",
                "document_location": {"S3Bucket": "in", "S3ObjectName": "input/a.pdf"},
                "message_object_id": "job-1",
                "page_count": 3
            })
        );
    }

    #[test]
    fn missing_job_id_serialises_as_null() {
        let meta = JobMetadata::new("image/png", ObjectLocator::new("in", "a.png"), None);
        let value: serde_json::Value =
            serde_json::from_slice(&meta.with_page_count(1).to_json().unwrap()).unwrap();
        assert_eq!(value["message_object_id"], serde_json::Value::Null);
    }

    #[test]
    fn with_page_count_leaves_original_untouched() {
        let meta = sample();
        let counted = meta.with_page_count(5);
        assert_eq!(meta.page_count, None);
        assert_eq!(counted.page_count, Some(5));
        assert_eq!(counted.document_location, meta.document_location);
    }

    #[tokio::test]
    async fn read_back_from_page_location() {
        let store = BucketStore::in_memory(&["out"]);
        let meta = sample().with_page_count(2);
        meta.persist(&store, &ObjectLocator::new("out", "in_progress/job-1/metadata.json"))
            .await
            .unwrap();

        let page = ObjectLocator::new("out", "in_progress/job-1/pages/images/1.png");
        assert_eq!(read_job_metadata(&store, &page).await.unwrap(), meta);
    }

    #[tokio::test]
    async fn read_back_rejects_non_page_location() {
        let store = BucketStore::in_memory(&["out"]);
        let err = read_job_metadata(&store, &ObjectLocator::new("out", "in_progress/x.png"))
            .await
            .unwrap_err();
        assert!(matches!(err, SplitError::MalformedPath { .. }));
    }
}
