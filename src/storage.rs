//! Object storage access.
//!
//! The splitter only needs three calls against storage: `head` (content
//! type), `get` (whole object) and `put` (whole object). [`ObjectStorage`] is
//! that seam; [`BucketStore`] implements it over the [`object_store`] crate,
//! mapping each bucket name to its own backend so one job can read from one
//! bucket and write to another.
//!
//! Transport errors are surfaced as [`SplitError::Storage`] and never retried
//! here.

use crate::error::SplitError;
use crate::location::ObjectLocator;
use async_trait::async_trait;
use bytes::Bytes;
use object_store::aws::AmazonS3Builder;
use object_store::local::LocalFileSystem;
use object_store::memory::InMemory;
use object_store::path::Path as StorePath;
use object_store::{Attribute, GetOptions, ObjectStore, PutOptions, PutPayload};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

/// Object attributes returned by [`ObjectStorage::head`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectHead {
    /// Content type recorded by the store, if it keeps one.
    pub content_type: Option<String>,
    /// Object size in bytes.
    pub size: u64,
}

/// Minimal request/response interface to object storage.
#[async_trait]
pub trait ObjectStorage: Send + Sync {
    /// Fetch object attributes without the body.
    async fn head(&self, location: &ObjectLocator) -> Result<ObjectHead, SplitError>;

    /// Fetch the full object body.
    async fn get(&self, location: &ObjectLocator) -> Result<Bytes, SplitError>;

    /// Write the full object body, replacing any existing object.
    async fn put(
        &self,
        location: &ObjectLocator,
        data: Bytes,
        content_type: Option<&str>,
    ) -> Result<(), SplitError>;
}

/// Bucket-name → [`ObjectStore`] registry.
#[derive(Debug, Clone, Default)]
pub struct BucketStore {
    buckets: HashMap<String, Backend>,
}

#[derive(Debug, Clone)]
struct Backend {
    store: Arc<dyn ObjectStore>,
    /// False for stores that reject object attributes (local filesystem).
    keeps_content_type: bool,
}

impl BucketStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `store` as the backend for `bucket`.
    pub fn with_bucket(mut self, bucket: impl Into<String>, store: impl ObjectStore) -> Self {
        self.insert(bucket, Arc::new(store));
        self
    }

    pub fn insert(&mut self, bucket: impl Into<String>, store: Arc<dyn ObjectStore>) {
        self.buckets.insert(
            bucket.into(),
            Backend {
                store,
                keeps_content_type: true,
            },
        );
    }

    /// One empty [`InMemory`] store per bucket.
    pub fn in_memory<S: AsRef<str>>(buckets: &[S]) -> Self {
        let mut registry = Self::new();
        for bucket in buckets {
            registry.insert(bucket.as_ref(), Arc::new(InMemory::new()));
        }
        registry
    }

    /// Each bucket is the directory `{root}/{bucket}`, created if missing.
    ///
    /// The local filesystem keeps no content types; callers fall back to the
    /// key extension.
    pub fn local<S: AsRef<str>>(root: &Path, buckets: &[S]) -> Result<Self, SplitError> {
        let mut registry = Self::new();
        for bucket in buckets {
            let dir = root.join(bucket.as_ref());
            std::fs::create_dir_all(&dir)
                .map_err(|e| SplitError::storage("open", dir.display(), e))?;
            let store = LocalFileSystem::new_with_prefix(&dir)
                .map_err(|e| SplitError::storage("open", dir.display(), e))?;
            registry.buckets.insert(
                bucket.as_ref().to_string(),
                Backend {
                    store: Arc::new(store),
                    keeps_content_type: false,
                },
            );
        }
        Ok(registry)
    }

    /// S3 buckets configured from the standard `AWS_*` environment variables.
    pub fn s3_from_env<S: AsRef<str>>(buckets: &[S]) -> Result<Self, SplitError> {
        let mut registry = Self::new();
        for bucket in buckets {
            let store = AmazonS3Builder::from_env()
                .with_bucket_name(bucket.as_ref())
                .build()
                .map_err(|e| SplitError::storage("connect", bucket.as_ref(), e))?;
            registry.insert(bucket.as_ref(), Arc::new(store));
        }
        Ok(registry)
    }

    pub fn has_bucket(&self, bucket: &str) -> bool {
        self.buckets.contains_key(bucket)
    }

    fn backend(&self, bucket: &str) -> Result<&Backend, SplitError> {
        self.buckets
            .get(bucket)
            .ok_or_else(|| SplitError::UnknownBucket {
                bucket: bucket.to_string(),
            })
    }
}

#[async_trait]
impl ObjectStorage for BucketStore {
    async fn head(&self, location: &ObjectLocator) -> Result<ObjectHead, SplitError> {
        let store = &self.backend(&location.bucket)?.store;
        let options = GetOptions {
            head: true,
            ..Default::default()
        };
        let result = store
            .get_opts(&StorePath::from(location.key.as_str()), options)
            .await
            .map_err(|e| SplitError::storage("head", location, e))?;

        let head = ObjectHead {
            content_type: result
                .attributes
                .get(&Attribute::ContentType)
                .map(|v| v.to_string()),
            size: result.meta.size as u64,
        };
        debug!("head {} → {:?}", location, head);
        Ok(head)
    }

    async fn get(&self, location: &ObjectLocator) -> Result<Bytes, SplitError> {
        let store = &self.backend(&location.bucket)?.store;
        let data = store
            .get(&StorePath::from(location.key.as_str()))
            .await
            .map_err(|e| SplitError::storage("get", location, e))?
            .bytes()
            .await
            .map_err(|e| SplitError::storage("get", location, e))?;
        debug!("get {} → {} bytes", location, data.len());
        Ok(data)
    }

    async fn put(
        &self,
        location: &ObjectLocator,
        data: Bytes,
        content_type: Option<&str>,
    ) -> Result<(), SplitError> {
        let backend = self.backend(&location.bucket)?;
        let size = data.len();
        let mut options = PutOptions::default();
        if let Some(ct) = content_type.filter(|_| backend.keeps_content_type) {
            options
                .attributes
                .insert(Attribute::ContentType, ct.to_string().into());
        }
        backend
            .store
            .put_opts(
                &StorePath::from(location.key.as_str()),
                PutPayload::from(data),
                options,
            )
            .await
            .map_err(|e| SplitError::storage("put", location, e))?;
        debug!("put {} ← {} bytes", location, size);
        Ok(())
    }
}
