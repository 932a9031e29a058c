//! Per-page post-processing hook.
//!
//! The splitter awaits the hook once per page, strictly after that page's
//! upload succeeded. Whatever it returns is stored, uninterpreted, in
//! [`crate::output::PageResult::post_processing_result`].

use crate::location::ObjectLocator;
use async_trait::async_trait;
use serde_json::Value;

/// A caller-supplied step run against each uploaded page image.
#[async_trait]
pub trait PagePostProcessor: Send + Sync {
    /// Process the page image stored at `page`.
    async fn post_process(&self, page: &ObjectLocator) -> Option<Value>;
}

/// Plain synchronous closures work as hooks.
#[async_trait]
impl<F> PagePostProcessor for F
where
    F: Fn(&ObjectLocator) -> Option<Value> + Send + Sync,
{
    async fn post_process(&self, page: &ObjectLocator) -> Option<Value> {
        self(page)
    }
}
