//! The unit side effect: fetch a source URL, store the bytes under a fresh
//! key, return the object's public URL.

use std::sync::Arc;

use async_trait::async_trait;
use blob_store::{generate_key, BlobStorage, StoreError};
use thiserror::Error;
use tracing::debug;

use crate::fetch::{FetchError, ResourceFetcher};

/// Fetch and store failures stay distinct: a fetch failure means no upload
/// was attempted, a store failure means the bytes never became addressable.
/// Either way the caller leaves the row untouched.
#[derive(Debug, Error)]
pub enum RelayError {
    #[error("fetch failed: {0}")]
    Fetch(#[from] FetchError),
    #[error("store failed: {0}")]
    Store(#[from] StoreError),
}

#[async_trait]
pub trait Relay: Send + Sync {
    async fn relay(&self, source_url: &str) -> Result<String, RelayError>;
}

pub struct ResourceRelay {
    fetcher: Arc<dyn ResourceFetcher>,
    storage: BlobStorage,
}

impl ResourceRelay {
    pub fn new(fetcher: Arc<dyn ResourceFetcher>, storage: BlobStorage) -> Self {
        Self { fetcher, storage }
    }
}

#[async_trait]
impl Relay for ResourceRelay {
    async fn relay(&self, source_url: &str) -> Result<String, RelayError> {
        let resource = self.fetcher.get(source_url).await?;
        let key = generate_key();
        debug!(
            key = %key,
            content_type = %resource.content_type,
            size_bytes = resource.bytes.len(),
            "storing fetched resource"
        );
        let object_url = self
            .storage
            .put(&key, resource.bytes, &resource.content_type)
            .await?;
        Ok(object_url)
    }
}
