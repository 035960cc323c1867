//! HTTP resource fetcher: one GET per source URL, no retries.

use async_trait::async_trait;
use bytes::Bytes;
use thiserror::Error;

pub const FALLBACK_CONTENT_TYPE: &str = "application/octet-stream";

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("{url} returned status {status}")]
    Status {
        url: String,
        status: reqwest::StatusCode,
    },
}

#[derive(Debug, Clone)]
pub struct FetchedResource {
    pub bytes: Bytes,
    /// Content type declared by the origin, or
    /// [`FALLBACK_CONTENT_TYPE`] when the response carries none.
    pub content_type: String,
}

#[async_trait]
pub trait ResourceFetcher: Send + Sync {
    async fn get(&self, url: &str) -> Result<FetchedResource, FetchError>;
}

pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
        }
    }
}

impl Default for HttpFetcher {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ResourceFetcher for HttpFetcher {
    async fn get(&self, url: &str) -> Result<FetchedResource, FetchError> {
        let transport = |source: reqwest::Error| FetchError::Transport {
            url: url.to_string(),
            source,
        };
        let response = self.client.get(url).send().await.map_err(transport)?;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status,
            });
        }
        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .unwrap_or(FALLBACK_CONTENT_TYPE)
            .to_string();
        let bytes = response.bytes().await.map_err(transport)?;
        Ok(FetchedResource {
            bytes,
            content_type,
        })
    }
}
