//! Read-only HTTP(S) backend.
//!
//! Fetches the document with a plain GET, for example from a public S3
//! object URL. There is no write path: saving under an HTTP location keeps
//! only the local copy.

use std::time::Duration;

use async_trait::async_trait;
use skilltrack_core::Document;

use crate::backend::Backend;
use crate::error::StoreError;

pub struct HttpBackend {
    url: String,
    client: reqwest::Client,
}

impl HttpBackend {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, StoreError> {
        let url = url.into();
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| StoreError::RemoteUnavailable {
                location: url.clone(),
                reason: format!("failed to build HTTP client: {}", e),
            })?;
        Ok(Self { url, client })
    }

    fn unavailable(&self, reason: impl Into<String>) -> StoreError {
        StoreError::RemoteUnavailable {
            location: self.url.clone(),
            reason: reason.into(),
        }
    }
}

#[async_trait]
impl Backend for HttpBackend {
    fn name(&self) -> &str {
        "http"
    }

    fn describe(&self) -> String {
        self.url.clone()
    }

    async fn fetch(&self) -> Result<Document, StoreError> {
        tracing::debug!(url = %self.url, "fetching remote progress document");

        let resp = self.client.get(&self.url).send().await.map_err(|e| {
            if e.is_timeout() {
                self.unavailable("request timed out")
            } else {
                self.unavailable(e.to_string())
            }
        })?;

        let status = resp.status();
        if !status.is_success() {
            return Err(self.unavailable(format!("HTTP {}", status)));
        }

        let bytes = resp.bytes().await.map_err(|e| {
            if e.is_timeout() {
                self.unavailable("request timed out while reading body")
            } else {
                self.unavailable(e.to_string())
            }
        })?;

        Document::from_json(&bytes).map_err(|source| StoreError::RemoteParse {
            location: self.url.clone(),
            source,
        })
    }
}
