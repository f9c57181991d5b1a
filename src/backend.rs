//! Backend trait and the load fallback combinator.
//!
//! Loading tries an ordered list of backends and keeps the first document
//! any of them produces:
//!
//! ```text
//! Local          →  [local file]
//! Http(url)      →  [http GET, local file]
//! ObjectStore    →  [s3 GetObject, local file]
//! ```
//!
//! Every backend has the same contract, `fetch() -> Result<Document,
//! StoreError>`, so fallback is a single loop in [`first_success`] rather
//! than nested error handling.

use async_trait::async_trait;
use skilltrack_core::Document;

use crate::error::StoreError;

/// A place a progress document can be fetched from.
#[async_trait]
pub trait Backend: Send + Sync {
    /// Short backend name (`"local"`, `"http"`, `"s3"`).
    fn name(&self) -> &str;

    /// Human-readable location, for notices.
    fn describe(&self) -> String;

    /// Fetch and parse the document. A single attempt, no retry.
    async fn fetch(&self) -> Result<Document, StoreError>;
}

/// Outcome of a successful fallback chain.
#[derive(Debug)]
pub struct Resolved {
    pub document: Document,
    /// Name of the backend that produced the document.
    pub backend: String,
    /// Failures of the backends tried before it, in order.
    pub failures: Vec<StoreError>,
}

/// Every backend failed. The last failure is the final cause.
#[derive(Debug)]
pub struct Exhausted {
    pub failures: Vec<StoreError>,
}

impl Exhausted {
    pub fn last(&self) -> Option<&StoreError> {
        self.failures.last()
    }
}

/// Try each backend in order; return the first success or every failure.
pub async fn first_success(backends: &[&dyn Backend]) -> Result<Resolved, Exhausted> {
    let mut failures = Vec::new();
    for backend in backends {
        match backend.fetch().await {
            Ok(document) => {
                tracing::debug!(backend = backend.name(), "loaded progress document");
                return Ok(Resolved {
                    document,
                    backend: backend.name().to_string(),
                    failures,
                });
            }
            Err(e) => {
                tracing::warn!(backend = backend.name(), error = %e, "backend failed, trying next");
                failures.push(e);
            }
        }
    }
    Err(Exhausted { failures })
}
