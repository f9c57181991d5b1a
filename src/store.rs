//! The progress store: load and save with remote-to-local fallback.
//!
//! | Location | `load` | `save` |
//! |----------|--------|--------|
//! | `Local` | local file | local file |
//! | `Http(url)` | GET `url`, else local file | local file + read-only notice |
//! | `ObjectStore` | S3 GetObject, else local file | local file, then S3 PutObject |
//!
//! Neither operation fails. Problems come back as [`Notice`]s, and `load`
//! always produces a document (empty if nothing else works).

use std::path::Path;
use std::time::Duration;

use anyhow::Result;
use skilltrack_core::Document;

use crate::backend::{first_success, Backend};
use crate::backend_http::HttpBackend;
use crate::backend_local::LocalFile;
use crate::backend_s3::{AwsCredentials, S3Backend};
use crate::config::Config;
use crate::location::Location;
use crate::notice::Notice;

enum Remote {
    None,
    Http(HttpBackend),
    S3(S3Backend),
}

/// Result of [`ProgressStore::load`].
#[derive(Debug)]
pub struct Loaded {
    pub document: Document,
    /// Backend that produced the document, or `None` if every backend failed
    /// and the document is empty.
    pub source: Option<String>,
    pub notices: Vec<Notice>,
}

pub struct ProgressStore {
    location: Location,
    local: LocalFile,
    remote: Remote,
}

impl ProgressStore {
    /// Build a store for `location`, keeping the local copy at `local_path`.
    pub fn new(location: Location, local_path: &Path, config: &Config) -> Result<Self> {
        let timeout = Duration::from_secs(config.storage.timeout_secs);
        let remote = match &location {
            Location::Local => Remote::None,
            Location::Http(url) => Remote::Http(HttpBackend::new(url.clone(), timeout)?),
            Location::ObjectStore { bucket, key } => Remote::S3(S3Backend::new(
                bucket.clone(),
                key.clone(),
                &config.storage.s3,
                timeout,
            )?),
        };
        Ok(Self {
            location,
            local: LocalFile::new(local_path),
            remote,
        })
    }

    /// Build a store from the `[storage]` table.
    pub fn from_config(config: &Config) -> Result<Self> {
        Self::new(config.location()?, &config.storage.local_path, config)
    }

    /// Use fixed S3 credentials instead of the ambient chain. No effect for
    /// other locations.
    pub fn with_s3_credentials(mut self, creds: AwsCredentials) -> Self {
        self.remote = match self.remote {
            Remote::S3(s3) => Remote::S3(s3.with_credentials(creds)),
            other => other,
        };
        self
    }

    pub fn location(&self) -> &Location {
        &self.location
    }

    pub fn local_path(&self) -> &Path {
        self.local.path()
    }

    pub async fn local_exists(&self) -> bool {
        self.local.exists().await
    }

    /// Backends to try on load, most authoritative first.
    fn load_chain(&self) -> Vec<&dyn Backend> {
        let mut chain: Vec<&dyn Backend> = Vec::with_capacity(2);
        match &self.remote {
            Remote::None => {}
            Remote::Http(http) => chain.push(http),
            Remote::S3(s3) => chain.push(s3),
        }
        chain.push(&self.local);
        chain
    }

    /// Load the document. Never fails; see the module docs.
    pub async fn load(&self) -> Loaded {
        let chain = self.load_chain();

        match first_success(&chain).await {
            Ok(resolved) => {
                let mut notices: Vec<Notice> = resolved.failures.iter().map(Notice::warning).collect();
                if self.location.is_remote() && resolved.backend != self.location.kind() {
                    notices.push(Notice::info(
                        "using_local_copy",
                        format!("Falling back to local file {}", self.local.path().display()),
                    ));
                }
                Loaded {
                    document: resolved.document,
                    source: Some(resolved.backend),
                    notices,
                }
            }
            Err(exhausted) => {
                if let Some(cause) = exhausted.last() {
                    tracing::warn!(error = %cause, "no backend produced a document");
                }
                let mut notices: Vec<Notice> = exhausted.failures.iter().map(Notice::warning).collect();
                notices.push(Notice::info("starting_empty", "Starting with empty progress"));
                Loaded {
                    document: Document::new(),
                    source: None,
                    notices,
                }
            }
        }
    }

    /// Persist the document: local backup first, then the remote if writable.
    pub async fn save(&self, doc: &Document) -> Vec<Notice> {
        let mut notices = Vec::new();

        if let Err(e) = self.local.write(doc).await {
            tracing::warn!(error = %e, "local backup failed");
            notices.push(Notice::warning(&e));
        }

        match &self.remote {
            Remote::None => {}
            Remote::Http(_) => notices.push(Notice::info(
                "remote_read_only",
                "Remote location is HTTP(S) and read-only; local copy saved. To enable remote \
                 uploads, set the location to an s3:// URL and provide AWS credentials.",
            )),
            Remote::S3(s3) => match s3.put(doc).await {
                Ok(()) => notices.push(Notice::success(
                    "remote_saved",
                    format!("Progress saved to {}", self.location),
                )),
                Err(e) => {
                    tracing::warn!(error = %e, "remote upload failed");
                    notices.push(Notice::error(&e));
                }
            },
        }

        notices
    }

    /// Delete the local file.
    pub async fn discard_local(&self) -> Vec<Notice> {
        match self.local.remove().await {
            Ok(()) => Vec::new(),
            Err(e) => vec![Notice::error(&e)],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notice::NoticeLevel;
    use tempfile::TempDir;

    fn local_store(tmp: &TempDir) -> ProgressStore {
        let config = Config::default();
        ProgressStore::new(Location::Local, &tmp.path().join("progress.json"), &config).unwrap()
    }

    #[tokio::test]
    async fn local_round_trip() {
        let tmp = TempDir::new().unwrap();
        let store = local_store(&tmp);

        let mut doc = Document::new();
        doc.set_complete("linux_permissions", true);
        doc.set_complete("linux_cron_jobs", false);
        doc.notes.in_progress = "Kubernetes".into();

        let notices = store.save(&doc).await;
        assert!(notices.is_empty(), "{:?}", notices);

        let loaded = store.load().await;
        assert_eq!(loaded.document, doc);
        assert_eq!(loaded.source.as_deref(), Some("local"));
        assert!(loaded.notices.is_empty());
    }

    #[tokio::test]
    async fn missing_local_file_is_silently_empty() {
        let tmp = TempDir::new().unwrap();
        let loaded = local_store(&tmp).load().await;
        assert!(loaded.document.is_empty());
        assert!(loaded.notices.is_empty());
    }

    #[tokio::test]
    async fn malformed_local_file_warns_and_starts_empty() {
        let tmp = TempDir::new().unwrap();
        std::fs::write(tmp.path().join("progress.json"), "{{{").unwrap();
        let loaded = local_store(&tmp).load().await;
        assert!(loaded.document.is_empty());
        assert!(loaded.source.is_none());
        assert_eq!(loaded.notices[0].level, NoticeLevel::Warning);
        assert_eq!(loaded.notices[0].code, "local_io_error");
    }

    #[tokio::test]
    async fn save_is_byte_stable() {
        let tmp = TempDir::new().unwrap();
        let store = local_store(&tmp);
        let mut doc = Document::new();
        doc.set_complete("docker_dockerfile", true);

        store.save(&doc).await;
        let first = std::fs::read(store.local_path()).unwrap();
        store.save(&doc).await;
        let second = std::fs::read(store.local_path()).unwrap();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn discard_then_load_is_empty() {
        let tmp = TempDir::new().unwrap();
        let store = local_store(&tmp);
        let mut doc = Document::new();
        doc.set_complete("git_branching", true);
        store.save(&doc).await;

        assert!(store.discard_local().await.is_empty());
        assert!(!store.local_exists().await);
        assert!(store.load().await.document.is_empty());
    }

    #[tokio::test]
    async fn local_write_failure_is_a_warning() {
        let tmp = TempDir::new().unwrap();
        let blocker = tmp.path().join("blocker");
        std::fs::write(&blocker, "x").unwrap();
        let store = ProgressStore::new(
            Location::Local,
            &blocker.join("progress.json"),
            &Config::default(),
        )
        .unwrap();

        let notices = store.save(&Document::new()).await;
        assert_eq!(notices.len(), 1);
        assert_eq!(notices[0].code, "local_write_error");
        assert_eq!(notices[0].level, NoticeLevel::Warning);
    }
}
