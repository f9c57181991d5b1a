//! Local JSON file backend.
//!
//! The local file is both the `Local` location and the backup kept for every
//! remote location. A missing file is not an error: it reads as an empty
//! document. Writes go to a sibling temp file first and are renamed into
//! place, so a crash never leaves a half-written document behind.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use skilltrack_core::Document;

use crate::backend::Backend;
use crate::error::StoreError;

pub struct LocalFile {
    path: PathBuf,
}

impl LocalFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub async fn exists(&self) -> bool {
        tokio::fs::try_exists(&self.path).await.unwrap_or(false)
    }

    /// Write the document as indented JSON.
    pub async fn write(&self, doc: &Document) -> Result<(), StoreError> {
        let bytes = doc.to_json_pretty().map_err(|e| self.write_error(e.into()))?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| self.write_error(e))?;
        }

        let tmp = self.tmp_path();
        tokio::fs::write(&tmp, &bytes)
            .await
            .map_err(|e| self.write_error(e))?;
        if let Err(e) = tokio::fs::rename(&tmp, &self.path).await {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(self.write_error(e));
        }

        tracing::debug!(path = %self.path.display(), bytes = bytes.len(), "wrote local progress file");
        Ok(())
    }

    /// Delete the file. Deleting a file that does not exist succeeds.
    pub async fn remove(&self) -> Result<(), StoreError> {
        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(self.write_error(e)),
        }
    }

    fn tmp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }

    fn write_error(&self, source: std::io::Error) -> StoreError {
        StoreError::LocalWrite {
            path: self.path.clone(),
            source,
        }
    }
}

#[async_trait]
impl Backend for LocalFile {
    fn name(&self) -> &str {
        "local"
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }

    async fn fetch(&self) -> Result<Document, StoreError> {
        let bytes = match tokio::fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                tracing::debug!(path = %self.path.display(), "no local progress file yet");
                return Ok(Document::new());
            }
            Err(e) => {
                return Err(StoreError::LocalIo {
                    path: self.path.clone(),
                    reason: e.to_string(),
                })
            }
        };

        Document::from_json(&bytes).map_err(|e| StoreError::LocalIo {
            path: self.path.clone(),
            reason: format!("malformed JSON: {}", e),
        })
    }
}
