//! Error types for the store and the session.

use std::path::PathBuf;

use thiserror::Error;

/// A failure at the progress store boundary.
///
/// None of these are fatal. The store converts each one into a
/// [`Notice`](crate::notice::Notice) and carries on with whatever document
/// it could get.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StoreError {
    #[error("could not reach {location}: {reason}")]
    RemoteUnavailable { location: String, reason: String },
    #[error("could not parse document from {location}: {source}")]
    RemoteParse {
        location: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("could not read {}: {reason}", path.display())]
    LocalIo { path: PathBuf, reason: String },
    #[error("could not write {}: {source}", path.display())]
    LocalWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("could not upload to {location}: {reason}")]
    RemoteWrite { location: String, reason: String },
    #[error("no usable AWS credentials: {0}")]
    CredentialsUnavailable(String),
}

impl StoreError {
    /// Stable machine-readable code, used in JSON notices and API bodies.
    pub fn code(&self) -> &'static str {
        match self {
            StoreError::RemoteUnavailable { .. } => "remote_unavailable",
            StoreError::RemoteParse { .. } => "remote_parse_error",
            StoreError::LocalIo { .. } => "local_io_error",
            StoreError::LocalWrite { .. } => "local_write_error",
            StoreError::RemoteWrite { .. } => "remote_write_error",
            StoreError::CredentialsUnavailable(_) => "credentials_unavailable",
        }
    }
}

/// A rejected session action. These are caller mistakes, not store failures.
#[derive(Debug, Error, PartialEq, Eq)]
#[non_exhaustive]
pub enum SessionError {
    #[error("unknown task '{0}'")]
    UnknownTask(String),
    #[error("unknown note field '{0}' (expected to_learn, in_progress, or completed)")]
    UnknownNoteField(String),
    #[error("no reset was requested")]
    ResetNotRequested,
    #[error("reset token does not match the pending request")]
    ResetTokenMismatch,
}
