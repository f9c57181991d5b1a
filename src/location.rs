//! Persistence location parsing.

use std::fmt;

use anyhow::{bail, Result};

/// Where the progress document lives, beyond the local backup file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Location {
    /// Local file only.
    Local,
    /// Read-only public URL.
    Http(String),
    /// Read/write S3 object.
    ObjectStore { bucket: String, key: String },
}

impl Location {
    /// Parse a configured location string.
    ///
    /// Accepts an empty string (local only), an `http://` or `https://` URL,
    /// or `s3://<bucket>/<key>`. Anything else is rejected.
    pub fn parse(raw: &str) -> Result<Self> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Ok(Location::Local);
        }
        if raw.starts_with("http://") || raw.starts_with("https://") {
            return Ok(Location::Http(raw.to_string()));
        }
        if let Some(rest) = raw.strip_prefix("s3://") {
            let (bucket, key) = rest.split_once('/').unwrap_or((rest, ""));
            if bucket.is_empty() {
                bail!("s3 location is missing a bucket name");
            }
            if key.is_empty() || key.ends_with('/') {
                bail!("s3 location must name an object key, e.g. s3://{}/progress.json", bucket);
            }
            return Ok(Location::ObjectStore {
                bucket: bucket.to_string(),
                key: key.to_string(),
            });
        }
        bail!("unsupported location scheme (expected http://, https://, or s3://)")
    }

    /// Short backend name used in notices and logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Location::Local => "local",
            Location::Http(_) => "http",
            Location::ObjectStore { .. } => "s3",
        }
    }

    pub fn is_remote(&self) -> bool {
        !matches!(self, Location::Local)
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Location::Local => write!(f, "local"),
            Location::Http(url) => write!(f, "{}", url),
            Location::ObjectStore { bucket, key } => write!(f, "s3://{}/{}", bucket, key),
        }
    }
}
