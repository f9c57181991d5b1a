//! Catalogue loading.
//!
//! The built-in DevOps & SRE catalogue is compiled into the binary. A custom
//! one can be supplied with `[catalogue].path`, in the same TOML shape:
//!
//! ```toml
//! [[sections]]
//! key = "foundations"
//! title = "Foundations"
//!
//! [[sections.subsections]]
//! key = "linux"
//! title = "Linux Fundamentals"
//! tasks = [
//!     { key = "permissions", label = "File Permissions & Ownership" },
//! ]
//! ```
//!
//! Every catalogue is validated on load.

use anyhow::{Context, Result};
use skilltrack_core::Catalogue;
use std::path::Path;

use crate::config::Config;

const BUILTIN_DEVOPS_SRE: &str = include_str!("../catalogues/devops_sre.toml");

/// The built-in DevOps & SRE catalogue.
pub fn builtin() -> Result<Catalogue> {
    parse_catalogue(BUILTIN_DEVOPS_SRE).context("built-in catalogue is invalid")
}

/// The configured catalogue, or the built-in one.
pub fn load_catalogue(config: &Config) -> Result<Catalogue> {
    match &config.catalogue.path {
        Some(path) => load_catalogue_file(path),
        None => builtin(),
    }
}

pub fn load_catalogue_file(path: &Path) -> Result<Catalogue> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read catalogue file: {}", path.display()))?;
    parse_catalogue(&content).with_context(|| format!("Invalid catalogue: {}", path.display()))
}

pub fn parse_catalogue(content: &str) -> Result<Catalogue> {
    let catalogue: Catalogue = toml::from_str(content)?;
    catalogue.validate()?;
    Ok(catalogue)
}
