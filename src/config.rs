//! TOML configuration.
//!
//! ```toml
//! [storage]
//! location = "s3://my-bucket/skilltrack/progress.json"
//! local_path = "./data/progress.json"
//! timeout_secs = 10
//!
//! [storage.s3]
//! region = "eu-west-1"
//! # endpoint_url = "http://localhost:9000"   # MinIO / LocalStack
//!
//! [catalogue]
//! path = "./catalogue.toml"
//!
//! [server]
//! bind = "127.0.0.1:7341"
//! ```
//!
//! Every table is optional. The `SKILLTRACK_LOCATION` environment variable
//! overrides `storage.location`.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::location::Location;

/// Environment variable that overrides `storage.location`.
pub const LOCATION_ENV: &str = "SKILLTRACK_LOCATION";

/// Config file used when `--config` is not given, if it exists.
pub const DEFAULT_CONFIG_PATH: &str = "./config/trk.toml";

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub catalogue: CatalogueConfig,
    #[serde(default)]
    pub server: ServerConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct StorageConfig {
    /// Empty for local-only, an `http(s)://` URL, or `s3://bucket/key`.
    #[serde(default)]
    pub location: String,
    #[serde(default = "default_local_path")]
    pub local_path: PathBuf,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default)]
    pub s3: S3Config,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            location: String::new(),
            local_path: default_local_path(),
            timeout_secs: default_timeout_secs(),
            s3: S3Config::default(),
        }
    }
}

fn default_local_path() -> PathBuf {
    PathBuf::from("./data/progress.json")
}
fn default_timeout_secs() -> u64 {
    10
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct S3Config {
    /// Falls back to `AWS_REGION`, then `AWS_DEFAULT_REGION`, then `us-east-1`.
    #[serde(default)]
    pub region: Option<String>,
    /// Custom endpoint for S3-compatible services. Requests use path-style
    /// addressing (`<endpoint>/<bucket>/<key>`) when this is set.
    #[serde(default)]
    pub endpoint_url: Option<String>,
}

impl S3Config {
    pub fn resolved_region(&self) -> String {
        self.region
            .clone()
            .or_else(|| std::env::var("AWS_REGION").ok())
            .or_else(|| std::env::var("AWS_DEFAULT_REGION").ok())
            .filter(|r| !r.is_empty())
            .unwrap_or_else(|| "us-east-1".to_string())
    }
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct CatalogueConfig {
    /// A catalogue TOML file. The built-in catalogue is used when unset.
    #[serde(default)]
    pub path: Option<PathBuf>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

fn default_bind() -> String {
    "127.0.0.1:7341".to_string()
}

impl Config {
    /// Resolve the persistence location, validating its form.
    pub fn location(&self) -> Result<Location> {
        Location::parse(&self.storage.location)
            .with_context(|| format!("invalid storage.location '{}'", self.storage.location))
    }

    /// Apply environment overrides.
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(location) = std::env::var(LOCATION_ENV) {
            self.storage.location = location;
        }
        self
    }
}

/// Parse and validate a config file.
pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    parse_config(&content).with_context(|| "Failed to parse config file")
}

/// Load `path` if given, else the default config file if present, else
/// built-in defaults. Environment overrides are applied in every case.
pub fn load_or_default(path: Option<&Path>) -> Result<Config> {
    let config = match path {
        Some(p) => load_config(p)?,
        None => {
            let default = Path::new(DEFAULT_CONFIG_PATH);
            if default.exists() {
                load_config(default)?
            } else {
                Config::default()
            }
        }
    };
    let config = config.with_env_overrides();
    config.location()?;
    Ok(config)
}

fn parse_config(content: &str) -> Result<Config> {
    let config: Config = toml::from_str(content)?;

    if config.storage.timeout_secs == 0 {
        anyhow::bail!("storage.timeout_secs must be > 0");
    }

    if config.storage.local_path.as_os_str().is_empty() {
        anyhow::bail!("storage.local_path must not be empty");
    }

    config.location()?;

    Ok(config)
}
