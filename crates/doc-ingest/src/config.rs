//! Configuration for the ingestion pipeline

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

/// Main ingestion configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IngestConfig {
    /// Server configuration
    #[serde(default)]
    pub server: ServerConfig,
    /// Upload storage configuration
    #[serde(default)]
    pub storage: StorageConfig,
    /// Directory loader defaults
    #[serde(default)]
    pub loader: LoaderDefaults,
    /// PDF layout partitioner configuration
    #[serde(default)]
    pub pdf: PdfConfig,
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Host to bind to
    pub host: String,
    /// Port to listen on
    pub port: u16,
    /// Maximum upload size in bytes
    pub max_upload_size: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            max_upload_size: 10 * 1024 * 1024, // 10MB
        }
    }
}

/// Upload storage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Directory receiving uploads and extracted artifacts
    pub upload_dir: PathBuf,
    /// File registry name, relative to the upload directory
    #[serde(default = "default_registry_file")]
    pub registry_file: String,
}

fn default_registry_file() -> String { "files.json".to_string() }

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            upload_dir: PathBuf::from("./data/uploads"),
            registry_file: default_registry_file(),
        }
    }
}

impl StorageConfig {
    pub fn registry_path(&self) -> PathBuf {
        self.upload_dir.join(&self.registry_file)
    }
}

/// Defaults applied to directory loaders built from configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoaderDefaults {
    /// Walk subdirectories
    #[serde(default = "default_recursive")]
    pub recursive: bool,
    /// Worker threads per traversal
    #[serde(default = "default_num_threads")]
    pub num_threads: usize,
    /// Basenames never loaded
    #[serde(default)]
    pub exclude_files: Vec<String>,
}

fn default_recursive() -> bool { true }
fn default_num_threads() -> usize { 1 }

impl Default for LoaderDefaults {
    fn default() -> Self {
        Self {
            recursive: true,
            num_threads: 1,
            exclude_files: Vec::new(),
        }
    }
}

/// PDF partitioner backend
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PartitionBackend {
    /// Unstructured partition API (layout-aware, hi_res)
    #[default]
    Unstructured,
    /// Local text extraction, one narrative element per page
    Local,
}

/// PDF layout partitioner configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PdfConfig {
    /// Backend to use
    #[serde(default)]
    pub backend: PartitionBackend,
    /// Unstructured partition endpoint
    #[serde(default = "default_api_url")]
    pub api_url: String,
    /// Unstructured API key
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    /// Partition strategy
    #[serde(default = "default_strategy")]
    pub strategy: String,
    /// Fall back to local extraction when the API fails
    #[serde(default = "default_fallback")]
    pub fallback_to_local: bool,
    /// Request timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
    /// Scratch directory for extracted block images, beside the source file
    #[serde(default = "default_scratch_dir")]
    pub scratch_dir: String,
}

fn default_api_url() -> String { "https://api.unstructuredapp.io/general/v0/general".to_string() }
fn default_strategy() -> String { "hi_res".to_string() }
fn default_fallback() -> bool { true }
fn default_timeout() -> u64 { 300 }
fn default_scratch_dir() -> String { "unstructured_images".to_string() }

impl Default for PdfConfig {
    fn default() -> Self {
        Self {
            backend: PartitionBackend::default(),
            api_url: default_api_url(),
            api_key: None,
            strategy: default_strategy(),
            fallback_to_local: true,
            timeout_secs: 300, // 5 minutes
            scratch_dir: default_scratch_dir(),
        }
    }
}

impl IngestConfig {
    /// Load configuration from a TOML file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&raw)
            .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Build configuration from `DOC_INGEST_CONFIG` plus environment overrides
    pub fn from_env() -> Result<Self> {
        let mut config = match std::env::var("DOC_INGEST_CONFIG") {
            Ok(path) => Self::load(path)?,
            Err(_) => Self::default(),
        };

        if let Ok(dir) = std::env::var("DOC_INGEST_UPLOAD_DIR") {
            config.storage.upload_dir = PathBuf::from(dir);
        }
        if let Ok(host) = std::env::var("DOC_INGEST_HOST") {
            config.server.host = host;
        }
        if let Ok(port) = std::env::var("DOC_INGEST_PORT") {
            config.server.port = port
                .parse()
                .map_err(|_| Error::Config(format!("Invalid DOC_INGEST_PORT: {}", port)))?;
        }
        if let Ok(key) = std::env::var("UNSTRUCTURED_API_KEY") {
            config.pdf.api_key = Some(key);
        }
        if let Ok(url) = std::env::var("UNSTRUCTURED_API_URL") {
            config.pdf.api_url = url;
        }

        config.validate()?;
        Ok(config)
    }

    /// Reject settings the pipeline cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.server.port == 0 {
            return Err(Error::Config("server.port must be non-zero".to_string()));
        }
        if self.server.max_upload_size == 0 {
            return Err(Error::Config("server.max_upload_size must be non-zero".to_string()));
        }
        if self.loader.num_threads == 0 {
            return Err(Error::Config("loader.num_threads must be at least 1".to_string()));
        }
        Ok(())
    }
}
