//! Error types for the ingestion pipeline

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::types::file_type::ALLOWED_UPLOAD_EXTENSIONS;

/// Result type alias for ingestion operations
pub type Result<T> = std::result::Result<T, Error>;

/// Ingestion pipeline errors
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// File parsing error
    #[error("Failed to parse file '{filename}': {message}")]
    FileParse { filename: String, message: String },

    /// Upload with an extension outside the allow-list
    #[error("Unsupported file type: {0}")]
    UnsupportedFileType(String),

    /// The extractor produced nothing for an uploaded file
    #[error("Extraction failed for '{0}'")]
    ExtractionFailed(String),

    /// Layout partitioner error
    #[error("Partitioner error: {0}")]
    Partition(String),

    /// Metadata value outside the string / non-negative integer schema
    #[error("Invalid metadata value for '{key}': {message}")]
    InvalidMetadata { key: String, message: String },

    /// Malformed chunk persistence file
    #[error("Invalid chunk file: {0}")]
    InvalidChunkFile(String),

    /// Malformed client request
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// File record not found
    #[error("File not found: {0}")]
    NotFound(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML front matter error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// Binary snapshot error
    #[error("Snapshot error: {0}")]
    Snapshot(String),

    /// Zip container error
    #[error("Zip error: {0}")]
    Zip(#[from] zip::result::ZipError),

    /// XML error
    #[error("XML error: {0}")]
    Xml(#[from] quick_xml::Error),

    /// HTTP request error
    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Create a file parse error
    pub fn file_parse(filename: impl Into<String>, message: impl Into<String>) -> Self {
        Self::FileParse {
            filename: filename.into(),
            message: message.into(),
        }
    }

    /// Create an invalid metadata error
    pub fn invalid_metadata(key: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidMetadata {
            key: key.into(),
            message: message.into(),
        }
    }

    /// Create a partitioner error
    pub fn partition(message: impl Into<String>) -> Self {
        Self::Partition(message.into())
    }

    /// Create an internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }
}

/// Fixed rejection message for uploads outside the allow-list
pub fn unsupported_format_message() -> String {
    format!(
        "Unsupported file format. Allowed formats: {}",
        ALLOWED_UPLOAD_EXTENSIONS.join(", ")
    )
}

/// Templated client-facing message wrapping an arbitrary failure
pub fn default_error_message(err: &str) -> String {
    format!("Something went wrong :/ {}", err)
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let (status, detail) = match &self {
            Error::UnsupportedFileType(_) => (StatusCode::BAD_REQUEST, unsupported_format_message()),
            Error::NotFound(_) => (
                StatusCode::NOT_FOUND,
                "We could not find what you're looking for :/".to_string(),
            ),
            _ => (
                StatusCode::BAD_REQUEST,
                default_error_message(&self.to_string()),
            ),
        };

        tracing::warn!("Request rejected ({}): {}", status, self);

        (status, Json(json!({ "detail": detail }))).into_response()
    }
}
