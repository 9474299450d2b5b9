//! doc-ingest: document ingestion pipeline producing uniform chunks
//!
//! Office documents (docx, pptx, xlsx), PDFs and Outlook messages are
//! extracted by format-specific extractors into [`Chunk`]s with shared
//! identity, content and metadata semantics. A [`Loader`] walks a corpus
//! directory; the [`IngestService`] handles single uploads and registers
//! the flattened text as a logical file.

pub mod codec;
pub mod config;
pub mod error;
pub mod extractors;
pub mod loader;
pub mod partition;
pub mod server;
pub mod service;
pub mod storage;
pub mod types;

pub use config::IngestConfig;
pub use error::{Error, Result};
pub use loader::{ChunkExtractor, Extractor, ExtractorKind, Loader, LoaderConfig};
pub use service::{format_chunks, IngestService, Upload};
pub use types::{generate_unique_id, Chunk, FileRecord, FileType, Metadata, MetadataValue};
