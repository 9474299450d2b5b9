//! Core types for the ingestion pipeline

pub mod chunk;
pub mod file_record;
pub mod file_type;

pub use chunk::{generate_unique_id, Chunk, Metadata, MetadataValue};
pub use file_record::{FileMeta, FileRecord};
pub use file_type::{FileType, ALLOWED_UPLOAD_EXTENSIONS};
