//! Registered file records

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Descriptive metadata stored with a file record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileMeta {
    /// Original upload filename
    pub name: String,
    /// Content type declared by the client, if any
    pub content_type: Option<String>,
    /// Size in bytes of the logical content
    pub size: u64,
    /// Path of the logical content (extracted text artifact or verbatim upload)
    pub path: String,
    /// Path of the original upload when it differs from `path`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_path: Option<String>,
}

/// A logical file known to the registry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileRecord {
    /// Unique record id, also the prefix of the stored filenames
    pub id: Uuid,
    /// Owner identity
    pub user_id: String,
    /// Stored filename of the logical content
    pub filename: String,
    /// File metadata
    pub meta: FileMeta,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
}

impl FileRecord {
    pub fn new(id: Uuid, user_id: impl Into<String>, filename: impl Into<String>, meta: FileMeta) -> Self {
        Self {
            id,
            user_id: user_id.into(),
            filename: filename.into(),
            meta,
            created_at: Utc::now(),
        }
    }
}
