//! Upload orchestration: validate, store, extract, register

use std::path::{Path, PathBuf};
use std::sync::Arc;
use uuid::Uuid;

use crate::config::IngestConfig;
use crate::error::{Error, Result};
use crate::loader::{ExtractorKind, Loader};
use crate::storage::FileRegistry;
use crate::types::file_type::{dotted_extension, is_allowed_upload};
use crate::types::{Chunk, FileMeta, FileRecord, FileType};

/// Flatten a file's chunks into one text artifact.
///
/// The artifact is labeled with the first chunk's `source`; an empty list gives an empty string.
pub fn format_chunks(chunks: &[Chunk]) -> String {
    let Some(first) = chunks.first() else {
        return String::new();
    };
    let content = chunks
        .iter()
        .map(|c| c.content.as_str())
        .collect::<Vec<_>>()
        .join("\n");
    format!("Filename: {}\n\nContent:\n{}", first.source(), content)
}

/// A file received from a client
#[derive(Debug, Clone)]
pub struct Upload {
    /// Declared filename; any directory part is discarded
    pub filename: String,
    pub content_type: Option<String>,
    pub data: Vec<u8>,
}

/// Ingestion orchestrator over the upload directory and the file registry
pub struct IngestService {
    config: IngestConfig,
    registry: Arc<FileRegistry>,
}

impl IngestService {
    pub fn new(config: IngestConfig) -> Self {
        let registry = Arc::new(FileRegistry::open(config.storage.registry_path()));
        Self { config, registry }
    }

    pub fn config(&self) -> &IngestConfig {
        &self.config
    }

    pub fn registry(&self) -> &Arc<FileRegistry> {
        &self.registry
    }

    fn upload_dir(&self) -> &Path {
        &self.config.storage.upload_dir
    }

    /// Store an upload and register its logical content.
    ///
    /// Plain text is stored verbatim. Other formats are extracted and the
    /// flattened text becomes the logical content, with the original kept beside it.
    pub async fn upload(&self, user_id: &str, upload: Upload) -> Result<FileRecord> {
        let name = base_name(&upload.filename);
        let ext = dotted_extension(&name);
        if !is_allowed_upload(&name) {
            return Err(Error::UnsupportedFileType(ext));
        }

        let file_type = FileType::from_path(&name);
        tracing::info!(
            "Uploading {} ({}, {} bytes, {:?})",
            name,
            file_type.display_name(),
            upload.data.len(),
            upload.content_type
        );

        let id = Uuid::new_v4();
        let stored_name = format!("{}_{}", id, name);
        let stored_path = self.upload_dir().join(&stored_name);

        let record = if file_type.is_plain_text() {
            if let Err(e) = std::str::from_utf8(&upload.data) {
                return Err(Error::file_parse(&name, format!("not valid UTF-8: {}", e)));
            }
            self.write(&stored_path, &upload.data).await?;

            FileRecord::new(
                id,
                user_id,
                stored_name,
                FileMeta {
                    name,
                    content_type: upload.content_type,
                    size: upload.data.len() as u64,
                    path: stored_path.display().to_string(),
                    original_path: None,
                },
            )
        } else {
            let kind = ExtractorKind::from_extension(&ext)
                .ok_or_else(|| Error::ExtractionFailed(name.clone()))?;
            self.write(&stored_path, &upload.data).await?;

            tracing::debug!("Running the {} extractor on {}", kind.name(), stored_name);
            let chunks = match self.extract(kind, stored_path.clone()).await {
                Ok(Some(chunks)) => chunks,
                Ok(None) => {
                    self.discard(&stored_path).await;
                    return Err(Error::ExtractionFailed(name));
                }
                Err(e) => {
                    self.discard(&stored_path).await;
                    return Err(e);
                }
            };

            let content = format_chunks(&chunks);
            let base = Path::new(&name)
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_default();
            let extracted_name = format!("{}_{}.txt", id, base);
            let extracted_path = self.upload_dir().join(&extracted_name);
            self.write(&extracted_path, content.as_bytes()).await?;

            tracing::info!("Extracted {} chunks from {} into {}", chunks.len(), name, extracted_name);

            FileRecord::new(
                id,
                user_id,
                extracted_name,
                FileMeta {
                    name: format!("{}.txt", base),
                    content_type: Some("text/plain".to_string()),
                    size: content.len() as u64,
                    path: extracted_path.display().to_string(),
                    original_path: Some(stored_path.display().to_string()),
                },
            )
        };

        self.registry.insert(record.clone());
        Ok(record)
    }

    /// Run one extractor over a stored upload on the blocking pool
    async fn extract(&self, kind: ExtractorKind, path: PathBuf) -> Result<Option<Vec<Chunk>>> {
        let upload_dir = self.upload_dir().to_path_buf();
        let pdf = self.config.pdf.clone();

        tokio::task::spawn_blocking(move || -> Result<Option<Vec<Chunk>>> {
            let mut loader = Loader::for_kind_with(upload_dir, kind, &pdf)?;
            Ok(loader.load_file(&path).map(<[Chunk]>::to_vec))
        })
        .await
        .map_err(|e| Error::internal(format!("Extraction task failed: {}", e)))?
    }

    async fn write(&self, path: &Path, data: &[u8]) -> Result<()> {
        tokio::fs::create_dir_all(self.upload_dir()).await?;
        tokio::fs::write(path, data).await?;
        Ok(())
    }

    async fn discard(&self, path: &Path) {
        if let Err(e) = tokio::fs::remove_file(path).await {
            tracing::warn!("Failed to remove {}: {}", path.display(), e);
        }
    }

    pub fn list(&self) -> Vec<FileRecord> {
        self.registry.list()
    }

    pub fn get(&self, id: &Uuid) -> Result<FileRecord> {
        self.registry
            .get(id)
            .ok_or_else(|| Error::NotFound(id.to_string()))
    }

    /// Path of a record's logical content, which must still exist on disk
    pub fn content_path(&self, id: &Uuid) -> Result<PathBuf> {
        let record = self.get(id)?;
        let path = PathBuf::from(&record.meta.path);
        if path.is_file() {
            Ok(path)
        } else {
            Err(Error::NotFound(record.meta.path))
        }
    }

    /// Unregister a record; stored files are left in place
    pub fn delete(&self, id: &Uuid) -> Result<FileRecord> {
        let record = self
            .registry
            .remove(id)
            .ok_or_else(|| Error::NotFound(id.to_string()))?;
        tracing::info!("Deleted file record {} ({})", record.id, record.filename);
        Ok(record)
    }

    /// Drop every record and every entry of the upload directory except the registry file
    pub async fn delete_all(&self) -> Result<usize> {
        let count = self.registry.clear();
        let dir = self.upload_dir();
        if !dir.exists() {
            tracing::warn!("Upload directory {} does not exist", dir.display());
            return Ok(count);
        }

        let mut entries = tokio::fs::read_dir(dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path == self.registry.path() {
                continue;
            }
            let result = match entry.file_type().await {
                Ok(ft) if ft.is_dir() => tokio::fs::remove_dir_all(&path).await,
                _ => tokio::fs::remove_file(&path).await,
            };
            if let Err(e) = result {
                tracing::warn!("Failed to delete {}: {}", path.display(), e);
            }
        }

        tracing::info!("Deleted {} file records and cleared {}", count, dir.display());
        Ok(count)
    }
}

/// Final path component of a client-declared filename, either separator style
fn base_name(filename: &str) -> String {
    filename
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or(filename)
        .to_string()
}
