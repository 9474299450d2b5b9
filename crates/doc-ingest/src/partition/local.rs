//! Local PDF partitioning with lopdf

use lopdf::Document;
use std::path::Path;

use super::{ElementCategory, LayoutElement, Partitioner};
use crate::error::{Error, Result};

/// Emits one narrative element per page with extractable text
///
/// No layout analysis happens here: no titles, tables or block images.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalPartitioner;

impl Partitioner for LocalPartitioner {
    fn partition(&self, path: &Path, _image_dir: &Path) -> Result<Vec<LayoutElement>> {
        let filename = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        let doc = Document::load(path)
            .map_err(|e| Error::file_parse(&filename, format!("Failed to load PDF: {}", e)))?;

        let mut elements = Vec::new();
        for page_number in doc.get_pages().keys() {
            match doc.extract_text(&[*page_number]) {
                Ok(text) if !text.trim().is_empty() => {
                    elements.push(
                        LayoutElement::new(ElementCategory::NarrativeText, text.trim(), *page_number)
                            .with_filename(&filename),
                    );
                }
                Ok(_) => tracing::debug!("Page {} of {} has no text layer", page_number, filename),
                Err(e) => {
                    tracing::debug!("Could not extract page {} of {}: {}", page_number, filename, e)
                }
            }
        }

        Ok(elements)
    }

    fn name(&self) -> &'static str {
        "local"
    }
}
