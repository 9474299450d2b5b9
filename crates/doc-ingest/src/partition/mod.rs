//! PDF layout partitioning
//!
//! A [`Partitioner`] turns a PDF into a flat, ordered list of typed layout
//! elements tagged with page numbers. Two backends exist: the Unstructured
//! partition API (layout-aware, extracts block images) and a local lopdf
//! text extractor that emits one narrative element per page.

pub mod local;
pub mod unstructured;

pub use local::LocalPartitioner;
pub use unstructured::UnstructuredPartitioner;

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;

use crate::config::{PartitionBackend, PdfConfig};
use crate::error::Result;

/// Layout element category
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ElementCategory {
    NarrativeText,
    Title,
    Table,
    ListItem,
    Image,
    UncategorizedText,
    Other(String),
}

impl ElementCategory {
    /// Map a partitioner type label onto a category
    pub fn from_label(label: &str) -> Self {
        match label {
            "NarrativeText" => Self::NarrativeText,
            "Title" => Self::Title,
            "Table" => Self::Table,
            "ListItem" => Self::ListItem,
            "Image" => Self::Image,
            "UncategorizedText" => Self::UncategorizedText,
            other => Self::Other(other.to_string()),
        }
    }
}

/// One layout element
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayoutElement {
    pub category: ElementCategory,
    pub text: String,
    /// 1-based page number, `None` when the partitioner did not report one
    pub page_number: Option<u32>,
    /// Source filename as seen by the partitioner
    pub filename: Option<String>,
    /// HTML rendering of a table element
    pub text_as_html: Option<String>,
}

impl LayoutElement {
    pub fn new(category: ElementCategory, text: impl Into<String>, page_number: u32) -> Self {
        Self {
            category,
            text: text.into(),
            page_number: Some(page_number),
            filename: None,
            text_as_html: None,
        }
    }

    pub fn with_html(mut self, html: impl Into<String>) -> Self {
        self.text_as_html = Some(html.into());
        self
    }

    pub fn with_filename(mut self, filename: impl Into<String>) -> Self {
        self.filename = Some(filename.into());
        self
    }
}

/// Layout-aware PDF partitioner
pub trait Partitioner: Send + Sync {
    /// Partition a PDF; extracted block images are written into `image_dir`
    fn partition(&self, path: &Path, image_dir: &Path) -> Result<Vec<LayoutElement>>;

    /// Backend name used in logs
    fn name(&self) -> &'static str;
}

/// Tries a primary partitioner and falls back to a secondary one on error
pub struct FallbackPartitioner {
    primary: Arc<dyn Partitioner>,
    fallback: Arc<dyn Partitioner>,
}

impl FallbackPartitioner {
    pub fn new(primary: Arc<dyn Partitioner>, fallback: Arc<dyn Partitioner>) -> Self {
        Self { primary, fallback }
    }
}

impl Partitioner for FallbackPartitioner {
    fn partition(&self, path: &Path, image_dir: &Path) -> Result<Vec<LayoutElement>> {
        match self.primary.partition(path, image_dir) {
            Ok(elements) => Ok(elements),
            Err(e) => {
                tracing::warn!(
                    "{} partitioner failed for {}, falling back to {}: {}",
                    self.primary.name(),
                    path.display(),
                    self.fallback.name(),
                    e
                );
                self.fallback.partition(path, image_dir)
            }
        }
    }

    fn name(&self) -> &'static str {
        "fallback"
    }
}

/// Build the partitioner selected by configuration
pub fn from_config(config: &PdfConfig) -> Arc<dyn Partitioner> {
    match config.backend {
        PartitionBackend::Local => Arc::new(LocalPartitioner),
        PartitionBackend::Unstructured => {
            let api: Arc<dyn Partitioner> = Arc::new(UnstructuredPartitioner::new(config));
            if config.fallback_to_local {
                Arc::new(FallbackPartitioner::new(api, Arc::new(LocalPartitioner)))
            } else {
                api
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    struct Failing;

    impl Partitioner for Failing {
        fn partition(&self, _path: &Path, _image_dir: &Path) -> Result<Vec<LayoutElement>> {
            Err(Error::partition("service unavailable"))
        }

        fn name(&self) -> &'static str {
            "failing"
        }
    }

    struct Fixed;

    impl Partitioner for Fixed {
        fn partition(&self, _path: &Path, _image_dir: &Path) -> Result<Vec<LayoutElement>> {
            Ok(vec![LayoutElement::new(ElementCategory::Title, "Hello", 1)])
        }

        fn name(&self) -> &'static str {
            "fixed"
        }
    }

    #[test]
    fn test_category_labels() {
        assert_eq!(ElementCategory::from_label("Title"), ElementCategory::Title);
        assert_eq!(ElementCategory::from_label("ListItem"), ElementCategory::ListItem);
        assert_eq!(
            ElementCategory::from_label("Header"),
            ElementCategory::Other("Header".to_string())
        );
    }

    #[test]
    fn test_fallback_used_on_error() {
        let chained = FallbackPartitioner::new(Arc::new(Failing), Arc::new(Fixed));
        let elements = chained.partition(Path::new("a.pdf"), Path::new("/tmp")).unwrap();
        assert_eq!(elements.len(), 1);
        assert_eq!(elements[0].text, "Hello");
    }

    #[test]
    fn test_from_config_backends() {
        let mut config = PdfConfig::default();
        assert_eq!(from_config(&config).name(), "fallback");
        config.fallback_to_local = false;
        assert_eq!(from_config(&config).name(), "unstructured");
        config.backend = PartitionBackend::Local;
        assert_eq!(from_config(&config).name(), "local");
    }
}
