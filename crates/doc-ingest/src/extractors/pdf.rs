//! PDF extraction: one chunk per page from partitioned layout elements

use std::fs;
use std::path::Path;
use std::sync::Arc;
use walkdir::WalkDir;

use crate::error::Result;
use crate::loader::registry::ChunkExtractor;
use crate::loader::text::{clean_bullets, confluence_id, file_name, segment};
use crate::partition::{ElementCategory, LayoutElement, Partitioner};
use crate::types::Chunk;

/// Provenance fields kept for schema parity with the other formats, always empty
const EMPTY_PROVENANCE: &[&str] = &[
    "hierarchy_info",
    "author",
    "editor",
    "created_date",
    "create_date_timestamp",
    "attachments",
    "id",
    "confluence_link",
];

/// Content and titles gathered for one page
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PdfPage {
    pub number: u32,
    pub titles: Vec<String>,
    pub contents: Vec<String>,
}

impl PdfPage {
    /// Titles joined with `" , "`, no trailing separator
    pub fn joined_titles(&self) -> String {
        self.titles.join(" , ")
    }
}

/// Group elements into pages `1..=max_page`; pages without elements are kept empty
pub fn build_pages(elements: &[LayoutElement]) -> Vec<PdfPage> {
    let max_page = elements
        .iter()
        .filter_map(|e| e.page_number)
        .max()
        .unwrap_or(0);

    (1..=max_page)
        .map(|number| {
            let mut page = PdfPage { number, ..PdfPage::default() };
            for element in elements.iter().filter(|e| e.page_number == Some(number)) {
                match &element.category {
                    ElementCategory::UncategorizedText | ElementCategory::Image => {}
                    ElementCategory::NarrativeText => {
                        page.contents.push(segment(&element.text, "\n\n"));
                    }
                    ElementCategory::Title => {
                        page.titles.push(element.text.clone());
                        page.contents.push(element.text.clone());
                    }
                    ElementCategory::Table => {
                        page.contents.push("<html table>".to_string());
                        page.contents.push(
                            element
                                .text_as_html
                                .clone()
                                .unwrap_or_else(|| element.text.clone()),
                        );
                    }
                    ElementCategory::ListItem => page.contents.push(clean_bullets(&element.text)),
                    ElementCategory::Other(_) => page.contents.push(element.text.clone()),
                }
            }
            page
        })
        .collect()
}

/// Extracts PDFs through a layout [`Partitioner`]
#[derive(Clone)]
pub struct PdfExtractor {
    partitioner: Arc<dyn Partitioner>,
    scratch_dir: String,
}

impl PdfExtractor {
    pub fn new(partitioner: Arc<dyn Partitioner>) -> Self {
        Self {
            partitioner,
            scratch_dir: "unstructured_images".to_string(),
        }
    }

    /// Name of the scratch directory created beside each source PDF
    pub fn with_scratch_dir(mut self, scratch_dir: impl Into<String>) -> Self {
        self.scratch_dir = scratch_dir.into();
        self
    }

    /// Copy every file from the scratch directory into the source directory
    fn copy_block_images(&self, scratch: &Path, target: &Path) {
        for entry in WalkDir::new(scratch).into_iter().flatten() {
            if !entry.file_type().is_file() {
                continue;
            }
            let destination = target.join(entry.file_name());
            if let Err(e) = fs::copy(entry.path(), &destination) {
                tracing::warn!(
                    "Failed to copy {} to {}: {}",
                    entry.path().display(),
                    destination.display(),
                    e
                );
            }
        }
    }
}

impl ChunkExtractor for PdfExtractor {
    fn extract(&self, path: &Path) -> Result<Option<Vec<Chunk>>> {
        tracing::info!("Loading pdf file: {}", path.display());
        let source_dir = path.parent().unwrap_or_else(|| Path::new("."));
        let scratch = source_dir.join(&self.scratch_dir);
        fs::create_dir_all(&scratch)?;

        let elements = self.partitioner.partition(path, &scratch)?;
        let pages = build_pages(&elements);
        if pages.is_empty() {
            return Ok(None);
        }

        self.copy_block_images(&scratch, source_dir);

        let source = elements
            .iter()
            .find_map(|e| e.filename.clone())
            .unwrap_or_else(|| file_name(path));
        let document_id = confluence_id(path);

        let chunks = pages
            .into_iter()
            .map(|page| {
                let mut chunk = Chunk::generate().with_content(page.contents.join("\n"));
                for key in EMPTY_PROVENANCE {
                    chunk.set(*key, "");
                }
                chunk.set("page_title", page.joined_titles());
                chunk.set("page_number", page.number);
                chunk.set("source", source.as_str());
                chunk.set("confluence_id", document_id.as_str());
                chunk
            })
            .collect();

        Ok(Some(chunks))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::MetadataValue;
    use tempfile::tempdir;

    struct StubPartitioner {
        elements: Vec<LayoutElement>,
    }

    impl Partitioner for StubPartitioner {
        fn partition(&self, _path: &Path, image_dir: &Path) -> Result<Vec<LayoutElement>> {
            if !self.elements.is_empty() {
                fs::write(image_dir.join("figure-1-1.jpg"), b"JPEG")?;
            }
            Ok(self.elements.clone())
        }

        fn name(&self) -> &'static str {
            "stub"
        }
    }

    fn element(category: ElementCategory, text: &str, page: u32) -> LayoutElement {
        LayoutElement::new(category, text, page).with_filename("report.pdf")
    }

    fn sample_elements() -> Vec<LayoutElement> {
        vec![
            element(ElementCategory::Title, "Introduction", 1),
            element(ElementCategory::NarrativeText, "First sentence. Second sentence.", 1),
            element(ElementCategory::UncategorizedText, "12", 1),
            element(ElementCategory::Title, "Scope", 1),
            element(ElementCategory::ListItem, "\u{2022} bullet point", 2),
            element(ElementCategory::Table, "a b", 2).with_html("<table><tr><td>a</td></tr></table>"),
            element(ElementCategory::Image, "", 2),
            element(ElementCategory::Other("Footer".to_string()), "Confidential", 2),
        ]
    }

    #[test]
    fn test_build_pages() {
        let pages = build_pages(&sample_elements());
        assert_eq!(pages.len(), 2);

        assert_eq!(pages[0].titles, vec!["Introduction", "Scope"]);
        assert_eq!(pages[0].joined_titles(), "Introduction , Scope");
        assert_eq!(
            pages[0].contents,
            vec!["Introduction", "First sentence.\n\nSecond sentence.", "Scope"]
        );

        assert_eq!(
            pages[1].contents,
            vec![
                "bullet point",
                "<html table>",
                "<table><tr><td>a</td></tr></table>",
                "Confidential"
            ]
        );
        assert_eq!(pages[1].joined_titles(), "");
    }

    #[test]
    fn test_gap_pages_are_kept() {
        let elements = vec![
            element(ElementCategory::NarrativeText, "one", 1),
            element(ElementCategory::NarrativeText, "three", 3),
        ];
        let pages = build_pages(&elements);
        assert_eq!(pages.len(), 3);
        assert!(pages[1].contents.is_empty());
    }

    #[test]
    fn test_extract_page_chunks_and_images() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("upload_report.pdf");
        fs::write(&path, b"%PDF-1.4").unwrap();

        let extractor = PdfExtractor::new(Arc::new(StubPartitioner { elements: sample_elements() }));
        let chunks = extractor.extract(&path).unwrap().unwrap();
        assert_eq!(chunks.len(), 2);

        let first = &chunks[0];
        assert_eq!(first.content, "Introduction\nFirst sentence.\n\nSecond sentence.\nScope");
        assert_eq!(first.get("page_title").unwrap().to_string(), "Introduction , Scope");
        assert_eq!(first.get("page_number"), Some(&MetadataValue::Count(1)));
        assert_eq!(first.source(), "report.pdf");
        assert_eq!(first.get("author").unwrap().to_string(), "");
        assert_eq!(first.get("confluence_link").unwrap().to_string(), "");
        assert_eq!(first.get("confluence_id").unwrap().to_string(), "");

        assert_eq!(chunks[1].get("page_number"), Some(&MetadataValue::Count(2)));
        assert_eq!(fs::read(dir.path().join("figure-1-1.jpg")).unwrap(), b"JPEG");
    }

    #[test]
    fn test_no_elements_yields_nothing() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("blank.pdf");
        fs::write(&path, b"%PDF-1.4").unwrap();

        let extractor = PdfExtractor::new(Arc::new(StubPartitioner { elements: Vec::new() }));
        assert!(extractor.extract(&path).unwrap().is_none());
    }

    #[test]
    fn test_elements_without_pages_yield_nothing() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("odd.pdf");
        fs::write(&path, b"%PDF-1.4").unwrap();

        let mut loose = element(ElementCategory::NarrativeText, "floating", 1);
        loose.page_number = None;
        let extractor = PdfExtractor::new(Arc::new(StubPartitioner { elements: vec![loose] }));
        assert!(extractor.extract(&path).unwrap().is_none());
    }
}
