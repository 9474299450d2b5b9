//! Extractor dispatch by file extension

use std::path::Path;

use crate::config::PdfConfig;
use crate::error::Result;
use crate::extractors::{DocxExtractor, MsgExtractor, PdfExtractor, PptxExtractor, XlsxExtractor};
use crate::partition;
use crate::types::Chunk;

/// Format-specific extraction of one file into chunks
///
/// `Ok(None)` means the file yielded nothing worth recording; the traversal
/// leaves its key absent. Errors are caught and logged by the loader.
pub trait ChunkExtractor: Send + Sync {
    fn extract(&self, path: &Path) -> Result<Option<Vec<Chunk>>>;
}

/// The formats with a dedicated extractor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExtractorKind {
    Docx,
    Pptx,
    Pdf,
    Msg,
    Xlsx,
}

/// Extension (without dot, lower case) to extractor
const EXTENSION_TABLE: &[(&str, ExtractorKind)] = &[
    ("docx", ExtractorKind::Docx),
    ("pptx", ExtractorKind::Pptx),
    ("ppt", ExtractorKind::Pptx),
    ("pdf", ExtractorKind::Pdf),
    ("msg", ExtractorKind::Msg),
    ("xlsx", ExtractorKind::Xlsx),
];

impl ExtractorKind {
    /// Look up the extractor for an extension, with or without the leading dot
    pub fn from_extension(ext: &str) -> Option<Self> {
        let ext = ext.trim_start_matches('.').to_lowercase();
        EXTENSION_TABLE
            .iter()
            .find(|(e, _)| *e == ext)
            .map(|(_, kind)| *kind)
    }

    pub fn for_path(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|e| e.to_str())
            .and_then(Self::from_extension)
    }

    /// Extension filter a loader of this kind uses by default
    pub fn default_extensions(&self) -> &'static [&'static str] {
        match self {
            Self::Docx => &[".docx"],
            Self::Pptx => &[".ppt", ".pptx"],
            Self::Pdf => &[".pdf"],
            Self::Msg => &[".msg"],
            Self::Xlsx => &[".xlsx"],
        }
    }

    /// Short lower-case name, as accepted by `FromStr`
    pub fn name(&self) -> &'static str {
        match self {
            Self::Docx => "docx",
            Self::Pptx => "pptx",
            Self::Pdf => "pdf",
            Self::Msg => "msg",
            Self::Xlsx => "xlsx",
        }
    }
}

impl std::str::FromStr for ExtractorKind {
    type Err = crate::error::Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::from_extension(s).ok_or_else(|| crate::error::Error::UnsupportedFileType(s.to_string()))
    }
}

/// One extractor per supported format
#[derive(Clone)]
pub enum Extractor {
    Docx(DocxExtractor),
    Pptx(PptxExtractor),
    Pdf(PdfExtractor),
    Msg(MsgExtractor),
    Xlsx(XlsxExtractor),
}

impl Extractor {
    /// Build the extractor for a format; PDF uses the configured partitioner
    pub fn for_kind(kind: ExtractorKind, pdf: &PdfConfig) -> Self {
        match kind {
            ExtractorKind::Docx => Self::Docx(DocxExtractor),
            ExtractorKind::Pptx => Self::Pptx(PptxExtractor),
            ExtractorKind::Pdf => Self::Pdf(
                PdfExtractor::new(partition::from_config(pdf))
                    .with_scratch_dir(pdf.scratch_dir.clone()),
            ),
            ExtractorKind::Msg => Self::Msg(MsgExtractor),
            ExtractorKind::Xlsx => Self::Xlsx(XlsxExtractor),
        }
    }

    pub fn kind(&self) -> ExtractorKind {
        match self {
            Self::Docx(_) => ExtractorKind::Docx,
            Self::Pptx(_) => ExtractorKind::Pptx,
            Self::Pdf(_) => ExtractorKind::Pdf,
            Self::Msg(_) => ExtractorKind::Msg,
            Self::Xlsx(_) => ExtractorKind::Xlsx,
        }
    }
}

impl ChunkExtractor for Extractor {
    fn extract(&self, path: &Path) -> Result<Option<Vec<Chunk>>> {
        match self {
            Self::Docx(e) => e.extract(path),
            Self::Pptx(e) => e.extract(path),
            Self::Pdf(e) => e.extract(path),
            Self::Msg(e) => e.extract(path),
            Self::Xlsx(e) => e.extract(path),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extension_lookup() {
        assert_eq!(ExtractorKind::from_extension("docx"), Some(ExtractorKind::Docx));
        assert_eq!(ExtractorKind::from_extension(".PDF"), Some(ExtractorKind::Pdf));
        assert_eq!(ExtractorKind::from_extension("ppt"), Some(ExtractorKind::Pptx));
        assert_eq!(ExtractorKind::from_extension("txt"), None);
        assert_eq!(
            ExtractorKind::for_path(Path::new("/x/mail.msg")),
            Some(ExtractorKind::Msg)
        );
        assert_eq!("xlsx".parse::<ExtractorKind>().unwrap(), ExtractorKind::Xlsx);
        assert!("exe".parse::<ExtractorKind>().is_err());
    }

    #[test]
    fn test_default_extensions_cover_lookup_table() {
        for (ext, kind) in EXTENSION_TABLE {
            let dotted = format!(".{}", ext);
            assert!(kind.default_extensions().contains(&dotted.as_str()));
        }
    }

    #[test]
    fn test_for_kind_round_trips_kind() {
        let pdf = PdfConfig::default();
        for kind in [
            ExtractorKind::Docx,
            ExtractorKind::Pptx,
            ExtractorKind::Pdf,
            ExtractorKind::Msg,
            ExtractorKind::Xlsx,
        ] {
            assert_eq!(Extractor::for_kind(kind, &pdf).kind(), kind);
            assert_eq!(kind.name().parse::<ExtractorKind>().unwrap(), kind);
        }
    }
}
