//! File type detection for uploads and loaders

use serde::{Deserialize, Serialize};
use std::path::Path;

/// Extensions accepted by the upload endpoint, in the order they are reported
pub const ALLOWED_UPLOAD_EXTENSIONS: [&str; 6] = [".msg", ".pdf", ".pptx", ".docx", ".txt", ".md"];

/// Supported file types
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum FileType {
    /// Microsoft Word document (.docx)
    Docx,
    /// Microsoft PowerPoint presentation (.pptx)
    Pptx,
    /// PDF document
    Pdf,
    /// Outlook message (.msg)
    Msg,
    /// Excel spreadsheet (.xlsx)
    Xlsx,
    /// Plain text file
    Txt,
    /// Markdown file
    Markdown,
    /// Unknown file type
    Unknown,
}

impl FileType {
    /// Detect file type from extension (with or without the leading dot)
    pub fn from_extension(ext: &str) -> Self {
        match ext.trim_start_matches('.').to_lowercase().as_str() {
            "docx" => Self::Docx,
            "pptx" | "ppt" => Self::Pptx,
            "pdf" => Self::Pdf,
            "msg" => Self::Msg,
            "xlsx" => Self::Xlsx,
            "txt" => Self::Txt,
            "md" => Self::Markdown,
            _ => Self::Unknown,
        }
    }

    /// Detect file type from a path or a bare filename
    pub fn from_path(path: impl AsRef<Path>) -> Self {
        path.as_ref()
            .extension()
            .and_then(|e| e.to_str())
            .map(Self::from_extension)
            .unwrap_or(Self::Unknown)
    }

    /// Plain text formats are stored verbatim without extraction
    pub fn is_plain_text(&self) -> bool {
        matches!(self, Self::Txt | Self::Markdown)
    }

    /// Get display name
    pub fn display_name(&self) -> &str {
        match self {
            Self::Docx => "Word Document (.docx)",
            Self::Pptx => "PowerPoint (.pptx)",
            Self::Pdf => "PDF",
            Self::Msg => "Outlook Message (.msg)",
            Self::Xlsx => "Excel Spreadsheet (.xlsx)",
            Self::Txt => "Text File",
            Self::Markdown => "Markdown",
            Self::Unknown => "Unknown",
        }
    }
}

/// Lower-cased extension of a filename including the leading dot, or empty
pub fn dotted_extension(filename: &str) -> String {
    Path::new(filename)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| format!(".{}", e.to_lowercase()))
        .unwrap_or_default()
}

/// Whether a filename is accepted by the upload endpoint
pub fn is_allowed_upload(filename: &str) -> bool {
    let ext = dotted_extension(filename);
    ALLOWED_UPLOAD_EXTENSIONS.contains(&ext.as_str())
}
