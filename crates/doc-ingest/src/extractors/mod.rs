//! Format-specific chunk extractors
//!
//! Each extractor turns one source file into an ordered list of chunks:
//!
//! - DOCX: one chunk per document
//! - PPTX: one chunk per slide
//! - PDF: one chunk per page, via a layout [`Partitioner`](crate::partition::Partitioner)
//! - MSG: one chunk per message
//! - XLSX: one chunk per non-empty worksheet

pub mod docx;
pub mod msg;
pub mod ooxml;
pub mod pdf;
pub mod pptx;
pub mod xlsx;

pub use docx::DocxExtractor;
pub use msg::MsgExtractor;
pub use pdf::PdfExtractor;
pub use pptx::PptxExtractor;
pub use xlsx::XlsxExtractor;
