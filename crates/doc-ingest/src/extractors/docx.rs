//! Word (.docx) extraction: one chunk per document

use docx_rs::{
    DocumentChild, DrawingData, Paragraph, ParagraphChild, Run, RunChild, Table,
    TableCell, TableCellContent, TableChild, TableRowChild,
};
use quick_xml::events::Event;
use quick_xml::Reader;
use serde_json::Value;
use std::fs;
use std::path::Path;

use super::ooxml::{attr, OoxmlPackage};
use crate::error::{Error, Result};
use crate::loader::registry::ChunkExtractor;
use crate::loader::text::{confluence_id, file_name, render_table, segment};
use crate::types::Chunk;

/// Extracts formatted paragraph text, tables and inline pictures
#[derive(Debug, Clone, Copy, Default)]
pub struct DocxExtractor;

/// An inline picture referenced from the document body
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InlineImage {
    /// `cNvPr` id of the picture shape
    pub shape_id: String,
    /// Relationship id of the image part
    pub embed: String,
}

/// Structural content of the document body
#[derive(Debug, Default, PartialEq, Eq)]
pub struct DocxContent {
    /// Non-empty body paragraphs with formatting markers
    pub paragraphs: Vec<String>,
    /// Top-level tables, each `Table:` followed by tab-separated rows
    pub tables: Vec<String>,
    /// Relationship ids of the pictures drawn in the body, in document order
    pub pictures: Vec<String>,
}

#[derive(Default)]
struct FormattedRun {
    text: String,
    bold: bool,
    italic: bool,
    underline: bool,
}

impl FormattedRun {
    fn from_run(run: &Run) -> Self {
        // docx-rs keeps toggle values private; the serialized property carries them
        let format = serde_json::to_value(&run.run_property).unwrap_or_default();
        Self {
            text: run_text(run),
            bold: toggle_on(format.get("bold")),
            italic: toggle_on(format.get("italic")),
            underline: underline_on(format.get("underline")),
        }
    }

    /// Run text wrapped in its formatting markers, with a trailing space
    fn render(&self) -> Option<String> {
        let text = self.text.trim();
        if text.is_empty() {
            return None;
        }

        let mut tags = Vec::new();
        if self.bold {
            tags.push("bold");
        }
        if self.italic {
            tags.push("italic");
        }
        if self.underline {
            tags.push("underline");
        }

        let open: String = tags.iter().map(|t| format!("<{}>", t)).collect();
        let close: String = tags.iter().rev().map(|t| format!("</{}>", t)).collect();
        Some(format!("{}{}{} ", open, text, close))
    }
}

fn toggle_on(value: Option<&Value>) -> bool {
    match value {
        Some(Value::Bool(on)) => *on,
        Some(Value::Object(fields)) => fields.get("val").and_then(Value::as_bool).unwrap_or(true),
        _ => false,
    }
}

fn underline_on(value: Option<&Value>) -> bool {
    let style = match value {
        Some(Value::String(style)) => Some(style.as_str()),
        Some(Value::Object(fields)) => fields.get("val").and_then(Value::as_str),
        _ => None,
    };
    style.is_some_and(|s| s != "none")
}

fn run_text(run: &Run) -> String {
    let mut text = String::new();
    for child in &run.children {
        match child {
            RunChild::Text(t) => text.push_str(&t.text),
            RunChild::Tab(_) => text.push('\t'),
            RunChild::Break(_) => text.push('\n'),
            _ => {}
        }
    }
    text
}

fn runs(paragraph: &Paragraph) -> impl Iterator<Item = &Run> {
    paragraph.children.iter().filter_map(|child| match child {
        ParagraphChild::Run(run) => {
            let run: &Run = run;
            Some(run)
        }
        _ => None,
    })
}

/// Body paragraph text with formatting markers
fn formatted_text(paragraph: &Paragraph) -> String {
    runs(paragraph)
        .filter_map(|run| FormattedRun::from_run(run).render())
        .collect::<String>()
        .trim()
        .to_string()
}

fn plain_text(paragraph: &Paragraph) -> String {
    runs(paragraph).map(run_text).collect::<String>().trim().to_string()
}

fn collect_pictures(paragraph: &Paragraph, pictures: &mut Vec<String>) {
    for run in runs(paragraph) {
        for child in &run.children {
            if let RunChild::Drawing(drawing) = child {
                if let Some(DrawingData::Pic(pic)) = &drawing.data {
                    pictures.push(pic.id.clone());
                }
            }
        }
    }
}

fn cell_text(cell: &TableCell, pictures: &mut Vec<String>) -> String {
    let mut text = String::new();
    for content in &cell.children {
        if let TableCellContent::Paragraph(paragraph) = content {
            let line = plain_text(paragraph);
            if !line.is_empty() {
                text.push_str(&line);
                text.push(' ');
            }
            collect_pictures(paragraph, pictures);
        }
    }
    text.trim().to_string()
}

/// Cell text per row; nested tables are not descended into
fn table_rows(table: &Table, pictures: &mut Vec<String>) -> Vec<Vec<String>> {
    let mut rows = Vec::new();
    for child in &table.rows {
        if let TableChild::TableRow(row) = child {
            let mut cells = Vec::new();
            for cell in &row.cells {
                if let TableRowChild::TableCell(cell) = cell {
                    cells.push(cell_text(cell, pictures));
                }
            }
            rows.push(cells);
        }
    }
    rows
}

/// Parse a .docx package held in memory
pub fn parse_document(bytes: &[u8], name: &str) -> Result<DocxContent> {
    let docx = docx_rs::read_docx(bytes).map_err(|e| Error::file_parse(name, e.to_string()))?;
    let mut content = DocxContent::default();

    for child in &docx.document.children {
        match child {
            DocumentChild::Paragraph(paragraph) => {
                let text = formatted_text(paragraph);
                if !text.is_empty() {
                    content.paragraphs.push(text);
                }
                collect_pictures(paragraph, &mut content.pictures);
            }
            DocumentChild::Table(table) => {
                let rendered = render_table(&table_rows(table, &mut content.pictures));
                if !rendered.is_empty() {
                    content.tables.push(format!("Table:\n{}", rendered));
                }
            }
            _ => {}
        }
    }

    Ok(content)
}

/// `wp:inline` pictures of the main part with their shape ids, in document order
pub fn inline_pictures(xml: &str) -> Result<Vec<InlineImage>> {
    let mut reader = Reader::from_str(xml);
    let mut images = Vec::new();
    let mut inline: Option<(Option<String>, Option<String>)> = None;

    loop {
        match reader.read_event()? {
            Event::Start(e) | Event::Empty(e) => match e.local_name().as_ref() {
                b"inline" => inline = Some((None, None)),
                b"cNvPr" => {
                    if let Some((id, _)) = inline.as_mut() {
                        // the picture's own cNvPr comes after wp:docPr
                        *id = attr(&e, b"id");
                    }
                }
                b"blip" => {
                    if let Some((_, embed)) = inline.as_mut() {
                        *embed = attr(&e, b"embed");
                    }
                }
                _ => {}
            },
            Event::End(e) if e.local_name().as_ref() == b"inline" => {
                if let Some((Some(shape_id), Some(embed))) = inline.take() {
                    images.push(InlineImage { shape_id, embed });
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(images)
}

/// Pair drawn pictures with their inline shapes; anchored pictures drop out
fn match_pictures(pictures: &[String], mut inline: Vec<InlineImage>) -> Vec<InlineImage> {
    pictures
        .iter()
        .filter_map(|embed| {
            let index = inline.iter().position(|image| &image.embed == embed)?;
            Some(inline.remove(index))
        })
        .collect()
}

impl DocxExtractor {
    /// Write inline pictures beside the source and return their placeholders
    fn extract_images(
        &self,
        package: &mut OoxmlPackage,
        main_part: &str,
        images: &[InlineImage],
        path: &Path,
    ) -> Result<Vec<String>> {
        if images.is_empty() {
            return Ok(Vec::new());
        }

        let rels = package.relationships(main_part)?;
        let image_dir = path.parent().unwrap_or_else(|| Path::new("."));
        let docx_name = file_name(path);
        let mut placeholders = Vec::new();

        for image in images {
            let filename = format!("{}_{}.png", docx_name, image.shape_id);
            let Some(rel) = rels.iter().find(|r| r.id == image.embed && !r.external) else {
                tracing::warn!("Image {} in {} has no embedded part", image.embed, docx_name);
                continue;
            };

            let written = package
                .read_bytes(&rel.target)
                .and_then(|bytes| Ok(fs::write(image_dir.join(&filename), bytes)?));
            match written {
                Ok(()) => {
                    tracing::debug!("Extracted image {}", filename);
                    placeholders.push(format!("[Image: {}]", filename));
                }
                Err(e) => tracing::warn!("Failed to extract image {}: {}", filename, e),
            }
        }

        Ok(placeholders)
    }
}

impl ChunkExtractor for DocxExtractor {
    fn extract(&self, path: &Path) -> Result<Option<Vec<Chunk>>> {
        let docx_name = file_name(path);
        let parsed = parse_document(&fs::read(path)?, &docx_name)?;

        let mut package = OoxmlPackage::open(path)?;
        let props = package.core_properties()?;
        let main_part = package.main_part()?;
        let images = if parsed.pictures.is_empty() {
            Vec::new()
        } else {
            let inline = inline_pictures(&package.read_text(&main_part)?)?;
            match_pictures(&parsed.pictures, inline)
        };
        let placeholders = self.extract_images(&mut package, &main_part, &images, path)?;

        let combined = parsed
            .paragraphs
            .iter()
            .chain(parsed.tables.iter())
            .chain(placeholders.iter())
            .cloned()
            .collect::<Vec<_>>()
            .join("\n");

        let mut chunk = Chunk::generate().with_content(segment(&combined, "\n"));
        chunk.set("file_name", docx_name.as_str());
        chunk.set("author", props.author);
        chunk.set("created_date", props.created);
        chunk.set("source", docx_name.as_str());
        chunk.set("confluence_id", confluence_id(path));

        Ok(Some(vec![chunk]))
    }
}
