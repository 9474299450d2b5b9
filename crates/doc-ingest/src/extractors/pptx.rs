//! PowerPoint (.pptx) extraction: one chunk per slide

use quick_xml::events::Event;
use quick_xml::Reader;
use std::fs;
use std::path::Path;

use super::ooxml::{attr, prefixed_attr, OoxmlPackage, Relationship};
use crate::error::Result;
use crate::loader::registry::ChunkExtractor;
use crate::loader::text::{confluence_id, file_name, render_table, segment};
use crate::types::{Chunk, MetadataValue};

/// Extracts titles, text boxes, pictures, tables and speaker notes per slide
#[derive(Debug, Clone, Copy, Default)]
pub struct PptxExtractor;

/// A top-level shape of a slide's shape tree
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SlideShape {
    /// Placeholder shape; `ph_type` is the placeholder type attribute
    Placeholder { ph_type: Option<String>, text: String },
    /// Free text box
    TextBox(String),
    /// Picture referencing an image relationship
    Picture { embed: String },
    /// Table rows of cell text
    Table(Vec<Vec<String>>),
    /// Auto shapes, groups, connectors and other frames
    Other,
}

impl SlideShape {
    fn title(&self) -> Option<&str> {
        match self {
            Self::Placeholder { ph_type: Some(t), text } if t == "title" || t == "ctrTitle" => {
                Some(text.trim())
            }
            _ => None,
        }
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum ShapeKind {
    Sp,
    Pic,
    Frame,
    Group,
}

#[derive(Default)]
struct ShapeState {
    placeholder: Option<Option<String>>,
    txbox: bool,
    embed: Option<String>,
    paragraphs: Vec<String>,
    paragraph: String,
    in_text: bool,
    in_table: bool,
    rows: Vec<Vec<String>>,
    row: Vec<String>,
    cell: Vec<String>,
}

impl ShapeState {
    fn finish(self, kind: ShapeKind) -> SlideShape {
        let text = self.paragraphs.join("\n");
        if let Some(ph_type) = self.placeholder {
            return SlideShape::Placeholder { ph_type, text };
        }
        match kind {
            ShapeKind::Sp if self.txbox => SlideShape::TextBox(text),
            ShapeKind::Pic => match self.embed {
                Some(embed) => SlideShape::Picture { embed },
                None => SlideShape::Other,
            },
            ShapeKind::Frame if self.in_table || !self.rows.is_empty() => SlideShape::Table(self.rows),
            _ => SlideShape::Other,
        }
    }
}

/// Parse the top-level shapes of a slide (or notes slide) in document order
pub fn parse_shapes(xml: &str) -> Result<Vec<SlideShape>> {
    let mut reader = Reader::from_str(xml);
    let mut stack: Vec<Vec<u8>> = Vec::new();
    let mut shapes = Vec::new();
    let mut current: Option<(ShapeKind, usize, ShapeState)> = None;

    loop {
        let event = reader.read_event()?;
        let is_empty = matches!(event, Event::Empty(_));
        match event {
            Event::Start(e) | Event::Empty(e) => {
                let name = e.local_name().as_ref().to_vec();

                if current.is_none() && stack.last().map(Vec::as_slice) == Some(b"spTree".as_slice()) {
                    let kind = match name.as_slice() {
                        b"sp" => Some(ShapeKind::Sp),
                        b"pic" => Some(ShapeKind::Pic),
                        b"graphicFrame" => Some(ShapeKind::Frame),
                        b"grpSp" | b"cxnSp" | b"contentPart" => Some(ShapeKind::Group),
                        _ => None,
                    };
                    if let Some(kind) = kind {
                        if is_empty {
                            shapes.push(SlideShape::Other);
                        } else {
                            current = Some((kind, stack.len(), ShapeState::default()));
                        }
                    }
                } else if let Some((kind, _, state)) = current.as_mut() {
                    if *kind != ShapeKind::Group {
                        match name.as_slice() {
                            b"ph" => state.placeholder = Some(attr(&e, b"type")),
                            b"cNvSpPr" => {
                                state.txbox = matches!(attr(&e, b"txBox").as_deref(), Some("1" | "true"))
                            }
                            b"blip" => state.embed = prefixed_attr(&e, b"embed"),
                            b"tbl" => state.in_table = true,
                            b"tr" if !is_empty => state.row.clear(),
                            b"tc" if !is_empty => state.cell.clear(),
                            b"p" if !is_empty => state.paragraph.clear(),
                            b"t" if !is_empty => state.in_text = true,
                            b"br" => state.paragraph.push('\n'),
                            _ => {}
                        }
                    }
                }

                if !is_empty {
                    stack.push(name);
                }
            }
            Event::Text(t) => {
                if let Some((_, _, state)) = current.as_mut() {
                    if state.in_text {
                        state.paragraph.push_str(&t.unescape()?);
                    }
                }
            }
            Event::End(_) => {
                let name = stack.pop().unwrap_or_default();
                let depth = stack.len();

                let closes_shape = matches!(current.as_ref(), Some((_, d, _)) if *d == depth);
                if closes_shape {
                    if let Some((kind, _, state)) = current.take() {
                        shapes.push(state.finish(kind));
                    }
                } else if let Some((_, _, state)) = current.as_mut() {
                    match name.as_slice() {
                        b"t" => state.in_text = false,
                        b"p" => {
                            let paragraph = std::mem::take(&mut state.paragraph);
                            if state.in_table {
                                state.cell.push(paragraph);
                            } else {
                                state.paragraphs.push(paragraph);
                            }
                        }
                        b"tc" => {
                            let text = state.cell.join("\n").trim().to_string();
                            state.row.push(text);
                        }
                        b"tr" => {
                            let row = std::mem::take(&mut state.row);
                            state.rows.push(row);
                        }
                        _ => {}
                    }
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(shapes)
}

/// Slide part names in presentation order
fn slide_parts(package: &mut OoxmlPackage, presentation: &str) -> Result<Vec<String>> {
    let rels = package.relationships(presentation)?;
    let xml = package.read_text(presentation)?;

    let mut reader = Reader::from_str(&xml);
    let mut ordered = Vec::new();
    loop {
        match reader.read_event()? {
            Event::Start(e) | Event::Empty(e) if e.local_name().as_ref() == b"sldId" => {
                if let Some(rid) = prefixed_attr(&e, b"id") {
                    if let Some(rel) = rels.iter().find(|r| r.id == rid) {
                        ordered.push(rel.target.clone());
                    }
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if ordered.is_empty() {
        // no slide id list: fall back to numeric part order
        let mut names: Vec<String> = package
            .part_names()
            .into_iter()
            .filter(|n| n.starts_with("ppt/slides/slide") && n.ends_with(".xml"))
            .collect();
        names.sort_by_key(|n| {
            n.trim_start_matches("ppt/slides/slide")
                .trim_end_matches(".xml")
                .parse::<u32>()
                .unwrap_or(0)
        });
        ordered = names;
    }

    Ok(ordered)
}

/// Body placeholder text of a notes slide
fn notes_text(package: &mut OoxmlPackage, rels: &[Relationship]) -> Result<String> {
    let Some(rel) = rels.iter().find(|r| r.is("notesSlide") && !r.external) else {
        return Ok(String::new());
    };
    let Some(xml) = package.read_optional_text(&rel.target)? else {
        return Ok(String::new());
    };

    let text = parse_shapes(&xml)?
        .into_iter()
        .find_map(|shape| match shape {
            SlideShape::Placeholder { ph_type: Some(t), text } if t == "body" => Some(text),
            _ => None,
        })
        .unwrap_or_default();
    Ok(text.trim().to_string())
}

impl ChunkExtractor for PptxExtractor {
    fn extract(&self, path: &Path) -> Result<Option<Vec<Chunk>>> {
        let mut package = OoxmlPackage::open(path)?;
        let props = package.core_properties()?;
        let presentation = package.main_part()?;
        let slides = slide_parts(&mut package, &presentation)?;

        let pptx_name = file_name(path);
        let document_id = confluence_id(path);
        let image_dir = path.parent().unwrap_or_else(|| Path::new("."));

        let mut chunks = Vec::with_capacity(slides.len());
        for (index, slide_part) in slides.iter().enumerate() {
            let slide_number = index + 1;
            let xml = package.read_text(slide_part)?;
            let rels = package.relationships(slide_part)?;

            let mut contents: Vec<String> = Vec::new();
            let mut titles: Vec<String> = Vec::new();

            for shape in parse_shapes(&xml)? {
                match &shape {
                    SlideShape::Placeholder { .. } => {
                        if let Some(title) = shape.title().filter(|t| !t.is_empty()) {
                            titles.push(title.to_string());
                            contents.push(format!("Title: {}", title));
                        }
                    }
                    SlideShape::TextBox(text) => {
                        let text = text.trim();
                        if !text.is_empty() {
                            contents.push(segment(text, "\n\n"));
                        }
                    }
                    SlideShape::Picture { embed } => {
                        let Some(rel) = rels.iter().find(|r| &r.id == embed && !r.external) else {
                            tracing::warn!("Picture {} on slide {} has no image part", embed, slide_number);
                            continue;
                        };
                        let original = rel.target.rsplit('/').next().unwrap_or(&rel.target);
                        let filename = format!("{}_slide{}_{}", pptx_name, slide_number, original);
                        let written = package
                            .read_bytes(&rel.target)
                            .and_then(|bytes| Ok(fs::write(image_dir.join(&filename), bytes)?));
                        match written {
                            Ok(()) => contents.push(format!("[Image: {}]", filename)),
                            Err(e) => tracing::warn!("Failed to extract image {}: {}", filename, e),
                        }
                    }
                    SlideShape::Table(rows) => {
                        let table = render_table(rows);
                        if !table.is_empty() {
                            contents.push(format!("Table:\n{}", table));
                        }
                    }
                    SlideShape::Other => {}
                }
            }

            let notes = notes_text(&mut package, &rels)?;
            if !notes.is_empty() {
                contents.push(format!("Notes:\n{}", notes));
            }

            let mut chunk = Chunk::generate().with_content(contents.join("\n"));
            chunk.set("pptx_file_name", pptx_name.as_str());
            chunk.set("slide_number", slide_number.to_string());
            chunk.set("page_title", MetadataValue::joined(&titles, ", "));
            chunk.set("author", props.author.as_str());
            chunk.set("created_date", props.created.as_str());
            chunk.set("source", pptx_name.as_str());
            chunk.set("confluence_id", document_id.as_str());
            chunks.push(chunk);
        }

        Ok(Some(chunks))
    }
}
