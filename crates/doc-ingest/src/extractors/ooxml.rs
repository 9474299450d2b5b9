//! Zip part access shared by the OOXML formats (docx, pptx, xlsx)

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use std::fs::File;
use std::io::{Read, Seek};
use std::path::Path;
use zip::ZipArchive;

use crate::error::{Error, Result};
use crate::loader::text::{format_timestamp, parse_w3c_timestamp};

/// A package relationship with its target resolved to a part name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Relationship {
    pub id: String,
    pub rel_type: String,
    pub target: String,
    pub external: bool,
}

impl Relationship {
    /// Whether the relationship type ends with the given short name (e.g. `image`)
    pub fn is(&self, short_type: &str) -> bool {
        self.rel_type.rsplit('/').next() == Some(short_type)
    }
}

/// Author and creation time from `docProps/core.xml`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CoreProperties {
    pub author: String,
    /// `YYYY-MM-DD HH:MM:SS`, empty when absent or unparseable
    pub created: String,
}

/// An opened OOXML package
pub struct OoxmlPackage<R: Read + Seek = File> {
    archive: ZipArchive<R>,
    name: String,
}

impl OoxmlPackage<File> {
    pub fn open(path: &Path) -> Result<Self> {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let file = File::open(path)?;
        Self::from_reader(file, name)
    }
}

impl<R: Read + Seek> OoxmlPackage<R> {
    pub fn from_reader(reader: R, name: impl Into<String>) -> Result<Self> {
        let name = name.into();
        let archive = ZipArchive::new(reader)
            .map_err(|e| Error::file_parse(&name, format!("not an OOXML package: {}", e)))?;
        Ok(Self { archive, name })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn has_part(&self, part: &str) -> bool {
        self.archive.file_names().any(|n| n == part)
    }

    pub fn part_names(&self) -> Vec<String> {
        self.archive.file_names().map(str::to_string).collect()
    }

    pub fn read_bytes(&mut self, part: &str) -> Result<Vec<u8>> {
        let mut file = self
            .archive
            .by_name(part)
            .map_err(|e| Error::file_parse(&self.name, format!("missing part {}: {}", part, e)))?;
        let mut buf = Vec::with_capacity(file.size() as usize);
        file.read_to_end(&mut buf)?;
        Ok(buf)
    }

    pub fn read_text(&mut self, part: &str) -> Result<String> {
        let bytes = self.read_bytes(part)?;
        String::from_utf8(bytes)
            .map_err(|e| Error::file_parse(&self.name, format!("part {} is not UTF-8: {}", part, e)))
    }

    /// Read a part that may legitimately be missing
    pub fn read_optional_text(&mut self, part: &str) -> Result<Option<String>> {
        if self.has_part(part) {
            self.read_text(part).map(Some)
        } else {
            Ok(None)
        }
    }

    /// Relationships of a part (`""` for the package-level relationships)
    pub fn relationships(&mut self, part: &str) -> Result<Vec<Relationship>> {
        let rels_part = rels_part_name(part);
        let Some(xml) = self.read_optional_text(&rels_part)? else {
            return Ok(Vec::new());
        };

        let mut reader = Reader::from_str(&xml);
        let mut rels = Vec::new();
        loop {
            match reader.read_event()? {
                Event::Start(e) | Event::Empty(e) if e.local_name().as_ref() == b"Relationship" => {
                    let id = attr(&e, b"Id").unwrap_or_default();
                    let rel_type = attr(&e, b"Type").unwrap_or_default();
                    let raw_target = attr(&e, b"Target").unwrap_or_default();
                    let external = attr(&e, b"TargetMode").as_deref() == Some("External");
                    let target = if external {
                        raw_target
                    } else {
                        resolve_target(part, &raw_target)
                    };
                    rels.push(Relationship { id, rel_type, target, external });
                }
                Event::Eof => break,
                _ => {}
            }
        }
        Ok(rels)
    }

    /// Part name of the main document, from the package relationships
    pub fn main_part(&mut self) -> Result<String> {
        self.relationships("")?
            .into_iter()
            .find(|r| r.is("officeDocument"))
            .map(|r| r.target)
            .ok_or_else(|| Error::file_parse(&self.name, "package has no main document part"))
    }

    pub fn core_properties(&mut self) -> Result<CoreProperties> {
        let Some(xml) = self.read_optional_text("docProps/core.xml")? else {
            return Ok(CoreProperties::default());
        };

        let mut reader = Reader::from_str(&xml);
        let mut props = CoreProperties::default();
        let mut current: Option<&'static str> = None;
        loop {
            match reader.read_event()? {
                Event::Start(e) => {
                    current = match e.local_name().as_ref() {
                        b"creator" => Some("creator"),
                        b"created" => Some("created"),
                        _ => None,
                    };
                }
                Event::Text(t) => {
                    let text = t.unescape()?;
                    match current {
                        Some("creator") => props.author.push_str(text.trim()),
                        Some("created") => {
                            props.created = parse_w3c_timestamp(&text)
                                .map(|ts| format_timestamp(&ts))
                                .unwrap_or_default();
                        }
                        _ => {}
                    }
                }
                Event::End(_) => current = None,
                Event::Eof => break,
                _ => {}
            }
        }
        Ok(props)
    }
}

/// Unescaped value of an attribute matched by local name
pub fn attr(e: &BytesStart<'_>, local: &[u8]) -> Option<String> {
    e.attributes()
        .flatten()
        .find(|a| a.key.local_name().as_ref() == local)
        .and_then(|a| a.unescape_value().ok())
        .map(|v| v.into_owned())
}

/// Like [`attr`] but only matches namespace-prefixed attributes (`r:id`, not `id`)
pub fn prefixed_attr(e: &BytesStart<'_>, local: &[u8]) -> Option<String> {
    e.attributes()
        .flatten()
        .find(|a| a.key.prefix().is_some() && a.key.local_name().as_ref() == local)
        .and_then(|a| a.unescape_value().ok())
        .map(|v| v.into_owned())
}

/// `word/document.xml` -> `word/_rels/document.xml.rels`; `""` -> `_rels/.rels`
fn rels_part_name(part: &str) -> String {
    match part.rsplit_once('/') {
        Some((dir, file)) => format!("{}/_rels/{}.rels", dir, file),
        None if part.is_empty() => "_rels/.rels".to_string(),
        None => format!("_rels/{}.rels", part),
    }
}

/// Resolve a relationship target relative to the source part's directory
pub fn resolve_target(source_part: &str, target: &str) -> String {
    if let Some(absolute) = target.strip_prefix('/') {
        return absolute.to_string();
    }

    let mut segments: Vec<&str> = match source_part.rsplit_once('/') {
        Some((dir, _)) => dir.split('/').collect(),
        None => Vec::new(),
    };
    for segment in target.split('/') {
        match segment {
            "." | "" => {}
            ".." => {
                segments.pop();
            }
            other => segments.push(other),
        }
    }
    segments.join("/")
}


#[cfg(test)]
mod tests {
    use super::fixtures::*;
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_resolve_target() {
        assert_eq!(resolve_target("word/document.xml", "media/image1.png"), "word/media/image1.png");
        assert_eq!(
            resolve_target("ppt/slides/slide1.xml", "../media/image2.jpeg"),
            "ppt/media/image2.jpeg"
        );
        assert_eq!(resolve_target("", "word/document.xml"), "word/document.xml");
        assert_eq!(resolve_target("ppt/slides/slide1.xml", "/ppt/media/x.png"), "ppt/media/x.png");
    }

    #[test]
    fn test_rels_part_name() {
        assert_eq!(rels_part_name(""), "_rels/.rels");
        assert_eq!(rels_part_name("word/document.xml"), "word/_rels/document.xml.rels");
    }

    #[test]
    fn test_package_main_part_and_core_properties() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("doc.docx");
        let rels = r#"<?xml version="1.0"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
<Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="word/document.xml"/>
<Relationship Id="rId2" Type="http://example.com/hyperlink" Target="https://example.com" TargetMode="External"/>
</Relationships>"#;
        write_package(
            &path,
            &[
                ("_rels/.rels", rels.as_bytes()),
                ("docProps/core.xml", CORE_XML.as_bytes()),
                ("word/document.xml", b"<w:document/>"),
            ],
        );

        let mut pkg = OoxmlPackage::open(&path).unwrap();
        assert_eq!(pkg.name(), "doc.docx");
        assert_eq!(pkg.main_part().unwrap(), "word/document.xml");

        let rels = pkg.relationships("").unwrap();
        assert_eq!(rels.len(), 2);
        assert!(rels[1].external);
        assert_eq!(rels[1].target, "https://example.com");

        let props = pkg.core_properties().unwrap();
        assert_eq!(props.author, "Ada Lovelace");
        assert_eq!(props.created, "2023-11-02 08:30:00");

        assert!(pkg.relationships("word/document.xml").unwrap().is_empty());
        assert!(pkg.read_bytes("word/missing.xml").is_err());
    }

    #[test]
    fn test_missing_core_properties_are_empty() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("bare.docx");
        write_package(&path, &[("word/document.xml", b"<w:document/>")]);
        let mut pkg = OoxmlPackage::open(&path).unwrap();
        assert_eq!(pkg.core_properties().unwrap(), CoreProperties::default());
        assert!(pkg.main_part().is_err());
    }

    #[test]
    fn test_not_a_zip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("fake.docx");
        std::fs::write(&path, b"plain text").unwrap();
        assert!(matches!(OoxmlPackage::open(&path), Err(Error::FileParse { .. })));
    }
}
