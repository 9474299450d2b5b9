//! Markdown encoding with a YAML front matter header

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::error::{Error, Result};
use crate::types::{Chunk, Metadata};

static FRONT_MATTER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)^---\n(.*?)\n---\n(.*)").expect("Invalid regex"));

#[derive(Serialize)]
struct FrontMatterRef<'a> {
    id: &'a str,
    metadata: &'a Metadata,
}

#[derive(Deserialize)]
struct FrontMatter {
    id: Option<String>,
    metadata: Option<Metadata>,
}

/// Render a chunk as front matter followed by its raw content
pub fn to_markdown_string(chunk: &Chunk) -> Result<String> {
    let yaml = serde_yaml::to_string(&FrontMatterRef {
        id: &chunk.id,
        metadata: &chunk.metadata,
    })?;
    Ok(format!("---\n{}---\n{}\n", yaml, chunk.content))
}

/// Parse a chunk from front matter and content; the content is trimmed
pub fn from_markdown_str(raw: &str) -> Result<Chunk> {
    let caps = FRONT_MATTER
        .captures(raw)
        .ok_or_else(|| Error::InvalidChunkFile("missing YAML front matter".to_string()))?;
    let header = caps.get(1).map(|m| m.as_str()).unwrap_or_default();
    let body = caps.get(2).map(|m| m.as_str()).unwrap_or_default();

    let front: FrontMatter = serde_yaml::from_str(header)?;
    let (Some(id), Some(metadata)) = (front.id, front.metadata) else {
        return Err(Error::InvalidChunkFile(
            "front matter must define 'id' and 'metadata'".to_string(),
        ));
    };

    Ok(Chunk::new(id).with_content(body.trim()).with_metadata(metadata))
}

/// Write a chunk to a markdown file
pub fn chunk_to_markdown(chunk: &Chunk, path: impl AsRef<Path>) -> Result<()> {
    fs::write(path, to_markdown_string(chunk)?)?;
    Ok(())
}

/// Read a chunk from a markdown file
pub fn markdown_to_chunk(path: impl AsRef<Path>) -> Result<Chunk> {
    from_markdown_str(&fs::read_to_string(path)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn sample() -> Chunk {
        let mut chunk = Chunk::new("7f1c").with_content("Title: Intro\n\nNotes:\nsay hi");
        chunk.set("pptx_file_name", "deck.pptx");
        chunk.set("slide_number", 1u64);
        chunk.set("page_title", "Intro, Agenda");
        chunk.set("author", "");
        chunk.set("confluence_id", "12345");
        chunk
    }

    #[test]
    fn test_markdown_round_trip() {
        let chunk = sample();
        let raw = to_markdown_string(&chunk).unwrap();
        assert!(raw.starts_with("---\n"));
        assert_eq!(from_markdown_str(&raw).unwrap(), chunk);
    }

    #[test]
    fn test_numeric_looking_strings_stay_strings() {
        let chunk = sample();
        let back = from_markdown_str(&to_markdown_string(&chunk).unwrap()).unwrap();
        assert_eq!(back.get("confluence_id").and_then(|v| v.as_str()), Some("12345"));
        assert_eq!(back.get("slide_number").and_then(|v| v.as_u64()), Some(1));
    }

    #[test]
    fn test_markdown_file_round_trip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("chunk.md");
        let chunk = sample();
        chunk_to_markdown(&chunk, &path).unwrap();
        assert_eq!(markdown_to_chunk(&path).unwrap(), chunk);
    }

    #[test]
    fn test_content_is_trimmed() {
        let raw = "---\nid: abc\nmetadata:\n  source: x\n---\n\n  body text  \n\n";
        let chunk = from_markdown_str(raw).unwrap();
        assert_eq!(chunk.content, "body text");
        assert_eq!(chunk.source(), "x");
    }

    #[test]
    fn test_missing_front_matter() {
        assert!(matches!(
            from_markdown_str("just text"),
            Err(Error::InvalidChunkFile(_))
        ));
    }

    #[test]
    fn test_missing_required_keys() {
        let raw = "---\nid: abc\n---\nbody";
        assert!(matches!(
            from_markdown_str(raw),
            Err(Error::InvalidChunkFile(_))
        ));
    }
}
