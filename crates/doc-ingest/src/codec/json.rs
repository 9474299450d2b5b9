//! JSON array encoding

use serde::Serialize;
use std::fs;
use std::path::Path;

use crate::error::Result;
use crate::types::Chunk;

/// Pretty-print chunks with a four-space indent
pub fn to_json_string(chunks: &[Chunk]) -> Result<String> {
    let mut buf = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut ser = serde_json::Serializer::with_formatter(&mut buf, formatter);
    chunks.serialize(&mut ser)?;
    Ok(String::from_utf8_lossy(&buf).into_owned())
}

/// Write chunks as a JSON array
pub fn save_chunks_json(chunks: &[Chunk], path: impl AsRef<Path>) -> Result<()> {
    fs::write(path, to_json_string(chunks)?)?;
    Ok(())
}

/// Read chunks from a JSON array
pub fn load_chunks_json(path: impl AsRef<Path>) -> Result<Vec<Chunk>> {
    let raw = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&raw)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_json_round_trip_preserves_order() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("chunks.json");

        let mut first = Chunk::new("b").with_content("Über straße");
        first.set("sheet_name", "Sheet1");
        let mut second = Chunk::new("a").with_content("Table:\nx\ty");
        second.set("slide_number", 3u64);
        let chunks = vec![first, second];

        save_chunks_json(&chunks, &path).unwrap();
        let raw = std::fs::read_to_string(&path).unwrap();
        assert!(raw.contains("\n    {"));
        assert!(raw.contains("Über straße"));

        assert_eq!(load_chunks_json(&path).unwrap(), chunks);
    }

    #[test]
    fn test_missing_optional_fields_default() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("chunks.json");
        std::fs::write(&path, r#"[{"id": "only-id"}]"#).unwrap();
        let chunks = load_chunks_json(&path).unwrap();
        assert_eq!(chunks, vec![Chunk::new("only-id")]);
    }

    #[test]
    fn test_invalid_metadata_type_rejected() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("chunks.json");
        std::fs::write(&path, r#"[{"id": "x", "metadata": {"titles": ["a"]}}]"#).unwrap();
        assert!(load_chunks_json(&path).is_err());
    }
}
