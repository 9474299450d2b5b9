//! Outlook message (.msg) extraction

use std::fs::File;
use std::io::{Read, Seek};
use std::path::Path;

use crate::error::{Error, Result};
use crate::loader::registry::ChunkExtractor;
use crate::loader::text::confluence_id;
use crate::types::Chunk;

const SUBJECT_TAG: &str = "0037";
const BODY_TAG: &str = "1000";
/// PT_UNICODE (UTF-16LE)
const UNICODE_SUFFIX: &str = "001F";
/// PT_STRING8
const STRING8_SUFFIX: &str = "001E";

/// Extracts subject and plain-text body from a compound-file message
#[derive(Debug, Clone, Copy, Default)]
pub struct MsgExtractor;

/// Subject and body read from a message's property streams
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MessageText {
    pub subject: String,
    pub body: String,
}

impl MessageText {
    pub fn read<F: Read + Seek>(file: &mut cfb::CompoundFile<F>) -> Self {
        Self {
            subject: read_string_property(file, SUBJECT_TAG),
            body: read_string_property(file, BODY_TAG),
        }
    }

    pub fn to_content(&self) -> String {
        format!("# {}\n{}", self.subject, self.body)
    }
}

/// Read a top-level string property, empty when absent or unreadable
fn read_string_property<F: Read + Seek>(file: &mut cfb::CompoundFile<F>, tag: &str) -> String {
    for suffix in [UNICODE_SUFFIX, STRING8_SUFFIX] {
        let stream = format!("/__substg1.0_{}{}", tag, suffix);
        if !file.is_stream(&stream) {
            continue;
        }

        let mut buf = Vec::new();
        match file.open_stream(&stream).and_then(|mut s| s.read_to_end(&mut buf)) {
            Ok(_) => {
                let text = if suffix == UNICODE_SUFFIX {
                    decode_utf16le(&buf)
                } else {
                    String::from_utf8_lossy(&buf).into_owned()
                };
                return text.trim_end_matches('\0').to_string();
            }
            Err(e) => tracing::warn!("Failed to read stream {}: {}", stream, e),
        }
    }
    String::new()
}

/// Lossy UTF-16LE decode; an odd trailing byte is dropped
fn decode_utf16le(bytes: &[u8]) -> String {
    let units: Vec<u16> = bytes
        .chunks_exact(2)
        .map(|pair| u16::from_le_bytes([pair[0], pair[1]]))
        .collect();
    String::from_utf16_lossy(&units)
}

impl ChunkExtractor for MsgExtractor {
    fn extract(&self, path: &Path) -> Result<Option<Vec<Chunk>>> {
        tracing::info!("Loading msg file: {}", path.display());
        let mut file = cfb::CompoundFile::open(File::open(path)?).map_err(|e| {
            Error::file_parse(path.display().to_string(), format!("not a compound file: {}", e))
        })?;
        let message = MessageText::read(&mut file);

        let mut chunk = Chunk::generate().with_content(message.to_content());
        // Message-level id, independent of the chunk id
        chunk.set("ID", uuid::Uuid::new_v4().to_string());
        chunk.set("subject", message.subject.as_str());
        chunk.set("sender", "");
        chunk.set("date", "");
        chunk.set("source", path.display().to_string());
        chunk.set("confluence_id", confluence_id(path));

        Ok(Some(vec![chunk]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::tempdir;

    fn utf16(text: &str) -> Vec<u8> {
        text.encode_utf16().flat_map(u16::to_le_bytes).collect()
    }

    fn write_msg(path: &Path, streams: &[(&str, Vec<u8>)]) {
        let mut file = cfb::create(path).unwrap();
        for (name, data) in streams {
            let mut stream = file.create_stream(name).unwrap();
            stream.write_all(data).unwrap();
        }
        file.flush().unwrap();
    }

    #[test]
    fn test_extract_unicode_message() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("status.msg");
        write_msg(
            &path,
            &[
                ("/__substg1.0_0037001F", utf16("Weekly status")),
                ("/__substg1.0_1000001F", utf16("All systems nominal.\r\nNo incidents.\0")),
            ],
        );

        let chunks = MsgExtractor.extract(&path).unwrap().unwrap();
        assert_eq!(chunks.len(), 1);

        let chunk = &chunks[0];
        assert_eq!(chunk.content, "# Weekly status\nAll systems nominal.\r\nNo incidents.");
        assert_eq!(chunk.get("subject").unwrap().to_string(), "Weekly status");
        assert_eq!(chunk.get("sender").unwrap().to_string(), "");
        assert_eq!(chunk.get("date").unwrap().to_string(), "");
        assert_eq!(chunk.source(), path.display().to_string());

        let message_id = chunk.get("ID").unwrap().to_string();
        assert!(!message_id.is_empty());
        assert_ne!(message_id, chunk.id);
    }

    #[test]
    fn test_string8_body_is_decoded_lossily() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("legacy.msg");
        write_msg(
            &path,
            &[
                ("/__substg1.0_0037001E", b"Legacy".to_vec()),
                ("/__substg1.0_1000001E", b"caf\xe9 menu".to_vec()),
            ],
        );

        let chunk = &MsgExtractor.extract(&path).unwrap().unwrap()[0];
        assert_eq!(chunk.content, "# Legacy\ncaf\u{fffd} menu");
    }

    #[test]
    fn test_missing_properties_are_empty() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("blank.msg");
        write_msg(&path, &[]);

        let chunk = &MsgExtractor.extract(&path).unwrap().unwrap()[0];
        assert_eq!(chunk.content, "# \n");
        assert_eq!(chunk.get("subject").unwrap().to_string(), "");
    }

    #[test]
    fn test_not_a_compound_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("fake.msg");
        std::fs::write(&path, b"From: nobody").unwrap();
        assert!(MsgExtractor.extract(&path).is_err());
    }

    #[test]
    fn test_decode_utf16le() {
        assert_eq!(decode_utf16le(&utf16("h\u{e9}llo")), "h\u{e9}llo");
        assert_eq!(decode_utf16le(&[0x41, 0x00, 0x42]), "A");
    }
}
