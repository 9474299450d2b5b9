//! Binary snapshot encoding

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs;
use std::path::Path;

use crate::error::{Error, Result};
use crate::types::Chunk;

fn encode<T: Serialize>(value: &T) -> Result<Vec<u8>> {
    bincode::serde::encode_to_vec(value, bincode::config::standard())
        .map_err(|e| Error::Snapshot(e.to_string()))
}

fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T> {
    let (value, _) = bincode::serde::decode_from_slice(bytes, bincode::config::standard())
        .map_err(|e| Error::Snapshot(e.to_string()))?;
    Ok(value)
}

/// Write one chunk as a binary snapshot
pub fn save_chunk(chunk: &Chunk, path: impl AsRef<Path>) -> Result<()> {
    fs::write(path, encode(chunk)?)?;
    Ok(())
}

/// Read one chunk from a binary snapshot
pub fn load_chunk(path: impl AsRef<Path>) -> Result<Chunk> {
    decode(&fs::read(path)?)
}

/// Write an ordered list of chunks as a binary snapshot
pub fn save_chunks(chunks: &[Chunk], path: impl AsRef<Path>) -> Result<()> {
    fs::write(path, encode(&chunks)?)?;
    Ok(())
}

/// Read an ordered list of chunks from a binary snapshot
pub fn load_chunks(path: impl AsRef<Path>) -> Result<Vec<Chunk>> {
    decode(&fs::read(path)?)
}
