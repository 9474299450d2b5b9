//! Chunk persistence formats
//!
//! Three independent encodings of the same schema:
//! - `snapshot`: opaque binary (bincode), single chunk or list
//! - `json`: pretty-printed JSON array
//! - `markdown`: YAML front matter (`id`, `metadata`) followed by raw content

pub mod json;
pub mod markdown;
pub mod snapshot;

pub use json::{load_chunks_json, save_chunks_json, to_json_string};
pub use markdown::{chunk_to_markdown, from_markdown_str, markdown_to_chunk, to_markdown_string};
pub use snapshot::{load_chunk, load_chunks, save_chunk, save_chunks};
