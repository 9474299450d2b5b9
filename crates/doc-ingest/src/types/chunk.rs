//! Chunk type: the uniform unit of extracted content

use serde::de::{self, Deserializer, Visitor};
use serde::ser::Serializer;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::fmt;
use uuid::Uuid;

use crate::error::{Error, Result};

/// Chunk metadata: string keys to flat string or non-negative integer values
pub type Metadata = BTreeMap<String, MetadataValue>;

/// A single metadata value
///
/// Containers are never stored; list-valued fields are flattened to a
/// joined string by the extractor before assignment.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum MetadataValue {
    /// UTF-8 text
    Text(String),
    /// Non-negative integer (page and slide numbers)
    Count(u64),
}

impl MetadataValue {
    /// Flatten a list of strings into a single text value
    pub fn joined<I, S>(items: I, separator: &str) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let parts: Vec<String> = items.into_iter().map(|s| s.as_ref().to_string()).collect();
        Self::Text(parts.join(separator))
    }

    /// Convert a JSON value, rejecting anything but strings and non-negative integers
    pub fn from_json(key: &str, value: &serde_json::Value) -> Result<Self> {
        match value {
            serde_json::Value::String(s) => Ok(Self::Text(s.clone())),
            serde_json::Value::Number(n) => n.as_u64().map(Self::Count).ok_or_else(|| {
                Error::invalid_metadata(key, format!("{} is not a non-negative integer", n))
            }),
            other => Err(Error::invalid_metadata(
                key,
                format!("unsupported value type: {}", other),
            )),
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            Self::Count(_) => None,
        }
    }

    pub fn as_u64(&self) -> Option<u64> {
        match self {
            Self::Text(_) => None,
            Self::Count(n) => Some(*n),
        }
    }
}

impl fmt::Display for MetadataValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(s) => f.write_str(s),
            Self::Count(n) => write!(f, "{}", n),
        }
    }
}

impl From<String> for MetadataValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<&str> for MetadataValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<&String> for MetadataValue {
    fn from(value: &String) -> Self {
        Self::Text(value.clone())
    }
}

impl From<u64> for MetadataValue {
    fn from(value: u64) -> Self {
        Self::Count(value)
    }
}

impl From<u32> for MetadataValue {
    fn from(value: u32) -> Self {
        Self::Count(u64::from(value))
    }
}

impl From<usize> for MetadataValue {
    fn from(value: usize) -> Self {
        Self::Count(value as u64)
    }
}

impl TryFrom<i64> for MetadataValue {
    type Error = Error;

    fn try_from(value: i64) -> Result<Self> {
        u64::try_from(value)
            .map(Self::Count)
            .map_err(|_| Error::invalid_metadata("<integer>", format!("{} is negative", value)))
    }
}

/// Tagged form used by binary (non self-describing) formats
#[derive(Serialize)]
enum TaggedRef<'a> {
    Text(&'a str),
    Count(u64),
}

#[derive(Deserialize)]
enum Tagged {
    Text(String),
    Count(u64),
}

impl Serialize for MetadataValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        if serializer.is_human_readable() {
            match self {
                Self::Text(s) => serializer.serialize_str(s),
                Self::Count(n) => serializer.serialize_u64(*n),
            }
        } else {
            match self {
                Self::Text(s) => TaggedRef::Text(s).serialize(serializer),
                Self::Count(n) => TaggedRef::Count(*n).serialize(serializer),
            }
        }
    }
}

struct MetadataValueVisitor;

impl<'de> Visitor<'de> for MetadataValueVisitor {
    type Value = MetadataValue;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a string or a non-negative integer")
    }

    fn visit_str<E: de::Error>(self, v: &str) -> std::result::Result<Self::Value, E> {
        Ok(MetadataValue::Text(v.to_string()))
    }

    fn visit_string<E: de::Error>(self, v: String) -> std::result::Result<Self::Value, E> {
        Ok(MetadataValue::Text(v))
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> std::result::Result<Self::Value, E> {
        Ok(MetadataValue::Count(v))
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> std::result::Result<Self::Value, E> {
        u64::try_from(v)
            .map(MetadataValue::Count)
            .map_err(|_| E::invalid_value(de::Unexpected::Signed(v), &self))
    }
}

impl<'de> Deserialize<'de> for MetadataValue {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        if deserializer.is_human_readable() {
            deserializer.deserialize_any(MetadataValueVisitor)
        } else {
            Ok(match Tagged::deserialize(deserializer)? {
                Tagged::Text(s) => MetadataValue::Text(s),
                Tagged::Count(n) => MetadataValue::Count(n),
            })
        }
    }
}

/// A chunk of extracted content with provenance metadata
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    /// Opaque unique identifier
    pub id: String,
    /// Text body, possibly carrying inline structural markup
    #[serde(default)]
    pub content: String,
    /// Extractor-defined metadata
    #[serde(default)]
    pub metadata: Metadata,
}

impl Chunk {
    /// Create an empty chunk with the given id
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            content: String::new(),
            metadata: Metadata::new(),
        }
    }

    /// Create a chunk with a freshly generated id
    pub fn generate() -> Self {
        Self::new(generate_unique_id(None))
    }

    pub fn with_content(mut self, content: impl Into<String>) -> Self {
        self.content = content.into();
        self
    }

    pub fn with_metadata(mut self, metadata: Metadata) -> Self {
        self.metadata = metadata;
        self
    }

    /// Build a chunk from JSON metadata, validating every value
    pub fn from_json_metadata(
        id: impl Into<String>,
        content: impl Into<String>,
        metadata: &serde_json::Map<String, serde_json::Value>,
    ) -> Result<Self> {
        let mut converted = Metadata::new();
        for (key, value) in metadata {
            converted.insert(key.clone(), MetadataValue::from_json(key, value)?);
        }
        Ok(Self::new(id).with_content(content).with_metadata(converted))
    }

    /// Set a metadata field
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<MetadataValue>) {
        self.metadata.insert(key.into(), value.into());
    }

    /// Get a metadata field
    pub fn get(&self, key: &str) -> Option<&MetadataValue> {
        self.metadata.get(key)
    }

    /// The `source` label, empty when unset
    pub fn source(&self) -> String {
        self.metadata
            .get("source")
            .map(|v| v.to_string())
            .unwrap_or_default()
    }
}

/// Generate a random id not present in the issued set
pub fn generate_unique_id(issued: Option<&HashSet<String>>) -> String {
    loop {
        let id = Uuid::new_v4().to_string();
        match issued {
            Some(existing) if existing.contains(&id) => continue,
            _ => return id,
        }
    }
}
