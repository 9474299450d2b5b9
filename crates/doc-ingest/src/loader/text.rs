//! Text helpers shared by the format extractors

use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use std::path::Path;
use unicode_segmentation::UnicodeSegmentation;

static CONFLUENCE_ATTACHMENT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"attahments/(\d+)/").expect("Invalid regex"));

/// Bullet glyphs stripped from the start of list items
const BULLETS: &[char] = &[
    '\u{2022}', '\u{25CF}', '\u{25CB}', '\u{25E6}', '\u{25AA}', '\u{25AB}', '\u{2023}',
    '\u{2043}', '\u{204C}', '\u{204D}', '\u{2219}', '\u{00B7}', '\u{25A0}', '\u{25A1}',
    '\u{27A2}', '\u{2713}', '\u{F0B7}', '*', '-', 'o',
];

/// Split text into trimmed, non-empty sentences
pub fn split_sentences(text: &str) -> Vec<String> {
    text.split_sentence_bounds()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Sentence-segment text and join the sentences with `separator`
pub fn segment(text: &str, separator: &str) -> String {
    split_sentences(text).join(separator)
}

/// Render rows of cell text as tab-separated lines
///
/// Empty cells are skipped and rows left empty are dropped.
pub fn render_table(rows: &[Vec<String>]) -> String {
    rows.iter()
        .filter_map(|row| {
            let cells: Vec<&str> = row
                .iter()
                .map(|c| c.trim())
                .filter(|c| !c.is_empty())
                .collect();
            if cells.is_empty() {
                None
            } else {
                Some(cells.join("\t"))
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Numeric document id from an `attahments/<digits>/` path segment, else empty
pub fn confluence_id(path: &Path) -> String {
    let normalized = path.to_string_lossy().replace('\\', "/");
    CONFLUENCE_ATTACHMENT
        .captures(&normalized)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
        .unwrap_or_default()
}

/// Strip a leading bullet marker from a list item
pub fn clean_bullets(text: &str) -> String {
    let trimmed = text.trim_start();
    let mut chars = trimmed.chars();
    match chars.next() {
        // 'o' only counts as a bullet when followed by whitespace
        Some(c) if BULLETS.contains(&c) => {
            let rest = chars.as_str();
            if c.is_ascii_alphanumeric() && !rest.starts_with(char::is_whitespace) {
                trimmed.trim().to_string()
            } else {
                rest.trim().to_string()
            }
        }
        _ => trimmed.trim().to_string(),
    }
}

/// Document timestamp in `YYYY-MM-DD HH:MM:SS`
pub fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.format("%Y-%m-%d %H:%M:%S").to_string()
}

/// Parse a W3CDTF timestamp from OOXML core properties
pub fn parse_w3c_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .ok()
        .or_else(|| {
            chrono::NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S")
                .ok()
                .map(|n| n.and_utc())
        })
}

/// Final path component as a string
pub fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Final path component without its extension
pub fn file_stem(path: &Path) -> String {
    path.file_stem()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}
