//! Plain text and RTF extractor.

use crate::error::{ParseError, Result, Stage};
use crate::extractor::LeafExtractor;
use crate::format::FormatTag;
use std::path::Path;

/// Reads text-like files with lossy UTF-8 decoding.
///
/// RTF markup is passed through unchanged; only the byte decoding is lenient.
pub struct TextExtractor;

impl TextExtractor {
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl Default for TextExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl LeafExtractor for TextExtractor {
    fn format(&self) -> FormatTag {
        FormatTag::Text
    }

    fn extensions(&self) -> &[&str] {
        &["txt", "rtf"]
    }

    fn extract(&self, path: &Path) -> Result<String> {
        let bytes = std::fs::read(path).map_err(|e| ParseError::io(Stage::LeafDecode, path, e))?;
        Ok(decode_lossy(bytes))
    }
}

/// Decode UTF-8, replacing invalid sequences with U+FFFD.
fn decode_lossy(bytes: Vec<u8>) -> String {
    match String::from_utf8(bytes) {
        Ok(text) => text,
        Err(err) => String::from_utf8_lossy(err.as_bytes()).into_owned(),
    }
}
