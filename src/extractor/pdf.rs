//! PDF text extractor.
//!
//! Uses lopdf to decode the document and extract text page by page.

use crate::error::{ParseError, Result};
use crate::extractor::LeafExtractor;
use crate::format::FormatTag;
use lopdf::Document;
use std::path::Path;
use tracing::debug;

/// Extractor for PDF files.
pub struct PdfExtractor;

impl PdfExtractor {
    /// Create a new PDF extractor.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl Default for PdfExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl LeafExtractor for PdfExtractor {
    fn format(&self) -> FormatTag {
        FormatTag::Pdf
    }

    fn extensions(&self) -> &[&str] {
        &["pdf"]
    }

    fn extract(&self, path: &Path) -> Result<String> {
        debug!("Extracting PDF: {:?}", path);

        let document =
            Document::load(path).map_err(|e| ParseError::extraction(FormatTag::Pdf, path, e))?;

        Ok(extract_pages(&document).join("\n"))
    }
}

/// One text segment per page, in page order.
///
/// Pages without a decodable text layer (scans, broken content streams)
/// contribute an empty segment instead of failing the document.
fn extract_pages(document: &Document) -> Vec<String> {
    let pages = document.get_pages();
    let mut segments = Vec::with_capacity(pages.len());

    for page_number in pages.keys() {
        match document.extract_text(&[*page_number]) {
            Ok(text) => segments.push(text),
            Err(e) => {
                debug!("No text extracted from page {}: {}", page_number, e);
                segments.push(String::new());
            }
        }
    }

    debug!("Extracted text from {} PDF pages", segments.len());
    segments
}
