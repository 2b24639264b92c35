//! DOCX paragraph extractor.
//!
//! Reads `word/document.xml` from the package and collects the text of each
//! body-level paragraph in document order. Tables, headers, footers, text
//! boxes and embedded objects are not visited.

use crate::error::{ParseError, Result, Stage};
use crate::extractor::LeafExtractor;
use crate::format::FormatTag;
use quick_xml::events::Event;
use quick_xml::Reader;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use tracing::debug;

const DOCUMENT_PART: &str = "word/document.xml";

/// Extractor for Office Open XML word processing documents.
pub struct DocxExtractor {
    max_part_size: u64,
}

impl DocxExtractor {
    /// `max_part_size` caps the decompressed size of the main document part.
    #[must_use]
    pub fn new(max_part_size: u64) -> Self {
        Self { max_part_size }
    }

    fn read_document_part(&self, path: &Path) -> Result<String> {
        let file = File::open(path).map_err(|e| ParseError::io(Stage::LeafDecode, path, e))?;
        let mut archive = zip::ZipArchive::new(file)
            .map_err(|e| ParseError::extraction(FormatTag::Docx, path, e))?;
        let part = archive
            .by_name(DOCUMENT_PART)
            .map_err(|e| ParseError::extraction(FormatTag::Docx, path, e))?;

        let mut bytes = Vec::new();
        part.take(self.max_part_size + 1)
            .read_to_end(&mut bytes)
            .map_err(|e| ParseError::extraction(FormatTag::Docx, path, e))?;

        if bytes.len() as u64 > self.max_part_size {
            return Err(ParseError::extraction(
                FormatTag::Docx,
                path,
                format!("{} is larger than {} bytes", DOCUMENT_PART, self.max_part_size),
            ));
        }

        String::from_utf8(bytes).map_err(|e| ParseError::extraction(FormatTag::Docx, path, e))
    }
}

impl LeafExtractor for DocxExtractor {
    fn format(&self) -> FormatTag {
        FormatTag::Docx
    }

    fn extensions(&self) -> &[&str] {
        &["docx"]
    }

    fn extract(&self, path: &Path) -> Result<String> {
        debug!("Extracting DOCX: {:?}", path);

        let xml = self.read_document_part(path)?;
        let paragraphs =
            body_paragraphs(&xml).map_err(|e| ParseError::extraction(FormatTag::Docx, path, e))?;

        debug!("Extracted {} DOCX paragraphs", paragraphs.len());
        Ok(paragraphs.join("\n"))
    }
}

/// Paragraph currently being collected.
struct OpenParagraph {
    depth: usize,
    text: String,
    nested: usize,
    in_run: bool,
}

impl OpenParagraph {
    /// Run content of this paragraph, excluding nested paragraphs and
    /// paragraph properties such as tab stop definitions.
    fn run_text(&mut self) -> Option<&mut String> {
        (self.nested == 0 && self.in_run).then_some(&mut self.text)
    }
}

/// Page and column breaks carry no text; only line breaks do.
fn is_line_break(element: &quick_xml::events::BytesStart<'_>) -> bool {
    element
        .attributes()
        .flatten()
        .find(|attr| attr.key.as_ref() == b"w:type")
        .map_or(true, |attr| attr.value.as_ref() == b"textWrapping")
}

/// Text of every `w:p` that is a direct child of `w:body`.
fn body_paragraphs(xml: &str) -> std::result::Result<Vec<String>, quick_xml::Error> {
    let mut reader = Reader::from_str(xml);
    let mut paragraphs = Vec::new();
    let mut depth = 0usize;
    let mut body_depth: Option<usize> = None;
    let mut current: Option<OpenParagraph> = None;
    let mut in_text = false;

    loop {
        match reader.read_event()? {
            Event::Start(element) => {
                depth += 1;
                match element.name().as_ref() {
                    b"w:body" => body_depth = Some(depth),
                    b"w:p" => match current.as_mut() {
                        Some(open) => open.nested += 1,
                        None if body_depth == Some(depth - 1) => {
                            current = Some(OpenParagraph {
                                depth,
                                text: String::new(),
                                nested: 0,
                                in_run: false,
                            });
                        }
                        None => {}
                    },
                    b"w:r" => {
                        if let Some(open) = current.as_mut().filter(|open| open.nested == 0) {
                            open.in_run = true;
                        }
                    }
                    b"w:t" => {
                        in_text = current.as_ref().is_some_and(|open| open.nested == 0);
                    }
                    _ => {}
                }
            }
            Event::Empty(element) => match element.name().as_ref() {
                b"w:p" => {
                    if current.is_none() && body_depth == Some(depth) {
                        paragraphs.push(String::new());
                    }
                }
                b"w:tab" => {
                    if let Some(text) = current.as_mut().and_then(OpenParagraph::run_text) {
                        text.push('\t');
                    }
                }
                b"w:cr" => {
                    if let Some(text) = current.as_mut().and_then(OpenParagraph::run_text) {
                        text.push('\n');
                    }
                }
                b"w:br" if is_line_break(&element) => {
                    if let Some(text) = current.as_mut().and_then(OpenParagraph::run_text) {
                        text.push('\n');
                    }
                }
                _ => {}
            },
            Event::Text(text) if in_text => {
                if let Some(open) = current.as_mut() {
                    open.text.push_str(&text.unescape()?);
                }
            }
            Event::End(element) => {
                match element.name().as_ref() {
                    b"w:t" => in_text = false,
                    b"w:r" => {
                        if let Some(open) = current.as_mut().filter(|open| open.nested == 0) {
                            open.in_run = false;
                        }
                    }
                    b"w:p" => {
                        let closes_body_paragraph =
                            current.as_ref().is_some_and(|open| open.depth == depth);
                        if closes_body_paragraph {
                            if let Some(done) = current.take() {
                                paragraphs.push(done.text);
                            }
                        } else if let Some(open) = current.as_mut() {
                            open.nested = open.nested.saturating_sub(1);
                        }
                    }
                    b"w:body" => body_depth = None,
                    _ => {}
                }
                depth = depth.saturating_sub(1);
            }
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(paragraphs)
}
