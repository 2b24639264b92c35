//! Leaf extractors: format-specific decoders that turn one regular file into text.

pub mod docx;
pub mod pdf;
pub mod registry;
pub mod text;

pub use docx::DocxExtractor;
pub use pdf::PdfExtractor;
pub use registry::ExtractorRegistry;
pub use text::TextExtractor;

use crate::error::Result;
use crate::format::FormatTag;
use std::path::Path;

/// A decoder for a single non-container document.
pub trait LeafExtractor: Send + Sync {
    /// Format produced by this extractor.
    fn format(&self) -> FormatTag;

    /// Lowercase file extensions routed to this extractor.
    fn extensions(&self) -> &[&str];

    /// Extract the full text of the file at `path`.
    fn extract(&self, path: &Path) -> Result<String>;
}
