//! Extractor registry mapping formats and extensions to leaf extractors.

use crate::error::{ParseError, Result};
use crate::extractor::{DocxExtractor, LeafExtractor, PdfExtractor, TextExtractor};
use crate::format::FormatTag;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

/// Registry of leaf extractors.
pub struct ExtractorRegistry {
    /// Extractor per format
    extractors: HashMap<FormatTag, Arc<dyn LeafExtractor>>,
    /// Extension to format mapping
    extension_mapping: HashMap<String, FormatTag>,
}

impl ExtractorRegistry {
    /// Create a new empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            extractors: HashMap::new(),
            extension_mapping: HashMap::new(),
        }
    }

    /// Registry with the PDF, DOCX and text extractors.
    #[must_use]
    pub fn with_defaults(max_part_size: u64) -> Self {
        let mut registry = Self::new();
        registry.register(PdfExtractor::new());
        registry.register(DocxExtractor::new(max_part_size));
        registry.register(TextExtractor::new());
        registry
    }

    /// Register an extractor, replacing any previous one for the same format
    /// together with the extensions it claimed.
    pub fn register<E: LeafExtractor + 'static>(&mut self, extractor: E) {
        let extractor = Arc::new(extractor);
        let format = extractor.format();
        if self.extractors.contains_key(&format) {
            self.extension_mapping.retain(|_, mapped| *mapped != format);
        }
        for extension in extractor.extensions() {
            self.extension_mapping
                .insert((*extension).to_string(), format);
        }
        self.extractors.insert(format, extractor);
    }

    #[must_use]
    pub fn get(&self, format: FormatTag) -> Option<Arc<dyn LeafExtractor>> {
        self.extractors.get(&format).cloned()
    }

    #[must_use]
    pub fn format_for_extension(&self, extension: &str) -> Option<FormatTag> {
        self.extension_mapping
            .get(&extension.to_lowercase())
            .copied()
    }

    /// All registered leaf extensions, sorted.
    #[must_use]
    pub fn extensions(&self) -> Vec<String> {
        let mut extensions: Vec<String> = self.extension_mapping.keys().cloned().collect();
        extensions.sort();
        extensions
    }

    /// Extract text from a file with the extractor registered for `format`.
    pub fn extract(&self, path: &Path, format: FormatTag) -> Result<String> {
        let extractor = self.get(format).ok_or_else(|| ParseError::UnsupportedFormat {
            path: path.display().to_string(),
            extension: format.as_str().to_string(),
        })?;

        debug!("Extracting {} with {} extractor", path.display(), format);
        extractor.extract(path)
    }
}

impl Default for ExtractorRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    struct UpperCaseExtractor;

    impl LeafExtractor for UpperCaseExtractor {
        fn format(&self) -> FormatTag {
            FormatTag::Text
        }

        fn extensions(&self) -> &[&str] {
            &["md"]
        }

        fn extract(&self, path: &Path) -> Result<String> {
            let content = std::fs::read_to_string(path)
                .map_err(|e| ParseError::io(crate::error::Stage::LeafDecode, path, e))?;
            Ok(content.to_uppercase())
        }
    }

    #[test]
    fn test_new_registry_is_empty() {
        let registry = ExtractorRegistry::new();
        assert!(registry.extractors.is_empty());
        assert!(registry.extension_mapping.is_empty());
    }

    #[test]
    fn test_defaults_cover_leaf_extensions() {
        let registry = ExtractorRegistry::with_defaults(1024);

        assert_eq!(registry.format_for_extension("pdf"), Some(FormatTag::Pdf));
        assert_eq!(registry.format_for_extension("docx"), Some(FormatTag::Docx));
        assert_eq!(registry.format_for_extension("txt"), Some(FormatTag::Text));
        assert_eq!(registry.format_for_extension("RTF"), Some(FormatTag::Text));
        assert_eq!(registry.format_for_extension("doc"), None);
        assert_eq!(registry.extensions(), vec!["docx", "pdf", "rtf", "txt"]);
    }

    #[test]
    fn test_register_replaces_format_entry() {
        let mut registry = ExtractorRegistry::with_defaults(1024);
        registry.register(UpperCaseExtractor);

        assert_eq!(registry.format_for_extension("md"), Some(FormatTag::Text));
        assert_eq!(registry.format_for_extension("txt"), None);
        assert_eq!(registry.format_for_extension("rtf"), None);
        assert_eq!(registry.format_for_extension("pdf"), Some(FormatTag::Pdf));
        assert_eq!(registry.extensions(), vec!["docx", "md", "pdf"]);

        let temp_dir = tempdir().unwrap();
        let file_path = temp_dir.path().join("notes.md");
        std::fs::write(&file_path, "draft").unwrap();

        let text = registry.extract(&file_path, FormatTag::Text).unwrap();
        assert_eq!(text, "DRAFT");
    }

    #[test]
    fn test_extract_without_extractor() {
        let registry = ExtractorRegistry::new();
        let result = registry.extract(Path::new("/test/file.pdf"), FormatTag::Pdf);

        match result.unwrap_err() {
            ParseError::UnsupportedFormat { extension, .. } => assert_eq!(extension, "pdf"),
            other => panic!("Expected UnsupportedFormat error, got {:?}", other),
        }
    }
}
