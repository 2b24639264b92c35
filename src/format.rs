//! Format classification for top-level inputs and container members.

use crate::error::{ParseError, Result, Stage};
use crate::extractor::ExtractorRegistry;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::sync::Arc;

/// Closed set of formats the pipeline distinguishes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FormatTag {
    Pdf,
    Docx,
    Text,
    Zip,
    Edoc,
    Unsupported,
}

impl FormatTag {
    pub fn as_str(&self) -> &'static str {
        match self {
            FormatTag::Pdf => "pdf",
            FormatTag::Docx => "docx",
            FormatTag::Text => "text",
            FormatTag::Zip => "zip",
            FormatTag::Edoc => "edoc",
            FormatTag::Unsupported => "unsupported",
        }
    }

    pub fn is_container(&self) -> bool {
        matches!(self, FormatTag::Zip | FormatTag::Edoc)
    }

    /// Label used inside placeholder segments.
    pub(crate) fn placeholder_label(&self) -> &'static str {
        match self {
            FormatTag::Edoc => "EDOC",
            _ => "ZIP",
        }
    }
}

impl fmt::Display for FormatTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Extensions recognised as signed ASiC-E containers.
const SIGNED_CONTAINER_EXTENSIONS: &[&str] = &["edoc", "asice"];

/// Lowercase extension of a path or archive member name.
pub fn extension_of<P: AsRef<Path>>(path: P) -> Option<String> {
    path.as_ref()
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_lowercase)
}

/// Signed-container sniff. Callers only depend on the yes/no answer, so this
/// can become a structural check without touching dispatch.
pub fn is_signed_container<P: AsRef<Path>>(path: P) -> bool {
    extension_of(path).is_some_and(|ext| SIGNED_CONTAINER_EXTENSIONS.contains(&ext.as_str()))
}

/// Routes inputs and container members to a [`FormatTag`].
#[derive(Clone)]
pub struct FormatDispatcher {
    registry: Arc<ExtractorRegistry>,
}

impl FormatDispatcher {
    pub fn new(registry: Arc<ExtractorRegistry>) -> Self {
        Self { registry }
    }

    /// Classify a top-level input. Unknown extensions are an error here.
    pub fn classify<P: AsRef<Path>>(&self, path: P) -> Result<FormatTag> {
        let path = path.as_ref();

        let metadata =
            std::fs::metadata(path).map_err(|e| ParseError::io(Stage::Classification, path, e))?;
        if !metadata.is_file() {
            return Err(ParseError::io(
                Stage::Classification,
                path,
                std::io::Error::new(std::io::ErrorKind::InvalidInput, "not a regular file"),
            ));
        }

        self.classify_name(path).ok_or_else(|| ParseError::UnsupportedFormat {
            path: path.display().to_string(),
            extension: extension_of(path).unwrap_or_default(),
        })
    }

    /// Classify by name only, without touching the filesystem.
    pub fn classify_name<P: AsRef<Path>>(&self, path: P) -> Option<FormatTag> {
        let path = path.as_ref();

        if is_signed_container(path) {
            return Some(FormatTag::Edoc);
        }

        let extension = extension_of(path)?;
        if extension == "zip" {
            return Some(FormatTag::Zip);
        }

        self.registry.format_for_extension(&extension)
    }

    /// Classify a member found inside a container. Nested containers are
    /// never expanded, so anything that is not a leaf is `Unsupported`.
    pub fn classify_member(&self, name: &str) -> FormatTag {
        extension_of(name)
            .and_then(|ext| self.registry.format_for_extension(&ext))
            .unwrap_or(FormatTag::Unsupported)
    }

    pub fn registry(&self) -> &ExtractorRegistry {
        &self.registry
    }

    /// Every extension accepted as a top-level input, sorted.
    pub fn supported_extensions(&self) -> Vec<String> {
        let mut extensions = self.registry.extensions();
        extensions.push("zip".to_string());
        extensions.extend(SIGNED_CONTAINER_EXTENSIONS.iter().map(|e| e.to_string()));
        extensions.sort();
        extensions.dedup();
        extensions
    }
}
