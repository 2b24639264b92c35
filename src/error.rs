use crate::format::FormatTag;
use std::fmt;
use std::path::Path;
use thiserror::Error;

/// Boxed cause attached to leaf decoder failures.
pub type Cause = Box<dyn std::error::Error + Send + Sync>;

#[derive(Error, Debug)]
pub enum ParseError {
    #[error("Unsupported file type '{extension}': {path}")]
    UnsupportedFormat { path: String, extension: String },

    #[error("Invalid {kind} container {path}: {source}")]
    InvalidContainer {
        path: String,
        kind: FormatTag,
        #[source]
        source: zip::result::ZipError,
    },

    #[error("{format} extraction failed for {path}: {source}")]
    ExtractionFailed {
        format: FormatTag,
        path: String,
        #[source]
        source: Cause,
    },

    #[error("IO operation failed during {stage} on {path}: {source}")]
    Io {
        path: String,
        stage: Stage,
        #[source]
        source: std::io::Error,
    },

    #[error("Container {path} exceeds the {limit} limit ({actual} > {max})")]
    ContainerLimitExceeded {
        path: String,
        limit: LimitKind,
        actual: u64,
        max: u64,
    },

    #[error("Member '{member}' of {container}: {source}")]
    Member {
        container: String,
        member: String,
        #[source]
        source: Box<ParseError>,
    },

    #[error("No supported documents found in {path}")]
    NoDocumentsFound { path: String },

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Operation was cancelled by user")]
    Cancelled,
}

/// Which container guard tripped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LimitKind {
    EntryCount,
    EntrySize,
    TotalSize,
    CompressionRatio,
}

impl fmt::Display for LimitKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            LimitKind::EntryCount => "entry count",
            LimitKind::EntrySize => "entry size",
            LimitKind::TotalSize => "total decompressed size",
            LimitKind::CompressionRatio => "compression ratio",
        };
        f.write_str(label)
    }
}

/// Pipeline stage an error was raised in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Classification,
    Unpack,
    LeafDecode,
    Scan,
    Configuration,
    Cancelled,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Classification => "classification",
            Stage::Unpack => "unpack",
            Stage::LeafDecode => "leaf decode",
            Stage::Scan => "scan",
            Stage::Configuration => "configuration",
            Stage::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl ParseError {
    pub fn io<P: AsRef<Path>>(stage: Stage, path: P, source: std::io::Error) -> Self {
        ParseError::Io {
            path: path.as_ref().display().to_string(),
            stage,
            source,
        }
    }

    pub fn extraction<P, E>(format: FormatTag, path: P, cause: E) -> Self
    where
        P: AsRef<Path>,
        E: Into<Cause>,
    {
        ParseError::ExtractionFailed {
            format,
            path: path.as_ref().display().to_string(),
            source: cause.into(),
        }
    }

    pub fn invalid_container<P: AsRef<Path>>(
        kind: FormatTag,
        path: P,
        source: zip::result::ZipError,
    ) -> Self {
        ParseError::InvalidContainer {
            path: path.as_ref().display().to_string(),
            kind,
            source,
        }
    }

    /// Attach container and member names to an error raised while handling a member.
    pub fn in_member(self, container: &str, member: &str) -> Self {
        ParseError::Member {
            container: container.to_string(),
            member: member.to_string(),
            source: Box::new(self),
        }
    }

    /// The innermost error, skipping member context wrappers.
    pub fn root(&self) -> &ParseError {
        match self {
            ParseError::Member { source, .. } => source.root(),
            other => other,
        }
    }

    pub fn stage(&self) -> Stage {
        match self {
            ParseError::UnsupportedFormat { .. } => Stage::Classification,
            ParseError::InvalidContainer { .. } | ParseError::ContainerLimitExceeded { .. } => {
                Stage::Unpack
            }
            ParseError::ExtractionFailed { .. } => Stage::LeafDecode,
            ParseError::Io { stage, .. } => *stage,
            ParseError::Member { source, .. } => source.stage(),
            ParseError::NoDocumentsFound { .. } => Stage::Scan,
            ParseError::Config { .. } => Stage::Configuration,
            ParseError::Cancelled => Stage::Cancelled,
        }
    }

    pub fn exit_code(&self) -> i32 {
        match self.root() {
            ParseError::UnsupportedFormat { .. } => 2,
            ParseError::InvalidContainer { .. } => 3,
            ParseError::ExtractionFailed { .. } => 4,
            ParseError::ContainerLimitExceeded { .. } => 5,
            ParseError::Io { .. } => 6,
            ParseError::NoDocumentsFound { .. } => 7,
            ParseError::Config { .. } => 8,
            ParseError::Cancelled => 130,
            ParseError::Member { .. } => 1,
        }
    }
}

pub trait UserFriendlyError {
    fn user_message(&self) -> String;
    fn suggestion(&self) -> Option<String>;
}

impl UserFriendlyError for ParseError {
    fn user_message(&self) -> String {
        match self {
            ParseError::UnsupportedFormat { path, extension } => {
                if extension.is_empty() {
                    format!("Cannot determine the document type of {}", path)
                } else {
                    format!("Unsupported document type '.{}': {}", extension, path)
                }
            }
            ParseError::InvalidContainer { path, kind, .. } => {
                format!("{} is not a valid {} container", path, kind.as_str().to_uppercase())
            }
            ParseError::ExtractionFailed { format, path, source } => {
                format!(
                    "Could not read {} document {}: {}",
                    format.as_str().to_uppercase(),
                    path,
                    source
                )
            }
            ParseError::Io { path, source, .. } => {
                format!("Cannot access {}: {}", path, source)
            }
            ParseError::ContainerLimitExceeded {
                path,
                limit,
                actual,
                max,
            } => match limit {
                LimitKind::EntryCount => format!(
                    "Container {} has too many entries: {} (maximum allowed: {})",
                    path, actual, max
                ),
                LimitKind::CompressionRatio => format!(
                    "Container {} has a suspicious compression ratio: {}:1 (maximum allowed: {}:1)",
                    path, actual, max
                ),
                _ => format!(
                    "Container {} exceeds the {} limit: {} (maximum allowed: {})",
                    path,
                    limit,
                    format_bytes(*actual),
                    format_bytes(*max)
                ),
            },
            ParseError::Member {
                container,
                member,
                source,
            } => {
                format!("{} (member '{}' of {})", source.user_message(), member, container)
            }
            ParseError::NoDocumentsFound { path } => {
                format!("No supported documents found in {}", path)
            }
            ParseError::Config { message } => {
                format!("Configuration error: {}", message)
            }
            ParseError::Cancelled => "Operation was cancelled by user".to_string(),
        }
    }

    fn suggestion(&self) -> Option<String> {
        match self {
            ParseError::UnsupportedFormat { .. } => Some(
                "Supported inputs are .pdf, .docx, .txt, .rtf, .zip and .edoc files.".to_string()
            ),
            ParseError::InvalidContainer { .. } => Some(
                "The archive is corrupt or truncated. Re-download the file and try again.".to_string()
            ),
            ParseError::ExtractionFailed { format: FormatTag::Pdf, .. } => Some(
                "The PDF may be damaged or encrypted. Try re-saving it with a PDF viewer.".to_string()
            ),
            ParseError::ExtractionFailed { format: FormatTag::Docx, .. } => Some(
                "The DOCX package may be damaged. Try re-saving it from a word processor.".to_string()
            ),
            ParseError::ContainerLimitExceeded { .. } => Some(
                "Raise the limits in the [limits] section of the configuration or with --max-entries / --max-total-size if the archive is trusted.".to_string()
            ),
            ParseError::Io { .. } => Some(
                "Ensure the file exists and you have the necessary read permissions.".to_string()
            ),
            ParseError::NoDocumentsFound { .. } => Some(
                "Check the directory contents and the [scan] exclude settings.".to_string()
            ),
            ParseError::Config { .. } => Some(
                "Check your configuration file syntax and ensure all required fields are present.".to_string()
            ),
            ParseError::Member { source, .. } => source.suggestion(),
            _ => None,
        }
    }
}

impl From<toml::de::Error> for ParseError {
    fn from(error: toml::de::Error) -> Self {
        ParseError::Config {
            message: error.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, ParseError>;

pub(crate) fn format_bytes(bytes: u64) -> String {
    const UNITS: &[&str] = &["B", "KB", "MB", "GB"];
    let mut size = bytes as f64;
    let mut unit_index = 0;

    while size >= 1024.0 && unit_index < UNITS.len() - 1 {
        size /= 1024.0;
        unit_index += 1;
    }

    if unit_index == 0 {
        format!("{} {}", bytes, UNITS[unit_index])
    } else {
        format!("{:.1} {}", size, UNITS[unit_index])
    }
}
