//! Public extraction entry point.
//!
//! [`DocumentParser`] classifies an input, runs it through a leaf extractor
//! or a container unpacker, and assembles an [`ExtractionResult`].

use crate::config::Config;
use crate::container::{
    self, ContainerEntry, ContainerUnpacker, EdocUnpacker, MemberOutcome, UnpackedMember,
    WorkArea, ZipUnpacker,
};
use crate::error::{ParseError, Result};
use crate::extractor::ExtractorRegistry;
use crate::format::{FormatDispatcher, FormatTag};
use crate::ui::signals::CancelToken;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Joins the texts of consecutive container members.
pub const MEMBER_SEPARATOR: &str = "\n\n-----\n\n";

/// Chunks are the blank-line separated segments of the text.
const CHUNK_BOUNDARY: &str = "\n\n";

/// Structured output of one extraction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractionResult {
    /// File name of the top-level input.
    pub filename: String,
    pub text: String,
    /// Non-empty segments of `text`, in order.
    pub chunks: Vec<String>,
    #[serde(rename = "type")]
    pub format: FormatTag,
    /// Per-member outcomes, for containers only.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub members: Vec<MemberReport>,
}

impl ExtractionResult {
    fn new(filename: String, text: String, format: FormatTag, members: Vec<MemberReport>) -> Self {
        let chunks = split_chunks(&text);
        Self {
            filename,
            text,
            chunks,
            format,
            members,
        }
    }
}

/// How a container member contributed to the text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MemberStatus {
    Extracted,
    Unsupported,
    Corrupt,
    Unreadable,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemberReport {
    pub name: String,
    pub format: FormatTag,
    pub status: MemberStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

/// Split text on blank-line boundaries, dropping empty segments.
pub fn split_chunks(text: &str) -> Vec<String> {
    text.split(CHUNK_BOUNDARY)
        .filter(|segment| !segment.is_empty())
        .map(str::to_string)
        .collect()
}

fn unsupported_placeholder(container: FormatTag, name: &str) -> String {
    format!("[UNSUPPORTED {} ITEM: {}]", container.placeholder_label(), name)
}

fn unreadable_placeholder(container: FormatTag, name: &str) -> String {
    format!("[UNREADABLE {} ITEM: {}]", container.placeholder_label(), name)
}

/// Extracts normalized text from documents and containers.
///
/// Every call owns its scratch area, so one parser can be shared across threads.
pub struct DocumentParser {
    dispatcher: FormatDispatcher,
    zip: ZipUnpacker,
    edoc: EdocUnpacker,
    scratch_root: Option<PathBuf>,
    cancel: CancelToken,
    #[cfg(feature = "parallel")]
    pool: Option<rayon::ThreadPool>,
}

impl DocumentParser {
    /// Parser configured from the `[limits]` and `[extraction]` sections.
    pub fn new(config: &Config) -> Result<Self> {
        let limits = config.limits.clone();
        let registry = ExtractorRegistry::with_defaults(limits.max_entry_size);

        #[cfg(feature = "parallel")]
        let pool = Some(
            rayon::ThreadPoolBuilder::new()
                .num_threads(config.extraction.workers)
                .thread_name(|index| format!("tenderdocs-member-{}", index))
                .build()
                .map_err(|e| ParseError::Config {
                    message: format!("Failed to build worker pool: {}", e),
                })?,
        );

        Ok(Self {
            dispatcher: FormatDispatcher::new(Arc::new(registry)),
            zip: ZipUnpacker::new(limits.clone()),
            edoc: EdocUnpacker::new(limits),
            scratch_root: config.extraction.scratch_dir.clone(),
            cancel: CancelToken::new(),
            #[cfg(feature = "parallel")]
            pool,
        })
    }

    /// Parser with the default limits and the system temporary directory.
    pub fn with_defaults() -> Self {
        let limits = crate::container::ContainerLimits::default();
        let registry = ExtractorRegistry::with_defaults(limits.max_entry_size);
        Self {
            dispatcher: FormatDispatcher::new(Arc::new(registry)),
            zip: ZipUnpacker::new(limits.clone()),
            edoc: EdocUnpacker::new(limits),
            scratch_root: None,
            cancel: CancelToken::new(),
            #[cfg(feature = "parallel")]
            pool: None,
        }
    }

    /// Stop rendering container members once `token` is cancelled.
    pub fn with_cancellation(mut self, token: CancelToken) -> Self {
        self.cancel = token;
        self
    }

    pub fn dispatcher(&self) -> &FormatDispatcher {
        &self.dispatcher
    }

    /// Extract `path`, creating and removing a work area when it is a container.
    pub fn extract<P: AsRef<Path>>(&self, path: P) -> Result<ExtractionResult> {
        let path = path.as_ref();
        let format = self.dispatcher.classify(path)?;

        if !format.is_container() {
            return self.finish(path, format, Vec::new(), Instant::now());
        }

        let work_area = match &self.scratch_root {
            Some(root) => WorkArea::new_in(root)?,
            None => WorkArea::new()?,
        };
        let result = self.extract_classified(path, format, &work_area);

        let scratch = work_area.path().to_path_buf();
        if let Err(e) = work_area.close() {
            warn!("Failed to remove work area {}: {}", scratch.display(), e);
        }

        result
    }

    /// Extract `path` using a caller-owned work area, which is left in place.
    pub fn extract_in<P: AsRef<Path>>(&self, path: P, work_area: &WorkArea) -> Result<ExtractionResult> {
        let path = path.as_ref();
        let format = self.dispatcher.classify(path)?;
        self.extract_classified(path, format, work_area)
    }

    /// Entries of a ZIP or EDOC container, in archive order.
    pub fn list_members<P: AsRef<Path>>(&self, path: P) -> Result<Vec<ContainerEntry>> {
        let path = path.as_ref();
        let format = self.dispatcher.classify(path)?;
        if !format.is_container() {
            return Err(ParseError::UnsupportedFormat {
                path: path.display().to_string(),
                extension: format.as_str().to_string(),
            });
        }
        container::list_entries(path, format)
    }

    fn extract_classified(
        &self,
        path: &Path,
        format: FormatTag,
        work_area: &WorkArea,
    ) -> Result<ExtractionResult> {
        let started = Instant::now();
        match self.unpacker_for(format) {
            Some(unpacker) => {
                let members = unpacker.unpack(path, work_area, &self.dispatcher)?;
                self.finish(path, format, members, started)
            }
            None => self.finish(path, format, Vec::new(), started),
        }
    }

    fn unpacker_for(&self, format: FormatTag) -> Option<&dyn ContainerUnpacker> {
        match format {
            FormatTag::Zip => Some(&self.zip),
            FormatTag::Edoc => Some(&self.edoc),
            _ => None,
        }
    }

    fn finish(
        &self,
        path: &Path,
        format: FormatTag,
        members: Vec<UnpackedMember>,
        started: Instant,
    ) -> Result<ExtractionResult> {
        let filename = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());

        let (text, reports) = if format.is_container() {
            let container = path.display().to_string();
            let rendered = self.render_members(&container, format, &members)?;
            let (texts, reports): (Vec<String>, Vec<MemberReport>) = rendered.into_iter().unzip();
            (texts.join(MEMBER_SEPARATOR), reports)
        } else {
            (self.dispatcher.registry().extract(path, format)?, Vec::new())
        };

        info!(
            "Extracted {} ({}, {} chars) in {:?}",
            filename,
            format,
            text.len(),
            started.elapsed()
        );
        Ok(ExtractionResult::new(filename, text, format, reports))
    }

    #[cfg(not(feature = "parallel"))]
    fn render_members(
        &self,
        container: &str,
        kind: FormatTag,
        members: &[UnpackedMember],
    ) -> Result<Vec<(String, MemberReport)>> {
        members
            .iter()
            .map(|member| self.render_member(container, kind, member))
            .collect()
    }

    #[cfg(feature = "parallel")]
    fn render_members(
        &self,
        container: &str,
        kind: FormatTag,
        members: &[UnpackedMember],
    ) -> Result<Vec<(String, MemberReport)>> {
        use rayon::prelude::*;

        let render = || {
            members
                .par_iter()
                .map(|member| self.render_member(container, kind, member))
                .collect::<Result<Vec<_>>>()
        };
        match &self.pool {
            Some(pool) => pool.install(render),
            None => render(),
        }
    }

    /// Text contribution and report of one member.
    fn render_member(
        &self,
        container: &str,
        kind: FormatTag,
        member: &UnpackedMember,
    ) -> Result<(String, MemberReport)> {
        self.cancel.check()?;
        let name = member.name.as_str();
        let report = |format: FormatTag, status: MemberStatus, detail: Option<String>| MemberReport {
            name: name.to_string(),
            format,
            status,
            detail,
        };

        match &member.outcome {
            MemberOutcome::Extracted(file) if file.format != FormatTag::Unsupported => {
                debug!("Extracting member {} of {}", name, container);
                match self.dispatcher.registry().extract(&file.path, file.format) {
                    Ok(text) => Ok((text, report(file.format, MemberStatus::Extracted, None))),
                    Err(e @ ParseError::ExtractionFailed { .. }) => {
                        warn!("Unreadable member {} of {}: {}", name, container, e);
                        Ok((
                            unreadable_placeholder(kind, name),
                            report(file.format, MemberStatus::Unreadable, Some(e.to_string())),
                        ))
                    }
                    Err(e) => Err(e.in_member(container, name)),
                }
            }
            MemberOutcome::Extracted(_) | MemberOutcome::Unsupported => Ok((
                unsupported_placeholder(kind, name),
                report(FormatTag::Unsupported, MemberStatus::Unsupported, None),
            )),
            MemberOutcome::Corrupt { reason } => {
                warn!("Corrupt member {} of {}: {}", name, container, reason);
                Ok((
                    unsupported_placeholder(kind, name),
                    report(
                        self.dispatcher.classify_member(name),
                        MemberStatus::Corrupt,
                        Some(reason.clone()),
                    ),
                ))
            }
        }
    }
}

impl Default for DocumentParser {
    fn default() -> Self {
        Self::with_defaults()
    }
}
