//! ZIP-based container unpacking.

pub mod edoc;
pub mod limits;
pub mod workarea;
pub mod zip;

pub use edoc::EdocUnpacker;
pub use limits::ContainerLimits;
pub use workarea::WorkArea;
pub use self::zip::ZipUnpacker;

use crate::error::{ParseError, Result, Stage};
use crate::format::{FormatDispatcher, FormatTag};
use limits::{Budget, CopyError};
use serde::Serialize;
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing::debug;

/// A member written into the work area, ready for a leaf extractor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedFile {
    pub path: PathBuf,
    pub format: FormatTag,
}

/// What happened to one archive member.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MemberOutcome {
    Extracted(ExtractedFile),
    Unsupported,
    /// The member's header or data could not be decompressed.
    Corrupt { reason: String },
}

/// One member in archive order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnpackedMember {
    /// Archive-relative name as stored in the central directory.
    pub name: String,
    pub outcome: MemberOutcome,
}

impl UnpackedMember {
    pub(crate) fn unsupported(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            outcome: MemberOutcome::Unsupported,
        }
    }

    pub(crate) fn corrupt(name: impl Into<String>, reason: impl ToString) -> Self {
        Self {
            name: name.into(),
            outcome: MemberOutcome::Corrupt {
                reason: reason.to_string(),
            },
        }
    }
}

/// Entry of a container as listed in its central directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ContainerEntry {
    pub name: String,
    pub size: u64,
    pub compressed_size: u64,
    pub is_dir: bool,
}

/// Expands one container format into extracted members.
pub trait ContainerUnpacker: Send + Sync {
    fn kind(&self) -> FormatTag;

    /// Unpack `path` into a fresh scratch directory of `work_area`.
    ///
    /// Members are returned in central-directory order.
    fn unpack(
        &self,
        path: &Path,
        work_area: &WorkArea,
        dispatcher: &FormatDispatcher,
    ) -> Result<Vec<UnpackedMember>>;
}

pub(crate) fn open_archive(path: &Path, kind: FormatTag) -> Result<::zip::ZipArchive<File>> {
    let file = File::open(path).map_err(|e| ParseError::io(Stage::Unpack, path, e))?;
    ::zip::ZipArchive::new(file).map_err(|e| ParseError::invalid_container(kind, path, e))
}

/// Central-directory names by index, readable even when an entry header is not.
pub(crate) fn entry_names<R: Read + std::io::Seek>(archive: &::zip::ZipArchive<R>) -> Vec<String> {
    (0..archive.len())
        .map(|index| {
            archive
                .name_for_index(index)
                .map(str::to_string)
                .unwrap_or_else(|| format!("#{}", index))
        })
        .collect()
}

/// List the entries of a container without decompressing any of them.
pub fn list_entries(path: &Path, kind: FormatTag) -> Result<Vec<ContainerEntry>> {
    let mut archive = open_archive(path, kind)?;
    let mut entries = Vec::with_capacity(archive.len());

    for index in 0..archive.len() {
        let entry = archive
            .by_index_raw(index)
            .map_err(|e| ParseError::invalid_container(kind, path, e))?;
        entries.push(ContainerEntry {
            name: entry.name().to_string(),
            size: entry.size(),
            compressed_size: entry.compressed_size(),
            is_dir: entry.is_dir(),
        });
    }

    Ok(entries)
}

/// Declared metadata of an entry about to be written.
pub(crate) struct EntryInfo {
    pub name: String,
    pub size: u64,
    pub compressed_size: u64,
}

/// Decompress one entry to `target` under the container budget.
///
/// Returns `Ok(None)` when written, `Ok(Some(reason))` when the entry data is
/// corrupt (the partial file is removed) or its path runs through a file
/// written for an earlier member. Limit and write failures are fatal.
pub(crate) fn materialize<R: Read>(
    reader: &mut R,
    info: &EntryInfo,
    target: &Path,
    budget: &mut Budget<'_>,
    container: &Path,
) -> Result<Option<String>> {
    budget.check_declared(info.size, info.compressed_size)?;

    let wrap = |e: ParseError| e.in_member(&container.display().to_string(), &info.name);

    if let Some(parent) = target.parent() {
        if parent.ancestors().any(Path::is_file) {
            return Ok(Some(format!(
                "path of {} passes through an earlier member file",
                info.name
            )));
        }
        std::fs::create_dir_all(parent)
            .map_err(|e| wrap(ParseError::io(Stage::Unpack, parent, e)))?;
    }
    let mut output =
        File::create(target).map_err(|e| wrap(ParseError::io(Stage::Unpack, target, e)))?;

    match budget.copy_entry(reader, &mut output, info.compressed_size) {
        Ok(written) => {
            debug!("Wrote {} ({} bytes) to {}", info.name, written, target.display());
            Ok(None)
        }
        Err(CopyError::Read(e)) => {
            drop(output);
            if let Err(remove_err) = std::fs::remove_file(target) {
                debug!("Could not remove partial file {}: {}", target.display(), remove_err);
            }
            Ok(Some(e.to_string()))
        }
        Err(CopyError::Write(e)) => Err(wrap(ParseError::io(Stage::Unpack, target, e))),
        Err(CopyError::Limit(e)) => Err(e),
    }
}
