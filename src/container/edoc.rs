//! Signed EDOC / ASiC-E container unpacker.
//!
//! Signature and package metadata entries are dropped, allow-listed document
//! entries are written flat (base name only) into a scratch directory.
//! Signatures are never verified.

use super::limits::ContainerLimits;
use super::workarea::unique_path;
use super::{
    entry_names, materialize, open_archive, ContainerUnpacker, EntryInfo, ExtractedFile,
    MemberOutcome, UnpackedMember, WorkArea,
};
use crate::error::Result;
use crate::format::{extension_of, FormatDispatcher, FormatTag};
use std::path::Path;
use tracing::{debug, info};

/// Extensions whose entries are kept for extraction.
const DOCUMENT_EXTENSIONS: &[&str] = &["pdf", "docx", "doc", "txt", "rtf", "odt"];

/// Extensions that may carry a signature.
const SIGNATURE_EXTENSIONS: &[&str] = &["p7s", "p7m", "xml"];

/// Signature entries are recognised by name, not parsed.
fn is_signature_entry(name: &str, extension: Option<&str>) -> bool {
    extension.is_some_and(|ext| SIGNATURE_EXTENSIONS.contains(&ext))
        && name.to_lowercase().contains("signature")
}

/// ASiC package bookkeeping: the root `mimetype` and anything in `META-INF/`.
fn is_package_metadata(name: &str) -> bool {
    name == "mimetype"
        || name
            .get(..9)
            .is_some_and(|prefix| prefix.eq_ignore_ascii_case("META-INF/"))
}

/// Last path component of an archive name.
fn base_name(name: &str) -> Option<&str> {
    name.rsplit(['/', '\\'])
        .next()
        .filter(|base| !base.is_empty() && *base != "." && *base != "..")
}

/// Unpacks the signed documents of an EDOC container.
pub struct EdocUnpacker {
    limits: ContainerLimits,
}

impl EdocUnpacker {
    pub fn new(limits: ContainerLimits) -> Self {
        Self { limits }
    }
}

impl Default for EdocUnpacker {
    fn default() -> Self {
        Self::new(ContainerLimits::default())
    }
}

impl ContainerUnpacker for EdocUnpacker {
    fn kind(&self) -> FormatTag {
        FormatTag::Edoc
    }

    fn unpack(
        &self,
        path: &Path,
        work_area: &WorkArea,
        dispatcher: &FormatDispatcher,
    ) -> Result<Vec<UnpackedMember>> {
        let mut archive = open_archive(path, FormatTag::Edoc)?;
        self.limits.check_entry_count(path, archive.len())?;

        let root = work_area.scratch_dir("edoc")?;
        let mut budget = self.limits.budget(path);
        let mut members = Vec::new();
        let mut skipped = 0usize;

        for (index, listed_name) in entry_names(&archive).into_iter().enumerate() {
            let mut entry = match archive.by_index(index) {
                Ok(entry) => entry,
                Err(e) => {
                    debug!("Cannot open EDOC entry {}: {}", listed_name, e);
                    members.push(UnpackedMember::corrupt(listed_name, e));
                    continue;
                }
            };

            if entry.is_dir() {
                continue;
            }

            let name = entry.name().to_string();
            let extension = extension_of(&name);

            if is_signature_entry(&name, extension.as_deref()) {
                debug!("Skipping signature entry: {}", name);
                skipped += 1;
                continue;
            }

            let allowed = extension
                .as_deref()
                .is_some_and(|ext| DOCUMENT_EXTENSIONS.contains(&ext));
            if !allowed {
                if is_package_metadata(&name) {
                    debug!("Skipping package metadata: {}", name);
                    skipped += 1;
                } else {
                    debug!("EDOC entry outside the document allow-list: {}", name);
                    members.push(UnpackedMember::unsupported(name));
                }
                continue;
            }

            let Some(base) = base_name(&name) else {
                members.push(UnpackedMember::unsupported(name));
                continue;
            };

            let target = unique_path(&root.join(base));
            let info = EntryInfo {
                name: name.clone(),
                size: entry.size(),
                compressed_size: entry.compressed_size(),
            };

            let outcome = match materialize(&mut entry, &info, &target, &mut budget, path)? {
                None => MemberOutcome::Extracted(ExtractedFile {
                    path: target,
                    format: dispatcher.classify_member(&name),
                }),
                Some(reason) => {
                    debug!("Corrupt EDOC entry {}: {}", name, reason);
                    MemberOutcome::Corrupt { reason }
                }
            };
            members.push(UnpackedMember { name, outcome });
        }

        info!(
            "Unpacked {} members from {} ({} signature/metadata entries skipped)",
            members.len(),
            path.display(),
            skipped
        );
        Ok(members)
    }
}
