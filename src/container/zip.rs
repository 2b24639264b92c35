//! Generic ZIP archive unpacker.

use super::limits::ContainerLimits;
use super::workarea::unique_path;
use super::{entry_names, materialize, open_archive, ContainerUnpacker, EntryInfo, ExtractedFile, MemberOutcome, UnpackedMember, WorkArea};
use crate::error::Result;
use crate::format::{FormatDispatcher, FormatTag};
use std::path::Path;
use tracing::{debug, info};

/// Materializes leaf members of a ZIP archive, keeping their relative paths.
pub struct ZipUnpacker {
    limits: ContainerLimits,
}

impl ZipUnpacker {
    pub fn new(limits: ContainerLimits) -> Self {
        Self { limits }
    }
}

impl Default for ZipUnpacker {
    fn default() -> Self {
        Self::new(ContainerLimits::default())
    }
}

impl ContainerUnpacker for ZipUnpacker {
    fn kind(&self) -> FormatTag {
        FormatTag::Zip
    }

    fn unpack(
        &self,
        path: &Path,
        work_area: &WorkArea,
        dispatcher: &FormatDispatcher,
    ) -> Result<Vec<UnpackedMember>> {
        let mut archive = open_archive(path, FormatTag::Zip)?;
        self.limits.check_entry_count(path, archive.len())?;

        let root = work_area.scratch_dir("zip")?;
        let mut budget = self.limits.budget(path);
        let mut members = Vec::new();
        let names = entry_names(&archive);

        for (index, listed_name) in names.into_iter().enumerate() {
            let mut entry = match archive.by_index(index) {
                Ok(entry) => entry,
                Err(e) => {
                    debug!("Cannot open ZIP entry {}: {}", listed_name, e);
                    members.push(UnpackedMember::corrupt(listed_name, e));
                    continue;
                }
            };

            if entry.is_dir() {
                continue;
            }

            let name = entry.name().to_string();
            let format = dispatcher.classify_member(&name);
            if format == FormatTag::Unsupported {
                debug!("Unsupported ZIP member: {}", name);
                members.push(UnpackedMember::unsupported(name));
                continue;
            }

            let Some(relative) = entry.enclosed_name() else {
                debug!("ZIP member escapes the archive root: {}", name);
                members.push(UnpackedMember::unsupported(name));
                continue;
            };

            let target = unique_path(&root.join(relative));
            let info = EntryInfo {
                name: name.clone(),
                size: entry.size(),
                compressed_size: entry.compressed_size(),
            };

            let outcome = match materialize(&mut entry, &info, &target, &mut budget, path)? {
                None => MemberOutcome::Extracted(ExtractedFile { path: target, format }),
                Some(reason) => {
                    debug!("Corrupt ZIP member {}: {}", name, reason);
                    MemberOutcome::Corrupt { reason }
                }
            };
            members.push(UnpackedMember { name, outcome });
        }

        info!(
            "Unpacked {} members from {} ({} bytes written)",
            members.len(),
            path.display(),
            budget.total()
        );
        Ok(members)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{LimitKind, ParseError};
    use crate::extractor::ExtractorRegistry;
    use crate::test_support::{entry_count, write_zip};
    use std::sync::Arc;
    use tempfile::TempDir;

    fn dispatcher() -> FormatDispatcher {
        FormatDispatcher::new(Arc::new(ExtractorRegistry::with_defaults(1024 * 1024)))
    }

    fn unpack(path: &Path, limits: ContainerLimits, area: &WorkArea) -> Result<Vec<UnpackedMember>> {
        ZipUnpacker::new(limits).unpack(path, area, &dispatcher())
    }

    #[test]
    fn test_members_in_archive_order() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("bundle.zip");
        write_zip(
            &path,
            &[
                ("z.txt", b"last name first".as_slice()),
                ("docs/", b"".as_slice()),
                ("docs/a.txt", b"A".as_slice()),
                ("setup.exe", b"MZ".as_slice()),
            ],
        );

        let area = WorkArea::new().unwrap();
        let members = unpack(&path, ContainerLimits::default(), &area).unwrap();
        let names: Vec<&str> = members.iter().map(|m| m.name.as_str()).collect();
        assert_eq!(names, vec!["z.txt", "docs/a.txt", "setup.exe"]);

        match &members[1].outcome {
            MemberOutcome::Extracted(file) => {
                assert_eq!(file.format, FormatTag::Text);
                assert!(file.path.ends_with("docs/a.txt"));
                assert_eq!(std::fs::read_to_string(&file.path).unwrap(), "A");
            }
            other => panic!("Expected extracted member, got {:?}", other),
        }
        assert_eq!(members[2].outcome, MemberOutcome::Unsupported);
    }

    #[test]
    fn test_unsupported_members_are_not_written() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("bundle.zip");
        write_zip(&path, &[("tool.exe", b"MZ".as_slice()), ("inner.zip", b"PK".as_slice())]);

        let area = WorkArea::new().unwrap();
        let members = unpack(&path, ContainerLimits::default(), &area).unwrap();

        assert!(members.iter().all(|m| m.outcome == MemberOutcome::Unsupported));
        let scratch = std::fs::read_dir(area.path()).unwrap().next().unwrap().unwrap().path();
        assert_eq!(entry_count(&scratch), 0);
    }

    #[test]
    fn test_member_below_a_file_member_is_corrupt() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("clash.zip");
        write_zip(
            &path,
            &[("a.txt", b"first".as_slice()), ("a.txt/b.txt", b"second".as_slice())],
        );

        let area = WorkArea::new().unwrap();
        let members = unpack(&path, ContainerLimits::default(), &area).unwrap();

        assert!(matches!(members[0].outcome, MemberOutcome::Extracted(_)));
        assert_eq!(members[1].name, "a.txt/b.txt");
        assert!(matches!(members[1].outcome, MemberOutcome::Corrupt { .. }));
    }

    #[test]
    fn test_invalid_archive() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("broken.zip");
        std::fs::write(&path, b"definitely not a zip").unwrap();

        let area = WorkArea::new().unwrap();
        assert!(matches!(
            unpack(&path, ContainerLimits::default(), &area),
            Err(ParseError::InvalidContainer { kind: FormatTag::Zip, .. })
        ));
    }

    #[test]
    fn test_entry_count_limit() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("many.zip");
        write_zip(
            &path,
            &[("a.txt", b"a".as_slice()), ("b.txt", b"b".as_slice()), ("c.txt", b"c".as_slice())],
        );

        let limits = ContainerLimits {
            max_entries: 2,
            ..ContainerLimits::default()
        };
        let area = WorkArea::new().unwrap();
        match unpack(&path, limits, &area) {
            Err(ParseError::ContainerLimitExceeded { limit, actual, max, .. }) => {
                assert_eq!(limit, LimitKind::EntryCount);
                assert_eq!(actual, 3);
                assert_eq!(max, 2);
            }
            other => panic!("Expected ContainerLimitExceeded, got {:?}", other),
        }
    }

    #[test]
    fn test_total_size_limit() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("big.zip");
        let chunk = vec![b'x'; 600];
        write_zip(&path, &[("a.txt", chunk.as_slice()), ("b.txt", chunk.as_slice())]);

        let limits = ContainerLimits {
            max_total_size: 1000,
            ..ContainerLimits::default()
        };
        let area = WorkArea::new().unwrap();
        assert!(matches!(
            unpack(&path, limits, &area),
            Err(ParseError::ContainerLimitExceeded { limit: LimitKind::TotalSize, .. })
        ));
    }

    #[test]
    fn test_compression_ratio_limit() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("bomb.zip");
        let zeros = vec![0u8; 256 * 1024];
        write_zip(&path, &[("zeros.txt", zeros.as_slice())]);

        let limits = ContainerLimits {
            max_compression_ratio: 10,
            ratio_threshold: 1024,
            ..ContainerLimits::default()
        };
        let area = WorkArea::new().unwrap();
        assert!(matches!(
            unpack(&path, limits, &area),
            Err(ParseError::ContainerLimitExceeded { limit: LimitKind::CompressionRatio, .. })
        ));
    }
}
