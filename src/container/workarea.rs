//! Scoped scratch directory for one top-level extraction.

use crate::error::{ParseError, Result, Stage};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use tempfile::TempDir;
use tracing::debug;

const PREFIX: &str = "tenderdocs-";

/// Temporary directory owned by a single extraction.
///
/// The directory and everything unpacked into it is removed when the value
/// is dropped or closed, on success and error paths alike.
pub struct WorkArea {
    dir: TempDir,
    next_scratch: AtomicUsize,
}

impl WorkArea {
    /// Create a work area under the system temporary directory.
    pub fn new() -> Result<Self> {
        let dir = tempfile::Builder::new()
            .prefix(PREFIX)
            .tempdir()
            .map_err(|e| ParseError::io(Stage::Unpack, std::env::temp_dir(), e))?;
        Ok(Self::from_dir(dir))
    }

    /// Create a work area under `root`, which must already exist.
    pub fn new_in<P: AsRef<Path>>(root: P) -> Result<Self> {
        let root = root.as_ref();
        let dir = tempfile::Builder::new()
            .prefix(PREFIX)
            .tempdir_in(root)
            .map_err(|e| ParseError::io(Stage::Unpack, root, e))?;
        Ok(Self::from_dir(dir))
    }

    fn from_dir(dir: TempDir) -> Self {
        debug!("Created work area {}", dir.path().display());
        Self {
            dir,
            next_scratch: AtomicUsize::new(0),
        }
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Fresh, empty subdirectory for one unpack run.
    pub fn scratch_dir(&self, label: &str) -> Result<PathBuf> {
        let index = self.next_scratch.fetch_add(1, Ordering::Relaxed);
        let dir = self.dir.path().join(format!("{}-{}", label, index));
        std::fs::create_dir(&dir).map_err(|e| ParseError::io(Stage::Unpack, &dir, e))?;
        Ok(dir)
    }

    /// Remove the directory now and report failures instead of ignoring them.
    pub fn close(self) -> Result<()> {
        let path = self.dir.path().to_path_buf();
        self.dir
            .close()
            .map_err(|e| ParseError::io(Stage::Unpack, path, e))
    }
}

/// `target` itself if free, otherwise `stem_1.ext`, `stem_2.ext`, ...
pub(crate) fn unique_path(target: &Path) -> PathBuf {
    if std::fs::symlink_metadata(target).is_err() {
        return target.to_path_buf();
    }

    let parent = target.parent().unwrap_or_else(|| Path::new(""));
    let stem = target
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let extension = target.extension().map(|e| e.to_string_lossy().into_owned());

    let mut index = 1;
    loop {
        let name = match &extension {
            Some(ext) => format!("{}_{}.{}", stem, index, ext),
            None => format!("{}_{}", stem, index),
        };
        let candidate = parent.join(name);
        if std::fs::symlink_metadata(&candidate).is_err() {
            return candidate;
        }
        index += 1;
    }
}
