use crate::config::ScanConfig;
use crate::error::{format_bytes, ParseError, Result, Stage};
use crate::scanner::file_filter::FileFilter;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use walkdir::{DirEntry, WalkDir};

/// A top-level file queued for extraction.
#[derive(Debug, Clone)]
pub struct InputFile {
    pub source_path: PathBuf,
    /// Path shown to the user; relative to the scanned directory when scanned.
    pub display_path: PathBuf,
    pub extension: String,
    pub size: u64,
}

impl InputFile {
    pub fn new(source_path: PathBuf, display_path: PathBuf, size: u64) -> Self {
        let extension = source_path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("")
            .to_lowercase();

        Self {
            source_path,
            display_path,
            extension,
            size,
        }
    }

    /// A path named directly on the command line, taken as is.
    pub fn explicit(path: PathBuf) -> Self {
        let size = std::fs::metadata(&path).map(|m| m.len()).unwrap_or(0);
        Self::new(path.clone(), path, size)
    }

    pub fn display_path(&self) -> String {
        self.display_path.display().to_string()
    }
}

pub struct DocumentScanner {
    filter: FileFilter,
    max_depth: usize,
    follow_links: bool,
}

impl DocumentScanner {
    pub fn new(config: &ScanConfig, extensions: Vec<String>) -> Self {
        Self {
            filter: FileFilter::new(config, extensions),
            max_depth: config.max_depth,
            follow_links: config.follow_links,
        }
    }

    /// Supported files below `root`, sorted by relative path.
    pub fn scan_directory<P: AsRef<Path>>(&self, root: P) -> Result<Vec<InputFile>> {
        let root_path = root.as_ref();

        let metadata =
            std::fs::metadata(root_path).map_err(|e| ParseError::io(Stage::Scan, root_path, e))?;
        if !metadata.is_dir() {
            return Err(ParseError::io(
                Stage::Scan,
                root_path,
                std::io::Error::new(std::io::ErrorKind::InvalidInput, "not a directory"),
            ));
        }

        let mut documents = Vec::new();

        let walker = WalkDir::new(root_path)
            .max_depth(self.max_depth)
            .follow_links(self.follow_links)
            .into_iter()
            .filter_entry(|e| self.should_traverse(e));

        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(err) => {
                    warn!("Skipping unreadable path during scan: {}", err);
                    continue;
                }
            };

            if !entry.file_type().is_file() {
                continue;
            }

            match self.process_file(&entry, root_path) {
                Ok(Some(input)) => documents.push(input),
                Ok(None) => {}
                Err(err) => warn!("Error processing {}: {}", entry.path().display(), err),
            }
        }

        if documents.is_empty() {
            return Err(ParseError::NoDocumentsFound {
                path: root_path.display().to_string(),
            });
        }

        documents.sort_by(|a, b| a.display_path.cmp(&b.display_path));
        debug!("Found {} documents under {}", documents.len(), root_path.display());

        Ok(documents)
    }

    fn should_traverse(&self, entry: &DirEntry) -> bool {
        if entry.depth() == 0 || !entry.file_type().is_dir() {
            return true;
        }
        self.filter.should_traverse_directory(entry.path())
    }

    fn process_file(&self, entry: &DirEntry, root_path: &Path) -> Result<Option<InputFile>> {
        let path = entry.path();

        if !self.filter.is_supported_file(path) {
            return Ok(None);
        }

        let metadata = entry.metadata().map_err(|e| {
            let source = e
                .into_io_error()
                .unwrap_or_else(|| std::io::Error::other("filesystem loop"));
            ParseError::io(Stage::Scan, path, source)
        })?;

        if !self.filter.is_size_allowed(metadata.len()) {
            debug!("Skipping {} ({} over the size cap)", path.display(), format_bytes(metadata.len()));
            return Ok(None);
        }

        let relative = path.strip_prefix(root_path).unwrap_or(path).to_path_buf();
        Ok(Some(InputFile::new(path.to_path_buf(), relative, metadata.len())))
    }

    pub fn get_statistics(&self, documents: &[InputFile]) -> ScanStatistics {
        let mut files_by_extension = HashMap::new();
        for doc in documents {
            *files_by_extension.entry(doc.extension.clone()).or_insert(0) += 1;
        }

        ScanStatistics {
            total_files: documents.len(),
            total_size: documents.iter().map(|d| d.size).sum(),
            files_by_extension,
        }
    }
}

#[derive(Debug, Default)]
pub struct ScanStatistics {
    pub total_files: usize,
    pub total_size: u64,
    pub files_by_extension: HashMap<String, usize>,
}

impl ScanStatistics {
    pub fn display_summary(&self) -> String {
        let mut summary = format!(
            "Scan Results:\n  Total files: {}\n  Total size: {}\n",
            self.total_files,
            format_bytes(self.total_size)
        );

        if !self.files_by_extension.is_empty() {
            summary.push_str("  Files by type:\n");
            let mut extensions: Vec<_> = self.files_by_extension.iter().collect();
            extensions.sort_by(|a, b| b.1.cmp(a.1).then(a.0.cmp(b.0)));

            for (ext, count) in extensions {
                summary.push_str(&format!("    {}: {} files\n", ext, count));
            }
        }

        summary
    }
}
