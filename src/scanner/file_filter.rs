use crate::config::ScanConfig;
use regex::Regex;
use std::path::Path;

pub struct FileFilter {
    extensions: Vec<String>,
    max_file_size: u64,
    exclude_dirs: Vec<String>,
    exclude_patterns: Vec<Regex>,
}

impl FileFilter {
    /// `extensions` are the lowercase top-level extensions the pipeline accepts.
    pub fn new(config: &ScanConfig, extensions: Vec<String>) -> Self {
        // Patterns are checked by Config::validate; invalid ones are skipped here.
        let exclude_patterns = config
            .exclude_patterns
            .iter()
            .filter_map(|pattern| Regex::new(pattern).ok())
            .collect();

        Self {
            extensions: extensions.into_iter().map(|e| e.to_lowercase()).collect(),
            max_file_size: config.max_file_size,
            exclude_dirs: config.exclude_dirs.clone(),
            exclude_patterns,
        }
    }

    pub fn is_supported_file(&self, path: &Path) -> bool {
        let Some(filename) = path.file_name().and_then(|s| s.to_str()) else {
            return false;
        };
        if self.matches_any_pattern(filename) {
            return false;
        }

        path.extension()
            .and_then(|s| s.to_str())
            .is_some_and(|ext| self.extensions.contains(&ext.to_lowercase()))
    }

    pub fn should_traverse_directory(&self, path: &Path) -> bool {
        let Some(dir_name) = path.file_name().and_then(|s| s.to_str()) else {
            return true;
        };

        let dir_name_lower = dir_name.to_lowercase();
        if self
            .exclude_dirs
            .iter()
            .any(|exclude| exclude.to_lowercase() == dir_name_lower)
        {
            return false;
        }

        !self.matches_any_pattern(dir_name)
    }

    pub fn is_size_allowed(&self, size: u64) -> bool {
        size <= self.max_file_size
    }

    pub fn matches_any_pattern(&self, text: &str) -> bool {
        self.exclude_patterns
            .iter()
            .any(|pattern| pattern.is_match(text))
    }

    pub fn extensions(&self) -> &[String] {
        &self.extensions
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_filter() -> FileFilter {
        let config = ScanConfig {
            exclude_dirs: vec!["__MACOSX".to_string(), "archive".to_string()],
            exclude_patterns: vec![r"^~\$.*".to_string(), r"^\..*".to_string()],
            max_depth: 10,
            max_file_size: 1024 * 1024,
            follow_links: false,
        };
        let extensions = ["pdf", "docx", "txt", "rtf", "zip", "edoc", "asice"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        FileFilter::new(&config, extensions)
    }

    #[test]
    fn test_supported_file_detection() {
        let filter = create_test_filter();

        assert!(filter.is_supported_file(Path::new("offer.pdf")));
        assert!(filter.is_supported_file(Path::new("tender/Terms.DOCX")));
        assert!(filter.is_supported_file(Path::new("signed.edoc")));
        assert!(filter.is_supported_file(Path::new("bundle.zip")));

        assert!(!filter.is_supported_file(Path::new("budget.xlsx")));
        assert!(!filter.is_supported_file(Path::new("README")));
    }

    #[test]
    fn test_lock_and_hidden_files_are_excluded() {
        let filter = create_test_filter();

        assert!(!filter.is_supported_file(Path::new("~$offer.docx")));
        assert!(!filter.is_supported_file(Path::new(".draft.txt")));
    }

    #[test]
    fn test_directory_traversal_rules() {
        let filter = create_test_filter();

        assert!(filter.should_traverse_directory(Path::new("lots")));
        assert!(filter.should_traverse_directory(Path::new("2024/offers")));
        assert!(!filter.should_traverse_directory(Path::new("__macosx")));
        assert!(!filter.should_traverse_directory(Path::new("Archive")));
        assert!(!filter.should_traverse_directory(Path::new(".git")));
    }

    #[test]
    fn test_size_limits() {
        let filter = create_test_filter();

        assert!(filter.is_size_allowed(1024));
        assert!(filter.is_size_allowed(1024 * 1024));
        assert!(!filter.is_size_allowed(2 * 1024 * 1024));
    }
}
