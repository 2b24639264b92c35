//! Batch progress tracking and the JSON batch report.

use crate::config::Config;
use crate::container::ContainerLimits;
use crate::error::{ParseError, Result, Stage};
use crate::parser::{ExtractionResult, MemberStatus};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

/// Running state of a batch, fed to progress bars.
#[derive(Debug)]
pub struct BatchProgress {
    pub files_processed: usize,
    pub total_files: usize,
    pub bytes_processed: u64,
    pub total_bytes: u64,
    pub current_file: Option<String>,
    pub start_time: Instant,
    pub errors: Vec<String>,
}

impl BatchProgress {
    pub fn new(total_files: usize, total_bytes: u64) -> Self {
        Self {
            files_processed: 0,
            total_files,
            bytes_processed: 0,
            total_bytes,
            current_file: None,
            start_time: Instant::now(),
            errors: Vec::new(),
        }
    }

    pub fn update_file(&mut self, filename: String, bytes: u64) {
        self.files_processed += 1;
        self.bytes_processed += bytes;
        self.current_file = Some(filename);
    }

    pub fn add_error<S: Into<String>>(&mut self, error: S) {
        self.errors.push(error.into());
    }

    pub fn percentage(&self) -> f64 {
        if self.total_files == 0 {
            0.0
        } else {
            (self.files_processed as f64 / self.total_files as f64) * 100.0
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.start_time.elapsed()
    }

    /// Linear estimate from the average time per finished file.
    pub fn estimated_remaining(&self) -> Option<Duration> {
        if self.files_processed == 0 || self.files_processed >= self.total_files {
            return None;
        }
        let per_file = self.elapsed() / self.files_processed as u32;
        Some(per_file * (self.total_files - self.files_processed) as u32)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchReport {
    pub generated_at: DateTime<Utc>,
    pub summary: BatchSummary,
    pub documents: Vec<DocumentEntry>,
    pub failures: Vec<FailureEntry>,
    pub config_used: ConfigSnapshot,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BatchSummary {
    pub total_inputs: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub total_chars: usize,
    pub total_chunks: usize,
    /// Container members rendered as placeholders.
    pub placeholder_members: usize,
    pub documents_by_type: BTreeMap<String, usize>,
    pub duration: Duration,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentEntry {
    pub path: String,
    #[serde(flatten)]
    pub result: ExtractionResult,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FailureEntry {
    pub path: String,
    pub stage: String,
    pub message: String,
    pub exit_code: i32,
}

impl FailureEntry {
    pub fn from_error(path: &Path, error: &ParseError) -> Self {
        Self {
            path: path.display().to_string(),
            stage: error.stage().as_str().to_string(),
            message: error.to_string(),
            exit_code: error.exit_code(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigSnapshot {
    pub limits: ContainerLimits,
    pub workers: usize,
    pub scratch_dir: Option<PathBuf>,
}

impl From<&Config> for ConfigSnapshot {
    fn from(config: &Config) -> Self {
        Self {
            limits: config.limits.clone(),
            workers: config.extraction.workers,
            scratch_dir: config.extraction.scratch_dir.clone(),
        }
    }
}

impl BatchReport {
    pub fn new(config: &Config) -> Self {
        Self {
            generated_at: Utc::now(),
            summary: BatchSummary::default(),
            documents: Vec::new(),
            failures: Vec::new(),
            config_used: ConfigSnapshot::from(config),
        }
    }

    pub fn record_success(&mut self, path: &Path, result: ExtractionResult) {
        let summary = &mut self.summary;
        summary.total_inputs += 1;
        summary.succeeded += 1;
        summary.total_chars += result.text.chars().count();
        summary.total_chunks += result.chunks.len();
        summary.placeholder_members += result
            .members
            .iter()
            .filter(|m| m.status != MemberStatus::Extracted)
            .count();
        *summary
            .documents_by_type
            .entry(result.format.as_str().to_string())
            .or_insert(0) += 1;

        self.documents.push(DocumentEntry {
            path: path.display().to_string(),
            result,
        });
    }

    pub fn record_failure(&mut self, path: &Path, error: &ParseError) {
        self.summary.total_inputs += 1;
        self.summary.failed += 1;
        self.failures.push(FailureEntry::from_error(path, error));
    }

    pub fn finish(&mut self, duration: Duration) {
        self.summary.duration = duration;
        self.generated_at = Utc::now();
    }

    /// 0 when every input succeeded, otherwise the code of the first failure.
    pub fn exit_code(&self) -> i32 {
        self.failures.first().map_or(0, |failure| failure.exit_code)
    }

    pub fn save_json<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let json_content = serde_json::to_string_pretty(self).map_err(|e| ParseError::Config {
            message: format!("Failed to serialize report to JSON: {}", e),
        })?;

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .map_err(|e| ParseError::io(Stage::Scan, parent, e))?;
        }
        std::fs::write(path, json_content).map_err(|e| ParseError::io(Stage::Scan, path, e))?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::FormatTag;
    use crate::parser::{split_chunks, MemberReport};
    use tempfile::TempDir;

    fn result(filename: &str, text: &str, format: FormatTag, members: Vec<MemberReport>) -> ExtractionResult {
        ExtractionResult {
            filename: filename.to_string(),
            text: text.to_string(),
            chunks: split_chunks(text),
            format,
            members,
        }
    }

    #[test]
    fn test_progress_tracking() {
        let mut progress = BatchProgress::new(4, 1000);
        assert_eq!(progress.percentage(), 0.0);

        progress.update_file("a.pdf".to_string(), 250);
        assert_eq!(progress.percentage(), 25.0);
        assert_eq!(progress.bytes_processed, 250);

        progress.add_error("b.zip: invalid container");
        assert_eq!(progress.errors.len(), 1);
    }

    #[test]
    fn test_report_summary() {
        let mut report = BatchReport::new(&Config::default());
        report.record_success(Path::new("a.txt"), result("a.txt", "one\n\ntwo", FormatTag::Text, vec![]));
        report.record_success(
            Path::new("b.zip"),
            result(
                "b.zip",
                "[UNSUPPORTED ZIP ITEM: x.exe]",
                FormatTag::Zip,
                vec![MemberReport {
                    name: "x.exe".to_string(),
                    format: FormatTag::Unsupported,
                    status: MemberStatus::Unsupported,
                    detail: None,
                }],
            ),
        );
        report.record_failure(
            Path::new("c.xlsx"),
            &ParseError::UnsupportedFormat {
                path: "c.xlsx".to_string(),
                extension: "xlsx".to_string(),
            },
        );

        let summary = &report.summary;
        assert_eq!(summary.total_inputs, 3);
        assert_eq!(summary.succeeded, 2);
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.total_chunks, 3);
        assert_eq!(summary.placeholder_members, 1);
        assert_eq!(summary.documents_by_type["zip"], 1);
        assert_eq!(report.failures[0].stage, "classification");
        assert_eq!(report.exit_code(), 2);
    }

    #[test]
    fn test_exit_code_without_failures() {
        let report = BatchReport::new(&Config::default());
        assert_eq!(report.exit_code(), 0);
    }

    #[test]
    fn test_save_json() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("reports").join("batch.json");

        let mut report = BatchReport::new(&Config::default());
        report.record_success(Path::new("a.txt"), result("a.txt", "hello", FormatTag::Text, vec![]));
        report.finish(Duration::from_millis(5));
        report.save_json(&path).unwrap();

        let json: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(json["summary"]["succeeded"], 1);
        assert_eq!(json["documents"][0]["type"], "text");
        assert_eq!(json["documents"][0]["path"], "a.txt");
        assert_eq!(json["config_used"]["limits"]["max_entries"], 10_000);
    }
}
