pub mod cli;
pub mod config;
pub mod container;
pub mod error;
pub mod extractor;
pub mod format;
pub mod logging;
pub mod parser;
pub mod report;
pub mod scanner;
pub mod ui;

#[cfg(test)]
pub(crate) mod test_support;

// Public API re-exports
pub use cli::{Cli, OutputFormat};
pub use config::{CliOverrides, Config, ExtractionConfig, LogFormat, LoggingConfig, ScanConfig};
pub use error::{LimitKind, ParseError, Result, Stage, UserFriendlyError};

// Core functionality re-exports
pub use container::{ContainerEntry, ContainerLimits, WorkArea};
pub use format::{FormatDispatcher, FormatTag};
pub use parser::{split_chunks, DocumentParser, ExtractionResult, MemberReport, MemberStatus, MEMBER_SEPARATOR};
pub use report::{BatchProgress, BatchReport};
pub use scanner::{DocumentScanner, FileFilter, InputFile};
pub use ui::{CancelToken, OutputFormatter, OutputMode, ProgressManager};

use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, info};

/// Batch front end: resolves inputs, drives the parser, prints results.
pub struct TenderDocs {
    config: Config,
    parser: DocumentParser,
    output_formatter: OutputFormatter,
    progress_manager: ProgressManager,
    cancel: CancelToken,
    show_chunks: bool,
}

impl TenderDocs {
    pub fn new(config: Config, output_mode: OutputMode, verbose: u8, quiet: bool) -> Result<Self> {
        let cancel = CancelToken::new();
        ui::install_interrupt_handler(&cancel)?;
        Self::build(config, output_mode, verbose, quiet, cancel)
    }

    /// Instance without a process-wide signal handler.
    pub fn new_for_test(config: Config, output_mode: OutputMode, verbose: u8, quiet: bool) -> Result<Self> {
        Self::build(config, output_mode, verbose, quiet, CancelToken::new())
    }

    pub fn from_cli(cli_args: &Cli) -> Result<Self> {
        let config = cli_args.load_config()?;
        let output_mode = match cli_args.output_format {
            OutputFormat::Human => OutputMode::Human,
            OutputFormat::Json => OutputMode::Json,
            OutputFormat::Plain => OutputMode::Plain,
        };

        Ok(Self::new(config, output_mode, cli_args.verbose, cli_args.quiet)?.with_chunks(cli_args.chunks))
    }

    fn build(
        config: Config,
        output_mode: OutputMode,
        verbose: u8,
        quiet: bool,
        cancel: CancelToken,
    ) -> Result<Self> {
        let parser = DocumentParser::new(&config)?.with_cancellation(cancel.clone());
        let progress_enabled =
            output_mode == OutputMode::Human && !quiet && console::Term::stderr().is_term();

        Ok(Self {
            config,
            parser,
            output_formatter: OutputFormatter::new(output_mode, verbose, quiet),
            progress_manager: ProgressManager::new(progress_enabled),
            cancel,
            show_chunks: false,
        })
    }

    /// Print chunks rather than the joined text in human output.
    pub fn with_chunks(mut self, show_chunks: bool) -> Self {
        self.show_chunks = show_chunks;
        self
    }

    /// Expand directories into the supported files below them. Explicit
    /// files pass through untouched so unsupported ones fail visibly.
    pub fn collect_inputs(&self, inputs: &[PathBuf]) -> (Vec<InputFile>, Vec<(PathBuf, ParseError)>) {
        let scanner = DocumentScanner::new(
            &self.config.scan,
            self.parser.dispatcher().supported_extensions(),
        );

        let mut files = Vec::new();
        let mut failures = Vec::new();

        for input in inputs {
            if !input.is_dir() {
                files.push(InputFile::explicit(input.clone()));
                continue;
            }

            match scanner.scan_directory(input) {
                Ok(found) => {
                    let stats = scanner.get_statistics(&found);
                    self.output_formatter.debug(&stats.display_summary());
                    files.extend(found.into_iter().map(|file| {
                        let shown = input.join(&file.display_path);
                        InputFile::new(file.source_path, shown, file.size)
                    }));
                }
                Err(e) => failures.push((input.clone(), e)),
            }
        }

        (files, failures)
    }

    /// Extract every input in order. A failing document is reported and
    /// recorded; only cancellation aborts the batch.
    pub fn run_batch(&self, inputs: &[PathBuf]) -> Result<BatchReport> {
        let started = Instant::now();
        let mut report = BatchReport::new(&self.config);

        let (files, scan_failures) = self.collect_inputs(inputs);
        for (path, error) in &scan_failures {
            self.output_formatter.print_user_friendly_error(error);
            report.record_failure(path, error);
        }

        info!("Extracting {} input(s)", files.len());
        let total_bytes = files.iter().map(|f| f.size).sum();
        let mut progress = BatchProgress::new(files.len(), total_bytes);
        let pb = if files.len() > 1 {
            self.progress_manager.create_file_progress(files.len() as u64)
        } else {
            indicatif::ProgressBar::hidden()
        };

        for file in &files {
            self.cancel.check()?;

            let shown = file.display_path();
            debug!("Extracting {}", shown);

            match self.parser.extract(&file.source_path) {
                Ok(result) => {
                    self.progress_manager.suspend(|| {
                        self.output_formatter.print_result(&shown, &result, self.show_chunks)
                    });
                    report.record_success(&file.display_path, result);
                }
                Err(ParseError::Cancelled) => return Err(ParseError::Cancelled),
                Err(e) => {
                    self.progress_manager
                        .suspend(|| self.output_formatter.print_user_friendly_error(&e));
                    progress.add_error(format!("{}: {}", shown, e));
                    report.record_failure(&file.display_path, &e);
                }
            }

            progress.update_file(shown, file.size);
            ui::progress::update_file_progress(&pb, &progress);
        }

        let elapsed = started.elapsed();
        ui::progress::finish_progress_with_summary(&pb, "Extraction finished", elapsed);
        self.progress_manager.clear();

        report.finish(elapsed);
        self.output_formatter.print_batch_summary(&report);

        Ok(report)
    }

    /// Print the entries of each container input.
    pub fn list(&self, inputs: &[PathBuf]) -> Result<()> {
        for input in inputs {
            self.cancel.check()?;
            let entries = self.parser.list_members(input)?;
            self.output_formatter
                .print_entries(&input.display().to_string(), &entries);
        }
        Ok(())
    }

    pub fn generate_sample_config<P: AsRef<Path>>(output_path: P) -> Result<()> {
        Config::default().save_to_file(output_path)
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn parser(&self) -> &DocumentParser {
        &self.parser
    }

    pub fn output_formatter(&self) -> &OutputFormatter {
        &self.output_formatter
    }

    pub fn is_running(&self) -> bool {
        !self.cancel.is_cancelled()
    }

    pub fn request_shutdown(&self) {
        self.cancel.cancel();
    }

    pub fn handle_error(&self, error: &ParseError) {
        self.output_formatter.print_user_friendly_error(error);
    }
}

pub fn version_info() -> &'static str {
    concat!(env!("CARGO_PKG_NAME"), " ", env!("CARGO_PKG_VERSION"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::write_zip;
    use tempfile::TempDir;

    fn tenderdocs() -> TenderDocs {
        TenderDocs::new_for_test(Config::default(), OutputMode::Plain, 0, true).unwrap()
    }

    #[test]
    fn test_collect_inputs_expands_directories() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        std::fs::create_dir(root.join("lots")).unwrap();
        std::fs::write(root.join("lots").join("b.txt"), "b").unwrap();
        std::fs::write(root.join("a.txt"), "a").unwrap();
        std::fs::write(root.join("budget.xlsx"), "x").unwrap();

        let explicit = root.join("budget.xlsx");
        let (files, failures) = tenderdocs().collect_inputs(&[root.to_path_buf(), explicit.clone()]);

        assert!(failures.is_empty());
        let sources: Vec<_> = files.iter().map(|f| f.source_path.clone()).collect();
        assert_eq!(
            sources,
            vec![root.join("a.txt"), root.join("lots").join("b.txt"), explicit]
        );
    }

    #[test]
    fn test_collect_inputs_reports_empty_directory() {
        let temp_dir = TempDir::new().unwrap();
        let (files, failures) = tenderdocs().collect_inputs(&[temp_dir.path().to_path_buf()]);

        assert!(files.is_empty());
        assert!(matches!(failures[0].1, ParseError::NoDocumentsFound { .. }));
    }

    #[test]
    fn test_run_batch_records_successes_and_failures() {
        let temp_dir = TempDir::new().unwrap();
        let text = temp_dir.path().join("notes.txt");
        std::fs::write(&text, "first\n\nsecond").unwrap();
        let bundle = temp_dir.path().join("bundle.zip");
        write_zip(&bundle, &[("a.txt", b"inner".as_slice()), ("setup.exe", b"MZ".as_slice())]);
        let unsupported = temp_dir.path().join("budget.xlsx");
        std::fs::write(&unsupported, "x").unwrap();

        let report = tenderdocs()
            .run_batch(&[text, bundle, unsupported])
            .unwrap();

        assert_eq!(report.summary.total_inputs, 3);
        assert_eq!(report.summary.succeeded, 2);
        assert_eq!(report.summary.failed, 1);
        assert_eq!(report.summary.placeholder_members, 1);
        assert_eq!(report.exit_code(), 2);
        assert_eq!(report.documents[0].result.chunks, vec!["first", "second"]);
    }

    #[test]
    fn test_run_batch_stops_when_cancelled() {
        let temp_dir = TempDir::new().unwrap();
        let text = temp_dir.path().join("notes.txt");
        std::fs::write(&text, "text").unwrap();

        let tenderdocs = tenderdocs();
        tenderdocs.request_shutdown();
        assert!(!tenderdocs.is_running());
        assert!(matches!(
            tenderdocs.run_batch(&[text]),
            Err(ParseError::Cancelled)
        ));
    }

    #[test]
    fn test_list_rejects_leaf_documents() {
        let temp_dir = TempDir::new().unwrap();
        let text = temp_dir.path().join("notes.txt");
        std::fs::write(&text, "text").unwrap();

        assert!(matches!(
            tenderdocs().list(&[text]),
            Err(ParseError::UnsupportedFormat { .. })
        ));
    }

    #[test]
    fn test_sample_config_generation() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("tenderdocs.toml");

        TenderDocs::generate_sample_config(&path).unwrap();
        let loaded = Config::load_from_file(&path).unwrap();
        assert_eq!(loaded.limits, ContainerLimits::default());
    }

    #[test]
    fn test_version_info() {
        assert!(version_info().starts_with("tenderdocs "));
    }
}
