use crate::config::{CliOverrides, Config};
use crate::error::Result;
use crate::logging::level_for_verbosity;
use clap::{Parser, ValueEnum};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "tenderdocs")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Extract normalized text from procurement documents")]
#[command(
    long_about = "TenderDocs extracts plain text from PDF, DOCX and text files, and from \
                  ZIP and EDOC containers holding them, and splits it into paragraph chunks."
)]
#[command(after_help = "EXAMPLES:\n  \
    tenderdocs offer.pdf\n  \
    tenderdocs tender.zip --output-format json\n  \
    tenderdocs signed.edoc --chunks\n  \
    tenderdocs ./procurement --report report.json --exclude archive\n  \
    tenderdocs tender.zip --list")]
#[command(arg_required_else_help = true)]
pub struct Cli {
    /// Files or directories to extract
    #[arg(required_unless_present = "generate_config")]
    pub inputs: Vec<PathBuf>,

    /// Configuration file path
    #[arg(short, long, help = "Path to TOML configuration file")]
    pub config: Option<PathBuf>,

    /// Output format for results
    #[arg(long, value_enum, default_value_t = OutputFormat::Human)]
    pub output_format: OutputFormat,

    /// Print chunks instead of the joined text
    #[arg(long)]
    pub chunks: bool,

    /// Write a JSON batch report to this path
    #[arg(short, long)]
    pub report: Option<PathBuf>,

    /// List container entries instead of extracting them
    #[arg(short, long)]
    pub list: bool,

    /// Maximum number of entries in a container
    #[arg(long)]
    pub max_entries: Option<usize>,

    /// Maximum total uncompressed size of a container (e.g. 512MB)
    #[arg(long, value_parser = parse_size_string)]
    pub max_total_size: Option<u64>,

    /// Directory under which per-container work areas are created
    #[arg(long)]
    pub scratch_dir: Option<PathBuf>,

    /// Worker threads for member extraction
    #[arg(short, long)]
    pub workers: Option<usize>,

    /// Directories to skip when scanning (comma-separated)
    #[arg(short, long, value_delimiter = ',')]
    pub exclude: Option<Vec<String>>,

    /// Verbose output level (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Quiet mode (suppress non-essential output)
    #[arg(short, long, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Generate sample configuration file
    #[arg(long, help = "Write a sample configuration file (to --config or tenderdocs.toml)")]
    pub generate_config: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable colored output
    Human,
    /// One JSON object per document
    Json,
    /// Extracted text only
    Plain,
}

impl Cli {
    pub fn load_config(&self) -> Result<Config> {
        let mut config = Config::load_with_defaults(self.config.as_ref())?;

        let overrides = self.create_cli_overrides();
        config.merge_with_cli_args(&overrides);
        config.validate()?;

        Ok(config)
    }

    pub fn create_cli_overrides(&self) -> CliOverrides {
        CliOverrides::new()
            .with_max_entries(self.max_entries)
            .with_max_total_size(self.max_total_size)
            .with_scratch_dir(self.scratch_dir.clone())
            .with_workers(self.workers)
            .with_exclude(self.exclude.clone())
            .with_log_level(level_for_verbosity(self.verbose, self.quiet).map(str::to_string))
    }

    pub fn config_output_path(&self) -> PathBuf {
        self.config
            .clone()
            .unwrap_or_else(|| PathBuf::from("tenderdocs.toml"))
    }

    pub fn is_verbose(&self) -> bool {
        self.verbose > 0 && !self.quiet
    }

    pub fn verbosity_level(&self) -> u8 {
        if self.quiet {
            0
        } else {
            self.verbose
        }
    }
}

pub fn parse_size_string(s: &str) -> std::result::Result<u64, String> {
    let s = s.trim().to_lowercase();

    let (number_str, multiplier) = if s.ends_with("kb") || s.ends_with('k') {
        (s.trim_end_matches("kb").trim_end_matches('k'), 1024)
    } else if s.ends_with("mb") || s.ends_with('m') {
        (s.trim_end_matches("mb").trim_end_matches('m'), 1024 * 1024)
    } else if s.ends_with("gb") || s.ends_with('g') {
        (
            s.trim_end_matches("gb").trim_end_matches('g'),
            1024 * 1024 * 1024,
        )
    } else if s.ends_with('b') {
        (s.trim_end_matches('b'), 1)
    } else {
        (s.as_str(), 1)
    };

    let number: f64 = number_str
        .parse()
        .map_err(|_| format!("Invalid number format: {}", number_str))?;

    if number < 0.0 {
        return Err("Size cannot be negative".to_string());
    }

    Ok((number * multiplier as f64) as u64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_size_string() {
        assert_eq!(parse_size_string("10").unwrap(), 10);
        assert_eq!(parse_size_string("10KB").unwrap(), 10 * 1024);
        assert_eq!(parse_size_string("5MB").unwrap(), 5 * 1024 * 1024);
        assert_eq!(parse_size_string("1GB").unwrap(), 1024 * 1024 * 1024);

        assert!(parse_size_string("invalid").is_err());
        assert!(parse_size_string("-5MB").is_err());
    }

    #[test]
    fn test_parse_arguments() {
        let cli = Cli::try_parse_from([
            "tenderdocs",
            "tender.zip",
            "offer.pdf",
            "--output-format",
            "json",
            "--max-total-size",
            "64MB",
            "--exclude",
            "archive,old",
            "-vv",
        ])
        .unwrap();

        assert_eq!(cli.inputs, vec![PathBuf::from("tender.zip"), PathBuf::from("offer.pdf")]);
        assert_eq!(cli.output_format, OutputFormat::Json);
        assert_eq!(cli.max_total_size, Some(64 * 1024 * 1024));
        assert_eq!(cli.verbosity_level(), 2);
        assert!(cli.is_verbose());

        let overrides = cli.create_cli_overrides();
        assert_eq!(overrides.exclude, Some(vec!["archive".to_string(), "old".to_string()]));
        assert_eq!(overrides.log_level.as_deref(), Some("debug"));
    }

    #[test]
    fn test_inputs_required_unless_generating_config() {
        assert!(Cli::try_parse_from(["tenderdocs", "--chunks"]).is_err());

        let cli = Cli::try_parse_from(["tenderdocs", "--generate-config"]).unwrap();
        assert!(cli.inputs.is_empty());
        assert_eq!(cli.config_output_path(), PathBuf::from("tenderdocs.toml"));
    }

    #[test]
    fn test_quiet_conflicts_with_verbose() {
        assert!(Cli::try_parse_from(["tenderdocs", "a.pdf", "-q", "-v"]).is_err());
    }

    #[test]
    fn test_load_config_applies_overrides() {
        let cli = Cli::try_parse_from(["tenderdocs", "a.pdf", "--max-entries", "50", "-w", "2"])
            .unwrap();
        let config = cli.load_config().unwrap();

        assert_eq!(config.limits.max_entries, 50);
        assert_eq!(config.extraction.workers, 2);
    }
}
