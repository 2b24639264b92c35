use crate::container::ContainerLimits;
use crate::error::{ParseError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    pub limits: ContainerLimits,
    pub extraction: ExtractionConfig,
    pub scan: ScanConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ExtractionConfig {
    /// Threads used for member extraction with the `parallel` feature.
    pub workers: usize,
    /// Parent directory for work areas; the system temp dir when unset.
    pub scratch_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ScanConfig {
    pub exclude_dirs: Vec<String>,
    pub exclude_patterns: Vec<String>,
    pub max_depth: usize,
    pub max_file_size: u64,
    pub follow_links: bool,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// `EnvFilter` directive, e.g. `info` or `tenderdocs=debug`.
    pub level: String,
    pub format: LogFormat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Pretty,
    #[default]
    Compact,
    Json,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            workers: num_cpus::get(),
            scratch_dir: None,
        }
    }
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            exclude_dirs: vec![
                ".git".to_string(),
                "__MACOSX".to_string(),
                "node_modules".to_string(),
            ],
            exclude_patterns: vec![
                r"^~\$.*".to_string(), // Office lock files
                r"^\..*".to_string(),
            ],
            max_depth: 10,
            max_file_size: 512 * 1024 * 1024, // 512MB
            follow_links: false,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "warn".to_string(),
            format: LogFormat::default(),
        }
    }
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(ParseError::Config {
                message: format!("Configuration file not found: {}", path.display()),
            });
        }

        let content = std::fs::read_to_string(path).map_err(|e| ParseError::Config {
            message: format!("Failed to read config file {}: {}", path.display(), e),
        })?;

        let config: Config = toml::from_str(&content).map_err(|e| ParseError::Config {
            message: format!("Failed to parse config file {}: {}", path.display(), e),
        })?;

        Ok(config)
    }

    pub fn load_with_defaults<P: AsRef<Path>>(config_path: Option<P>) -> Result<Self> {
        match config_path {
            Some(path) => Self::load_from_file(path),
            None => {
                let default_paths = ["tenderdocs.toml", ".tenderdocs.toml"];

                for default_path in &default_paths {
                    if Path::new(default_path).exists() {
                        return Self::load_from_file(default_path);
                    }
                }

                Ok(Self::default())
            }
        }
    }

    pub fn merge_with_cli_args(&mut self, cli_args: &CliOverrides) {
        if let Some(max_entries) = cli_args.max_entries {
            self.limits.max_entries = max_entries;
        }

        if let Some(max_total_size) = cli_args.max_total_size {
            self.limits.max_total_size = max_total_size;
        }

        if let Some(ref scratch_dir) = cli_args.scratch_dir {
            self.extraction.scratch_dir = Some(scratch_dir.clone());
        }

        if let Some(workers) = cli_args.workers {
            self.extraction.workers = workers;
        }

        if let Some(ref exclude) = cli_args.exclude {
            self.scan.exclude_dirs.extend(exclude.clone());
        }

        if let Some(ref level) = cli_args.log_level {
            self.logging.level = level.clone();
        }
    }

    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let content = toml::to_string_pretty(self).map_err(|e| ParseError::Config {
            message: format!("Failed to serialize config: {}", e),
        })?;

        std::fs::write(path, content).map_err(|e| ParseError::Config {
            message: format!("Failed to write config file {}: {}", path.display(), e),
        })?;

        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        let limits = &self.limits;
        if limits.max_entries == 0 {
            return Err(config_error("limits.max_entries must be greater than 0"));
        }
        if limits.max_entry_size == 0 || limits.max_total_size == 0 {
            return Err(config_error("Container size limits must be greater than 0"));
        }
        if limits.max_entry_size > limits.max_total_size {
            return Err(config_error(
                "limits.max_entry_size cannot exceed limits.max_total_size",
            ));
        }
        if limits.max_compression_ratio == 0 {
            return Err(config_error(
                "limits.max_compression_ratio must be greater than 0",
            ));
        }

        if self.extraction.workers == 0 {
            return Err(config_error("extraction.workers must be greater than 0"));
        }

        if let Some(ref scratch) = self.extraction.scratch_dir {
            if !scratch.is_dir() {
                return Err(ParseError::Config {
                    message: format!("Scratch directory does not exist: {}", scratch.display()),
                });
            }
        }

        if self.scan.max_depth == 0 {
            return Err(config_error("scan.max_depth must be greater than 0"));
        }
        if self.scan.max_file_size == 0 {
            return Err(config_error("scan.max_file_size must be greater than 0"));
        }
        for pattern in &self.scan.exclude_patterns {
            if let Err(e) = regex::Regex::new(pattern) {
                return Err(ParseError::Config {
                    message: format!("Invalid exclude pattern '{}': {}", pattern, e),
                });
            }
        }

        if let Err(e) = tracing_subscriber::EnvFilter::try_new(&self.logging.level) {
            return Err(ParseError::Config {
                message: format!("Invalid log level '{}': {}", self.logging.level, e),
            });
        }

        Ok(())
    }

    pub fn create_sample_config() -> String {
        let sample_config = Self::default();
        toml::to_string_pretty(&sample_config).unwrap_or_else(|_| String::new())
    }
}

fn config_error(message: &str) -> ParseError {
    ParseError::Config {
        message: message.to_string(),
    }
}

#[derive(Debug, Default)]
pub struct CliOverrides {
    pub max_entries: Option<usize>,
    pub max_total_size: Option<u64>,
    pub scratch_dir: Option<PathBuf>,
    pub workers: Option<usize>,
    pub exclude: Option<Vec<String>>,
    pub log_level: Option<String>,
}

impl CliOverrides {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_entries(mut self, max_entries: Option<usize>) -> Self {
        self.max_entries = max_entries;
        self
    }

    pub fn with_max_total_size(mut self, max_total_size: Option<u64>) -> Self {
        self.max_total_size = max_total_size;
        self
    }

    pub fn with_scratch_dir(mut self, scratch_dir: Option<PathBuf>) -> Self {
        self.scratch_dir = scratch_dir;
        self
    }

    pub fn with_workers(mut self, workers: Option<usize>) -> Self {
        self.workers = workers;
        self
    }

    pub fn with_exclude(mut self, exclude: Option<Vec<String>>) -> Self {
        self.exclude = exclude;
        self
    }

    pub fn with_log_level(mut self, level: Option<String>) -> Self {
        self.log_level = level;
        self
    }
}
