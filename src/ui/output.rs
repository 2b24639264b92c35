use crate::container::ContainerEntry;
use crate::error::{format_bytes, ParseError, UserFriendlyError};
use crate::parser::{ExtractionResult, MemberStatus};
use crate::report::BatchReport;
use console::{style, Emoji, Term};
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum OutputMode {
    Human,
    Json,
    Plain,
}

impl OutputMode {
    pub fn from_string(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "json" => OutputMode::Json,
            "plain" => OutputMode::Plain,
            _ => OutputMode::Human,
        }
    }
}

// Emojis with text fallbacks
static CHECKMARK: Emoji = Emoji("✅ ", "✓ ");
static CROSS: Emoji = Emoji("❌ ", "✗ ");
static INFO: Emoji = Emoji("ℹ️  ", "i ");
static WARNING: Emoji = Emoji("⚠️  ", "! ");
static PAGE: Emoji = Emoji("📄 ", "# ");

/// Renders results on stdout and status messages on stderr.
pub struct OutputFormatter {
    mode: OutputMode,
    use_colors: bool,
    verbose_level: u8,
    quiet: bool,
}

impl OutputFormatter {
    pub fn new(mode: OutputMode, verbose: u8, quiet: bool) -> Self {
        let use_colors = match mode {
            OutputMode::Human => Term::stderr().features().colors_supported() && !quiet,
            _ => false,
        };

        Self {
            mode,
            use_colors,
            verbose_level: if quiet { 0 } else { verbose },
            quiet,
        }
    }

    pub fn mode(&self) -> OutputMode {
        self.mode
    }

    // Status messages
    pub fn success(&self, message: &str) {
        if self.should_show_message(0) {
            match self.mode {
                OutputMode::Human => self.print_human_message(MessageType::Success, message),
                OutputMode::Json => self.print_json_message("success", message),
                OutputMode::Plain => eprintln!("SUCCESS: {}", message),
            }
        }
    }

    pub fn error(&self, message: &str) {
        match self.mode {
            OutputMode::Human => self.print_human_message(MessageType::Error, message),
            OutputMode::Json => self.print_json_message("error", message),
            OutputMode::Plain => eprintln!("ERROR: {}", message),
        }
    }

    pub fn warning(&self, message: &str) {
        if self.should_show_message(0) {
            match self.mode {
                OutputMode::Human => self.print_human_message(MessageType::Warning, message),
                OutputMode::Json => self.print_json_message("warning", message),
                OutputMode::Plain => eprintln!("WARNING: {}", message),
            }
        }
    }

    pub fn info(&self, message: &str) {
        if self.should_show_message(1) {
            match self.mode {
                OutputMode::Human => self.print_human_message(MessageType::Info, message),
                OutputMode::Json => self.print_json_message("info", message),
                OutputMode::Plain => eprintln!("INFO: {}", message),
            }
        }
    }

    pub fn debug(&self, message: &str) {
        if self.should_show_message(2) {
            match self.mode {
                OutputMode::Human => {
                    if self.use_colors {
                        eprintln!("  {}", style(message).dim());
                    } else {
                        eprintln!("  DEBUG: {}", message);
                    }
                }
                OutputMode::Json => self.print_json_message("debug", message),
                OutputMode::Plain => eprintln!("DEBUG: {}", message),
            }
        }
    }

    pub fn print_user_friendly_error(&self, error: &ParseError) {
        self.error(&error.user_message());

        if let Some(suggestion) = error.suggestion() {
            match self.mode {
                OutputMode::Human => {
                    if self.use_colors {
                        eprintln!("{}{}", INFO, style(format!("Suggestion: {}", suggestion)).cyan());
                    } else {
                        eprintln!("Suggestion: {}", suggestion);
                    }
                }
                OutputMode::Json => {
                    self.print_json_status(&serde_json::json!({
                        "type": "suggestion",
                        "message": suggestion
                    }));
                }
                OutputMode::Plain => eprintln!("SUGGESTION: {}", suggestion),
            }
        }
    }

    /// Print one extraction result on stdout.
    pub fn print_result(&self, source: &str, result: &ExtractionResult, show_chunks: bool) {
        match self.mode {
            OutputMode::Json => match serde_json::to_string(result) {
                Ok(line) => println!("{}", line),
                Err(e) => self.error(&format!("Failed to serialize result for {}: {}", source, e)),
            },
            OutputMode::Plain => println!("{}", result.text),
            OutputMode::Human => self.print_human_result(source, result, show_chunks),
        }
    }

    /// Print the entries of a container on stdout.
    pub fn print_entries(&self, source: &str, entries: &[ContainerEntry]) {
        match self.mode {
            OutputMode::Json => {
                let listing = serde_json::json!({ "container": source, "entries": entries });
                println!("{}", listing);
            }
            OutputMode::Plain => {
                for entry in entries {
                    println!("{}", entry.name);
                }
            }
            OutputMode::Human => {
                self.print_header(source);
                for entry in entries {
                    if entry.is_dir {
                        println!("  {:>10}  {}", "-", entry.name);
                    } else {
                        println!(
                            "  {:>10}  {}",
                            format_bytes(entry.size),
                            entry.name
                        );
                    }
                }
                println!();
                println!("  {} entries", entries.len());
            }
        }
    }

    pub fn print_batch_summary(&self, report: &BatchReport) {
        if self.quiet || self.mode == OutputMode::Json {
            return;
        }

        let summary = &report.summary;
        match self.mode {
            OutputMode::Human => {
                self.print_separator();
                let headline = format!(
                    "Processed {} of {} inputs",
                    summary.succeeded, summary.total_inputs
                );
                if summary.failed == 0 {
                    self.print_human_message(MessageType::Success, &headline);
                } else {
                    self.print_human_message(MessageType::Warning, &headline);
                }
                eprintln!("  Characters:   {}", summary.total_chars);
                eprintln!("  Chunks:       {}", summary.total_chunks);
                if summary.placeholder_members > 0 {
                    eprintln!("  Placeholders: {}", summary.placeholder_members);
                }
                if summary.failed > 0 {
                    eprintln!("  Failures:     {}", summary.failed);
                }
                eprintln!("  Time taken:   {}", format_duration(summary.duration));
            }
            _ => {
                eprintln!(
                    "COMPLETED: {} succeeded, {} failed",
                    summary.succeeded, summary.failed
                );
            }
        }
    }

    pub fn print_header(&self, title: &str) {
        if self.use_colors {
            println!("{}{}", PAGE, style(title).bold().cyan());
        } else {
            println!("=== {} ===", title);
        }
    }

    pub fn print_separator(&self) {
        if self.quiet || self.mode == OutputMode::Json {
            return;
        }
        if self.use_colors {
            eprintln!("{}", style("─".repeat(60)).dim());
        } else {
            eprintln!("{}", "-".repeat(60));
        }
    }

    fn should_show_message(&self, min_verbose_level: u8) -> bool {
        !self.quiet && self.verbose_level >= min_verbose_level
    }

    fn print_human_result(&self, source: &str, result: &ExtractionResult, show_chunks: bool) {
        self.print_header(source);
        println!(
            "type: {}  chars: {}  chunks: {}",
            result.format,
            result.text.chars().count(),
            result.chunks.len()
        );

        let degraded: Vec<_> = result
            .members
            .iter()
            .filter(|m| m.status != MemberStatus::Extracted)
            .collect();
        if !degraded.is_empty() {
            println!("placeholders: {}", degraded.len());
        }
        println!();

        if show_chunks {
            for (index, chunk) in result.chunks.iter().enumerate() {
                if self.use_colors {
                    println!("{}", style(format!("[chunk {}]", index + 1)).dim());
                } else {
                    println!("[chunk {}]", index + 1);
                }
                println!("{}", chunk);
                println!();
            }
        } else {
            println!("{}", result.text);
            println!();
        }
    }

    fn print_human_message(&self, msg_type: MessageType, message: &str) {
        if self.use_colors {
            let (emoji, styled) = match msg_type {
                MessageType::Success => (&CHECKMARK, style(message).green().bold()),
                MessageType::Error => (&CROSS, style(message).red().bold()),
                MessageType::Warning => (&WARNING, style(message).yellow().bold()),
                MessageType::Info => (&INFO, style(message).cyan()),
            };
            eprintln!("{}{}", emoji, styled);
        } else {
            let prefix = match msg_type {
                MessageType::Success => "✓",
                MessageType::Error => "✗",
                MessageType::Warning => "!",
                MessageType::Info => "i",
            };
            eprintln!("{} {}", prefix, message);
        }
    }

    fn print_json_message(&self, level: &str, message: &str) {
        self.print_json_status(&serde_json::json!({
            "type": "message",
            "level": level,
            "message": message,
            "timestamp": chrono::Utc::now().to_rfc3339()
        }));
    }

    fn print_json_status(&self, obj: &serde_json::Value) {
        eprintln!(
            "{}",
            serde_json::to_string(obj).unwrap_or_else(|_| "{}".to_string())
        );
    }
}

#[derive(Debug, Clone, Copy)]
enum MessageType {
    Success,
    Error,
    Warning,
    Info,
}

fn format_duration(duration: Duration) -> String {
    let secs = duration.as_secs();
    if secs >= 60 {
        format!("{}m {}s", secs / 60, secs % 60)
    } else if secs > 0 {
        format!("{}s", secs)
    } else {
        format!("{}ms", duration.as_millis())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_output_mode_parsing() {
        assert_eq!(OutputMode::from_string("human"), OutputMode::Human);
        assert_eq!(OutputMode::from_string("JSON"), OutputMode::Json);
        assert_eq!(OutputMode::from_string("plain"), OutputMode::Plain);
        assert_eq!(OutputMode::from_string("invalid"), OutputMode::Human);
    }

    #[test]
    fn test_quiet_mode() {
        let formatter = OutputFormatter::new(OutputMode::Human, 2, true);
        assert_eq!(formatter.verbose_level, 0);
        assert!(!formatter.use_colors);
        assert!(!formatter.should_show_message(0));
    }

    #[test]
    fn test_should_show_message() {
        let formatter = OutputFormatter::new(OutputMode::Plain, 1, false);
        assert!(formatter.should_show_message(0));
        assert!(formatter.should_show_message(1));
        assert!(!formatter.should_show_message(2));
        assert!(!formatter.use_colors);
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(Duration::from_secs(30)), "30s");
        assert_eq!(format_duration(Duration::from_secs(90)), "1m 30s");
        assert_eq!(format_duration(Duration::from_millis(500)), "500ms");
    }
}
