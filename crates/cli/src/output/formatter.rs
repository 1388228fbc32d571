//! Output formatter for human-readable and JSON output
//!
//! Ensures consistent output formatting across all commands. In JSON mode
//! every progress event is printed as one JSON object per line.

use console::style;
use serde::Serialize;

use s3ops_core::ProgressEvent;

use super::OutputConfig;

/// How a progress event is presented in human mode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Channel {
    /// Plain stdout line
    Plain,
    /// Green check on stdout
    Success,
    /// Yellow warning on stderr
    Warning,
    /// Red cross on stderr, printed even in quiet mode
    Error,
}

impl Channel {
    pub fn of(event: &ProgressEvent) -> Self {
        match event {
            ProgressEvent::TransferFailed { .. } | ProgressEvent::DeleteFailed { .. } => {
                Channel::Error
            }
            ProgressEvent::NoObjectsFound { .. } => Channel::Warning,
            ProgressEvent::SummaryTotal { .. }
            | ProgressEvent::TransferSummary { .. }
            | ProgressEvent::DeleteSucceeded { .. } => Channel::Success,
            _ => Channel::Plain,
        }
    }
}

/// Formatter for CLI output
///
/// Handles both human-readable and JSON output formats based on configuration.
/// When JSON mode is enabled, all output is strict JSON without colors or progress.
#[derive(Debug, Clone)]
pub struct Formatter {
    config: OutputConfig,
}

impl Formatter {
    /// Create a new formatter with the given configuration
    pub fn new(config: OutputConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &OutputConfig {
        &self.config
    }

    /// Check if JSON output mode is enabled
    pub fn is_json(&self) -> bool {
        self.config.json
    }

    /// Check if quiet mode is enabled
    pub fn is_quiet(&self) -> bool {
        self.config.quiet
    }

    /// Check if colors are enabled
    pub fn colors_enabled(&self) -> bool {
        !self.config.no_color && !self.config.json
    }

    /// Print one progress event
    pub fn event(&self, event: &ProgressEvent) {
        if self.config.json {
            match json_line(event) {
                Ok(line) => println!("{line}"),
                Err(e) => eprintln!("Error serializing output: {e}"),
            }
            return;
        }

        let line = event.to_string();
        match Channel::of(event) {
            Channel::Plain => self.println(&line),
            Channel::Success => self.success(&line),
            Channel::Warning => self.warning(&line),
            Channel::Error => self.error(&line),
        }
    }

    /// Output a success message
    pub fn success(&self, message: &str) {
        if self.config.quiet || self.config.json {
            return;
        }

        if self.colors_enabled() {
            println!("{} {message}", style("✓").green());
        } else {
            println!("✓ {message}");
        }
    }

    /// Output an error message
    ///
    /// Errors are always printed, even in quiet mode.
    pub fn error(&self, message: &str) {
        if self.config.json {
            eprintln!("{}", serde_json::json!({ "error": message }));
        } else if self.colors_enabled() {
            eprintln!("{} {message}", style("✗").red());
        } else {
            eprintln!("✗ {message}");
        }
    }

    /// Output a warning message
    pub fn warning(&self, message: &str) {
        if self.config.quiet || self.config.json {
            return;
        }

        if self.colors_enabled() {
            eprintln!("{} {message}", style("⚠").yellow());
        } else {
            eprintln!("⚠ {message}");
        }
    }

    /// Output JSON directly
    pub fn json<T: Serialize>(&self, value: &T) {
        match serde_json::to_string_pretty(value) {
            Ok(json) => println!("{json}"),
            Err(e) => eprintln!("Error serializing output: {e}"),
        }
    }

    /// Print a line of text (respects quiet mode)
    pub fn println(&self, message: &str) {
        if self.config.quiet {
            return;
        }
        println!("{message}");
    }
}

impl Default for Formatter {
    fn default() -> Self {
        Self::new(OutputConfig::default())
    }
}

/// One NDJSON line for an event
pub fn json_line(event: &ProgressEvent) -> serde_json::Result<String> {
    serde_json::to_string(event)
}
