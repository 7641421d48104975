//! Output formatting and progress indicators
//!
//! Human-readable and JSON renderings of command results, plus the spinner
//! shown while targets build.

use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;

/// How command results are printed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OutputConfig {
    pub quiet: bool,
    pub json: bool,
    pub verbose: u8,
}

impl OutputConfig {
    pub fn new(quiet: bool, json: bool, verbose: u8) -> Self {
        Self {
            quiet,
            json,
            verbose,
        }
    }

    /// Spinners only make sense for interactive, non-JSON output
    pub fn show_progress(&self) -> bool {
        !self.quiet && !self.json
    }

    /// Print a human-readable line unless quiet or JSON
    pub fn line(&self, message: impl AsRef<str>) {
        if !self.quiet && !self.json {
            println!("{}", message.as_ref());
        }
    }

    /// Log filter directive for the requested verbosity
    pub fn log_level(&self) -> &'static str {
        if self.quiet {
            return "error";
        }
        match self.verbose {
            0 => "warn",
            1 => "info",
            2 => "debug",
            _ => "trace",
        }
    }
}

/// Print `value` as pretty JSON on stdout
pub fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Print an error chain on stderr
pub fn display_error(error: &anyhow::Error) {
    eprintln!("{} {error}", status::ERROR);
    for cause in error.chain().skip(1) {
        eprintln!("  caused by: {cause}");
    }
}

/// Create a spinner for operations with unknown duration
pub fn create_spinner(message: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::default_spinner()
        .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏")
        .template("{spinner:.blue} {msg}")
    {
        pb.set_style(style);
    }
    pb.set_message(message.to_string());
    pb.enable_steady_tick(std::time::Duration::from_millis(80));
    pb
}

/// Status message prefixes
pub mod status {
    pub const SUCCESS: &str = "✓";
    pub const ERROR: &str = "✗";
    pub const WARNING: &str = "⚠";
    pub const SKIPPED: &str = "-";
}
