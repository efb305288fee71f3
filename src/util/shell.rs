//! Terminal output for the CLI.
//!
//! Human mode prints right-aligned status lines and a spinner while cargo
//! runs. JSON mode prints one [`BuildEvent`] per line on stdout and nothing
//! else.

use std::fmt::Display;
use std::io::{self, IsTerminal, Write};
use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};

use crate::builder::events::BuildEvent;
use crate::util::diagnostic::Diagnostic;

/// Shell output mode - Human and Json are mutually exclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShellMode {
    Human { verbose: bool, color: ColorChoice },
    Json,
}

/// Color output mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ColorChoice {
    /// Detect TTY and use colors if available.
    #[default]
    Auto,
    Always,
    Never,
}

/// Status types for output messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Building,
    Finished,
    Created,
    Warning,
    Error,
}

impl Status {
    fn as_str(&self) -> &'static str {
        match self {
            Status::Building => "Building",
            Status::Finished => "Finished",
            Status::Created => "Created",
            Status::Warning => "Warning",
            Status::Error => "error",
        }
    }

    fn color_code(&self) -> &'static str {
        match self {
            Status::Finished | Status::Created => "\x1b[1;32m",
            Status::Building => "\x1b[1;36m",
            Status::Warning => "\x1b[1;33m",
            Status::Error => "\x1b[1;31m",
        }
    }
}

const STATUS_WIDTH: usize = 12;

/// Central shell for all CLI output.
#[derive(Debug)]
pub struct Shell {
    mode: ShellMode,
    use_color: bool,
}

impl Shell {
    pub fn new(mode: ShellMode) -> Self {
        let use_color = match mode {
            ShellMode::Json => false,
            ShellMode::Human { color, .. } => match color {
                ColorChoice::Auto => io::stderr().is_terminal(),
                ColorChoice::Always => true,
                ColorChoice::Never => false,
            },
        };

        Shell { mode, use_color }
    }

    /// Create a shell from CLI flags. JSON mode wins over verbosity.
    pub fn from_flags(verbose: bool, no_color: bool, json: bool) -> Self {
        if json {
            return Shell::new(ShellMode::Json);
        }
        let color = if no_color {
            ColorChoice::Never
        } else {
            ColorChoice::Auto
        };
        Shell::new(ShellMode::Human { verbose, color })
    }

    pub fn is_json(&self) -> bool {
        matches!(self.mode, ShellMode::Json)
    }

    pub fn is_verbose(&self) -> bool {
        matches!(self.mode, ShellMode::Human { verbose: true, .. })
    }

    pub fn use_color(&self) -> bool {
        self.use_color
    }

    /// Print `{status:>12} {message}` to stderr. Silent in JSON mode.
    pub fn status(&self, status: Status, msg: impl Display) {
        if self.is_json() {
            return;
        }
        eprintln!("{} {}", self.format_status(status), msg);
    }

    /// Print a build event to stdout. Only in JSON mode.
    pub fn event(&self, event: &BuildEvent) {
        if !self.is_json() {
            return;
        }
        println!("{}", event.to_json());
        let _ = io::stdout().flush();
    }

    /// Print a diagnostic to stderr. Silent in JSON mode, where failures are
    /// reported as events.
    pub fn diagnostic(&self, diagnostic: &Diagnostic) {
        if self.is_json() {
            return;
        }
        eprint!("{}", diagnostic.format(self.use_color));
    }

    /// Start a spinner with `msg`.
    ///
    /// Hidden in JSON and verbose mode, where it would interleave with
    /// other output, and when stderr is not a terminal.
    pub fn spinner(&self, msg: impl Display) -> Spinner {
        let pb = if self.is_json() || self.is_verbose() || !io::stderr().is_terminal() {
            None
        } else {
            let pb = ProgressBar::new_spinner();
            if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.green} {msg} [{elapsed}]") {
                pb.set_style(style);
            }
            pb.set_message(msg.to_string());
            pb.enable_steady_tick(Duration::from_millis(100));
            Some(pb)
        };

        Spinner { pb }
    }

    fn format_status(&self, status: Status) -> String {
        let text = status.as_str();
        if self.use_color {
            format!("{}{:>width$}\x1b[0m", status.color_code(), text, width = STATUS_WIDTH)
        } else {
            format!("{:>width$}", text, width = STATUS_WIDTH)
        }
    }
}

/// A running spinner; cleared when finished or dropped.
pub struct Spinner {
    pb: Option<ProgressBar>,
}

impl Spinner {
    pub fn finish(self) {}
}

impl Drop for Spinner {
    fn drop(&mut self) {
        if let Some(pb) = &self.pb {
            pb.finish_and_clear();
        }
    }
}

/// Format a duration in a human-readable way.
pub fn format_duration(duration: Duration) -> String {
    let secs = duration.as_secs_f64();
    if secs < 60.0 {
        format!("{:.2}s", secs)
    } else {
        format!("{:.1}m", secs / 60.0)
    }
}

/// Format a byte count with a binary unit.
pub fn format_size(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["B", "KiB", "MiB", "GiB"];
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{} B", bytes)
    } else {
        format!("{:.1} {}", value, UNITS[unit])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_flags() {
        let shell = Shell::from_flags(false, true, false);
        assert!(!shell.is_json());
        assert!(!shell.is_verbose());
        assert!(!shell.use_color());

        let shell = Shell::from_flags(true, true, false);
        assert!(shell.is_verbose());

        // JSON takes precedence
        let shell = Shell::from_flags(true, false, true);
        assert!(shell.is_json());
        assert!(!shell.is_verbose());
        assert!(!shell.use_color());
    }

    #[test]
    fn test_status_formatting() {
        let shell = Shell::from_flags(false, true, false);
        let formatted = shell.format_status(Status::Finished);
        assert_eq!(formatted.trim(), "Finished");
        assert_eq!(formatted.len(), STATUS_WIDTH);
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(Duration::from_millis(500)), "0.50s");
        assert_eq!(format_duration(Duration::from_secs(2)), "2.00s");
        assert_eq!(format_duration(Duration::from_secs(90)), "1.5m");
    }

    #[test]
    fn test_format_size() {
        assert_eq!(format_size(512), "512 B");
        assert_eq!(format_size(2048), "2.0 KiB");
        assert_eq!(format_size(5 * 1024 * 1024 + 512 * 1024), "5.5 MiB");
    }
}
