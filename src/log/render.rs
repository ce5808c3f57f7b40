// src/log/render.rs

//! Turning job log entries into console lines.

use chrono::{DateTime, Local};
use colored::Colorize;

use crate::log::entry::{LogEntry, LogScope, Severity};

/// Timestamp prefix format of standard entries.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// How the caller should present a line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisplayHint {
    Info,
    Warn,
    Error,
    Verbose,
}

impl From<Severity> for DisplayHint {
    fn from(severity: Severity) -> Self {
        match severity {
            Severity::Information => DisplayHint::Info,
            Severity::Warning => DisplayHint::Warn,
            Severity::Error => DisplayHint::Error,
            Severity::Verbose => DisplayHint::Verbose,
        }
    }
}

/// A job log entry ready for display.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedLine {
    pub hint: DisplayHint,
    pub text: String,
    /// Summary lines are set apart from the progress output.
    pub blank_line_before: bool,
    pub is_summary: bool,
}

/// Render one entry. `now` is the rendering time used for the prefix.
pub fn render(entry: &LogEntry, now: DateTime<Local>) -> RenderedLine {
    let hint = DisplayHint::from(entry.severity);

    let text = match (entry.scope, entry.severity) {
        (LogScope::Summary, _) => entry.text.trim_start().to_string(),
        (LogScope::NoPrefix, _) => entry.text.clone(),
        (LogScope::Standard, Severity::Verbose) => format!("VERBOSE: {}", entry.text),
        (LogScope::Standard, _) => format!("{} {}", now.format(TIMESTAMP_FORMAT), entry.text),
    };

    RenderedLine {
        hint,
        text,
        blank_line_before: entry.is_summary(),
        is_summary: entry.is_summary(),
    }
}

/// Print a rendered line to stdout, coloured by its hint.
pub fn print_line(line: &RenderedLine) {
    if line.blank_line_before {
        println!();
    }

    match line.hint {
        DisplayHint::Info => println!("{}", line.text),
        DisplayHint::Warn | DisplayHint::Verbose => println!("{}", line.text.yellow()),
        DisplayHint::Error => println!("{}", line.text.red()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn fixed_now() -> DateTime<Local> {
        Local.with_ymd_and_hms(2024, 3, 1, 9, 30, 0).unwrap()
    }

    #[test]
    fn standard_entries_get_rendering_time() {
        let entry = LogEntry::new(Severity::Warning, LogScope::Standard, "slow response");
        let line = render(&entry, fixed_now());
        assert_eq!(line.text, "2024-03-01 09:30:00 slow response");
        assert_eq!(line.hint, DisplayHint::Warn);
        assert!(!line.blank_line_before);
    }

    #[test]
    fn verbose_entries_have_no_time() {
        let entry = LogEntry::new(Severity::Verbose, LogScope::Standard, "deploying web");
        let line = render(&entry, fixed_now());
        assert_eq!(line.text, "VERBOSE: deploying web");
        assert_eq!(line.hint, DisplayHint::Verbose);
    }

    #[test]
    fn no_prefix_and_summary_are_undecorated() {
        let plain = LogEntry::new(Severity::Error, LogScope::NoPrefix, "raw");
        assert_eq!(render(&plain, fixed_now()).text, "raw");

        let summary = LogEntry::new(Severity::Information, LogScope::Summary, "  JobId: x");
        let line = render(&summary, fixed_now());
        assert_eq!(line.text, "JobId: x");
        assert!(line.is_summary);
        assert!(line.blank_line_before);
    }
}
