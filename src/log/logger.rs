// src/log/logger.rs

use std::sync::Arc;

use tracing::{debug, error, info, warn};

use crate::log::channel::LogChannel;
use crate::log::entry::{JobSummary, LogEntry, LogScope, Severity};

/// Producer handle for one job's log.
///
/// Every entry is appended to the job's [`LogChannel`] and mirrored to
/// `tracing` with the job id attached. Verbose entries only reach the
/// channel when the job runs with verbose logging.
#[derive(Debug, Clone)]
pub struct JobLogger {
    job_id: Arc<str>,
    channel: Arc<LogChannel>,
    verbose: bool,
}

impl JobLogger {
    pub fn new(job_id: impl Into<Arc<str>>, channel: Arc<LogChannel>, verbose: bool) -> Self {
        Self {
            job_id: job_id.into(),
            channel,
            verbose,
        }
    }

    pub fn job_id(&self) -> &str {
        &self.job_id
    }

    pub fn info(&self, text: impl Into<String>) -> LogEntry {
        self.emit(Severity::Information, LogScope::Standard, text.into())
    }

    pub fn warn(&self, text: impl Into<String>) -> LogEntry {
        self.emit(Severity::Warning, LogScope::Standard, text.into())
    }

    pub fn error(&self, text: impl Into<String>) -> LogEntry {
        self.emit(Severity::Error, LogScope::Standard, text.into())
    }

    /// Verbose entry; `None` when verbose logging is off.
    pub fn verbose(&self, text: impl Into<String>) -> Option<LogEntry> {
        let text = text.into();
        if !self.verbose {
            debug!(job_id = %self.job_id, "{}", text);
            return None;
        }
        Some(self.emit(Severity::Verbose, LogScope::Standard, text))
    }

    /// Entry rendered as-is, without timestamp or severity decoration.
    pub fn no_prefix(&self, severity: Severity, text: impl Into<String>) -> LogEntry {
        self.emit(severity, LogScope::NoPrefix, text.into())
    }

    /// Emit the terminal summary entry.
    pub fn summary(&self, summary: &JobSummary) -> LogEntry {
        self.emit(summary.severity(), LogScope::Summary, summary.to_text())
    }

    fn emit(&self, severity: Severity, scope: LogScope, text: String) -> LogEntry {
        match severity {
            Severity::Information => info!(job_id = %self.job_id, ?scope, "{}", text),
            Severity::Warning => warn!(job_id = %self.job_id, ?scope, "{}", text),
            Severity::Error => error!(job_id = %self.job_id, ?scope, "{}", text),
            Severity::Verbose => debug!(job_id = %self.job_id, ?scope, "{}", text),
        }

        self.channel.append(LogEntry::new(severity, scope, text))
    }
}
