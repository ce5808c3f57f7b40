// src/log/entry.rs

use std::cmp::Ordering;

use chrono::{DateTime, Utc};

use crate::types::JobState;

/// Severity of a job log entry, decided by the producer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Information,
    Warning,
    Error,
    Verbose,
}

/// How an entry is routed and decorated when rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogScope {
    /// Regular progress line, prefixed with the rendering time.
    Standard,
    /// Printed as is, no decoration.
    NoPrefix,
    /// The terminal job summary. Undecorated, and marks job completion.
    Summary,
}

/// One line of the job log.
#[derive(Debug, Clone, PartialEq)]
pub struct LogEntry {
    pub timestamp: DateTime<Utc>,
    /// Assigned by the channel on append; breaks timestamp ties.
    pub sequence: u64,
    pub severity: Severity,
    pub scope: LogScope,
    pub text: String,
}

impl LogEntry {
    /// New entry stamped with the current time.
    pub fn new(severity: Severity, scope: LogScope, text: impl Into<String>) -> Self {
        Self::at(Utc::now(), severity, scope, text)
    }

    pub fn at(
        timestamp: DateTime<Utc>,
        severity: Severity,
        scope: LogScope,
        text: impl Into<String>,
    ) -> Self {
        Self {
            timestamp,
            sequence: 0,
            severity,
            scope,
            text: text.into(),
        }
    }

    pub fn is_summary(&self) -> bool {
        self.scope == LogScope::Summary
    }

    /// Drain order: timestamp, then append sequence.
    pub fn drain_order(a: &LogEntry, b: &LogEntry) -> Ordering {
        a.timestamp
            .cmp(&b.timestamp)
            .then(a.sequence.cmp(&b.sequence))
    }
}

/// Content of the terminal summary entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobSummary {
    pub job_id: String,
    pub status: JobState,
    pub total_requests: u64,
    pub message: String,
}

impl JobSummary {
    pub fn severity(&self) -> Severity {
        match self.status {
            JobState::Succeeded => Severity::Information,
            _ => Severity::Error,
        }
    }

    pub fn to_text(&self) -> String {
        format!(
            "JobId: {}\nStatus: {}\nTotal Requests: {}\nMessage: {}",
            self.job_id, self.status, self.total_requests, self.message
        )
    }
}
