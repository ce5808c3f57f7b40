// src/log/stream.rs

//! Consumer side of the job log: the polling protocol.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Local};
use tracing::debug;

use crate::log::channel::LogChannel;
use crate::log::render::{RenderedLine, render};

/// Result of one poll.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PollLog {
    /// Rendered lines, oldest first.
    pub lines: Vec<RenderedLine>,
    /// Set once the summary entry has been drained. Stays set.
    pub is_complete: bool,
}

/// Single-consumer reader of a job's [`LogChannel`].
///
/// Each poll drains every available entry in timestamp order and renders
/// it. Draining the summary entry completes the stream: it is the last line
/// returned, and later polls return nothing without touching the channel.
#[derive(Debug)]
pub struct LogStream {
    channel: Arc<LogChannel>,
    complete: bool,
}

impl LogStream {
    pub fn new(channel: Arc<LogChannel>) -> Self {
        Self {
            channel,
            complete: false,
        }
    }

    pub fn is_complete(&self) -> bool {
        self.complete
    }

    pub fn poll(&mut self) -> PollLog {
        self.poll_at(Local::now())
    }

    /// [`LogStream::poll`] with an explicit rendering time.
    pub fn poll_at(&mut self, now: DateTime<Local>) -> PollLog {
        if self.complete {
            return PollLog {
                lines: Vec::new(),
                is_complete: true,
            };
        }

        let drained = self.channel.drain_until_summary();
        let mut lines = Vec::with_capacity(drained.len());

        for entry in &drained {
            if entry.is_summary() {
                self.complete = true;
            }
            lines.push(render(entry, now));
        }

        if !lines.is_empty() {
            debug!(lines = lines.len(), complete = self.complete, "drained job log");
        }

        PollLog {
            lines,
            is_complete: self.complete,
        }
    }

    /// Wait for the next poll tick, then poll.
    ///
    /// The wait ends early when the job posts its summary, so completion is
    /// not delayed by a full interval.
    pub async fn next_poll(&mut self, interval: Duration) -> PollLog {
        if !self.complete {
            tokio::select! {
                _ = tokio::time::sleep(interval) => {}
                _ = self.channel.summary_posted() => {}
            }
        }
        self.poll()
    }
}
