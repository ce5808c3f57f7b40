// src/log/channel.rs

//! The buffer shared by the job (producer) and the caller loop (consumer).

use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};
use tokio::sync::Notify;

use crate::log::entry::LogEntry;

/// Ordered, timestamp-sortable job log.
///
/// Any number of producers may `append` concurrently. A single consumer
/// drains entries; a drained entry is gone for good.
#[derive(Debug, Default)]
pub struct LogChannel {
    buffer: Mutex<Buffer>,
    summary_posted: Notify,
}

#[derive(Debug, Default)]
struct Buffer {
    entries: Vec<LogEntry>,
    next_sequence: u64,
    latest: Option<DateTime<Utc>>,
}

impl LogChannel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an entry, stamping its sequence number. Returns the stamped
    /// copy.
    ///
    /// A summary is never stamped earlier than anything appended before it,
    /// so it still sorts last if the wall clock stepped backwards.
    pub fn append(&self, mut entry: LogEntry) -> LogEntry {
        let is_summary = entry.is_summary();

        {
            let mut buffer = self.lock();
            if let Some(latest) = buffer
                .latest
                .filter(|latest| is_summary && *latest > entry.timestamp)
            {
                entry.timestamp = latest;
            }
            buffer.latest = Some(buffer.latest.map_or(entry.timestamp, |l| l.max(entry.timestamp)));

            entry.sequence = buffer.next_sequence;
            buffer.next_sequence += 1;
            buffer.entries.push(entry.clone());
        }

        if is_summary {
            self.summary_posted.notify_one();
        }

        entry
    }

    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().entries.is_empty()
    }

    /// Remove and return every available entry in timestamp order, stopping
    /// right after the first summary entry. Anything ordered after the
    /// summary stays in the channel.
    pub fn drain_until_summary(&self) -> Vec<LogEntry> {
        let mut buffer = self.lock();
        let entries = &mut buffer.entries;
        entries.sort_by(LogEntry::drain_order);

        let end = entries
            .iter()
            .position(LogEntry::is_summary)
            .map(|idx| idx + 1)
            .unwrap_or(entries.len());

        entries.drain(..end).collect()
    }

    /// Resolves once a summary entry has been appended (immediately if one
    /// was appended before anyone waited).
    pub async fn summary_posted(&self) {
        self.summary_posted.notified().await;
    }

    fn lock(&self) -> MutexGuard<'_, Buffer> {
        self.buffer.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
