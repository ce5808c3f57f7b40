// src/log/mod.rs

//! The caller-facing job log.
//!
//! - [`entry`]: typed log entries and the summary payload.
//! - [`channel`]: the producer/consumer buffer.
//! - [`logger`]: the producer handle used by the orchestrator and executor.
//! - [`render`]: entry → console line.
//! - [`stream`]: the polling protocol used by the caller.

pub mod channel;
pub mod entry;
pub mod logger;
pub mod render;
pub mod stream;

pub use channel::LogChannel;
pub use entry::{JobSummary, LogEntry, LogScope, Severity};
pub use logger::JobLogger;
pub use render::{DisplayHint, RenderedLine, print_line, render};
pub use stream::{LogStream, PollLog};
