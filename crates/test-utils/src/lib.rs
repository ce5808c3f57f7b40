pub mod builders;
pub mod fake_api;
pub mod fake_source;

use std::sync::Once;
use std::time::Duration;

use drmdeploy::engine::JobHandle;
use drmdeploy::log::RenderedLine;
use tracing_subscriber::{EnvFilter, fmt};

static INIT: Once = Once::new();

/// Initialise tracing for tests.
///
/// - Uses `with_test_writer()`, so logs are captured per-test.
/// - The Rust test harness only prints captured output for **failing** tests
///   (unless you run with `-- --nocapture`).
///
/// Enable levels with e.g.:
/// `RUST_LOG=debug cargo test`
pub fn init_tracing() {
    INIT.call_once(|| {
        let filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

        fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .with_target(true)
            .init();
    });
}

/// Run a future with a 5-second timeout.
pub async fn with_timeout<F, T>(f: F) -> T
where
    F: std::future::Future<Output = T>,
{
    tokio::time::timeout(Duration::from_secs(5), f)
        .await
        .expect("Test timed out after 5 seconds")
}

/// Poll a job until its summary has been drained and return every line.
pub async fn drain_job(handle: &mut JobHandle) -> Vec<RenderedLine> {
    with_timeout(async {
        let mut lines = Vec::new();
        loop {
            let poll = handle.next_poll(Duration::from_millis(20)).await;
            lines.extend(poll.lines);
            if poll.is_complete {
                return lines;
            }
        }
    })
    .await
}

/// The summary line of a drained job log.
pub fn summary_line(lines: &[RenderedLine]) -> &RenderedLine {
    lines
        .iter()
        .find(|l| l.is_summary)
        .expect("job log has no summary line")
}
