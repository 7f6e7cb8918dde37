pub mod fake_job;
pub mod recording_sink;

use std::sync::Once;
use std::time::Duration;

use tracing_subscriber::{fmt, EnvFilter};

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
            .with_test_writer() // print only for failing tests unless --nocapture
            .with_target(true)
            .init();
    });
}

/// Slack allowed on top of an expected duration under the paused test clock.
pub const TIMING_SLACK: Duration = Duration::from_millis(10);

/// `actual` is at least `expected` and at most `expected + TIMING_SLACK`.
pub fn approximately(actual: Duration, expected: Duration) -> bool {
    actual >= expected && actual <= expected + TIMING_SLACK
}

pub fn ms(n: u64) -> Duration {
    Duration::from_millis(n)
}
