//! Console logging for the grader and intake binaries.
//!
//! Log lines are the tool's progress output: which student is being graded,
//! how each fixture ran, and the per-file update counts. Reports and
//! `summary.json` are the durable record and are unaffected by `RUST_LOG`.

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize the tracing subscriber.
///
/// Reads `RUST_LOG` env var. Defaults to `info` if unset.
/// Output: stderr, compact format.
///
/// # Example
/// ```bash
/// RUST_LOG=grader=debug cargo run -p grader -- submissions/jane_doe_1234
/// ```
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr).compact())
        .init();
}
