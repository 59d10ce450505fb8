//! Process-wide tracing subscriber setup.

use tracing_subscriber::EnvFilter;

/// Install a `fmt` subscriber writing to stderr. `RUST_LOG` takes precedence
/// over `level`.
///
/// Safe to call more than once; later calls are ignored.
pub fn init(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| filter_for(level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}

/// Build a filter from a configured level, falling back to `info` when the
/// level string cannot be parsed.
fn filter_for(level: &str) -> EnvFilter {
    EnvFilter::try_new(level).unwrap_or_else(|_| EnvFilter::new("info"))
}
