//! Structured logging setup.

use tracing_subscriber::EnvFilter;

/// Event filter from `RUST_LOG`, falling back to `socialgraph=info`.
fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("socialgraph=info"))
}

/// Initialize compact structured logging on stderr with `RUST_LOG` support.
///
/// Defaults to `socialgraph=info` when `RUST_LOG` is not set. Stdout is left
/// to the embedding program. Only the first call installs a subscriber.
pub fn init_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter())
        .with_writer(std::io::stderr)
        .with_target(true)
        .compact()
        .try_init();
}
