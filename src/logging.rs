//! Tracing setup for embedding applications.

use tracing_subscriber::EnvFilter;

/// Default filter when RUST_LOG is unset.
pub const DEFAULT_LOG_FILTER: &str = "medlens=info";

/// Initializes the global tracing subscriber. Call once at process start;
/// a second call is a no-op rather than a panic.
pub fn init() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER)),
        )
        .try_init();
}
