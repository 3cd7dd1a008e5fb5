//! Diagnostic logging to stderr.
//!
//! Filter comes from GMAIL_TOKEN_LOG, then RUST_LOG, defaulting to `warn`.
//! User-facing progress is printed directly and does not go through here.

use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

pub const LOG_ENV: &str = "GMAIL_TOKEN_LOG";

fn filter_directive() -> String {
    std::env::var(LOG_ENV)
        .or_else(|_| std::env::var("RUST_LOG"))
        .unwrap_or_else(|_| "warn".into())
}

/// Install the global subscriber. Safe to call more than once.
pub fn init() {
    let filter = EnvFilter::try_new(filter_directive()).unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false),
        )
        .try_init();
}
