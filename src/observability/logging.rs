//! Structured logging setup.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Install the global subscriber.
///
/// `default_directive` applies when `RUST_LOG` is unset or invalid. Safe to
/// call more than once; later calls leave the first subscriber in place.
pub fn init_logging(default_directive: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive));

    let installed = tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_target(true))
        .try_init();

    if installed.is_err() {
        tracing::debug!("Global subscriber already installed");
    }
}
