//! Logging initialization
//!
//! Sets up the tracing subscriber once, honoring RUST_LOG when present and
//! falling back to the configured level otherwise.

use std::sync::Once;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::LoggingSettings;

static INIT: Once = Once::new();

/// Initialize the tracing subscriber from the logging settings
pub fn init_logging(config: &LoggingSettings) {
    INIT.call_once(|| {
        let env_filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(config.level.clone()));

        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt::layer().compact())
            .init();
    });
}
