//! Tracing subscriber bootstrap for hosts that embed the session core.

use tracing_subscriber::EnvFilter;

use crate::config::EnvConfig;

/// Filter used when `RUST_LOG` is unset or invalid.
#[must_use]
pub fn default_filter_directives(level: &str) -> String {
    format!("turn_stream={level},agent_provider={level}")
}

/// Installs a formatted stderr subscriber. Returns false if one was already set.
pub fn init_tracing(config: &EnvConfig) -> bool {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_filter_directives(&config.log_level)));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .try_init()
        .is_ok()
}
