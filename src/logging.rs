//! Process logging setup.
//!
//! Everything goes through `tracing`; this module installs the stdout
//! subscriber (timestamp, level, target) once at startup.

use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Environment variable selecting the log level
pub const LOG_LEVEL_ENV: &str = "LOG_LEVEL";

/// Parse a level name as accepted in `LOG_LEVEL`
pub fn parse_level(value: &str) -> Option<LevelFilter> {
    match value.trim().to_ascii_lowercase().as_str() {
        "off" => Some(LevelFilter::OFF),
        "error" => Some(LevelFilter::ERROR),
        "warn" | "warning" => Some(LevelFilter::WARN),
        "info" => Some(LevelFilter::INFO),
        "debug" => Some(LevelFilter::DEBUG),
        "trace" => Some(LevelFilter::TRACE),
        _ => None,
    }
}

/// Install the global subscriber
/// Unknown `LOG_LEVEL` values fall back to INFO with a warning
pub fn init() {
    let requested = std::env::var(LOG_LEVEL_ENV).ok();
    let level = requested
        .as_deref()
        .and_then(parse_level)
        .unwrap_or(LevelFilter::INFO);

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(true)
                .with_level(true),
        )
        .with(level)
        .init();

    if let Some(value) = requested.filter(|v| parse_level(v).is_none()) {
        tracing::warn!("Unknown {} '{}', using INFO", LOG_LEVEL_ENV, value);
    }
}
