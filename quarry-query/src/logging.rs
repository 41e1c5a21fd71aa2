//! Logging infrastructure for Quarry.
//!
//! Structured logging is controlled by environment variables:
//!
//! - `QUARRY_DEBUG=true` / `QUARRY_DEBUG=1` - Enable debug logging
//! - `QUARRY_LOG_LEVEL=debug|info|warn|error|trace` - Set a specific log level
//! - `QUARRY_LOG_FORMAT=json|pretty|compact` - Output format (default: json)
//!
//! ```rust,no_run
//! use quarry_query::logging;
//!
//! // Initialize logging (call once at startup)
//! logging::init();
//! ```
//!
//! Within Quarry, the standard tracing macros are used directly:
//!
//! ```rust,ignore
//! debug!(sql = %stmt.sql, params = stmt.params.len(), "Executing root query");
//! warn!(elapsed_ms = %ms, entity = %name, "Slow query detected");
//! ```

use std::env;
use std::sync::Once;

static INIT: Once = Once::new();

/// Check if debug logging is enabled via `QUARRY_DEBUG`.
///
/// Returns `true` if `QUARRY_DEBUG` is set to "true", "1", or "yes" (case-insensitive).
#[inline]
pub fn is_debug_enabled() -> bool {
    env::var("QUARRY_DEBUG")
        .map(|v| matches!(v.to_lowercase().as_str(), "true" | "1" | "yes"))
        .unwrap_or(false)
}

/// Get the configured log level from `QUARRY_LOG_LEVEL`.
///
/// Defaults to "debug" if `QUARRY_DEBUG` is enabled, otherwise "warn".
pub fn get_log_level() -> &'static str {
    let fallback = if is_debug_enabled() { "debug" } else { "warn" };
    env::var("QUARRY_LOG_LEVEL")
        .ok()
        .and_then(|level| parse_level(&level))
        .unwrap_or(fallback)
}

fn parse_level(level: &str) -> Option<&'static str> {
    match level.trim().to_lowercase().as_str() {
        "trace" => Some("trace"),
        "debug" => Some("debug"),
        "info" => Some("info"),
        "warn" => Some("warn"),
        "error" => Some("error"),
        _ => None,
    }
}

/// Get the configured log format from `QUARRY_LOG_FORMAT`.
pub fn get_log_format() -> &'static str {
    env::var("QUARRY_LOG_FORMAT")
        .map(|f| match f.to_lowercase().as_str() {
            "pretty" => "pretty",
            "compact" => "compact",
            _ => "json",
        })
        .unwrap_or("json")
}

/// Initialize the Quarry logging system.
///
/// Subsequent calls are no-ops. Nothing is installed unless `QUARRY_DEBUG` or
/// `QUARRY_LOG_LEVEL` is set, so applications with their own subscriber are
/// left alone.
pub fn init() {
    if !is_debug_enabled() && env::var("QUARRY_LOG_LEVEL").is_err() {
        return;
    }
    install(get_log_level());
}

/// Initialize logging with a specific level, ignoring `QUARRY_LOG_LEVEL`.
///
/// An unrecognized level falls back to "warn". Like [`init`], only the first
/// call installs a subscriber.
pub fn init_with_level(level: &str) {
    install(parse_level(level).unwrap_or("warn"));
}

fn install(level: &'static str) {
    INIT.call_once(|| {
        #[cfg(feature = "tracing-subscriber")]
        {
            use tracing_subscriber::{EnvFilter, fmt, prelude::*};

            let filter = EnvFilter::try_new(format!(
                "quarry={},quarry_query={},quarry_sqlite={}",
                level, level, level
            ))
            .unwrap_or_else(|_| EnvFilter::new("warn"));

            match get_log_format() {
                "json" => {
                    tracing_subscriber::registry()
                        .with(filter)
                        .with(fmt::layer().json())
                        .init();
                }
                "compact" => {
                    tracing_subscriber::registry()
                        .with(filter)
                        .with(fmt::layer().compact())
                        .init();
                }
                _ => {
                    tracing_subscriber::registry()
                        .with(filter)
                        .with(fmt::layer().pretty())
                        .init();
                }
            }

            tracing::info!(
                level = level,
                format = get_log_format(),
                "Quarry logging initialized"
            );
        }

        #[cfg(not(feature = "tracing-subscriber"))]
        let _ = level;
    });
}

/// Macro for conditional debug logging.
///
/// Only logs if `QUARRY_DEBUG` is enabled at runtime.
#[macro_export]
macro_rules! quarry_debug {
    ($($arg:tt)*) => {
        if $crate::logging::is_debug_enabled() {
            tracing::debug!($($arg)*);
        }
    };
}

/// Macro for conditional trace logging.
#[macro_export]
macro_rules! quarry_trace {
    ($($arg:tt)*) => {
        if $crate::logging::is_debug_enabled() {
            tracing::trace!($($arg)*);
        }
    };
}
