//! Logging infrastructure for relmap.
//!
//! relmap emits structured `tracing` events for descriptor builds, batch
//! plans, store round trips and distribution. Installing a subscriber is left
//! to the application unless the `tracing-subscriber` feature is enabled and
//! [`init`] is called.
//!
//! # Environment Variables
//!
//! - `RELMAP_DEBUG=true` - Enable debug logging
//! - `RELMAP_LOG_LEVEL=debug|info|warn|error|trace` - Set specific log level
//! - `RELMAP_LOG_FORMAT=json|pretty|compact` - Set output format (default: json)
//!
//! # Usage
//!
//! ```rust,no_run
//! use relmap_query::logging;
//!
//! // Initialize logging (call once at startup)
//! logging::init();
//! ```

use std::env;
use std::sync::Once;

static INIT: Once = Once::new();

/// Check if debug logging is enabled via `RELMAP_DEBUG`.
///
/// Returns `true` if `RELMAP_DEBUG` is set to "true", "1", or "yes" (case-insensitive).
#[inline]
pub fn is_debug_enabled() -> bool {
    env::var("RELMAP_DEBUG")
        .map(|v| matches!(v.to_lowercase().as_str(), "true" | "1" | "yes"))
        .unwrap_or(false)
}

/// Get the configured log level from `RELMAP_LOG_LEVEL`.
///
/// Defaults to "debug" if `RELMAP_DEBUG` is enabled, otherwise "warn".
pub fn get_log_level() -> &'static str {
    let fallback = if is_debug_enabled() { "debug" } else { "warn" };
    match env::var("RELMAP_LOG_LEVEL") {
        Ok(level) => match level.to_lowercase().as_str() {
            "trace" => "trace",
            "debug" => "debug",
            "info" => "info",
            "warn" => "warn",
            "error" => "error",
            _ => fallback,
        },
        Err(_) => fallback,
    }
}

/// Get the configured log format from `RELMAP_LOG_FORMAT`.
pub fn get_log_format() -> &'static str {
    env::var("RELMAP_LOG_FORMAT")
        .map(|f| match f.to_lowercase().as_str() {
            "pretty" => "pretty",
            "compact" => "compact",
            _ => "json",
        })
        .unwrap_or("json")
}

/// Build the filter directive for relmap's crates at `level`.
pub fn filter_directive(level: &str) -> String {
    format!("relmap={level},relmap_query={level},relmap_schema={level}")
}

/// Initialize the relmap logging system.
///
/// Subsequent calls are no-ops. Nothing is installed unless `RELMAP_DEBUG`
/// or `RELMAP_LOG_LEVEL` is set.
pub fn init() {
    INIT.call_once(|| {
        if !is_debug_enabled() && env::var("RELMAP_LOG_LEVEL").is_err() {
            return;
        }

        #[cfg(feature = "tracing-subscriber")]
        {
            use tracing_subscriber::{EnvFilter, fmt, prelude::*};

            let level = get_log_level();
            let filter = EnvFilter::try_new(filter_directive(level))
                .unwrap_or_else(|_| EnvFilter::new("warn"));

            // try_init: the host application may already own the global subscriber.
            let installed = match get_log_format() {
                "json" => tracing_subscriber::registry()
                    .with(filter)
                    .with(fmt::layer().json())
                    .try_init(),
                "compact" => tracing_subscriber::registry()
                    .with(filter)
                    .with(fmt::layer().compact())
                    .try_init(),
                _ => tracing_subscriber::registry()
                    .with(filter)
                    .with(fmt::layer().pretty())
                    .try_init(),
            };

            if installed.is_ok() {
                tracing::info!(
                    level = level,
                    format = get_log_format(),
                    "relmap logging initialized"
                );
            }
        }
    });
}
