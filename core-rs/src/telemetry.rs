//! Logging setup
//!
//! `RUST_LOG` takes precedence; otherwise the configured default level is
//! applied. `LOG_FORMAT=json` switches to JSON lines.

use std::env;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

#[derive(Debug, Clone, PartialEq)]
pub enum LogFormat {
    Human,
    Json,
}

/// Telemetry configuration
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    /// Primary log filter (RUST_LOG env var)
    pub log_filter: String,
    /// Fallback log level if RUST_LOG not set
    pub default_level: String,
    pub log_format: LogFormat,
}

impl TelemetryConfig {
    /// Configuration from the environment with the given fallback level
    pub fn from_env(default_level: &str) -> Self {
        Self {
            log_filter: env::var("RUST_LOG").unwrap_or_default(),
            default_level: default_level.to_string(),
            log_format: match env::var("LOG_FORMAT").unwrap_or_default().to_lowercase().as_str() {
                "json" => LogFormat::Json,
                _ => LogFormat::Human,
            },
        }
    }

    /// `--verbose` raises the fallback level to debug for this crate
    pub fn verbose(verbose: bool) -> Self {
        if verbose {
            Self::from_env("info,sparql_endpoint=debug,tower_http=debug")
        } else {
            Self::default()
        }
    }

    fn filter(&self) -> EnvFilter {
        if self.log_filter.is_empty() {
            EnvFilter::new(&self.default_level)
        } else {
            EnvFilter::new(&self.log_filter)
        }
    }
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self::from_env("info")
    }
}

/// Initialize the global tracing subscriber.
///
/// Safe to call multiple times; only the first call installs a subscriber.
pub fn init_logging(config: &TelemetryConfig) {
    if tracing::dispatcher::has_been_set() {
        tracing::debug!("tracing subscriber already initialized, skipping");
        return;
    }

    let fmt_layer = match config.log_format {
        LogFormat::Json => tracing_subscriber::fmt::layer().json().boxed(),
        LogFormat::Human => tracing_subscriber::fmt::layer().compact().boxed(),
    };

    // try_init: another thread (tests) may win the race after has_been_set()
    let _ = tracing_subscriber::registry()
        .with(config.filter())
        .with(fmt_layer)
        .try_init();
}
