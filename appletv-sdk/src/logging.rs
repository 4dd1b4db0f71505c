//! Subscriber setup for hosts embedding the bridge
//!
//! Library code only emits `tracing` events; nothing is printed until the
//! host installs a subscriber, either explicitly with [`init_logging`] or
//! from the environment with [`init_logging_from_env`].

use std::str::FromStr;

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter, Registry};

/// Environment variable selecting the [`LoggingMode`]
pub const MODE_ENV: &str = "APPLETV_LOG_MODE";

/// Environment variable overriding the filter directives
pub const LEVEL_ENV: &str = "APPLETV_LOG_LEVEL";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LoggingMode {
    /// No subscriber is installed
    #[default]
    Silent,
    /// Compact single-line output on stderr, `info` by default
    Development,
    /// Multi-line output with thread ids and source locations, `debug` by default
    Debug,
    /// Newline-delimited JSON for log collectors, `info` by default
    Json,
}

impl LoggingMode {
    fn default_directives(&self) -> &'static str {
        match self {
            LoggingMode::Silent => "off",
            LoggingMode::Development | LoggingMode::Json => "info",
            LoggingMode::Debug => "debug",
        }
    }
}

impl FromStr for LoggingMode {
    type Err = LoggingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "silent" | "off" => Ok(LoggingMode::Silent),
            "development" | "dev" => Ok(LoggingMode::Development),
            "debug" => Ok(LoggingMode::Debug),
            "json" => Ok(LoggingMode::Json),
            other => Err(LoggingError::InvalidEnv(format!("{MODE_ENV}={other}"))),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum LoggingError {
    #[error("Failed to initialize tracing subscriber: {0}")]
    TracingInit(String),

    #[error("Invalid environment variable: {0}")]
    InvalidEnv(String),

    #[error("Invalid filter directives: {0}")]
    InvalidFilter(String),
}

/// Install a global subscriber for `mode`.
///
/// Filter directives come from `APPLETV_LOG_LEVEL`, then `RUST_LOG`, then
/// the mode's default. Fails if a global subscriber is already set.
pub fn init_logging(mode: LoggingMode) -> Result<(), LoggingError> {
    if mode == LoggingMode::Silent {
        return Ok(());
    }

    let filter = env_filter(mode)?;
    let registry = Registry::default().with(filter);

    let result = match mode {
        LoggingMode::Silent => Ok(()),
        LoggingMode::Development => registry
            .with(fmt::layer().with_target(false).compact())
            .try_init(),
        LoggingMode::Debug => registry
            .with(
                fmt::layer()
                    .pretty()
                    .with_thread_ids(true)
                    .with_file(true)
                    .with_line_number(true),
            )
            .try_init(),
        LoggingMode::Json => registry
            .with(fmt::layer().json().with_current_span(false))
            .try_init(),
    };

    result.map_err(|e| LoggingError::TracingInit(e.to_string()))
}

/// Read the mode from `APPLETV_LOG_MODE` (default silent) and install it
pub fn init_logging_from_env() -> Result<(), LoggingError> {
    let mode = match std::env::var(MODE_ENV) {
        Ok(value) => value.parse()?,
        Err(_) => LoggingMode::Silent,
    };
    init_logging(mode)
}

pub fn is_initialized() -> bool {
    tracing::dispatcher::has_been_set()
}

fn env_filter(mode: LoggingMode) -> Result<EnvFilter, LoggingError> {
    let directives = filter_directives(
        std::env::var(LEVEL_ENV).ok(),
        std::env::var("RUST_LOG").ok(),
        mode,
    );
    EnvFilter::try_new(&directives).map_err(|e| LoggingError::InvalidFilter(format!("{directives}: {e}")))
}

fn filter_directives(level: Option<String>, rust_log: Option<String>, mode: LoggingMode) -> String {
    level
        .filter(|value| !value.trim().is_empty())
        .or_else(|| rust_log.filter(|value| !value.trim().is_empty()))
        .unwrap_or_else(|| mode.default_directives().to_string())
}
