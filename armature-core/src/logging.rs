//! Logging bootstrap for Armature
//!
//! Defaults to JSON output on STDOUT, filtered by `RUST_LOG` when set.
//!
//! ```no_run
//! use armature_core::logging::*;
//!
//! LogConfig::new()
//!     .level(LogLevel::Debug)
//!     .format(LogFormat::Pretty)
//!     .init();
//!
//! info!("Application started");
//! ```

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

// Re-export tracing for convenience
pub use tracing::{debug, error, info, trace, warn};

/// Log level for filtering messages
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    /// Convert to string for EnvFilter
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

/// Output format for log messages
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// JSON format (default) - structured, machine-readable
    Json,
    /// Pretty format - formatted for development
    Pretty,
    /// Compact format - minimal output
    Compact,
}

/// Logging configuration
#[derive(Debug, Clone)]
pub struct LogConfig {
    pub level: LogLevel,
    pub format: LogFormat,
    /// Include target (module path)
    pub targets: bool,
    /// Custom environment filter (overrides level if set)
    pub env_filter: Option<String>,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: LogLevel::Info,
            format: LogFormat::Json,
            targets: true,
            env_filter: None,
        }
    }
}

impl LogConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn level(mut self, level: LogLevel) -> Self {
        self.level = level;
        self
    }

    pub fn format(mut self, format: LogFormat) -> Self {
        self.format = format;
        self
    }

    pub fn with_targets(mut self, enable: bool) -> Self {
        self.targets = enable;
        self
    }

    /// Use an explicit filter directive such as `"armature_csrf=debug"`
    pub fn env_filter(mut self, filter: impl Into<String>) -> Self {
        self.env_filter = Some(filter.into());
        self
    }

    fn build_filter(&self) -> EnvFilter {
        match &self.env_filter {
            Some(directive) => EnvFilter::new(directive),
            None => EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(self.level.as_str())),
        }
    }

    /// Install the global subscriber.
    ///
    /// Returns `false` if a global subscriber was already set.
    pub fn try_init(&self) -> bool {
        let registry = tracing_subscriber::registry().with(self.build_filter());
        let result = match self.format {
            LogFormat::Json => registry
                .with(fmt::layer().json().with_target(self.targets))
                .try_init(),
            LogFormat::Pretty => registry
                .with(fmt::layer().pretty().with_target(self.targets))
                .try_init(),
            LogFormat::Compact => registry
                .with(fmt::layer().compact().with_target(self.targets))
                .try_init(),
        };
        result.is_ok()
    }

    /// Install the global subscriber, ignoring an existing one
    pub fn init(&self) {
        if !self.try_init() {
            debug!("Global tracing subscriber already installed");
        }
    }
}
