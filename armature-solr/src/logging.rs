//! Opt-in `tracing` subscriber setup.
//!
//! The crate only emits `tracing` events. Applications that do not install
//! their own subscriber can call [`init`], which reads:
//!
//! - `SOLR_LOG_LEVEL=trace|debug|info|warn|error|off` (default `info`)
//! - `SOLR_LOG_FORMAT=pretty|compact|json` (default `json`)
//!
//! `RUST_LOG`, when set, takes precedence over `SOLR_LOG_LEVEL`.

use std::env;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

/// Output format for log records.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// Multi-line, human readable.
    Pretty,
    /// Single line per event.
    Compact,
    /// Newline-delimited JSON.
    Json,
}

impl LogFormat {
    /// Parse a format name.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "pretty" => Some(LogFormat::Pretty),
            "compact" => Some(LogFormat::Compact),
            "json" => Some(LogFormat::Json),
            _ => None,
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Maximum level recorded.
    pub level: LevelFilter,
    /// Output format.
    pub format: LogFormat,
    /// Include the event target (module path).
    pub target: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: LevelFilter::INFO,
            format: LogFormat::Json,
            target: true,
        }
    }
}

impl LogConfig {
    /// Read `SOLR_LOG_LEVEL` and `SOLR_LOG_FORMAT`, falling back to defaults
    /// for missing or unrecognised values.
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let level = env::var("SOLR_LOG_LEVEL")
            .ok()
            .and_then(|s| s.trim().parse::<LevelFilter>().ok())
            .unwrap_or(defaults.level);

        let format = env::var("SOLR_LOG_FORMAT")
            .ok()
            .and_then(|s| LogFormat::parse(&s))
            .unwrap_or(defaults.format);

        Self {
            level,
            format,
            ..defaults
        }
    }

    fn filter(&self) -> EnvFilter {
        EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(self.level.to_string()))
    }
}

/// Install a global subscriber configured from the environment.
///
/// Returns `false` when a global subscriber was already set.
pub fn init() -> bool {
    init_with(&LogConfig::from_env())
}

/// Install a global subscriber with an explicit configuration.
pub fn init_with(config: &LogConfig) -> bool {
    let builder = tracing_subscriber::fmt()
        .with_env_filter(config.filter())
        .with_target(config.target);

    let result = match config.format {
        LogFormat::Pretty => builder.pretty().try_init(),
        LogFormat::Compact => builder.compact().try_init(),
        LogFormat::Json => builder.json().try_init(),
    };
    result.is_ok()
}
