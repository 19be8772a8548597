//! Structured logging setup for salsa
//!
//! Logs go to stderr so command results on stdout stay machine-readable.
//! Output is either human console lines or JSON, filtered by `RUST_LOG`
//! when set and by the configured level for salsa's own targets.
//!
//! # Example
//!
//! ```no_run
//! use salsa::util::logging;
//!
//! // With environment: SALSA_LOG_LEVEL=debug SALSA_LOG_JSON=true
//! logging::init_from_env();
//!
//! tracing::info!(feed_id = 12, "Feed created");
//! ```

use std::env;
use std::io;
use std::sync::Once;
use tracing::Level;
use tracing_subscriber::filter::Directive;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Ensures logging is only initialized once
static INIT: Once = Once::new();

/// HTTP stack targets kept quiet unless RUST_LOG asks for them
const NOISY_TARGETS: &[&str] = &["h2=warn", "hyper=warn", "hyper_util=warn", "reqwest=warn"];

/// Configuration for logging initialization
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    /// Minimum level of salsa's own events
    pub level: Level,

    /// Emit one JSON object per event
    pub use_json: bool,

    /// Include the module target (e.g. salsa::intents::plugin_run) in logs
    pub include_target: bool,

    /// Include file and line number information
    pub include_location: bool,

    /// Include thread ID and name in logs
    pub include_thread_ids: bool,
}

impl Default for LoggingConfig {
    /// WARN level console output; the CLI raises it with `-v` or `--log-level`
    fn default() -> Self {
        Self {
            level: Level::WARN,
            use_json: false,
            include_target: false,
            include_location: false,
            include_thread_ids: false,
        }
    }
}

impl LoggingConfig {
    pub fn with_level(level: Level) -> Self {
        Self {
            level,
            ..Default::default()
        }
    }

    /// JSON output with full metadata, for log collectors
    pub fn production() -> Self {
        Self {
            level: Level::INFO,
            use_json: true,
            include_target: true,
            include_location: true,
            include_thread_ids: true,
        }
    }

    pub fn development() -> Self {
        Self {
            level: Level::DEBUG,
            use_json: false,
            include_target: true,
            include_location: true,
            include_thread_ids: false,
        }
    }

    /// Directives applied on top of RUST_LOG
    pub fn directives(&self, rust_log_set: bool) -> Vec<Directive> {
        let own = format!("salsa={}", self.level.as_str().to_lowercase());
        let mut raw: Vec<String> = vec![own];
        if !rust_log_set {
            raw.extend(NOISY_TARGETS.iter().map(|s| s.to_string()));
        }
        raw.iter().filter_map(|d| d.parse().ok()).collect()
    }
}

/// Parses a log level, case-insensitively
///
/// # Example
///
/// ```
/// use salsa::util::logging::parse_level;
/// use tracing::Level;
///
/// assert_eq!(parse_level("debug"), Some(Level::DEBUG));
/// assert_eq!(parse_level("loud"), None);
/// ```
pub fn parse_level(level_str: &str) -> Option<Level> {
    match level_str.trim().to_lowercase().as_str() {
        "trace" => Some(Level::TRACE),
        "debug" => Some(Level::DEBUG),
        "info" => Some(Level::INFO),
        "warn" | "warning" => Some(Level::WARN),
        "error" => Some(Level::ERROR),
        _ => None,
    }
}

/// Installs the global subscriber; later calls are ignored
pub fn init_logging(config: LoggingConfig) {
    INIT.call_once(|| {
        let rust_log_set = env::var("RUST_LOG").is_ok();
        let filter = config
            .directives(rust_log_set)
            .into_iter()
            .fold(EnvFilter::from_default_env(), |filter, directive| {
                filter.add_directive(directive)
            });

        if config.use_json {
            tracing_subscriber::registry()
                .with(filter)
                .with(
                    fmt::layer()
                        .json()
                        .with_writer(io::stderr)
                        .with_target(config.include_target)
                        .with_file(config.include_location)
                        .with_line_number(config.include_location)
                        .with_thread_ids(config.include_thread_ids)
                        .with_thread_names(config.include_thread_ids),
                )
                .init();
        } else {
            tracing_subscriber::registry()
                .with(filter)
                .with(
                    fmt::layer()
                        .with_writer(io::stderr)
                        .with_target(config.include_target)
                        .with_file(config.include_location)
                        .with_line_number(config.include_location)
                        .with_thread_ids(config.include_thread_ids)
                        .with_thread_names(config.include_thread_ids),
                )
                .init();
        }
    });
}

pub fn init_default() {
    init_logging(LoggingConfig::default());
}

/// Reads `SALSA_LOG_LEVEL` and `SALSA_LOG_JSON`
pub fn config_from_env() -> LoggingConfig {
    let level = env::var("SALSA_LOG_LEVEL")
        .ok()
        .and_then(|v| parse_level(&v))
        .unwrap_or(Level::WARN);

    let use_json = env::var("SALSA_LOG_JSON")
        .ok()
        .and_then(|v| v.parse::<bool>().ok())
        .unwrap_or(false);

    LoggingConfig {
        level,
        use_json,
        include_target: use_json,
        ..Default::default()
    }
}

pub fn init_from_env() {
    init_logging(config_from_env());
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    fn test_parse_level() {
        assert_eq!(parse_level("trace"), Some(Level::TRACE));
        assert_eq!(parse_level("Debug"), Some(Level::DEBUG));
        assert_eq!(parse_level(" INFO "), Some(Level::INFO));
        assert_eq!(parse_level("warning"), Some(Level::WARN));
        assert_eq!(parse_level("error"), Some(Level::ERROR));
        assert_eq!(parse_level(""), None);
        assert_eq!(parse_level("verbose"), None);
    }

    #[test]
    fn test_presets() {
        let config = LoggingConfig::default();
        assert_eq!(config.level, Level::WARN);
        assert!(!config.use_json);

        let config = LoggingConfig::production();
        assert!(config.use_json);
        assert!(config.include_thread_ids);

        let config = LoggingConfig::development();
        assert_eq!(config.level, Level::DEBUG);
        assert!(config.include_location);
    }

    #[test]
    fn test_directives() {
        let config = LoggingConfig::with_level(Level::DEBUG);

        let quiet = config.directives(false);
        assert_eq!(quiet.len(), 1 + NOISY_TARGETS.len());
        assert_eq!(quiet[0].to_string(), "salsa=debug");

        let with_rust_log = config.directives(true);
        assert_eq!(with_rust_log.len(), 1);
    }

    #[test]
    #[serial]
    fn test_config_from_env() {
        env::set_var("SALSA_LOG_LEVEL", "trace");
        env::set_var("SALSA_LOG_JSON", "true");
        let config = config_from_env();
        env::remove_var("SALSA_LOG_LEVEL");
        env::remove_var("SALSA_LOG_JSON");

        assert_eq!(config.level, Level::TRACE);
        assert!(config.use_json);
        assert!(config.include_target);

        let config = config_from_env();
        assert_eq!(config.level, Level::WARN);
        assert!(!config.use_json);
    }
}
