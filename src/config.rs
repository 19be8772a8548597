//! Configuration management for salsa
//!
//! Settings are loaded from environment variables with sensible defaults.
//! Command-line flags override individual fields after loading.
//!
//! # Environment Variables
//!
//! - `SALSA_URL`: API base URL - default: the stored context's URL, else
//!   "http://localhost:8000/api/v1/"
//! - `SALSA_USERNAME`: User name used with `SALSA_TOKEN`
//! - `SALSA_TOKEN`: API token; when set it takes precedence over the stored context
//! - `SALSA_REQUEST_TIMEOUT`: Timeout in seconds - default: "30"
//! - `SALSA_LOG_LEVEL`: Logging level - default: "warn"
//! - `SALSA_CONTEXT_DIR`: Directory of `context.json` - default: `<config dir>/salsa`
//!
//! ## Feed layout
//! - `SALSA_DIRCOPY_PLUGIN`: Directory-copy plugin name - default: "pl-dircopy"
//! - `SALSA_HOME_ROOT`: Top-level directory of user homes - default: "home"
//! - `SALSA_FEEDS_DIR`: Directory of feeds in a home - default: "feeds"
//! - `SALSA_DEFAULT_USER`: User assumed for paths without one - default: "chris"
//!
//! # Example
//!
//! ```no_run
//! use salsa::SalsaConfig;
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = SalsaConfig::default();
//! config.validate()?;
//!
//! let store = config.context_store()?;
//! let backend = config.create_backend(store.load()?.as_ref())?;
//! # Ok(())
//! # }
//! ```

use crate::backend::{BackendError, ChrisBackend, HttpBackend};
use crate::intents::{Context, ContextStore, FeedLayout};
use crate::util::logging::parse_level;
use std::collections::HashMap;
use std::env;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Default values for configuration
pub const DEFAULT_URL: &str = "http://localhost:8000/api/v1/";
const DEFAULT_LOG_LEVEL: &str = "warn";
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Configuration validation failed
    #[error("Configuration validation failed: {0}")]
    ValidationFailed(String),

    /// Failed to parse configuration value
    #[error("Failed to parse {field}: {error}")]
    ParseError { field: String, error: String },

    /// Neither SALSA_CONTEXT_DIR nor a platform config directory is available
    #[error("No context directory. Set SALSA_CONTEXT_DIR")]
    MissingContextDir,

    /// Backend initialization failed
    #[error("Backend initialization failed: {0}")]
    BackendInitError(#[from] BackendError),
}

/// Main configuration structure for salsa
#[derive(Debug, Clone)]
pub struct SalsaConfig {
    /// Explicit API base URL (SALSA_URL or `--url`)
    pub url: Option<String>,

    pub username: Option<String>,

    /// Explicit API token; overrides the stored context
    pub token: Option<String>,

    /// Request timeout in seconds
    pub request_timeout_secs: u64,

    /// Logging level (trace, debug, info, warn, error)
    pub log_level: String,

    /// Directory holding `context.json`
    pub context_dir: Option<PathBuf>,

    /// Naming convention of the backend's feed tree
    pub layout: FeedLayout,
}

fn non_empty_var(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

impl Default for SalsaConfig {
    /// Loads SALSA_* environment variables, falling back to defaults
    fn default() -> Self {
        let request_timeout_secs = env::var("SALSA_REQUEST_TIMEOUT")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(DEFAULT_REQUEST_TIMEOUT_SECS);

        let log_level = env::var("SALSA_LOG_LEVEL")
            .unwrap_or_else(|_| DEFAULT_LOG_LEVEL.to_string())
            .to_lowercase();

        let context_dir = non_empty_var("SALSA_CONTEXT_DIR")
            .map(PathBuf::from)
            .or_else(ContextStore::default_dir);

        let defaults = FeedLayout::default();
        let layout = FeedLayout {
            dircopy_plugin: non_empty_var("SALSA_DIRCOPY_PLUGIN").unwrap_or(defaults.dircopy_plugin),
            home_root: non_empty_var("SALSA_HOME_ROOT").unwrap_or(defaults.home_root),
            feeds_dir: non_empty_var("SALSA_FEEDS_DIR").unwrap_or(defaults.feeds_dir),
            default_user: non_empty_var("SALSA_DEFAULT_USER").unwrap_or(defaults.default_user),
            ..defaults
        };

        Self {
            url: non_empty_var("SALSA_URL"),
            username: non_empty_var("SALSA_USERNAME"),
            token: non_empty_var("SALSA_TOKEN"),
            request_timeout_secs,
            log_level,
            context_dir,
            layout,
        }
    }
}

impl SalsaConfig {
    /// Validates the configuration
    ///
    /// Checks that:
    /// - The timeout is between 1 second and 10 minutes
    /// - The log level is valid
    /// - An explicit URL uses http or https
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.request_timeout_secs == 0 {
            return Err(ConfigError::ValidationFailed(
                "Request timeout must be at least 1 second".to_string(),
            ));
        }
        if self.request_timeout_secs > 600 {
            return Err(ConfigError::ValidationFailed(
                "Request timeout cannot exceed 10 minutes".to_string(),
            ));
        }

        if parse_level(&self.log_level).is_none() {
            return Err(ConfigError::ValidationFailed(format!(
                "Invalid log level: {}. Valid options: trace, debug, info, warn, error",
                self.log_level
            )));
        }

        if let Some(url) = &self.url {
            if !(url.starts_with("http://") || url.starts_with("https://")) {
                return Err(ConfigError::ParseError {
                    field: "SALSA_URL".to_string(),
                    error: format!("'{}' is not an http(s) URL", url),
                });
            }
        }

        if self.layout.dircopy_plugin.trim().is_empty() {
            return Err(ConfigError::ValidationFailed(
                "Directory-copy plugin name must not be empty".to_string(),
            ));
        }

        Ok(())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Explicit URL, else the context's, else the default
    pub fn api_url(&self, context: Option<&Context>) -> String {
        self.url
            .clone()
            .or_else(|| context.map(|c| c.url.clone()))
            .unwrap_or_else(|| DEFAULT_URL.to_string())
    }

    pub fn context_store(&self) -> Result<ContextStore, ConfigError> {
        self.context_dir
            .clone()
            .map(ContextStore::new)
            .ok_or(ConfigError::MissingContextDir)
    }

    /// Client without credentials, used to log in
    pub fn login_client(&self, context: Option<&Context>) -> Result<HttpBackend, ConfigError> {
        Ok(HttpBackend::with_timeout(
            self.api_url(context),
            None,
            self.timeout(),
        )?)
    }

    /// Creates the HTTP backend.
    ///
    /// An explicit token (SALSA_TOKEN) wins over the stored context; without
    /// either the client is unauthenticated and protected endpoints fail with
    /// an authentication error.
    pub fn create_backend(
        &self,
        context: Option<&Context>,
    ) -> Result<Arc<dyn ChrisBackend>, ConfigError> {
        let token = self
            .token
            .clone()
            .or_else(|| context.map(|c| c.token.clone()));
        let backend = HttpBackend::with_timeout(self.api_url(context), token, self.timeout())?;
        Ok(Arc::new(backend))
    }

    /// Converts configuration to a display map for output formatting
    pub fn to_display_map(&self) -> HashMap<String, String> {
        let mut map = HashMap::new();

        map.insert(
            "url".to_string(),
            self.url.clone().unwrap_or_else(|| "(from context)".to_string()),
        );
        if let Some(ref username) = self.username {
            map.insert("username".to_string(), username.clone());
        }
        map.insert("token_set".to_string(), self.token.is_some().to_string());
        map.insert(
            "request_timeout_secs".to_string(),
            self.request_timeout_secs.to_string(),
        );
        map.insert("log_level".to_string(), self.log_level.clone());
        if let Some(ref dir) = self.context_dir {
            map.insert("context_dir".to_string(), dir.display().to_string());
        }
        map.insert(
            "dircopy_plugin".to_string(),
            self.layout.dircopy_plugin.clone(),
        );

        map
    }
}

impl fmt::Display for SalsaConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Salsa Configuration:")?;
        writeln!(
            f,
            "  URL: {}",
            self.url.as_deref().unwrap_or("(from context)")
        )?;
        if let Some(ref username) = self.username {
            writeln!(f, "  Username: {}", username)?;
        }
        writeln!(f, "  Token Set: {}", self.token.is_some())?;
        writeln!(f, "  Request Timeout: {}s", self.request_timeout_secs)?;
        writeln!(f, "  Log Level: {}", self.log_level)?;
        if let Some(ref dir) = self.context_dir {
            writeln!(f, "  Context Dir: {}", dir.display())?;
        }
        writeln!(f, "  Dircopy Plugin: {}", self.layout.dircopy_plugin)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::env;

    /// Helper to temporarily set environment variables for testing
    struct EnvGuard {
        key: String,
        old_value: Option<String>,
    }

    impl EnvGuard {
        fn set(key: &str, value: &str) -> Self {
            let old_value = env::var(key).ok();
            env::set_var(key, value);
            Self {
                key: key.to_string(),
                old_value,
            }
        }

        fn unset(key: &str) -> Self {
            let old_value = env::var(key).ok();
            env::remove_var(key);
            Self {
                key: key.to_string(),
                old_value,
            }
        }
    }

    impl Drop for EnvGuard {
        fn drop(&mut self) {
            match &self.old_value {
                Some(v) => env::set_var(&self.key, v),
                None => env::remove_var(&self.key),
            }
        }
    }

    fn config() -> SalsaConfig {
        SalsaConfig {
            url: None,
            username: None,
            token: None,
            request_timeout_secs: 30,
            log_level: "info".to_string(),
            context_dir: Some(PathBuf::from("/tmp/salsa")),
            layout: FeedLayout::default(),
        }
    }

    fn context() -> Context {
        Context::new(
            "https://cube.example.org/api/v1/",
            "alice",
            "stored-token",
            &FeedLayout::default(),
        )
    }

    #[test]
    #[serial]
    fn test_default_configuration() {
        let _guards = vec![
            EnvGuard::unset("SALSA_URL"),
            EnvGuard::unset("SALSA_TOKEN"),
            EnvGuard::unset("SALSA_REQUEST_TIMEOUT"),
            EnvGuard::unset("SALSA_DIRCOPY_PLUGIN"),
            EnvGuard::set("SALSA_LOG_LEVEL", DEFAULT_LOG_LEVEL),
        ];

        let config = SalsaConfig::default();

        assert!(config.url.is_none());
        assert!(config.token.is_none());
        assert_eq!(config.request_timeout_secs, DEFAULT_REQUEST_TIMEOUT_SECS);
        assert_eq!(config.log_level, DEFAULT_LOG_LEVEL);
        assert_eq!(config.layout.dircopy_plugin, "pl-dircopy");
    }

    #[test]
    #[serial]
    fn test_environment_variable_parsing() {
        let _guards = vec![
            EnvGuard::set("SALSA_URL", "https://cube.example.org/api/v1/"),
            EnvGuard::set("SALSA_TOKEN", "abc"),
            EnvGuard::set("SALSA_LOG_LEVEL", "DEBUG"),
            EnvGuard::set("SALSA_REQUEST_TIMEOUT", "60"),
            EnvGuard::set("SALSA_CONTEXT_DIR", "/var/lib/salsa"),
            EnvGuard::set("SALSA_DIRCOPY_PLUGIN", "pl-copy"),
            EnvGuard::set("SALSA_FEEDS_DIR", "projects"),
        ];

        let config = SalsaConfig::default();

        assert_eq!(config.url.as_deref(), Some("https://cube.example.org/api/v1/"));
        assert_eq!(config.token.as_deref(), Some("abc"));
        assert_eq!(config.log_level, "debug");
        assert_eq!(config.request_timeout_secs, 60);
        assert_eq!(config.context_dir, Some(PathBuf::from("/var/lib/salsa")));
        assert_eq!(config.layout.dircopy_plugin, "pl-copy");
        assert_eq!(config.layout.feeds_dir, "projects");
        assert_eq!(config.layout.feed_prefix, "feed_");
    }

    #[test]
    fn test_configuration_validation() {
        assert!(config().validate().is_ok());

        let mut invalid = config();
        invalid.request_timeout_secs = 0;
        assert!(invalid.validate().is_err());

        let mut invalid = config();
        invalid.request_timeout_secs = 601;
        assert!(invalid.validate().is_err());

        let mut invalid = config();
        invalid.log_level = "loud".to_string();
        assert!(invalid.validate().is_err());

        let mut invalid = config();
        invalid.url = Some("ftp://cube".to_string());
        assert!(matches!(
            invalid.validate(),
            Err(ConfigError::ParseError { .. })
        ));
    }

    #[test]
    fn test_api_url_precedence() {
        let mut config = config();
        assert_eq!(config.api_url(None), DEFAULT_URL);
        assert_eq!(
            config.api_url(Some(&context())),
            "https://cube.example.org/api/v1/"
        );

        config.url = Some("http://other:8000/api/v1/".to_string());
        assert_eq!(config.api_url(Some(&context())), "http://other:8000/api/v1/");
    }

    #[test]
    fn test_create_backend_uses_context() {
        let backend = config().create_backend(Some(&context())).unwrap();
        assert_eq!(backend.name(), "http");
        assert_eq!(
            backend.endpoint().as_deref(),
            Some("https://cube.example.org/api/v1/")
        );
    }

    #[test]
    fn test_context_store_requires_dir() {
        let mut config = config();
        assert!(config.context_store().is_ok());
        config.context_dir = None;
        assert!(matches!(
            config.context_store(),
            Err(ConfigError::MissingContextDir)
        ));
    }

    #[test]
    fn test_config_display_hides_token() {
        let mut config = config();
        config.token = Some("secret".to_string());
        let display = format!("{}", config);
        assert!(display.contains("Salsa Configuration:"));
        assert!(display.contains("Token Set: true"));
        assert!(!display.contains("secret"));
        assert!(!config.to_display_map().values().any(|v| v.contains("secret")));
    }
}
