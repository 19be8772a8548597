//! salsa - intent layer for a ChRIS-style medical compute backend
//!
//! The backend organizes analyses as feeds: trees of plugin instances whose
//! outputs live in a per-user file tree. This library exposes frontend-agnostic
//! operations ("intents") over that backend. The central one runs a plugin
//! *in place*: the working directory decides whether a new feed is created
//! or the plugin is chained onto an existing instance.
//!
//! # Example Usage
//!
//! ```no_run
//! use salsa::{PluginRunRequest, PluginRunner, SalsaConfig};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = SalsaConfig::default();
//! let store = config.context_store()?;
//! let context = store.require()?;
//! let backend = config.create_backend(Some(&context))?;
//!
//! let request = PluginRunRequest::new("pl-simpledsapp", context.cwd.clone())
//!     .with_param("dummyFloat", 3.5);
//! let result = PluginRunner::with_layout(backend, config.layout.clone())
//!     .execute_in_place(&request)
//!     .await?;
//! println!("Output will appear in {}", result.output_path);
//! # Ok(())
//! # }
//! ```
//!
//! # Project Structure
//!
//! - [`backend`]: the `ChrisBackend` trait, the HTTP client and a scripted mock
//! - [`intents`]: plugin runs in place, feeds, files, PACS, plugins and context
//! - [`cli`]: command-line parsing, handlers and output formatting
//! - [`config`]: environment-driven configuration

pub mod backend;
pub mod cli;
pub mod config;
pub mod intents;
pub mod util;

pub use backend::{BackendError, ChrisBackend, HttpBackend, MockBackend};
pub use config::{ConfigError, SalsaConfig};
pub use intents::{
    execute_in_place, Context, ContextStore, FeedLayout, IntentError, PluginExecutionResult,
    PluginRunError, PluginRunRequest, PluginRunner, ResourceTable,
};
pub use util::{init_default, init_from_env, init_logging, LoggingConfig};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_exists() {
        assert!(!VERSION.is_empty());
    }

    #[test]
    fn test_name_is_salsa() {
        assert_eq!(NAME, "salsa");
    }
}
