//! Frontend-agnostic operations over the remote resource API
//!
//! Every intent takes its backend explicitly and returns plain data, so the
//! CLI and tests drive the same code. [`plugin_run`] holds the in-place plugin
//! execution; the other modules are thin listing and transfer helpers.

pub mod context;
mod error;
pub mod feeds;
pub mod files;
pub mod pacs;
pub mod plugin_run;
pub mod plugins;
pub mod table;

pub use context::{Context, ContextError, ContextStore, ContextSummary};
pub use error::IntentError;
pub use feeds::{DeleteFailure, DeleteReport};
pub use files::FileContent;
pub use plugin_run::{
    execute_in_place, FeedLayout, PluginExecutionResult, PluginRunError, PluginRunRequest,
    PluginRunner,
};
pub use table::{ListOptions, ResourceTable};
