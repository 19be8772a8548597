//! Running plugins in place
//!
//! The working directory a user browses decides how a plugin run is wired
//! into the feed tree. See [`orchestrator`] for the protocol and [`paths`]
//! for the naming convention the output-path prediction relies on.

pub mod bootstrap;
pub mod classifier;
mod error;
pub mod orchestrator;
pub mod paths;

pub use bootstrap::{bootstrap, bootstrap_dirs, default_feed_title, select_dircopy, FeedBootstrap};
pub use classifier::{classify, is_in_feed, PathContext};
pub use error::{PathSegment, PluginRunError, RunStep};
pub use orchestrator::{
    build_run_params, execute_in_place, ContextParams, PluginExecutionResult, PluginRunRequest,
    PluginRunner,
};
pub use paths::{parse_instance_segment, FeedLayout};
