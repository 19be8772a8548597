//! In-place plugin execution
//!
//! `PluginRunner` runs a plugin "where the user is": the working directory
//! decides whether a new feed is bootstrapped first or the plugin is chained
//! onto the instance whose output the user is browsing.
//!
//! ```text
//! classify(cwd)
//!   FreshFeed    -> bootstrap feed -> run(previous_id = dircopy instance) -> fresh path
//!   ContinueFeed -> extract ids    -> run(previous_id = extracted id)     -> continue path
//! ```
//!
//! Backend calls are strictly sequential and never retried. A feed created
//! by the bootstrap step stays in place when the chained run fails.

use super::bootstrap::bootstrap;
use super::classifier::{classify, PathContext};
use super::error::{PathSegment, PluginRunError};
use super::paths::FeedLayout;
use crate::backend::{ChrisBackend, PluginRun};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Optional naming for the feed and the new instance
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContextParams {
    /// Title of a bootstrapped feed; defaults to the last segment of `cwd`
    #[serde(default)]
    pub feed_title: Option<String>,
    /// Title of the new plugin instance
    #[serde(default)]
    pub instance_title: Option<String>,
}

/// Everything needed to run a plugin in place
#[derive(Debug, Clone, PartialEq)]
pub struct PluginRunRequest {
    /// Plugin name or search string (`pl-foo`, `pl-foo-v1.2.0`, `name: pl-foo`)
    pub plugin_name: String,
    pub plugin_params: Map<String, Value>,
    pub context: ContextParams,
    /// Remote working directory
    pub cwd: String,
    /// Plugins runnable in the target environment, as `<name>-v<version>`
    pub available_plugin_names: Vec<String>,
}

impl PluginRunRequest {
    pub fn new(plugin_name: impl Into<String>, cwd: impl Into<String>) -> Self {
        Self {
            plugin_name: plugin_name.into(),
            plugin_params: Map::new(),
            context: ContextParams::default(),
            cwd: cwd.into(),
            available_plugin_names: Vec::new(),
        }
    }

    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.plugin_params.insert(key.into(), value.into());
        self
    }

    pub fn with_params(mut self, params: Map<String, Value>) -> Self {
        self.plugin_params.extend(params);
        self
    }

    pub fn with_context(mut self, context: ContextParams) -> Self {
        self.context = context;
        self
    }

    pub fn with_available_plugins(mut self, names: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.available_plugin_names = names.into_iter().map(Into::into).collect();
        self
    }
}

/// Outcome of a successful in-place run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PluginExecutionResult {
    /// Feed created for the run; only when a feed was bootstrapped
    #[serde(skip_serializing_if = "Option::is_none")]
    pub feed_id: Option<u64>,
    /// Directory-copy instance seeding that feed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bootstrap_instance_id: Option<u64>,
    pub plugin_instance_id: u64,
    /// Plugin name as resolved by the backend
    pub plugin_name: String,
    /// Predicted output directory of the new instance
    pub output_path: String,
}

/// Merges user parameters with the chaining parameters.
/// `previous_id` and `title` override same-named user parameters.
pub fn build_run_params(
    plugin_params: &Map<String, Value>,
    previous_id: u64,
    instance_title: Option<&str>,
) -> Map<String, Value> {
    let mut params = plugin_params.clone();
    params.insert("previous_id".to_string(), Value::from(previous_id));
    if let Some(title) = instance_title.filter(|t| !t.trim().is_empty()) {
        params.insert("title".to_string(), Value::from(title));
    }
    params
}

pub struct PluginRunner {
    backend: Arc<dyn ChrisBackend>,
    layout: FeedLayout,
}

impl PluginRunner {
    pub fn new(backend: Arc<dyn ChrisBackend>) -> Self {
        Self::with_layout(backend, FeedLayout::default())
    }

    pub fn with_layout(backend: Arc<dyn ChrisBackend>, layout: FeedLayout) -> Self {
        Self { backend, layout }
    }

    pub fn layout(&self) -> &FeedLayout {
        &self.layout
    }

    pub async fn execute_in_place(
        &self,
        request: &PluginRunRequest,
    ) -> Result<PluginExecutionResult, PluginRunError> {
        execute_in_place(self.backend.as_ref(), &self.layout, request).await
    }
}

impl std::fmt::Debug for PluginRunner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PluginRunner")
            .field("backend", &self.backend.name())
            .field("layout", &self.layout)
            .finish()
    }
}

/// Runs `request.plugin_name` in the context of `request.cwd`
pub async fn execute_in_place(
    backend: &dyn ChrisBackend,
    layout: &FeedLayout,
    request: &PluginRunRequest,
) -> Result<PluginExecutionResult, PluginRunError> {
    info!(
        "Running {} in place at {}",
        request.plugin_name, request.cwd
    );

    match classify(&request.cwd, layout) {
        PathContext::FreshFeed { cwd } => {
            debug!("{} is outside any feed, bootstrapping one", cwd);
            let feed = bootstrap(
                backend,
                layout,
                &cwd,
                request.context.feed_title.as_deref(),
                &request.available_plugin_names,
            )
            .await?;

            let run = run_chained(backend, request, feed.bootstrap_instance_id, Some(feed.feed_id))
                .await?;

            let output_path = layout.fresh_output_path(
                &cwd,
                feed.feed_id,
                feed.bootstrap_instance_id,
                &feed.dircopy_name,
                &run.plugin_name,
                run.id,
            );
            info!("Scheduled {} instance {} in new feed {}", run.plugin_name, run.id, feed.feed_id);

            Ok(PluginExecutionResult {
                feed_id: Some(feed.feed_id),
                bootstrap_instance_id: Some(feed.bootstrap_instance_id),
                plugin_instance_id: run.id,
                plugin_name: run.plugin_name,
                output_path,
            })
        }
        PathContext::ContinueFeed { cwd } => {
            let previous_id = layout.extract_previous_instance_id(&cwd).ok_or_else(|| {
                warn!("No instance segment in {}", cwd);
                PluginRunError::PathExtraction {
                    cwd: cwd.clone(),
                    missing: PathSegment::InstanceId,
                }
            })?;
            let feed_id = layout.extract_feed_id(&cwd).ok_or_else(|| {
                warn!("No feed segment in {}", cwd);
                PluginRunError::PathExtraction {
                    cwd: cwd.clone(),
                    missing: PathSegment::FeedId,
                }
            })?;
            debug!("Continuing feed {} after instance {}", feed_id, previous_id);

            let run = run_chained(backend, request, previous_id, None).await?;

            let previous_path = layout.locate_previous_instance_path(&cwd, previous_id, feed_id);
            let output_path = layout.continue_output_path(&previous_path, &run.plugin_name, run.id);
            info!(
                "Scheduled {} instance {} after instance {} in feed {}",
                run.plugin_name, run.id, previous_id, feed_id
            );

            Ok(PluginExecutionResult {
                feed_id: None,
                bootstrap_instance_id: None,
                plugin_instance_id: run.id,
                plugin_name: run.plugin_name,
                output_path,
            })
        }
    }
}

async fn run_chained(
    backend: &dyn ChrisBackend,
    request: &PluginRunRequest,
    previous_id: u64,
    orphaned_feed: Option<u64>,
) -> Result<PluginRun, PluginRunError> {
    let params = build_run_params(
        &request.plugin_params,
        previous_id,
        request.context.instance_title.as_deref(),
    );

    backend
        .run_plugin(&request.plugin_name, &params)
        .await
        .map_err(|e| {
            warn!("Run of {} failed: {}", request.plugin_name, e);
            PluginRunError::RemoteRun {
                plugin: request.plugin_name.clone(),
                source: e,
                orphaned_feed,
            }
        })
}
