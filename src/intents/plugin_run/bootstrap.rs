//! Feed bootstrap through the directory-copy plugin

use super::error::PluginRunError;
use super::paths::FeedLayout;
use crate::backend::{ChrisBackend, FeedCreateRequest, PluginRef, VersionedName};
use serde::Serialize;
use tracing::{debug, info, warn};

/// A feed created by the directory-copy plugin
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FeedBootstrap {
    pub feed_id: u64,
    /// Instance id of the directory-copy run that seeded the feed
    pub bootstrap_instance_id: u64,
    /// Plugin name of the directory-copy run, without version
    pub dircopy_name: String,
}

/// Newest `<dircopy>` or `<dircopy>-v<version>` entry of `available`.
///
/// Entries must start with the plugin name and parse back to exactly that
/// name, so `pl-dircopy-extra-v1.0` is not a candidate for `pl-dircopy`.
/// Unversioned entries rank below any versioned one.
pub fn select_dircopy(dircopy_plugin: &str, available: &[String]) -> Option<VersionedName> {
    available
        .iter()
        .filter(|entry| entry.starts_with(dircopy_plugin))
        .map(|entry| VersionedName::parse(entry))
        .filter(|parsed| parsed.name == dircopy_plugin)
        .max_by(|a, b| a.parsed_version().cmp(&b.parsed_version()))
}

/// Last non-empty segment of the path, or the path itself
pub fn default_feed_title(cwd: &str) -> String {
    cwd.split('/')
        .rev()
        .find(|segment| !segment.is_empty())
        .unwrap_or(cwd)
        .to_string()
}

/// Creates a feed seeded from `source_dirs`.
///
/// Fails before any remote call when no directory-copy plugin is available.
/// A created feed is never removed, even when the caller fails later.
pub async fn bootstrap_dirs(
    backend: &dyn ChrisBackend,
    layout: &FeedLayout,
    source_dirs: &[String],
    title: &str,
    available_plugin_names: &[String],
) -> Result<FeedBootstrap, PluginRunError> {
    let dircopy = select_dircopy(&layout.dircopy_plugin, available_plugin_names).ok_or_else(|| {
        warn!(
            "No '{}' plugin among {} available plugin(s)",
            layout.dircopy_plugin,
            available_plugin_names.len()
        );
        PluginRunError::DircopyNotFound {
            plugin: layout.dircopy_plugin.clone(),
            candidates: available_plugin_names.len(),
        }
    })?;
    debug!("Selected {} for feed bootstrap", dircopy);

    let request = FeedCreateRequest {
        source_dirs: source_dirs.to_vec(),
        title: title.to_string(),
        plugin: PluginRef::new(dircopy.name.clone(), dircopy.version.clone()),
    };

    let created = backend.create_feed(&request).await.map_err(|e| {
        warn!("Feed creation failed: {}", e);
        PluginRunError::FeedCreation {
            reason: e.to_string(),
        }
    })?;

    let (feed_id, bootstrap_instance_id) = match (created.id, created.bootstrap_instance_id()) {
        (Some(feed_id), Some(instance_id)) => (feed_id, instance_id),
        (feed_id, instance_id) => {
            warn!(
                "Feed creation answered without ids (feed={:?}, instance={:?})",
                feed_id, instance_id
            );
            return Err(PluginRunError::FeedCreation {
                reason: format!(
                    "malformed response: missing {}",
                    if feed_id.is_none() {
                        "feed id"
                    } else {
                        "bootstrap instance id"
                    }
                ),
            });
        }
    };

    info!(
        "Bootstrapped feed {} '{}' with {} instance {}",
        feed_id, title, dircopy.name, bootstrap_instance_id
    );

    Ok(FeedBootstrap {
        feed_id,
        bootstrap_instance_id,
        dircopy_name: dircopy.name,
    })
}

/// Creates a feed from the working directory, titled after it by default
pub async fn bootstrap(
    backend: &dyn ChrisBackend,
    layout: &FeedLayout,
    cwd: &str,
    feed_title: Option<&str>,
    available_plugin_names: &[String],
) -> Result<FeedBootstrap, PluginRunError> {
    let title = match feed_title {
        Some(title) if !title.trim().is_empty() => title.to_string(),
        _ => default_feed_title(cwd),
    };
    bootstrap_dirs(
        backend,
        layout,
        &[cwd.to_string()],
        &title,
        available_plugin_names,
    )
    .await
}
