//! Feed listing, creation and deletion

use super::error::IntentError;
use super::plugin_run::{bootstrap_dirs, FeedBootstrap, FeedLayout};
use super::table::{table_from_page, ListOptions, ResourceTable};
use crate::backend::{BackendError, ChrisBackend};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

/// Outcome of a batch deletion; failures do not stop the batch
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DeleteReport {
    pub deleted: Vec<u64>,
    pub failed: Vec<DeleteFailure>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeleteFailure {
    pub id: u64,
    pub error: String,
}

impl DeleteReport {
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }

    pub(crate) fn record(&mut self, id: u64, result: Result<(), BackendError>) {
        match result {
            Ok(()) => self.deleted.push(id),
            Err(e) => {
                warn!("Failed to delete {}: {}", id, e);
                self.failed.push(DeleteFailure {
                    id,
                    error: e.to_string(),
                });
            }
        }
    }
}

pub async fn list_feeds(
    backend: &dyn ChrisBackend,
    options: &ListOptions,
) -> Result<ResourceTable, IntentError> {
    let page = backend.list_feeds(&options.query).await?;
    debug!("Listed {} of {} feed(s)", page.results.len(), page.count);
    table_from_page(&page, &options.fields)
}

/// Creates a feed that copies `dirs`, titled `title`
pub async fn create_feed_from_dirs(
    backend: &dyn ChrisBackend,
    layout: &FeedLayout,
    dirs: &[String],
    title: &str,
    available_plugin_names: &[String],
) -> Result<FeedBootstrap, IntentError> {
    let dirs: Vec<String> = dirs
        .iter()
        .map(|d| d.trim().to_string())
        .filter(|d| !d.is_empty())
        .collect();
    if dirs.is_empty() {
        return Err(IntentError::InvalidArgument(
            "at least one source directory is required".to_string(),
        ));
    }

    let feed = bootstrap_dirs(backend, layout, &dirs, title, available_plugin_names).await?;
    info!("Created feed {} from {} dir(s)", feed.feed_id, dirs.len());
    Ok(feed)
}

pub async fn delete_feeds(backend: &dyn ChrisBackend, ids: &[u64]) -> DeleteReport {
    let mut report = DeleteReport::default();
    for &id in ids {
        report.record(id, backend.delete_feed(id).await);
    }
    info!(
        "Deleted {} feed(s), {} failure(s)",
        report.deleted.len(),
        report.failed.len()
    );
    report
}
