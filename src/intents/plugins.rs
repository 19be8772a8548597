//! Registered plugins

use super::error::IntentError;
use super::table::{table_from_page, ListOptions, ResourceTable};
use crate::backend::{ChrisBackend, ListQuery, VersionedName};
use tracing::debug;

pub use crate::backend::{newest_plugin, PluginSearch, PluginVersion};

const PAGE_SIZE: u32 = 100;

pub async fn list_plugins(
    backend: &dyn ChrisBackend,
    options: &ListOptions,
) -> Result<ResourceTable, IntentError> {
    let page = backend.list_plugins(&options.query).await?;
    table_from_page(&page, &options.fields)
}

/// Lists plugins matching a search string (see [`PluginSearch::parse`])
pub async fn search_plugins(
    backend: &dyn ChrisBackend,
    searchable: &str,
    fields: &[String],
) -> Result<ResourceTable, IntentError> {
    let query = PluginSearch::parse(searchable).to_query();
    let options = ListOptions {
        query,
        fields: fields.to_vec(),
    };
    list_plugins(backend, &options).await
}

/// Every registered plugin as `<name>-v<version>`, across all pages
pub async fn available_plugin_names(
    backend: &dyn ChrisBackend,
) -> Result<Vec<String>, IntentError> {
    let mut names = Vec::new();
    let mut offset = 0u32;

    loop {
        let query = ListQuery::new().with_limit(PAGE_SIZE).with_offset(offset);
        let page = backend.list_plugins(&query).await?;
        let fetched = page.results.len() as u32;
        let has_more = page.has_more();

        names.extend(page.results.into_iter().map(|plugin| {
            VersionedName {
                name: plugin.name,
                version: Some(plugin.version),
            }
            .to_string()
        }));

        if !has_more || fetched == 0 {
            break;
        }
        offset += fetched;
    }

    debug!("{} plugin(s) available", names.len());
    Ok(names)
}
