use super::error::BackendError;
use super::types::{
    FeedCreateRequest, FeedCreated, FeedRecord, FileRecord, FolderRecord, ListQuery,
    PacsFileRecord, Page, PluginRecord, PluginRun,
};
use async_trait::async_trait;
use bytes::Bytes;
use serde_json::{Map, Value};

/// Operations the intent layer needs from the remote resource API.
///
/// Implementations own transport, authentication and pagination details;
/// intents only see typed records and `BackendError`.
#[async_trait]
pub trait ChrisBackend: Send + Sync {
    /// Creates a feed by running the directory-copy plugin on `source_dirs`
    async fn create_feed(&self, request: &FeedCreateRequest) -> Result<FeedCreated, BackendError>;

    /// Schedules a plugin instance; `searchable` selects the plugin
    async fn run_plugin(
        &self,
        searchable: &str,
        params: &Map<String, Value>,
    ) -> Result<PluginRun, BackendError>;

    async fn list_plugins(&self, query: &ListQuery) -> Result<Page<PluginRecord>, BackendError>;

    async fn list_feeds(&self, query: &ListQuery) -> Result<Page<FeedRecord>, BackendError>;

    async fn delete_feed(&self, id: u64) -> Result<(), BackendError>;

    /// Lists files whose path starts with `path`
    async fn list_files(
        &self,
        path: &str,
        query: &ListQuery,
    ) -> Result<Page<FileRecord>, BackendError>;

    async fn delete_file(&self, id: u64) -> Result<(), BackendError>;

    async fn create_folder(&self, path: &str) -> Result<FolderRecord, BackendError>;

    async fn list_pacs_files(
        &self,
        query: &ListQuery,
    ) -> Result<Page<PacsFileRecord>, BackendError>;

    /// Downloads the contents behind a `file_resource` URL
    async fn download(&self, resource_url: &str) -> Result<Bytes, BackendError>;

    fn name(&self) -> &str;

    /// Base URL of the remote API, when there is one
    fn endpoint(&self) -> Option<String> {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct NullBackend;

    #[async_trait]
    impl ChrisBackend for NullBackend {
        async fn create_feed(
            &self,
            _request: &FeedCreateRequest,
        ) -> Result<FeedCreated, BackendError> {
            Ok(FeedCreated::new(1, 2))
        }

        async fn run_plugin(
            &self,
            searchable: &str,
            _params: &Map<String, Value>,
        ) -> Result<PluginRun, BackendError> {
            Ok(PluginRun::new(3, searchable))
        }

        async fn list_plugins(
            &self,
            _query: &ListQuery,
        ) -> Result<Page<PluginRecord>, BackendError> {
            Ok(Page::single(Vec::new()))
        }

        async fn list_feeds(&self, _query: &ListQuery) -> Result<Page<FeedRecord>, BackendError> {
            Ok(Page::single(Vec::new()))
        }

        async fn delete_feed(&self, _id: u64) -> Result<(), BackendError> {
            Ok(())
        }

        async fn list_files(
            &self,
            _path: &str,
            _query: &ListQuery,
        ) -> Result<Page<FileRecord>, BackendError> {
            Ok(Page::single(Vec::new()))
        }

        async fn delete_file(&self, _id: u64) -> Result<(), BackendError> {
            Ok(())
        }

        async fn create_folder(&self, path: &str) -> Result<FolderRecord, BackendError> {
            Ok(FolderRecord {
                id: 1,
                path: path.to_string(),
            })
        }

        async fn list_pacs_files(
            &self,
            _query: &ListQuery,
        ) -> Result<Page<PacsFileRecord>, BackendError> {
            Ok(Page::single(Vec::new()))
        }

        async fn download(&self, _resource_url: &str) -> Result<Bytes, BackendError> {
            Ok(Bytes::new())
        }

        fn name(&self) -> &str {
            "NullBackend"
        }
    }

    #[tokio::test]
    async fn test_backend_trait_object() {
        let backend: Box<dyn ChrisBackend> = Box::new(NullBackend);
        assert_eq!(backend.name(), "NullBackend");
        assert!(backend.endpoint().is_none());

        let run = backend.run_plugin("pl-foo", &Map::new()).await.unwrap();
        assert_eq!(run.id, 3);
        assert_eq!(run.plugin_name, "pl-foo");
    }
}
