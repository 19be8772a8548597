use super::client::ChrisBackend;
use super::error::BackendError;
use super::types::{
    FeedCreateRequest, FeedCreated, FeedRecord, FileRecord, FolderRecord, ListQuery,
    PacsFileRecord, Page, PluginRecord, PluginRun,
};
use async_trait::async_trait;
use bytes::Bytes;
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Mutex;

/// Operation kinds recorded by `MockBackend`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MockOperation {
    CreateFeed,
    RunPlugin,
    ListPlugins,
    ListFeeds,
    DeleteFeed,
    ListFiles,
    DeleteFile,
    CreateFolder,
    ListPacsFiles,
    Download,
}

/// A call received by `MockBackend`, with its arguments
#[derive(Debug, Clone, PartialEq)]
pub enum MockCall {
    CreateFeed(FeedCreateRequest),
    RunPlugin {
        searchable: String,
        params: Map<String, Value>,
    },
    ListPlugins(ListQuery),
    ListFeeds(ListQuery),
    DeleteFeed(u64),
    ListFiles {
        path: String,
        query: ListQuery,
    },
    DeleteFile(u64),
    CreateFolder(String),
    ListPacsFiles(ListQuery),
    Download(String),
}

impl MockCall {
    pub fn operation(&self) -> MockOperation {
        match self {
            MockCall::CreateFeed(_) => MockOperation::CreateFeed,
            MockCall::RunPlugin { .. } => MockOperation::RunPlugin,
            MockCall::ListPlugins(_) => MockOperation::ListPlugins,
            MockCall::ListFeeds(_) => MockOperation::ListFeeds,
            MockCall::DeleteFeed(_) => MockOperation::DeleteFeed,
            MockCall::ListFiles { .. } => MockOperation::ListFiles,
            MockCall::DeleteFile(_) => MockOperation::DeleteFile,
            MockCall::CreateFolder(_) => MockOperation::CreateFolder,
            MockCall::ListPacsFiles(_) => MockOperation::ListPacsFiles,
            MockCall::Download(_) => MockOperation::Download,
        }
    }
}

/// Scripted in-memory backend.
///
/// Feed creations and plugin runs are answered from FIFO queues; listings are
/// served from seeded records with the same filter and paging rules for every
/// collection. Every call is recorded so tests can assert on call counts.
pub struct MockBackend {
    name: String,
    feed_responses: Mutex<VecDeque<Result<FeedCreated, BackendError>>>,
    run_responses: Mutex<VecDeque<Result<PluginRun, BackendError>>>,
    plugins: Mutex<Vec<PluginRecord>>,
    feeds: Mutex<Vec<FeedRecord>>,
    files: Mutex<Vec<FileRecord>>,
    pacs_files: Mutex<Vec<PacsFileRecord>>,
    downloads: Mutex<HashMap<String, Bytes>>,
    failing_ids: Mutex<HashSet<u64>>,
    failing_operations: Mutex<HashMap<MockOperation, BackendError>>,
    calls: Mutex<Vec<MockCall>>,
    next_folder_id: Mutex<u64>,
    page_size: Option<usize>,
}

impl MockBackend {
    pub fn new() -> Self {
        Self::with_name("MockBackend")
    }

    pub fn with_name(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            feed_responses: Mutex::new(VecDeque::new()),
            run_responses: Mutex::new(VecDeque::new()),
            plugins: Mutex::new(Vec::new()),
            feeds: Mutex::new(Vec::new()),
            files: Mutex::new(Vec::new()),
            pacs_files: Mutex::new(Vec::new()),
            downloads: Mutex::new(HashMap::new()),
            failing_ids: Mutex::new(HashSet::new()),
            failing_operations: Mutex::new(HashMap::new()),
            calls: Mutex::new(Vec::new()),
            next_folder_id: Mutex::new(1),
            page_size: None,
        }
    }

    /// Caps pages at `size` records when a query sets no limit
    pub fn with_page_size(mut self, size: usize) -> Self {
        self.page_size = Some(size);
        self
    }

    pub fn add_feed_response(&self, response: Result<FeedCreated, BackendError>) {
        self.feed_responses.lock().unwrap().push_back(response);
    }

    pub fn add_run_response(&self, response: Result<PluginRun, BackendError>) {
        self.run_responses.lock().unwrap().push_back(response);
    }

    pub fn add_plugins(&self, plugins: impl IntoIterator<Item = PluginRecord>) {
        self.plugins.lock().unwrap().extend(plugins);
    }

    pub fn add_feeds(&self, feeds: impl IntoIterator<Item = FeedRecord>) {
        self.feeds.lock().unwrap().extend(feeds);
    }

    pub fn add_files(&self, files: impl IntoIterator<Item = FileRecord>) {
        self.files.lock().unwrap().extend(files);
    }

    pub fn add_pacs_files(&self, files: impl IntoIterator<Item = PacsFileRecord>) {
        self.pacs_files.lock().unwrap().extend(files);
    }

    pub fn add_download(&self, resource_url: impl Into<String>, contents: impl Into<Bytes>) {
        self.downloads
            .lock()
            .unwrap()
            .insert(resource_url.into(), contents.into());
    }

    /// Makes deletions of the given feed/file id fail
    pub fn fail_id(&self, id: u64) {
        self.failing_ids.lock().unwrap().insert(id);
    }

    /// Makes every call of `operation` fail with `error`
    pub fn fail_operation(&self, operation: MockOperation, error: BackendError) {
        self.failing_operations
            .lock()
            .unwrap()
            .insert(operation, error);
    }

    pub fn calls(&self) -> Vec<MockCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self, operation: MockOperation) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|call| call.operation() == operation)
            .count()
    }

    pub fn total_calls(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub fn remaining_feed_responses(&self) -> usize {
        self.feed_responses.lock().unwrap().len()
    }

    pub fn remaining_run_responses(&self) -> usize {
        self.run_responses.lock().unwrap().len()
    }

    /// Feed records still present (deleted ones are removed)
    pub fn feeds(&self) -> Vec<FeedRecord> {
        self.feeds.lock().unwrap().clone()
    }

    pub fn files(&self) -> Vec<FileRecord> {
        self.files.lock().unwrap().clone()
    }

    fn record(&self, call: MockCall) -> Result<(), BackendError> {
        let operation = call.operation();
        self.calls.lock().unwrap().push(call);
        match self.failing_operations.lock().unwrap().get(&operation) {
            Some(error) => Err(error.clone()),
            None => Ok(()),
        }
    }

    fn check_id(&self, id: u64, resource: &str) -> Result<(), BackendError> {
        if self.failing_ids.lock().unwrap().contains(&id) {
            return Err(BackendError::ApiError {
                message: format!("MockBackend: refusing to delete {} {}", resource, id),
                status_code: Some(500),
            });
        }
        Ok(())
    }
}

impl Default for MockBackend {
    fn default() -> Self {
        Self::new()
    }
}

/// Applies search filters and paging the way list endpoints do.
///
/// A filter `key=value` (or `key_exact=value`) matches a record whose field
/// `key` renders to `value`; `key_icontains=value` matches case-insensitive
/// substrings. A plain `fname` filter matches by prefix.
fn filter_and_page<T: Clone + Serialize>(
    records: &[T],
    query: &ListQuery,
    page_size: Option<usize>,
) -> Page<T> {
    let matching: Vec<T> = records
        .iter()
        .filter(|record| matches_filters(*record, query))
        .cloned()
        .collect();

    let count = matching.len() as u64;
    let offset = query.offset.unwrap_or(0) as usize;
    let limit = query
        .limit
        .map(|l| l as usize)
        .or(page_size)
        .unwrap_or(usize::MAX);
    let results: Vec<T> = matching.into_iter().skip(offset).take(limit).collect();
    let end = offset.saturating_add(results.len()) as u64;

    Page {
        count,
        next: (end < count).then(|| format!("mock://page?offset={}", end)),
        previous: (offset > 0).then(|| "mock://page?offset=0".to_string()),
        results,
    }
}

enum FilterMode {
    Exact,
    Prefix,
    Contains,
}

fn matches_filters<T: Serialize>(record: &T, query: &ListQuery) -> bool {
    let value = match serde_json::to_value(record) {
        Ok(value) => value,
        Err(_) => return false,
    };

    query.search.iter().all(|(key, expected)| {
        let (field, mode) = if let Some(field) = key.strip_suffix("_icontains") {
            (field, FilterMode::Contains)
        } else if let Some(field) = key.strip_suffix("_exact") {
            (field, FilterMode::Exact)
        } else if key == "fname" {
            (key.as_str(), FilterMode::Prefix)
        } else {
            (key.as_str(), FilterMode::Exact)
        };
        let actual = match value.get(field) {
            Some(Value::String(s)) => s.clone(),
            Some(Value::Null) | None => return false,
            Some(other) => other.to_string(),
        };
        match mode {
            FilterMode::Contains => actual.to_lowercase().contains(&expected.to_lowercase()),
            FilterMode::Prefix => actual.starts_with(expected.as_str()),
            FilterMode::Exact => actual == *expected,
        }
    })
}

#[async_trait]
impl ChrisBackend for MockBackend {
    async fn create_feed(&self, request: &FeedCreateRequest) -> Result<FeedCreated, BackendError> {
        self.record(MockCall::CreateFeed(request.clone()))?;
        self.feed_responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| {
                Err(BackendError::Other {
                    message: "MockBackend: No more create_feed responses in queue".to_string(),
                })
            })
    }

    async fn run_plugin(
        &self,
        searchable: &str,
        params: &Map<String, Value>,
    ) -> Result<PluginRun, BackendError> {
        self.record(MockCall::RunPlugin {
            searchable: searchable.to_string(),
            params: params.clone(),
        })?;
        self.run_responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| {
                Err(BackendError::Other {
                    message: "MockBackend: No more run_plugin responses in queue".to_string(),
                })
            })
    }

    async fn list_plugins(&self, query: &ListQuery) -> Result<Page<PluginRecord>, BackendError> {
        self.record(MockCall::ListPlugins(query.clone()))?;
        Ok(filter_and_page(&self.plugins.lock().unwrap(), query, self.page_size))
    }

    async fn list_feeds(&self, query: &ListQuery) -> Result<Page<FeedRecord>, BackendError> {
        self.record(MockCall::ListFeeds(query.clone()))?;
        Ok(filter_and_page(&self.feeds.lock().unwrap(), query, self.page_size))
    }

    async fn delete_feed(&self, id: u64) -> Result<(), BackendError> {
        self.record(MockCall::DeleteFeed(id))?;
        self.check_id(id, "feed")?;
        let mut feeds = self.feeds.lock().unwrap();
        let before = feeds.len();
        feeds.retain(|feed| feed.id != id);
        if feeds.len() == before {
            return Err(BackendError::NotFound {
                resource: format!("feed {}", id),
            });
        }
        Ok(())
    }

    async fn list_files(
        &self,
        path: &str,
        query: &ListQuery,
    ) -> Result<Page<FileRecord>, BackendError> {
        self.record(MockCall::ListFiles {
            path: path.to_string(),
            query: query.clone(),
        })?;
        let under_path: Vec<FileRecord> = self
            .files
            .lock()
            .unwrap()
            .iter()
            .filter(|file| file.fname.starts_with(path))
            .cloned()
            .collect();
        Ok(filter_and_page(&under_path, query, self.page_size))
    }

    async fn delete_file(&self, id: u64) -> Result<(), BackendError> {
        self.record(MockCall::DeleteFile(id))?;
        self.check_id(id, "file")?;
        let mut files = self.files.lock().unwrap();
        let before = files.len();
        files.retain(|file| file.id != id);
        if files.len() == before {
            return Err(BackendError::NotFound {
                resource: format!("file {}", id),
            });
        }
        Ok(())
    }

    async fn create_folder(&self, path: &str) -> Result<FolderRecord, BackendError> {
        self.record(MockCall::CreateFolder(path.to_string()))?;
        let mut next_id = self.next_folder_id.lock().unwrap();
        let folder = FolderRecord {
            id: *next_id,
            path: path.to_string(),
        };
        *next_id += 1;
        Ok(folder)
    }

    async fn list_pacs_files(
        &self,
        query: &ListQuery,
    ) -> Result<Page<PacsFileRecord>, BackendError> {
        self.record(MockCall::ListPacsFiles(query.clone()))?;
        Ok(filter_and_page(&self.pacs_files.lock().unwrap(), query, self.page_size))
    }

    async fn download(&self, resource_url: &str) -> Result<Bytes, BackendError> {
        self.record(MockCall::Download(resource_url.to_string()))?;
        self.downloads
            .lock()
            .unwrap()
            .get(resource_url)
            .cloned()
            .ok_or_else(|| BackendError::NotFound {
                resource: resource_url.to_string(),
            })
    }

    fn name(&self) -> &str {
        &self.name
    }
}

impl std::fmt::Debug for MockBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockBackend")
            .field("name", &self.name)
            .field("total_calls", &self.total_calls())
            .field("remaining_feed_responses", &self.remaining_feed_responses())
            .field("remaining_run_responses", &self.remaining_run_responses())
            .finish()
    }
}
