//! File browsing, folders and downloads

use super::error::IntentError;
use super::feeds::DeleteReport;
use super::table::{table_from_page, ListOptions, ResourceTable};
use crate::backend::{ChrisBackend, FileRecord, FolderRecord, ListQuery};
use bytes::Bytes;
use serde::Serialize;
use tracing::{debug, info};

/// Downloaded file contents
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileContent {
    pub path: String,
    #[serde(skip)]
    pub bytes: Bytes,
}

impl FileContent {
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// File name part of the path
    pub fn file_name(&self) -> &str {
        self.path.rsplit('/').next().unwrap_or(&self.path)
    }
}

/// Storage paths are relative: leading `/` trimmed, repeated `/` collapsed
pub fn normalize_path(path: &str) -> String {
    path.split('/')
        .filter(|segment| !segment.is_empty())
        .collect::<Vec<_>>()
        .join("/")
}

pub async fn list_files(
    backend: &dyn ChrisBackend,
    path: &str,
    options: &ListOptions,
) -> Result<ResourceTable, IntentError> {
    let path = normalize_path(path);
    let page = backend.list_files(&path, &options.query).await?;
    debug!("Listed {} file(s) under '{}'", page.results.len(), path);
    table_from_page(&page, &options.fields)
}

pub async fn create_folder(
    backend: &dyn ChrisBackend,
    path: &str,
) -> Result<FolderRecord, IntentError> {
    let path = normalize_path(path);
    if path.is_empty() {
        return Err(IntentError::InvalidArgument(
            "folder path must not be empty".to_string(),
        ));
    }
    let folder = backend.create_folder(&path).await?;
    info!("Created folder {} ({})", folder.path, folder.id);
    Ok(folder)
}

pub async fn delete_files(backend: &dyn ChrisBackend, ids: &[u64]) -> DeleteReport {
    let mut report = DeleteReport::default();
    for &id in ids {
        report.record(id, backend.delete_file(id).await);
    }
    info!(
        "Deleted {} file(s), {} failure(s)",
        report.deleted.len(),
        report.failed.len()
    );
    report
}

/// Record whose `fname` equals `path` exactly
pub async fn find_file(
    backend: &dyn ChrisBackend,
    path: &str,
) -> Result<FileRecord, IntentError> {
    let path = normalize_path(path);
    let query = ListQuery::new().with_filter("fname_exact", path.clone());
    let page = backend.list_files(&path, &query).await?;
    page.results
        .into_iter()
        .find(|file| file.fname == path)
        .ok_or_else(|| IntentError::NotFound(format!("file '{}'", path)))
}

pub(crate) async fn fetch(
    backend: &dyn ChrisBackend,
    path: String,
    file_resource: Option<String>,
) -> Result<FileContent, IntentError> {
    let url = file_resource
        .ok_or_else(|| IntentError::NotFound(format!("download link of '{}'", path)))?;
    let bytes = backend.download(&url).await?;
    debug!("Downloaded {} byte(s) of '{}'", bytes.len(), path);
    Ok(FileContent { path, bytes })
}

pub async fn download_file(
    backend: &dyn ChrisBackend,
    path: &str,
) -> Result<FileContent, IntentError> {
    let file = find_file(backend, path).await?;
    fetch(backend, file.fname, file.file_resource).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{MockBackend, MockCall, MockOperation};
    use yare::parameterized;

    fn file(id: u64, fname: &str) -> FileRecord {
        FileRecord {
            id,
            fname: fname.to_string(),
            fsize: 3,
            creation_date: None,
            file_resource: Some(format!("mock://files/{}/data", id)),
        }
    }

    #[parameterized(
        leading_slash = { "/home/chris/uploads", "home/chris/uploads" },
        double_slash = { "home//chris///uploads/", "home/chris/uploads" },
        root = { "/", "" },
        already_clean = { "home/chris", "home/chris" },
    )]
    fn test_normalize_path(input: &str, expected: &str) {
        assert_eq!(normalize_path(input), expected);
    }

    #[tokio::test]
    async fn test_list_files_normalizes_path() {
        let backend = MockBackend::new();
        backend.add_files(vec![
            file(1, "home/chris/uploads/a.txt"),
            file(2, "home/chris/feeds/feed_1/x.txt"),
        ]);

        let table = list_files(&backend, "//home/chris/uploads", &ListOptions::new())
            .await
            .unwrap();

        assert_eq!(table.column("fname"), vec!["home/chris/uploads/a.txt"]);
        match &backend.calls()[0] {
            MockCall::ListFiles { path, .. } => assert_eq!(path, "home/chris/uploads"),
            other => panic!("unexpected call {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_create_folder() {
        let backend = MockBackend::new();
        let folder = create_folder(&backend, "/home/chris/new/").await.unwrap();
        assert_eq!(folder.path, "home/chris/new");

        assert!(matches!(
            create_folder(&backend, "/").await,
            Err(IntentError::InvalidArgument(_))
        ));
        assert_eq!(backend.call_count(MockOperation::CreateFolder), 1);
    }

    #[tokio::test]
    async fn test_download_exact_match_only() {
        let backend = MockBackend::new();
        backend.add_files(vec![
            file(1, "home/chris/uploads/a.txt.bak"),
            file(2, "home/chris/uploads/a.txt"),
        ]);
        backend.add_download("mock://files/2/data", &b"abc"[..]);

        let content = download_file(&backend, "/home/chris/uploads/a.txt")
            .await
            .unwrap();
        assert_eq!(content.path, "home/chris/uploads/a.txt");
        assert_eq!(content.file_name(), "a.txt");
        assert_eq!(&content.bytes[..], b"abc");
    }

    #[tokio::test]
    async fn test_download_missing_file() {
        let backend = MockBackend::new();
        backend.add_files(vec![file(1, "home/chris/uploads/a.txt.bak")]);

        let result = download_file(&backend, "home/chris/uploads/a.txt").await;
        assert!(matches!(result, Err(IntentError::NotFound(_))));
        assert_eq!(backend.call_count(MockOperation::Download), 0);
    }

    #[tokio::test]
    async fn test_delete_files() {
        let backend = MockBackend::new();
        backend.add_files(vec![file(1, "a"), file(2, "b")]);

        let report = delete_files(&backend, &[2, 1]).await;
        assert_eq!(report.deleted, vec![2, 1]);
        assert!(report.is_complete());
        assert!(backend.files().is_empty());
    }
}
