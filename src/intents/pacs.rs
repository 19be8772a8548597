//! Files received from a PACS

use super::error::IntentError;
use super::files::{fetch, normalize_path, FileContent};
use super::table::{table_from_page, ListOptions, ResourceTable};
use crate::backend::{ChrisBackend, ListQuery, PacsFileRecord};
use tracing::debug;

pub async fn list_pacs_files(
    backend: &dyn ChrisBackend,
    options: &ListOptions,
) -> Result<ResourceTable, IntentError> {
    let page = backend.list_pacs_files(&options.query).await?;
    debug!("Listed {} of {} PACS file(s)", page.results.len(), page.count);
    table_from_page(&page, &options.fields)
}

pub async fn find_pacs_file(
    backend: &dyn ChrisBackend,
    path: &str,
) -> Result<PacsFileRecord, IntentError> {
    let path = normalize_path(path);
    let query = ListQuery::new().with_filter("fname_exact", path.clone());
    backend
        .list_pacs_files(&query)
        .await?
        .results
        .into_iter()
        .find(|file| file.fname == path)
        .ok_or_else(|| IntentError::NotFound(format!("PACS file '{}'", path)))
}

/// Looks up a PACS file by exact path and downloads it
pub async fn resolve_pacs_file(
    backend: &dyn ChrisBackend,
    path: &str,
) -> Result<FileContent, IntentError> {
    let file = find_pacs_file(backend, path).await?;
    fetch(backend, file.fname, file.file_resource).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{BackendError, MockBackend, MockOperation};

    fn pacs_file(id: u64, patient: &str, modality: &str) -> PacsFileRecord {
        PacsFileRecord {
            id,
            fname: format!("SERVICES/PACS/orthanc/{}/{:04}.dcm", patient, id),
            fsize: 512,
            patient_id: Some(patient.to_string()),
            patient_name: None,
            study_date: Some("2024-03-01".to_string()),
            study_description: None,
            series_description: None,
            modality: Some(modality.to_string()),
            pacs_identifier: Some("orthanc".to_string()),
            file_resource: Some(format!("mock://pacs/{}/data", id)),
        }
    }

    #[tokio::test]
    async fn test_list_by_patient() {
        let backend = MockBackend::new();
        backend.add_pacs_files(vec![
            pacs_file(1, "1449", "MR"),
            pacs_file(2, "1449", "CT"),
            pacs_file(3, "2001", "MR"),
        ]);

        let options = ListOptions::new()
            .with_query(ListQuery::new().with_filter("PatientID", "1449"))
            .with_fields(["id", "Modality"]);
        let table = list_pacs_files(&backend, &options).await.unwrap();

        assert_eq!(table.column("Modality"), vec!["MR", "CT"]);
        assert_eq!(table.total, 2);
    }

    #[tokio::test]
    async fn test_resolve_downloads_exact_file() {
        let backend = MockBackend::new();
        backend.add_pacs_files(vec![pacs_file(1, "1449", "MR"), pacs_file(2, "1449", "MR")]);
        backend.add_download("mock://pacs/2/data", &b"DICM"[..]);

        let content = resolve_pacs_file(&backend, "/SERVICES/PACS/orthanc/1449/0002.dcm")
            .await
            .unwrap();
        assert_eq!(content.file_name(), "0002.dcm");
        assert_eq!(content.len(), 4);
    }

    #[tokio::test]
    async fn test_find_exact_path_beyond_first_page() {
        let backend = MockBackend::new().with_page_size(2);
        let exact = pacs_file(1, "1449", "MR");
        let mut files: Vec<PacsFileRecord> = (2..=4)
            .map(|id| PacsFileRecord {
                fname: format!("{}.{}", exact.fname, id),
                ..pacs_file(id, "1449", "MR")
            })
            .collect();
        files.push(exact);
        backend.add_pacs_files(files);

        let found = find_pacs_file(&backend, "SERVICES/PACS/orthanc/1449/0001.dcm")
            .await
            .unwrap();
        assert_eq!(found.fname, "SERVICES/PACS/orthanc/1449/0001.dcm");
    }

    #[tokio::test]
    async fn test_resolve_unknown_path() {
        let backend = MockBackend::new();
        let result = resolve_pacs_file(&backend, "SERVICES/PACS/none.dcm").await;
        assert!(matches!(result, Err(IntentError::NotFound(_))));
        assert_eq!(backend.call_count(MockOperation::Download), 0);
    }

    #[tokio::test]
    async fn test_download_failure_is_backend_error() {
        let backend = MockBackend::new();
        backend.add_pacs_files(vec![pacs_file(1, "1449", "MR")]);

        let result = resolve_pacs_file(&backend, "SERVICES/PACS/orthanc/1449/0001.dcm").await;
        assert!(matches!(
            result,
            Err(IntentError::Backend(BackendError::NotFound { .. }))
        ));
    }
}
