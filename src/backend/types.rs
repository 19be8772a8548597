//! Backend communication types
//!
//! Requests and records exchanged with the remote resource API, independent of
//! the transport used by a particular `ChrisBackend` implementation.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Query for list/search endpoints
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListQuery {
    /// Maximum number of records per page
    pub limit: Option<u32>,
    /// Offset of the first record
    pub offset: Option<u32>,
    /// Search filters (`name`, `fname`, `PatientID`, ...)
    pub search: BTreeMap<String, String>,
}

impl ListQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn with_offset(mut self, offset: u32) -> Self {
        self.offset = Some(offset);
        self
    }

    pub fn with_filter(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.search.insert(key.into(), value.into());
        self
    }

    /// True when at least one search filter is set
    pub fn is_search(&self) -> bool {
        !self.search.is_empty()
    }

    /// Flattens the query into URL query pairs
    pub fn to_pairs(&self) -> Vec<(String, String)> {
        let mut pairs: Vec<(String, String)> = self
            .search
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        if let Some(limit) = self.limit {
            pairs.push(("limit".to_string(), limit.to_string()));
        }
        if let Some(offset) = self.offset {
            pairs.push(("offset".to_string(), offset.to_string()));
        }
        pairs
    }
}

/// One page of a paginated collection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page<T> {
    /// Total number of matching records across all pages
    #[serde(default)]
    pub count: u64,
    /// URL of the next page
    #[serde(default)]
    pub next: Option<String>,
    /// URL of the previous page
    #[serde(default)]
    pub previous: Option<String>,
    pub results: Vec<T>,
}

impl<T> Page<T> {
    /// A single, complete page
    pub fn single(results: Vec<T>) -> Self {
        Self {
            count: results.len() as u64,
            next: None,
            previous: None,
            results,
        }
    }

    pub fn has_more(&self) -> bool {
        self.next.is_some()
    }
}

/// Reference to a specific plugin, optionally pinned to a version
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PluginRef {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
}

impl PluginRef {
    pub fn new(name: impl Into<String>, version: Option<String>) -> Self {
        Self {
            name: name.into(),
            version,
        }
    }
}

/// Request to create a feed by running the directory-copy plugin
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FeedCreateRequest {
    /// Remote directories copied into the new feed
    pub source_dirs: Vec<String>,
    /// Feed title
    pub title: String,
    /// Directory-copy plugin that seeds the feed
    pub plugin: PluginRef,
}

/// Reference to the first plugin instance of a feed
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstanceRef {
    #[serde(default)]
    pub id: Option<u64>,
    #[serde(default)]
    pub plugin_name: Option<String>,
}

/// Response of a feed creation; fields are optional because a malformed
/// response must be reported rather than rejected during decoding
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedCreated {
    #[serde(default)]
    pub id: Option<u64>,
    #[serde(default)]
    pub bootstrap_instance: Option<InstanceRef>,
}

impl FeedCreated {
    pub fn new(feed_id: u64, bootstrap_instance_id: u64) -> Self {
        Self {
            id: Some(feed_id),
            bootstrap_instance: Some(InstanceRef {
                id: Some(bootstrap_instance_id),
                plugin_name: None,
            }),
        }
    }

    pub fn bootstrap_instance_id(&self) -> Option<u64> {
        self.bootstrap_instance.as_ref().and_then(|i| i.id)
    }
}

/// A scheduled plugin instance
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PluginRun {
    /// Plugin instance id
    pub id: u64,
    /// Plugin name as resolved by the backend
    pub plugin_name: String,
    #[serde(default)]
    pub plugin_version: Option<String>,
    #[serde(default)]
    pub feed_id: Option<u64>,
    #[serde(default)]
    pub status: Option<String>,
}

impl PluginRun {
    pub fn new(id: u64, plugin_name: impl Into<String>) -> Self {
        Self {
            id,
            plugin_name: plugin_name.into(),
            plugin_version: None,
            feed_id: None,
            status: None,
        }
    }
}

/// A feed as listed by the backend
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedRecord {
    pub id: u64,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub creation_date: Option<String>,
    #[serde(default)]
    pub owner_username: Option<String>,
    #[serde(default)]
    pub public: bool,
    #[serde(default)]
    pub finished_jobs: u64,
    #[serde(default)]
    pub errored_jobs: u64,
}

/// A user file or a file produced by a plugin instance
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileRecord {
    pub id: u64,
    pub fname: String,
    #[serde(default)]
    pub fsize: u64,
    #[serde(default)]
    pub creation_date: Option<String>,
    /// Download URL of the file contents
    #[serde(default)]
    pub file_resource: Option<String>,
}

/// A folder created in the backend's file browser
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FolderRecord {
    pub id: u64,
    pub path: String,
}

/// A file received from a PACS
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PacsFileRecord {
    pub id: u64,
    pub fname: String,
    #[serde(default)]
    pub fsize: u64,
    #[serde(rename = "PatientID", default)]
    pub patient_id: Option<String>,
    #[serde(rename = "PatientName", default)]
    pub patient_name: Option<String>,
    #[serde(rename = "StudyDate", default)]
    pub study_date: Option<String>,
    #[serde(rename = "StudyDescription", default)]
    pub study_description: Option<String>,
    #[serde(rename = "SeriesDescription", default)]
    pub series_description: Option<String>,
    #[serde(rename = "Modality", default)]
    pub modality: Option<String>,
    #[serde(default)]
    pub pacs_identifier: Option<String>,
    #[serde(default)]
    pub file_resource: Option<String>,
}

/// A plugin registered in the backend
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PluginRecord {
    pub id: u64,
    pub name: String,
    pub version: String,
    #[serde(rename = "type", default)]
    pub plugin_type: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_list_query_pairs() {
        let query = ListQuery::new()
            .with_filter("name", "pl-dircopy")
            .with_limit(10)
            .with_offset(20);

        assert!(query.is_search());
        assert_eq!(
            query.to_pairs(),
            vec![
                ("name".to_string(), "pl-dircopy".to_string()),
                ("limit".to_string(), "10".to_string()),
                ("offset".to_string(), "20".to_string()),
            ]
        );
    }

    #[test]
    fn test_page_deserialize() {
        let page: Page<FeedRecord> = serde_json::from_value(serde_json::json!({
            "count": 2,
            "next": "http://localhost:8000/api/v1/?limit=1&offset=1",
            "previous": null,
            "results": [{"id": 4, "name": "study1", "finished_jobs": 2}]
        }))
        .unwrap();

        assert_eq!(page.count, 2);
        assert!(page.has_more());
        assert_eq!(page.results[0].name, "study1");
        assert_eq!(page.results[0].finished_jobs, 2);
        assert!(page.results[0].owner_username.is_none());
    }

    #[test]
    fn test_feed_created_tolerates_missing_fields() {
        let created: FeedCreated = serde_json::from_str("{}").unwrap();
        assert!(created.id.is_none());
        assert!(created.bootstrap_instance_id().is_none());

        let created = FeedCreated::new(10, 20);
        assert_eq!(created.id, Some(10));
        assert_eq!(created.bootstrap_instance_id(), Some(20));
    }

    #[test]
    fn test_pacs_record_dicom_field_names() {
        let record: PacsFileRecord = serde_json::from_value(serde_json::json!({
            "id": 3,
            "fname": "SERVICES/PACS/orthanc/1449/0001.dcm",
            "PatientID": "1449",
            "Modality": "MR"
        }))
        .unwrap();

        assert_eq!(record.patient_id.as_deref(), Some("1449"));
        assert_eq!(record.modality.as_deref(), Some("MR"));

        let value = serde_json::to_value(&record).unwrap();
        assert!(value.get("PatientID").is_some());
    }
}
