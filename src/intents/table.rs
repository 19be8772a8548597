//! Frontend-agnostic tables of resource records

use super::error::IntentError;
use crate::backend::{ListQuery, Page};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Options shared by listing intents
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListOptions {
    pub query: ListQuery,
    /// Fields to keep, in order; empty keeps every field
    pub fields: Vec<String>,
}

impl ListOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_query(mut self, query: ListQuery) -> Self {
        self.query = query;
        self
    }

    pub fn with_fields<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.fields = fields.into_iter().map(Into::into).collect();
        self
    }
}

/// Selected fields of a list of records
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResourceTable {
    pub fields: Vec<String>,
    pub rows: Vec<Map<String, Value>>,
    /// Total matches on the backend, which may exceed `rows.len()`
    pub total: u64,
    pub has_more: bool,
}

impl ResourceTable {
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Values of one column, rendered as text
    pub fn column(&self, field: &str) -> Vec<String> {
        self.rows
            .iter()
            .map(|row| row.get(field).map(render_cell).unwrap_or_default())
            .collect()
    }
}

/// Renders a cell for text output; strings lose their quotes, null is empty
pub fn render_cell(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn to_object<T: Serialize>(record: &T) -> Result<Map<String, Value>, IntentError> {
    match serde_json::to_value(record)? {
        Value::Object(map) => Ok(map),
        other => Err(IntentError::InvalidArgument(format!(
            "record is not an object: {}",
            other
        ))),
    }
}

/// Builds a table from records, keeping `fields` (all when empty).
///
/// Field names are checked against the first record; an unknown name is an
/// `InvalidArgument` listing the valid ones.
pub fn select_fields<T: Serialize>(
    records: &[T],
    fields: &[String],
) -> Result<ResourceTable, IntentError> {
    let objects = records
        .iter()
        .map(to_object)
        .collect::<Result<Vec<_>, _>>()?;

    let available: Vec<String> = objects
        .first()
        .map(|first| first.keys().cloned().collect())
        .unwrap_or_default();

    let fields = if fields.is_empty() {
        available
    } else {
        if !objects.is_empty() {
            if let Some(unknown) = fields.iter().find(|f| !available.contains(f)) {
                return Err(IntentError::InvalidArgument(format!(
                    "unknown field '{}'; valid fields: {}",
                    unknown,
                    available.join(", ")
                )));
            }
        }
        fields.to_vec()
    };

    let rows = objects
        .into_iter()
        .map(|object| {
            fields
                .iter()
                .map(|f| (f.clone(), object.get(f).cloned().unwrap_or(Value::Null)))
                .collect()
        })
        .collect::<Vec<Map<String, Value>>>();

    Ok(ResourceTable {
        total: rows.len() as u64,
        fields,
        rows,
        has_more: false,
    })
}

/// Builds a table from one page, carrying its total and continuation
pub fn table_from_page<T: Serialize>(
    page: &Page<T>,
    fields: &[String],
) -> Result<ResourceTable, IntentError> {
    let mut table = select_fields(&page.results, fields)?;
    table.total = page.count.max(table.rows.len() as u64);
    table.has_more = page.has_more();
    Ok(table)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[derive(Serialize)]
    struct Row {
        id: u64,
        name: String,
        owner: Option<String>,
    }

    fn rows() -> Vec<Row> {
        vec![
            Row {
                id: 1,
                name: "a".to_string(),
                owner: None,
            },
            Row {
                id: 2,
                name: "b".to_string(),
                owner: Some("chris".to_string()),
            },
        ]
    }

    #[test]
    fn test_all_fields_by_default() {
        let table = select_fields(&rows(), &[]).unwrap();
        assert_eq!(table.fields, vec!["id", "name", "owner"]);
        assert_eq!(table.len(), 2);
        assert_eq!(table.column("owner"), vec!["", "chris"]);
    }

    #[test]
    fn test_selected_fields() {
        let table = select_fields(&rows(), &["name".to_string(), "id".to_string()]).unwrap();
        assert_eq!(table.fields, vec!["name", "id"]);
        assert_eq!(table.rows[1].get("id"), Some(&json!(2)));
        assert!(table.rows[1].get("owner").is_none());
    }

    #[test]
    fn test_unknown_field_lists_valid_ones() {
        let err = select_fields(&rows(), &["size".to_string()]).unwrap_err();
        let message = err.to_string();
        assert!(message.contains("unknown field 'size'"));
        assert!(message.contains("id, name, owner"));
    }

    #[test]
    fn test_empty_records() {
        let table = select_fields::<Row>(&[], &["anything".to_string()]).unwrap();
        assert!(table.is_empty());
        assert_eq!(table.fields, vec!["anything"]);
    }

    #[test]
    fn test_table_from_page() {
        let page = Page {
            count: 40,
            next: Some("next".to_string()),
            previous: None,
            results: rows(),
        };
        let table = table_from_page(&page, &[]).unwrap();
        assert_eq!(table.total, 40);
        assert!(table.has_more);
    }

    #[test]
    fn test_render_cell() {
        assert_eq!(render_cell(&json!("x")), "x");
        assert_eq!(render_cell(&json!(3)), "3");
        assert_eq!(render_cell(&json!(null)), "");
        assert_eq!(render_cell(&json!(true)), "true");
    }
}
