//! Plugin names, versions and search strings
//!
//! Plugins are addressed either by a bare name (`pl-dircopy`), a versioned
//! name (`pl-dircopy-v2.1.1`) or a search string of `key: value` pairs
//! (`name_exact: pl-dircopy, version: 2.1.1`).

use super::types::{ListQuery, PluginRecord};
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;

/// Dotted numeric version; missing components compare as zero
#[derive(Debug, Clone)]
pub struct PluginVersion {
    components: Vec<u64>,
}

impl PluginVersion {
    /// Parses `2.1.1`, `v2.1`, `1.0.0-rc1` (trailing non-digits are ignored
    /// per component). Returns `None` when a component has no leading digit.
    pub fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        let raw = raw.strip_prefix('v').unwrap_or(raw);
        if raw.is_empty() {
            return None;
        }

        let mut components = Vec::new();
        for part in raw.split('.') {
            let digits: String = part.chars().take_while(|c| c.is_ascii_digit()).collect();
            if digits.is_empty() {
                return None;
            }
            components.push(digits.parse().ok()?);
        }
        Some(Self { components })
    }

    fn component(&self, index: usize) -> u64 {
        self.components.get(index).copied().unwrap_or(0)
    }
}

impl Ord for PluginVersion {
    fn cmp(&self, other: &Self) -> Ordering {
        let len = self.components.len().max(other.components.len());
        (0..len)
            .map(|i| self.component(i).cmp(&other.component(i)))
            .find(|ord| *ord != Ordering::Equal)
            .unwrap_or(Ordering::Equal)
    }
}

impl PartialOrd for PluginVersion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for PluginVersion {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for PluginVersion {}

impl fmt::Display for PluginVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.components.iter().map(|c| c.to_string()).collect();
        write!(f, "{}", parts.join("."))
    }
}

/// A plugin name split from its optional `-v<version>` suffix
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionedName {
    pub name: String,
    pub version: Option<String>,
}

impl VersionedName {
    pub fn parse(raw: &str) -> Self {
        let raw = raw.trim();
        if let Some(index) = raw.rfind("-v") {
            let (name, version) = (&raw[..index], &raw[index + 2..]);
            if !name.is_empty() && PluginVersion::parse(version).is_some() {
                return Self {
                    name: name.to_string(),
                    version: Some(version.to_string()),
                };
            }
        }
        Self {
            name: raw.to_string(),
            version: None,
        }
    }

    pub fn parsed_version(&self) -> Option<PluginVersion> {
        self.version.as_deref().and_then(PluginVersion::parse)
    }
}

impl fmt::Display for VersionedName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.version {
            Some(version) => write!(f, "{}-v{}", self.name, version),
            None => write!(f, "{}", self.name),
        }
    }
}

/// Search parameters selecting a plugin
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PluginSearch {
    pub params: BTreeMap<String, String>,
}

impl PluginSearch {
    pub fn parse(searchable: &str) -> Self {
        let mut params = BTreeMap::new();

        if searchable.contains(':') {
            for pair in searchable.split(',') {
                if let Some((key, value)) = pair.split_once(':') {
                    let (key, value) = (key.trim(), value.trim());
                    if !key.is_empty() && !value.is_empty() {
                        params.insert(key.to_string(), value.to_string());
                    }
                }
            }
        } else {
            let versioned = VersionedName::parse(searchable);
            params.insert("name_exact".to_string(), versioned.name);
            if let Some(version) = versioned.version {
                params.insert("version".to_string(), version);
            }
        }

        Self { params }
    }

    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    pub fn to_query(&self) -> ListQuery {
        self.params
            .iter()
            .fold(ListQuery::new(), |query, (k, v)| query.with_filter(k, v))
    }
}

impl fmt::Display for PluginSearch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let pairs: Vec<String> = self
            .params
            .iter()
            .map(|(k, v)| format!("{}: {}", k, v))
            .collect();
        write!(f, "{}", pairs.join(", "))
    }
}

/// Picks the record with the highest version; unparsable versions rank last
pub fn newest_plugin<'a>(
    records: impl IntoIterator<Item = &'a PluginRecord>,
) -> Option<&'a PluginRecord> {
    records
        .into_iter()
        .max_by(|a, b| PluginVersion::parse(&a.version).cmp(&PluginVersion::parse(&b.version)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(id: u64, version: &str) -> PluginRecord {
        PluginRecord {
            id,
            name: "pl-dircopy".to_string(),
            version: version.to_string(),
            plugin_type: Some("fs".to_string()),
            title: None,
        }
    }

    #[test]
    fn test_version_ordering() {
        let parse = |s| PluginVersion::parse(s).unwrap();
        assert!(parse("2.1.1") > parse("2.1.0"));
        assert!(parse("10.0.0") > parse("9.9.9"));
        assert!(parse("2.1") == parse("2.1.0"));
        assert!(parse("v1.2.3") == parse("1.2.3"));
        assert!(parse("1.0.0-rc1") == parse("1.0.0"));
        assert!(PluginVersion::parse("latest").is_none());
        assert!(PluginVersion::parse("").is_none());
    }

    #[test]
    fn test_versioned_name() {
        let parsed = VersionedName::parse("pl-dircopy-v2.1.1");
        assert_eq!(parsed.name, "pl-dircopy");
        assert_eq!(parsed.version.as_deref(), Some("2.1.1"));
        assert_eq!(parsed.to_string(), "pl-dircopy-v2.1.1");

        let bare = VersionedName::parse("pl-dircopy");
        assert_eq!(bare.name, "pl-dircopy");
        assert!(bare.version.is_none());

        // "-v" followed by something that is not a version stays in the name
        let odd = VersionedName::parse("pl-very-vague");
        assert_eq!(odd.name, "pl-very-vague");
        assert!(odd.version.is_none());
    }

    #[test]
    fn test_plugin_search_forms() {
        let search = PluginSearch::parse("pl-foo-v1.0.2");
        assert_eq!(search.params.get("name_exact").unwrap(), "pl-foo");
        assert_eq!(search.params.get("version").unwrap(), "1.0.2");

        let search = PluginSearch::parse("name: pl-foo, version: 1.0.2");
        assert_eq!(search.params.get("name").unwrap(), "pl-foo");
        assert_eq!(search.params.get("version").unwrap(), "1.0.2");
        assert_eq!(search.to_string(), "name: pl-foo, version: 1.0.2");

        assert!(PluginSearch::parse("name: , :x").is_empty());
    }

    #[test]
    fn test_newest_plugin() {
        let records = vec![record(1, "1.0.0"), record(2, "2.1.1"), record(3, "2.0.9")];
        assert_eq!(newest_plugin(&records).unwrap().id, 2);
        assert!(newest_plugin(&Vec::new()).is_none());
    }
}
