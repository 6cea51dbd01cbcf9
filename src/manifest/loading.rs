//! Reading revision manifests from JSON files or inline mappings.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use serde_json::{Map, Value};

use crate::error::{AssetError, Result};

/// Revision entries in manifest order with leading slashes stripped from keys and values.
#[derive(Debug, Clone, Default)]
pub(crate) struct RevisionTable {
    entries: Vec<(String, String)>,
    index: HashMap<String, usize>,
}

impl RevisionTable {
    /// Insert an entry; an existing key keeps its position and takes the new token.
    fn insert(&mut self, key: String, token: String) {
        match self.index.get(&key) {
            Some(&position) => self.entries[position].1 = token,
            None => {
                self.index.insert(key.clone(), self.entries.len());
                self.entries.push((key, token));
            }
        }
    }

    pub(crate) fn get(&self, key: &str) -> Option<&str> {
        self.index
            .get(key)
            .map(|&position| self.entries[position].1.as_str())
    }

    pub(crate) fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries
            .iter()
            .map(|(key, token)| (key.as_str(), token.as_str()))
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }
}

/// Load revision entries from a JSON manifest on disk.
pub(crate) fn load_manifest_file(path: &Path) -> Result<RevisionTable> {
    let content = fs::read_to_string(path).map_err(|source| AssetError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let label = path.display().to_string();
    let value: Value = serde_json::from_str(&content).map_err(|source| AssetError::ManifestParse {
        manifest: label.clone(),
        source,
    })?;

    match value {
        Value::Object(map) => collect_entries(&label, &map),
        other => Err(AssetError::invalid_manifest(
            label,
            format!("expected a JSON object of revisions, found {}", json_type(&other)),
        )),
    }
}

/// Convert an inline mapping into revision entries.
pub(crate) fn collect_entries(label: &str, map: &Map<String, Value>) -> Result<RevisionTable> {
    let mut table = RevisionTable::default();

    for (key, value) in map {
        let token = match value {
            Value::String(token) => token.clone(),
            Value::Number(number) => number.to_string(),
            other => {
                return Err(AssetError::invalid_manifest(
                    label,
                    format!("revision of '{key}' must be a string, found {}", json_type(other)),
                ));
            }
        };

        table.insert(
            key.trim_start_matches('/').to_string(),
            token.trim_start_matches('/').to_string(),
        );
    }

    Ok(table)
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::tempdir;

    fn object(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => unreachable!(),
        }
    }

    #[test]
    fn strips_leading_slashes_and_keeps_order() {
        let map = object(json!({
            "/js/app.js": "/js/app.1.js",
            "css/app.css": "abc123",
            "img/logo.png": 42
        }));

        let table = collect_entries("inline", &map).unwrap();
        let entries: Vec<_> = table.iter().collect();
        assert_eq!(entries, vec![
            ("js/app.js", "js/app.1.js"),
            ("css/app.css", "abc123"),
            ("img/logo.png", "42"),
        ]);
        assert_eq!(table.get("js/app.js"), Some("js/app.1.js"));
        assert_eq!(table.get("/js/app.js"), None);
    }

    #[test]
    fn duplicate_keys_after_stripping_replace_in_place() {
        let map = object(json!({
            "app.css": "v1",
            "other.css": "v2",
            "/app.css": "v3"
        }));

        let table = collect_entries("inline", &map).unwrap();
        let entries: Vec<_> = table.iter().collect();
        assert_eq!(entries, vec![("app.css", "v3"), ("other.css", "v2")]);
        assert_eq!(table.len(), 2);
    }

    #[test]
    fn rejects_non_string_revisions() {
        let map = object(json!({ "app.css": ["v1"] }));
        let error = collect_entries("inline", &map).unwrap_err();
        assert!(matches!(error, AssetError::ManifestParse { .. }));
    }

    #[test]
    fn rejects_invalid_json_files() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("manifest.json");
        fs::write(&path, "{\"app.css\": ").unwrap();

        let error = load_manifest_file(&path).unwrap_err();
        assert!(matches!(error, AssetError::ManifestParse { .. }));
    }

    #[test]
    fn rejects_non_object_manifests() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("manifest.json");
        fs::write(&path, "[\"app.css\"]").unwrap();

        let error = load_manifest_file(&path).unwrap_err();
        assert!(matches!(error, AssetError::ManifestParse { .. }));
    }
}
