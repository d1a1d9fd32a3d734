/*!
Search structured preference documents (property lists and JSON) for a
string, reporting where in the document it was found.
*/

use std::fs;
use std::path::Path;

use plist::Value as PlistValue;
use serde_json::Value as JsonValue;

use crate::error::{StoreError, StoreResult};
use crate::text::{bytes_contain_ignore_case, contains_ignore_case};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKind {
    Plist,
    Json,
}

impl DocumentKind {
    pub fn of(path: &Path) -> Option<Self> {
        let extension = path.extension()?.to_str()?;
        if extension.eq_ignore_ascii_case("plist") {
            Some(Self::Plist)
        } else if extension.eq_ignore_ascii_case("json") {
            Some(Self::Json)
        } else {
            None
        }
    }
}

/// Key paths (e.g. `Accounts[0].AccountID`) of every key or string value in
/// the document at `path` that contains `needle`.
pub fn search_file(path: &Path, needle: &str) -> StoreResult<Vec<String>> {
    match DocumentKind::of(path) {
        Some(DocumentKind::Plist) => Ok(search_plist(&PlistValue::from_file(path)?, needle)),
        Some(DocumentKind::Json) => {
            let bytes = fs::read(path).map_err(|e| StoreError::io(path, e))?;
            Ok(search_json(&serde_json::from_slice(&bytes)?, needle))
        }
        None => Err(StoreError::Malformed {
            what: "document type",
            detail: path.display().to_string(),
        }),
    }
}

pub fn search_plist(value: &PlistValue, needle: &str) -> Vec<String> {
    let mut found = Vec::new();
    walk_plist(value, String::new(), needle, &mut found);
    found
}

pub fn search_json(value: &JsonValue, needle: &str) -> Vec<String> {
    let mut found = Vec::new();
    walk_json(value, String::new(), needle, &mut found);
    found
}

fn child(parent: &str, key: &str) -> String {
    if parent.is_empty() {
        key.to_string()
    } else {
        format!("{parent}.{key}")
    }
}

fn walk_plist(value: &PlistValue, path: String, needle: &str, found: &mut Vec<String>) {
    match value {
        PlistValue::Dictionary(dict) => {
            for (key, value) in dict {
                let key_path = child(&path, key);
                if contains_ignore_case(key, needle) {
                    found.push(key_path.clone());
                }
                walk_plist(value, key_path, needle, found);
            }
        }
        PlistValue::Array(items) => {
            for (index, item) in items.iter().enumerate() {
                walk_plist(item, format!("{path}[{index}]"), needle, found);
            }
        }
        PlistValue::String(text) if contains_ignore_case(text, needle) => found.push(path),
        // Archived objects and nested plists end up as opaque data blobs.
        PlistValue::Data(bytes) if bytes_contain_ignore_case(bytes, needle.as_bytes()) => {
            found.push(path)
        }
        _ => {}
    }
}

fn walk_json(value: &JsonValue, path: String, needle: &str, found: &mut Vec<String>) {
    match value {
        JsonValue::Object(map) => {
            for (key, value) in map {
                let key_path = child(&path, key);
                if contains_ignore_case(key, needle) {
                    found.push(key_path.clone());
                }
                walk_json(value, key_path, needle, found);
            }
        }
        JsonValue::Array(items) => {
            for (index, item) in items.iter().enumerate() {
                walk_json(item, format!("{path}[{index}]"), needle, found);
            }
        }
        JsonValue::String(text) if contains_ignore_case(text, needle) => found.push(path),
        _ => {}
    }
}

/// Render a key path for display; the document root has an empty path.
pub fn display_key_path(path: &str) -> &str {
    if path.is_empty() { "(root)" } else { path }
}

#[cfg(test)]
mod tests {
    use super::*;
    use plist::Dictionary;
    use serde_json::json;
    use tempfile::TempDir;

    #[test]
    fn test_json_key_paths() {
        let document = json!({
            "account": {"email": "User@Example.com", "name": "Me"},
            "recent": ["a@b.c", "user@example.com"],
            "user@example.com": true,
            "count": 3
        });
        let mut found = search_json(&document, "user@example.com");
        found.sort();
        assert_eq!(found, vec!["account.email", "recent[1]", "user@example.com"]);
    }

    #[test]
    fn test_plist_data_and_nested_values() {
        let mut inner = Dictionary::new();
        inner.insert("AccountID".to_string(), PlistValue::String("user@example.com".to_string()));
        inner.insert("Blob".to_string(), PlistValue::Data(b"xxUSER@EXAMPLE.COMxx".to_vec()));
        let mut root = Dictionary::new();
        root.insert(
            "Accounts".to_string(),
            PlistValue::Array(vec![PlistValue::Dictionary(inner)]),
        );

        let found = search_plist(&PlistValue::Dictionary(root), "user@example.com");
        assert_eq!(found, vec!["Accounts[0].AccountID", "Accounts[0].Blob"]);
    }

    #[test]
    fn test_search_file_by_extension() {
        let dir = TempDir::new().unwrap();
        let json = dir.path().join("info.json");
        fs::write(&json, r#"{"personal": {"email": "user@example.com"}}"#).unwrap();
        assert_eq!(search_file(&json, "user@example.com").unwrap(), vec!["personal.email"]);

        let plist = dir.path().join("prefs.plist");
        PlistValue::String("user@example.com".to_string())
            .to_file_xml(&plist)
            .unwrap();
        let found = search_file(&plist, "user@example.com").unwrap();
        assert_eq!(found, vec![String::new()]);
        assert_eq!(display_key_path(&found[0]), "(root)");

        assert!(search_file(&dir.path().join("notes.txt"), "x").is_err());
    }
}
