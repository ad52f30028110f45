//! Per-world metadata documents.
//!
//! Each world has one flat YAML mapping on disk. Only `name` is interpreted;
//! every other key is carried through load/save untouched.

use serde_yaml::{Mapping, Value};
use std::path::{Path, PathBuf};

/// Key holding the world name inside a metadata document.
pub const NAME_KEY: &str = "name";

/// Errors from reading or writing a metadata document.
#[derive(Debug, thiserror::Error)]
pub enum MetadataError {
    #[error("IO error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("YAML error in {path}: {source}")]
    Yaml {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },
    #[error("{0} does not contain a key-value mapping")]
    NotAMapping(PathBuf),
}

/// An open key-value document bound to a file.
#[derive(Debug, Clone)]
pub struct MetadataDoc {
    path: PathBuf,
    values: Mapping,
}

impl MetadataDoc {
    /// Open the document at `path`. A missing or empty file is an empty document.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, MetadataError> {
        let path = path.as_ref().to_path_buf();
        let text = match std::fs::read_to_string(&path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => String::new(),
            Err(source) => return Err(MetadataError::Io { path, source }),
        };

        let values = if text.trim().is_empty() {
            Mapping::new()
        } else {
            match serde_yaml::from_str::<Value>(&text) {
                Ok(Value::Mapping(m)) => m,
                Ok(Value::Null) => Mapping::new(),
                Ok(_) => return Err(MetadataError::NotAMapping(path)),
                Err(source) => return Err(MetadataError::Yaml { path, source }),
            }
        };

        Ok(Self { path, values })
    }

    /// Write the document back to its file.
    pub fn save(&self) -> Result<(), MetadataError> {
        let text = serde_yaml::to_string(&self.values).map_err(|source| MetadataError::Yaml {
            path: self.path.clone(),
            source,
        })?;
        std::fs::write(&self.path, text).map_err(|source| MetadataError::Io {
            path: self.path.clone(),
            source,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The `name` entry, if present and a string.
    pub fn name(&self) -> Option<&str> {
        self.get_str(NAME_KEY)
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.values.get(key).and_then(Value::as_str)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    /// Set `key`, returning the previous value.
    pub fn set(&mut self, key: &str, value: impl Into<Value>) -> Option<Value> {
        self.values.insert(Value::from(key), value.into())
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.values.remove(key)
    }

    /// String keys in document order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.values.keys().filter_map(Value::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_opens_empty() {
        let tmp = tempfile::tempdir().unwrap();
        let doc = MetadataDoc::open(tmp.path().join("absent.yml")).unwrap();
        assert!(doc.name().is_none());
        assert_eq!(doc.keys().count(), 0);
    }

    #[test]
    fn unknown_keys_survive_save() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("lobby.yml");
        std::fs::write(&path, "name: lobby\ndifficulty: 2\nspawn:\n  x: 4\n").unwrap();

        let mut doc = MetadataDoc::open(&path).unwrap();
        assert_eq!(doc.name(), Some("lobby"));
        doc.set("pvp", false);
        doc.save().unwrap();

        let reopened = MetadataDoc::open(&path).unwrap();
        assert_eq!(reopened.name(), Some("lobby"));
        assert_eq!(reopened.get("difficulty").and_then(Value::as_u64), Some(2));
        assert!(reopened.get("spawn").is_some_and(Value::is_mapping));
        assert_eq!(reopened.get("pvp").and_then(Value::as_bool), Some(false));
    }

    #[test]
    fn non_string_name_is_not_a_name() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("odd.yml");
        std::fs::write(&path, "name: 12\n").unwrap();
        let doc = MetadataDoc::open(&path).unwrap();
        assert!(doc.contains(NAME_KEY));
        assert!(doc.name().is_none());
    }

    #[test]
    fn sequence_document_is_rejected() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("list.yml");
        std::fs::write(&path, "- a\n- b\n").unwrap();
        match MetadataDoc::open(&path) {
            Err(MetadataError::NotAMapping(p)) => assert_eq!(p, path),
            other => panic!("expected NotAMapping, got: {other:?}"),
        }
    }

    #[test]
    fn broken_yaml_is_reported() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("bad.yml");
        std::fs::write(&path, "name: [unclosed\n").unwrap();
        assert!(matches!(
            MetadataDoc::open(&path),
            Err(MetadataError::Yaml { .. })
        ));
    }

    #[test]
    fn remove_drops_key() {
        let tmp = tempfile::tempdir().unwrap();
        let mut doc = MetadataDoc::open(tmp.path().join("w.yml")).unwrap();
        doc.set(NAME_KEY, "w");
        assert_eq!(doc.remove(NAME_KEY).as_ref().and_then(Value::as_str), Some("w"));
        assert!(!doc.contains(NAME_KEY));
    }
}
