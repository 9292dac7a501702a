//! Hierarchical key/value settings storage.

use std::{
    collections::BTreeMap,
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result as AnyResult};
use log::debug;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Groups of `key -> value` pairs, the shape compiler sets are persisted in.
pub trait SettingsStore {
    fn value(&self, group: &str, key: &str) -> Option<Value>;
    fn set_value(&mut self, group: &str, key: &str, value: Value);
    fn remove_key(&mut self, group: &str, key: &str);
    fn remove_group(&mut self, group: &str);
    fn keys(&self, group: &str) -> Vec<String>;
    fn has_group(&self, group: &str) -> bool;

    /// Flushes pending writes to the backing medium.
    fn sync(&mut self) -> AnyResult<()> {
        Ok(())
    }

    fn string(&self, group: &str, key: &str) -> Option<String> {
        match self.value(group, key)? {
            Value::String(s) => Some(s),
            Value::Number(n) => Some(n.to_string()),
            Value::Bool(b) => Some(b.to_string()),
            _ => None,
        }
    }

    fn bool(&self, group: &str, key: &str) -> Option<bool> {
        match self.value(group, key)? {
            Value::Bool(b) => Some(b),
            Value::String(s) => match s.as_str() {
                "true" | "1" => Some(true),
                "false" | "0" => Some(false),
                _ => None,
            },
            Value::Number(n) => n.as_i64().map(|n| n != 0),
            _ => None,
        }
    }

    fn int(&self, group: &str, key: &str) -> Option<i64> {
        match self.value(group, key)? {
            Value::Number(n) => n.as_i64(),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    /// Reads a list, accepting a bare string as a one-element list.
    fn string_list(&self, group: &str, key: &str) -> Vec<String> {
        match self.value(group, key) {
            Some(Value::Array(items)) => items
                .into_iter()
                .filter_map(|item| match item {
                    Value::String(s) => Some(s),
                    _ => None,
                })
                .collect(),
            Some(Value::String(s)) if !s.is_empty() => vec![s],
            _ => Vec::new(),
        }
    }
}

/// A settings store living in memory.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MemoryStore {
    groups: BTreeMap<String, BTreeMap<String, Value>>,
}

impl MemoryStore {
    pub fn new() -> MemoryStore {
        MemoryStore::default()
    }

    pub fn group_names(&self) -> impl Iterator<Item = &str> {
        self.groups.keys().map(String::as_str)
    }
}

impl SettingsStore for MemoryStore {
    fn value(&self, group: &str, key: &str) -> Option<Value> {
        self.groups.get(group)?.get(key).cloned()
    }

    fn set_value(&mut self, group: &str, key: &str, value: Value) {
        self.groups
            .entry(group.to_owned())
            .or_default()
            .insert(key.to_owned(), value);
    }

    fn remove_key(&mut self, group: &str, key: &str) {
        if let Some(entries) = self.groups.get_mut(group) {
            entries.remove(key);
        }
    }

    fn remove_group(&mut self, group: &str) {
        self.groups.remove(group);
    }

    fn keys(&self, group: &str) -> Vec<String> {
        self.groups
            .get(group)
            .map(|entries| entries.keys().cloned().collect())
            .unwrap_or_default()
    }

    fn has_group(&self, group: &str) -> bool {
        self.groups.contains_key(group)
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum FileFormat {
    Json,
    Toml,
}

impl FileFormat {
    fn of(path: &Path) -> FileFormat {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("toml") => FileFormat::Toml,
            _ => FileFormat::Json,
        }
    }
}

/// A [`MemoryStore`] mirrored to a JSON or TOML file.
///
/// The format follows the file extension. A missing file reads as an empty
/// store and is created on the first [`SettingsStore::sync`].
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    format: FileFormat,
    inner: MemoryStore,
}

impl FileStore {
    pub fn open(path: impl Into<PathBuf>) -> AnyResult<FileStore> {
        let path = path.into();
        let format = FileFormat::of(&path);

        let inner = if path.exists() {
            let content = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read settings file `{}`", path.display()))?;

            match format {
                FileFormat::Json => serde_json::from_str(&content).map_err(anyhow::Error::from),
                FileFormat::Toml => toml::from_str(&content).map_err(anyhow::Error::from),
            }
            .with_context(|| format!("Failed to parse settings file `{}`", path.display()))?
        } else {
            debug!("Settings file `{}` does not exist yet", path.display());
            MemoryStore::new()
        };

        Ok(FileStore {
            path,
            format,
            inner,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SettingsStore for FileStore {
    fn value(&self, group: &str, key: &str) -> Option<Value> {
        self.inner.value(group, key)
    }

    fn set_value(&mut self, group: &str, key: &str, value: Value) {
        self.inner.set_value(group, key, value)
    }

    fn remove_key(&mut self, group: &str, key: &str) {
        self.inner.remove_key(group, key)
    }

    fn remove_group(&mut self, group: &str) {
        self.inner.remove_group(group)
    }

    fn keys(&self, group: &str) -> Vec<String> {
        self.inner.keys(group)
    }

    fn has_group(&self, group: &str) -> bool {
        self.inner.has_group(group)
    }

    fn sync(&mut self) -> AnyResult<()> {
        let content = match self.format {
            FileFormat::Json => {
                serde_json::to_string_pretty(&self.inner).context("Failed to serialize settings")?
            }
            FileFormat::Toml => {
                toml::to_string(&self.inner).context("Failed to serialize settings")?
            }
        };

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create settings directory `{}`", parent.display())
            })?;
        }

        fs::write(&self.path, content)
            .with_context(|| format!("Failed to write settings file `{}`", self.path.display()))
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn typed_getters_are_lenient() {
        let mut store = MemoryStore::new();
        store.set_value("g", "flag", json!("true"));
        store.set_value("g", "count", json!("3"));
        store.set_value("g", "one", json!("/usr/bin"));

        assert_eq!(store.bool("g", "flag"), Some(true));
        assert_eq!(store.int("g", "count"), Some(3));
        assert_eq!(store.string_list("g", "one"), ["/usr/bin"]);
        assert!(store.string_list("g", "missing").is_empty());
    }

    #[test]
    fn remove_group_drops_every_key() {
        let mut store = MemoryStore::new();
        store.set_value("a", "k", json!(1));
        store.set_value("b", "k", json!(2));

        store.remove_group("a");

        assert!(!store.has_group("a"));
        assert_eq!(store.keys("b"), ["k"]);
    }

    #[test]
    fn file_store_round_trips_both_formats() {
        let dir = tempfile::tempdir().unwrap();

        for name in ["settings.json", "settings.toml"] {
            let path = dir.path().join(name);

            let mut store = FileStore::open(&path).unwrap();
            store.set_value("CompilerSet_0", "Name", json!("GCC 13.2.0"));
            store.set_value("CompilerSet_0", "Bins", json!(["/usr/bin"]));
            store.set_value("CompilerSets", "count", json!(1));
            store.sync().unwrap();

            let reopened = FileStore::open(&path).unwrap();
            assert_eq!(
                reopened.string("CompilerSet_0", "Name").as_deref(),
                Some("GCC 13.2.0")
            );
            assert_eq!(reopened.string_list("CompilerSet_0", "Bins"), ["/usr/bin"]);
            assert_eq!(reopened.int("CompilerSets", "count"), Some(1));
        }
    }
}
