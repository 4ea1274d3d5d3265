//! JSON-file repository.
//!
//! The whole collection is held in memory and written to one JSON file on
//! `flush()`. The file is replaced atomically via a temporary sibling.

use dashmap::DashMap;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::HashMap;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::store::traits::{Repository, StoreResult};

/// Repository persisted as a single JSON object file.
#[derive(Debug)]
pub struct JsonFileRepository<V> {
    inner: DashMap<String, V>,
    path: PathBuf,
}

impl<V> JsonFileRepository<V>
where
    V: Serialize + DeserializeOwned + Clone,
{
    /// Open a collection, loading the file if it exists.
    pub fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        let path = path.as_ref().to_path_buf();
        let inner = DashMap::new();

        if path.exists() {
            let reader = BufReader::new(File::open(&path)?);
            let map: HashMap<String, V> = serde_json::from_reader(reader)?;
            for (k, v) in map {
                inner.insert(k, v);
            }
            tracing::info!(path = %path.display(), entries = inner.len(), "Loaded collection");
        }

        Ok(Self { inner, path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl<V> Repository<V> for JsonFileRepository<V>
where
    V: Serialize + DeserializeOwned + Clone + Send + Sync,
{
    fn get(&self, key: &str) -> StoreResult<Option<V>> {
        Ok(self.inner.get(key).map(|r| r.value().clone()))
    }

    fn put(&self, key: &str, value: V) -> StoreResult<()> {
        self.inner.insert(key.to_string(), value);
        Ok(())
    }

    fn delete(&self, key: &str) -> StoreResult<Option<V>> {
        Ok(self.inner.remove(key).map(|(_, v)| v))
    }

    fn list(&self) -> StoreResult<Vec<(String, V)>> {
        Ok(self
            .inner
            .iter()
            .map(|r| (r.key().clone(), r.value().clone()))
            .collect())
    }

    fn flush(&self) -> StoreResult<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let map: HashMap<String, V> = self
            .inner
            .iter()
            .map(|r| (r.key().clone(), r.value().clone()))
            .collect();

        let tmp = self.path.with_extension("json.tmp");
        {
            let mut writer = BufWriter::new(File::create(&tmp)?);
            serde_json::to_writer(&mut writer, &map)?;
            writer.flush()?;
        }
        fs::rename(&tmp, &self.path)?;

        tracing::debug!(path = %self.path.display(), entries = map.len(), "Flushed collection");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Item {
        name: String,
        count: u32,
    }

    #[test]
    fn test_flush_and_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("items.json");

        let repo = JsonFileRepository::open(&path).unwrap();
        repo.put("x", Item { name: "ball".into(), count: 3 }).unwrap();
        repo.put("y", Item { name: "boot".into(), count: 1 }).unwrap();
        repo.delete("y").unwrap();

        // Nothing is written until flush.
        assert!(!path.exists());
        repo.flush().unwrap();
        assert!(path.exists());

        let reloaded: JsonFileRepository<Item> = JsonFileRepository::open(&path).unwrap();
        assert_eq!(
            reloaded.get("x").unwrap(),
            Some(Item { name: "ball".into(), count: 3 })
        );
        assert!(reloaded.get("y").unwrap().is_none());
    }

    #[test]
    fn test_corrupt_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.json");
        fs::write(&path, "not json").unwrap();

        let result: StoreResult<JsonFileRepository<Item>> = JsonFileRepository::open(&path);
        assert!(result.is_err());
    }
}
