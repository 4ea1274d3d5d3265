//! In-memory repository.

use dashmap::DashMap;

use crate::store::traits::{Repository, StoreResult};

/// Thread-safe map-backed repository. Contents are lost on restart.
#[derive(Debug)]
pub struct MemoryRepository<V> {
    inner: DashMap<String, V>,
}

impl<V> MemoryRepository<V> {
    pub fn new() -> Self {
        Self {
            inner: DashMap::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

impl<V> Default for MemoryRepository<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V> Repository<V> for MemoryRepository<V>
where
    V: Clone + Send + Sync,
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
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_crud() {
        let repo: MemoryRepository<u32> = MemoryRepository::new();
        assert!(repo.get("a").unwrap().is_none());

        repo.put("a", 1).unwrap();
        repo.put("a", 2).unwrap();
        assert_eq!(repo.get("a").unwrap(), Some(2));
        assert_eq!(repo.len(), 1);

        assert_eq!(repo.delete("a").unwrap(), Some(2));
        assert_eq!(repo.delete("a").unwrap(), None);
        assert!(repo.is_empty());
        assert!(repo.flush().is_ok());
    }
}
