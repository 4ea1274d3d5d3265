//! Repository abstraction used by every game manager.

use thiserror::Error;

/// Errors from repository backends.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("storage IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("storage serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

/// Result type for repository operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Keyed collection of values with caller-controlled persistence.
///
/// Writes are visible to reads immediately; whether they survive a restart
/// depends on the backend and on the caller invoking [`Repository::flush`].
pub trait Repository<V>: Send + Sync {
    fn get(&self, key: &str) -> StoreResult<Option<V>>;

    fn put(&self, key: &str, value: V) -> StoreResult<()>;

    /// Remove a value, returning it if it existed.
    fn delete(&self, key: &str) -> StoreResult<Option<V>>;

    /// All entries, in no particular order.
    fn list(&self) -> StoreResult<Vec<(String, V)>>;

    /// Persist pending writes. In-memory backends do nothing.
    fn flush(&self) -> StoreResult<()> {
        Ok(())
    }

    fn values(&self) -> StoreResult<Vec<V>> {
        Ok(self.list()?.into_iter().map(|(_, v)| v).collect())
    }
}
