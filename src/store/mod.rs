//! Storage subsystem.
//!
//! # Data Flow
//! ```text
//! Game manager
//!     → Arc<dyn Repository<T>> (injected by AppContext)
//!     → memory.rs (DashMap, volatile)
//!       or file.rs (DashMap + JSON file written on flush)
//! ```
//!
//! # Design Decisions
//! - Managers never pick their backend; the composition root does
//! - Persistence cadence belongs to the caller (`flush`), not to every write

pub mod file;
pub mod memory;
pub mod traits;

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::Path;
use std::sync::Arc;

use crate::config::{StorageBackend, StorageConfig};

pub use file::JsonFileRepository;
pub use memory::MemoryRepository;
pub use traits::{Repository, StoreError, StoreResult};

/// Open the named collection on the configured backend.
pub fn open_collection<V>(config: &StorageConfig, collection: &str) -> StoreResult<Arc<dyn Repository<V>>>
where
    V: Serialize + DeserializeOwned + Clone + Send + Sync + 'static,
{
    match config.backend {
        StorageBackend::Memory => Ok(Arc::new(MemoryRepository::new())),
        StorageBackend::File => {
            let path = Path::new(&config.data_dir).join(format!("{}.json", collection));
            Ok(Arc::new(JsonFileRepository::open(path)?))
        }
    }
}
