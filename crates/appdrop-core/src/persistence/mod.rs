pub mod json_store;

pub use json_store::JsonHistoryStore;

use std::path::Path;
use std::sync::Arc;

use crate::config::{HistoryBackend, InstallerConfig};
use crate::models::{CoreError, CoreErrorKind, Task};
use crate::sqlite::SqliteHistoryStore;

pub type PersistenceResult<T> = Result<T, CoreError>;

/// Durable backing for the history ledger. `save` always rewrites the full entry list.
pub trait HistoryStore: Send + Sync {
    fn location(&self) -> &Path;

    fn load(&self) -> PersistenceResult<Vec<Task>>;

    fn save(&self, entries: &[Task]) -> PersistenceResult<()>;

    /// Removes the backing store; a store that does not exist is already clear.
    fn clear(&self) -> PersistenceResult<()>;
}

pub fn open_history_store(config: &InstallerConfig) -> Arc<dyn HistoryStore> {
    let path = config.history_path();
    match config.history_backend {
        HistoryBackend::Json => Arc::new(JsonHistoryStore::new(path)),
        HistoryBackend::Sqlite => Arc::new(SqliteHistoryStore::new(path)),
    }
}

pub(crate) fn remove_store_file(path: &Path) -> PersistenceResult<()> {
    match std::fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(error) if error.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(error) => Err(CoreError {
            kind: CoreErrorKind::StorageFailure,
            ..CoreError::filesystem("remove", path, error)
        }),
    }
}
