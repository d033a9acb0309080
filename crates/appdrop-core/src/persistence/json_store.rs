use std::path::{Path, PathBuf};

use crate::fs_utils;
use crate::models::{CoreError, CoreErrorKind, Task};
use crate::persistence::{HistoryStore, PersistenceResult, remove_store_file};

/// History as a pretty-printed JSON array of task objects.
pub struct JsonHistoryStore {
    path: PathBuf,
}

impl JsonHistoryStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl HistoryStore for JsonHistoryStore {
    fn location(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> PersistenceResult<Vec<Task>> {
        let raw = match std::fs::read(&self.path) {
            Ok(raw) => raw,
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(error) => return Err(storage_error("read", &self.path, error.to_string())),
        };

        serde_json::from_slice(&raw)
            .map_err(|error| storage_error("parse", &self.path, error.to_string()))
    }

    fn save(&self, entries: &[Task]) -> PersistenceResult<()> {
        let encoded = serde_json::to_vec_pretty(entries)
            .map_err(|error| storage_error("encode", &self.path, error.to_string()))?;
        fs_utils::write_atomic(&self.path, &encoded)
            .map_err(|error| storage_error("write", &self.path, error.to_string()))
    }

    fn clear(&self) -> PersistenceResult<()> {
        remove_store_file(&self.path)
    }
}

fn storage_error(operation: &str, path: &Path, message: String) -> CoreError {
    CoreError::new(
        CoreErrorKind::StorageFailure,
        format!("history file '{}' {operation} failed: {message}", path.display()),
    )
}

#[cfg(test)]
mod tests {
    use super::JsonHistoryStore;
    use crate::models::{CoreErrorKind, Task};
    use crate::persistence::HistoryStore;

    #[test]
    fn missing_file_loads_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonHistoryStore::new(dir.path().join("history.json"));
        assert!(store.load().unwrap().is_empty());
        store.clear().unwrap();
    }

    #[test]
    fn corrupt_file_is_a_storage_failure() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("history.json");
        std::fs::write(&path, b"{not json").unwrap();

        let error = JsonHistoryStore::new(&path).load().unwrap_err();
        assert_eq!(error.kind, CoreErrorKind::StorageFailure);
    }

    #[test]
    fn saved_entries_use_flat_wire_keys() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data/history.json");
        let store = JsonHistoryStore::new(&path);

        let mut task = Task::create("/tmp/tool.deb");
        task.begin().unwrap();
        task.complete("Successfully installed tool.deb").unwrap();
        store.save(std::slice::from_ref(&task)).unwrap();

        let raw: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        let entry = &raw[0];
        for key in [
            "task_id",
            "file_path",
            "status",
            "progress",
            "message",
            "start_time",
            "end_time",
            "file_hash",
            "file_size",
        ] {
            assert!(entry.get(key).is_some(), "missing {key}");
        }
        assert_eq!(entry["status"], "completed");

        assert_eq!(store.load().unwrap(), vec![task]);

        store.clear().unwrap();
        assert!(!path.exists());
    }
}
