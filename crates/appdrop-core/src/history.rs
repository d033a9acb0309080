use std::sync::Arc;

use crate::models::Task;
use crate::persistence::{HistoryStore, PersistenceResult};

/// Entries kept on disk; older ones are dropped first.
pub const MAX_PERSISTED_ENTRIES: usize = 1000;
/// Default number of entries shown, most recent first.
pub const DISPLAY_LIMIT: usize = 100;

/// Bounded, append-only record of finished tasks.
///
/// Storage failures never reach callers of `load` or `append`: the in-memory
/// view stays authoritative for the running session and the failure is logged.
pub struct HistoryLedger {
    store: Arc<dyn HistoryStore>,
    entries: Vec<Task>,
}

impl HistoryLedger {
    pub fn load(store: Arc<dyn HistoryStore>) -> Self {
        let entries = read_entries(store.as_ref());
        Self { store, entries }
    }

    pub fn append(&mut self, task: Task) {
        tracing::info!(
            task_id = %task.id(),
            status = task.status().as_str(),
            "recording history entry"
        );
        self.entries.push(task);
        trim_to_cap(&mut self.entries);

        if let Err(error) = self.store.save(&self.entries) {
            tracing::error!(
                path = %self.store.location().display(),
                kind = ?error.kind,
                message = %error.message,
                "failed to persist install history"
            );
        }
    }

    /// Up to `limit` entries, newest first.
    pub fn recent(&self, limit: usize) -> Vec<&Task> {
        self.entries.iter().rev().take(limit).collect()
    }

    pub fn entries(&self) -> &[Task] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) -> PersistenceResult<()> {
        self.entries.clear();
        self.store.clear()
    }
}

fn read_entries(store: &dyn HistoryStore) -> Vec<Task> {
    match store.load() {
        Ok(mut entries) => {
            trim_to_cap(&mut entries);
            entries
        }
        Err(error) => {
            tracing::warn!(
                path = %store.location().display(),
                message = %error.message,
                "ignoring unreadable install history"
            );
            Vec::new()
        }
    }
}

fn trim_to_cap(entries: &mut Vec<Task>) {
    if entries.len() > MAX_PERSISTED_ENTRIES {
        let excess = entries.len() - MAX_PERSISTED_ENTRIES;
        entries.drain(..excess);
    }
}

#[cfg(test)]
mod tests {
    use std::path::{Path, PathBuf};
    use std::sync::{Arc, Mutex};

    use super::{DISPLAY_LIMIT, HistoryLedger};
    use crate::models::{CoreError, CoreErrorKind, Task};
    use crate::persistence::{HistoryStore, PersistenceResult};

    #[derive(Default)]
    struct MemoryStore {
        saved: Mutex<Vec<Task>>,
        fail_writes: bool,
    }

    impl HistoryStore for MemoryStore {
        fn location(&self) -> &Path {
            Path::new("memory")
        }

        fn load(&self) -> PersistenceResult<Vec<Task>> {
            Ok(self.saved.lock().unwrap().clone())
        }

        fn save(&self, entries: &[Task]) -> PersistenceResult<()> {
            if self.fail_writes {
                return Err(CoreError::new(CoreErrorKind::StorageFailure, "disk full"));
            }
            *self.saved.lock().unwrap() = entries.to_vec();
            Ok(())
        }

        fn clear(&self) -> PersistenceResult<()> {
            self.saved.lock().unwrap().clear();
            Ok(())
        }
    }

    fn task(index: usize) -> Task {
        let mut task = Task::create(PathBuf::from(format!("/tmp/pkg-{index}.deb")));
        task.begin().unwrap();
        task.complete(format!("done {index}")).unwrap();
        task
    }

    #[test]
    fn recent_is_newest_first_and_bounded() {
        let mut ledger = HistoryLedger::load(Arc::new(MemoryStore::default()));
        for index in 0..150 {
            ledger.append(task(index));
        }

        let recent = ledger.recent(DISPLAY_LIMIT);
        assert_eq!(recent.len(), DISPLAY_LIMIT);
        assert_eq!(recent[0].message(), "done 149");
        assert_eq!(recent[99].message(), "done 50");
    }

    #[test]
    fn write_failure_keeps_in_memory_entry() {
        let store = Arc::new(MemoryStore {
            fail_writes: true,
            ..MemoryStore::default()
        });
        let mut ledger = HistoryLedger::load(store);
        ledger.append(task(1));
        assert_eq!(ledger.len(), 1);
    }

    #[test]
    fn clear_empties_memory_and_store() {
        let store = Arc::new(MemoryStore::default());
        let mut ledger = HistoryLedger::load(store.clone());
        ledger.append(task(1));

        ledger.clear().unwrap();
        assert!(ledger.is_empty());
        assert!(store.saved.lock().unwrap().is_empty());
    }
}
