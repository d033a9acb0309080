use crate::models::{CoreError, CoreErrorKind, Task, TaskId, TaskStatus};
use crate::orchestration::OrchestrationResult;

/// User-visible list of files waiting for the next batch. Holds only `Queued` tasks.
#[derive(Clone, Debug, Default)]
pub struct InstallQueue {
    tasks: Vec<Task>,
}

impl InstallQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Accepts a freshly created task for a regular file that is not queued yet.
    pub fn enqueue(&mut self, task: Task) -> OrchestrationResult<Task> {
        if !task.source_path().is_file() {
            return Err(CoreError::new(
                CoreErrorKind::InvalidInput,
                format!("Not a regular file: {}", task.source_path().display()),
            ));
        }

        if self.contains(task.id()) {
            return Err(CoreError {
                task: Some(task.id().clone()),
                ..CoreError::new(
                    CoreErrorKind::InvalidInput,
                    format!("{} is already queued", task.file_name()),
                )
            });
        }

        tracing::debug!(task_id = %task.id(), path = %task.source_path().display(), "queued");
        self.tasks.push(task.clone());
        Ok(task)
    }

    pub fn contains(&self, task_id: &TaskId) -> bool {
        self.tasks.iter().any(|task| task.id() == task_id)
    }

    pub fn remove(&mut self, task_id: &TaskId) -> Option<Task> {
        let index = self.tasks.iter().position(|task| task.id() == task_id)?;
        Some(self.tasks.remove(index))
    }

    pub fn clear(&mut self) -> usize {
        let removed = self.tasks.len();
        self.tasks.clear();
        removed
    }

    pub fn snapshot(&self) -> Vec<Task> {
        self.tasks.clone()
    }

    /// Empties the queue, handing its tasks to a batch in FIFO order.
    pub fn take_all(&mut self) -> Vec<Task> {
        std::mem::take(&mut self.tasks)
    }

    /// Puts unprocessed batch tasks back ahead of anything queued meanwhile.
    pub fn restore_front(&mut self, tasks: Vec<Task>) {
        let mut restored: Vec<Task> = tasks
            .into_iter()
            .filter(|task| task.status() == TaskStatus::Queued && !self.contains(task.id()))
            .collect();
        restored.append(&mut self.tasks);
        self.tasks = restored;
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::path::Path;

    use super::InstallQueue;
    use crate::models::{CoreErrorKind, Task};

    fn file(dir: &Path, name: &str) -> Task {
        let path = dir.join(name);
        fs::write(&path, b"pkg").unwrap();
        Task::create(path)
    }

    #[test]
    fn enqueue_rejects_directories_and_duplicates() {
        let dir = tempfile::tempdir().unwrap();
        let mut queue = InstallQueue::new();

        let error = queue.enqueue(Task::create(dir.path())).unwrap_err();
        assert_eq!(error.kind, CoreErrorKind::InvalidInput);

        let task = file(dir.path(), "a.deb");
        queue.enqueue(task.clone()).unwrap();
        let duplicate = queue.enqueue(task).unwrap_err();
        assert_eq!(duplicate.kind, CoreErrorKind::InvalidInput);
        assert_eq!(queue.len(), 1);
    }

    #[test]
    fn remove_and_clear() {
        let dir = tempfile::tempdir().unwrap();
        let mut queue = InstallQueue::new();
        let first = queue.enqueue(file(dir.path(), "a.deb")).unwrap();
        queue.enqueue(file(dir.path(), "b.deb")).unwrap();

        assert_eq!(queue.remove(first.id()).unwrap().id(), first.id());
        assert!(queue.remove(first.id()).is_none());
        assert_eq!(queue.clear(), 1);
        assert!(queue.is_empty());
    }

    #[test]
    fn restored_tasks_go_ahead_of_newer_work() {
        let dir = tempfile::tempdir().unwrap();
        let mut queue = InstallQueue::new();
        queue.enqueue(file(dir.path(), "a.deb")).unwrap();
        queue.enqueue(file(dir.path(), "b.deb")).unwrap();

        let taken = queue.take_all();
        assert!(queue.is_empty());
        queue.enqueue(file(dir.path(), "c.deb")).unwrap();

        queue.restore_front(taken);
        let names: Vec<String> = queue.snapshot().iter().map(|task| task.file_name()).collect();
        assert_eq!(names, ["a.deb", "b.deb", "c.deb"]);
    }
}
