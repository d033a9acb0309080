use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::sync::Mutex;
use tokio::task::JoinHandle;

use crate::models::{CoreError, CoreErrorKind, Task, TaskId};
use crate::orchestration::{OrchestrationResult, TaskWorker};

pub const BUSY_MESSAGE: &str = "Installation already in progress. Please wait.";

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum InteractiveState {
    Idle,
    Running { task_id: TaskId },
}

struct InteractiveControl {
    state: InteractiveState,
    handle: Option<JoinHandle<Option<Task>>>,
}

/// The drag-and-drop path: one install at a time, extra requests are refused rather than queued.
#[derive(Clone)]
pub struct SingleTaskScheduler {
    worker: TaskWorker,
    control: Arc<Mutex<InteractiveControl>>,
}

impl SingleTaskScheduler {
    pub fn new(worker: TaskWorker) -> Self {
        Self {
            worker,
            control: Arc::new(Mutex::new(InteractiveControl {
                state: InteractiveState::Idle,
                handle: None,
            })),
        }
    }

    pub async fn state(&self) -> InteractiveState {
        self.control.lock().await.state.clone()
    }

    pub async fn is_installing(&self) -> bool {
        matches!(self.state().await, InteractiveState::Running { .. })
    }

    /// Validates `path` and starts installing it on a blocking worker.
    ///
    /// Every rejection happens before the file is read or any external tool runs.
    pub async fn install(&self, path: impl Into<PathBuf>) -> OrchestrationResult<TaskId> {
        let path = path.into();
        let mut control = self.control.lock().await;
        if matches!(control.state, InteractiveState::Running { .. }) {
            return Err(CoreError::new(CoreErrorKind::Busy, BUSY_MESSAGE));
        }

        validate_source(&path)?;
        let format = self.worker.registry().resolve(&path)?;

        let task_id = TaskId::for_path(&path);
        tracing::info!(task_id = %task_id, format = %format, "interactive install accepted");

        control.state = InteractiveState::Running {
            task_id: task_id.clone(),
        };

        let worker = self.worker.clone();
        let control_handle = self.control.clone();
        control.handle = Some(tokio::spawn(async move {
            let blocking_worker = worker.clone();
            // fingerprinting reads the whole package, so it happens off the runtime too
            let finished =
                tokio::task::spawn_blocking(move || blocking_worker.execute(Task::create(path)))
                    .await;

            control_handle.lock().await.state = InteractiveState::Idle;

            match finished {
                Ok(task) => {
                    worker.report(&task);
                    Some(task)
                }
                Err(error) => {
                    tracing::error!(%error, "interactive install worker panicked");
                    None
                }
            }
        }));

        Ok(task_id)
    }

    /// Waits for the in-flight install, if any, and returns the finished task.
    pub async fn wait(&self) -> Option<Task> {
        let handle = self.control.lock().await.handle.take()?;
        handle.await.ok().flatten()
    }
}

fn validate_source(path: &Path) -> OrchestrationResult<()> {
    let invalid = |message: String| {
        tracing::error!(path = %path.display(), %message, "rejected install request");
        CoreError::new(CoreErrorKind::InvalidInput, message)
    };

    let metadata = std::fs::metadata(path)
        .map_err(|_| invalid(format!("File does not exist: {}", path.display())))?;
    if !metadata.is_file() {
        return Err(invalid(format!("Not a regular file: {}", path.display())));
    }
    File::open(path).map_err(|_| invalid(format!("File is not readable: {}", path.display())))?;
    if metadata.len() == 0 {
        return Err(invalid(format!("File is empty: {}", path.display())));
    }
    Ok(())
}
