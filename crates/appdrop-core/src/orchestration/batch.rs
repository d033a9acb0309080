use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex as StdMutex};

use tokio::sync::Mutex;
use tokio::task::JoinHandle;

use crate::models::{CoreError, CoreErrorKind, Task, TaskStatus};
use crate::orchestration::{InstallEvent, InstallQueue, OrchestrationResult, TaskWorker, lock};

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum BatchState {
    Idle,
    Running,
}

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct BatchSummary {
    pub completed: usize,
    pub failed: usize,
    /// Tasks handed back to the queue because the batch was stopped.
    pub returned: usize,
}

struct BatchControl {
    state: BatchState,
    stop_requested: Arc<AtomicBool>,
    handle: Option<JoinHandle<BatchSummary>>,
}

/// Drains the install queue one task at a time. At most one batch runs per scheduler.
#[derive(Clone)]
pub struct BatchScheduler {
    worker: TaskWorker,
    queue: Arc<StdMutex<InstallQueue>>,
    control: Arc<Mutex<BatchControl>>,
}

impl BatchScheduler {
    pub fn new(worker: TaskWorker, queue: Arc<StdMutex<InstallQueue>>) -> Self {
        Self {
            worker,
            queue,
            control: Arc::new(Mutex::new(BatchControl {
                state: BatchState::Idle,
                stop_requested: Arc::new(AtomicBool::new(false)),
                handle: None,
            })),
        }
    }

    pub async fn state(&self) -> BatchState {
        self.control.lock().await.state
    }

    pub async fn is_running(&self) -> bool {
        self.state().await == BatchState::Running
    }

    /// Takes every queued task and starts working through them; returns how many were taken.
    ///
    /// Files queued while the batch runs wait for the next batch.
    pub async fn start(&self) -> OrchestrationResult<usize> {
        let mut control = self.control.lock().await;
        if control.state == BatchState::Running {
            return Err(CoreError::new(
                CoreErrorKind::Busy,
                "Batch installation is already running.",
            ));
        }

        let tasks = lock(&self.queue, "install queue")?.take_all();
        if tasks.is_empty() {
            return Err(CoreError::new(
                CoreErrorKind::InvalidInput,
                "Please add files to the queue first.",
            ));
        }

        let count = tasks.len();
        let stop_requested = Arc::new(AtomicBool::new(false));
        control.state = BatchState::Running;
        control.stop_requested = stop_requested.clone();

        tracing::info!(tasks = count, "batch installation started");

        let run = BatchRun {
            worker: self.worker.clone(),
            queue: self.queue.clone(),
            control: self.control.clone(),
            stop_requested,
        };
        control.handle = Some(tokio::spawn(run.drive(tasks.into())));

        Ok(count)
    }

    /// Asks a running batch to stop before its next task. Returns false when idle.
    pub async fn stop(&self) -> bool {
        let control = self.control.lock().await;
        if control.state != BatchState::Running {
            return false;
        }
        control.stop_requested.store(true, Ordering::SeqCst);
        tracing::info!("batch stop requested");
        true
    }

    /// Waits for the current batch, if any, and returns its summary.
    pub async fn wait(&self) -> Option<BatchSummary> {
        let handle = self.control.lock().await.handle.take()?;
        match handle.await {
            Ok(summary) => Some(summary),
            Err(error) => {
                tracing::error!(%error, "batch worker panicked");
                None
            }
        }
    }
}

struct BatchRun {
    worker: TaskWorker,
    queue: Arc<StdMutex<InstallQueue>>,
    control: Arc<Mutex<BatchControl>>,
    stop_requested: Arc<AtomicBool>,
}

impl BatchRun {
    async fn drive(self, mut pending: VecDeque<Task>) -> BatchSummary {
        let mut summary = BatchSummary::default();

        while let Some(task) = pending.pop_front() {
            if self.stop_requested.load(Ordering::SeqCst) {
                pending.push_front(task);
                break;
            }

            let task_id = task.id().clone();
            let worker = self.worker.clone();
            match tokio::task::spawn_blocking(move || worker.execute(task)).await {
                Ok(task) => {
                    if task.status() == TaskStatus::Completed {
                        summary.completed += 1;
                    } else {
                        summary.failed += 1;
                    }
                    self.worker.report(&task);
                }
                Err(error) => {
                    summary.failed += 1;
                    tracing::error!(task_id = %task_id, %error, "install worker panicked");
                    self.worker.emit(InstallEvent::Completed {
                        task_id,
                        success: false,
                        message: format!("Installation aborted: {error}"),
                    });
                }
            }
        }

        if !pending.is_empty() {
            summary.returned = pending.len();
            match lock(&self.queue, "install queue") {
                Ok(mut queue) => queue.restore_front(pending.into()),
                Err(error) => {
                    tracing::error!(message = %error.message, "stopped batch tasks were lost");
                }
            }
        }

        self.control.lock().await.state = BatchState::Idle;

        tracing::info!(
            completed = summary.completed,
            failed = summary.failed,
            returned = summary.returned,
            "batch installation finished"
        );
        self.worker.emit(InstallEvent::BatchFinished {
            completed: summary.completed,
            failed: summary.failed,
        });
        summary
    }
}
