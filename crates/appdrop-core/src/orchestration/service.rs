use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use crate::config::InstallerConfig;
use crate::execution::{CommandRunner, ProcessCommandRunner, check_dependencies};
use crate::history::{DISPLAY_LIMIT, HistoryLedger};
use crate::installers::InstallerRegistry;
use crate::models::{CoreError, CoreErrorKind, Task, TaskId};
use crate::orchestration::{
    BatchScheduler, BatchSummary, EventReceiver, InstallQueue, OrchestrationResult,
    SingleTaskScheduler, TaskWorker, event_channel, lock,
};
use crate::persistence::{HistoryStore, open_history_store};

/// Entry point for front ends: queue management, both install paths, history and events.
pub struct InstallerService {
    config: InstallerConfig,
    runner: Arc<dyn CommandRunner>,
    queue: Arc<Mutex<InstallQueue>>,
    ledger: Arc<Mutex<HistoryLedger>>,
    batch: BatchScheduler,
    interactive: SingleTaskScheduler,
    events: Mutex<Option<EventReceiver>>,
}

impl InstallerService {
    pub fn new(config: InstallerConfig) -> Self {
        let runner: Arc<dyn CommandRunner> = Arc::new(ProcessCommandRunner::from_config(&config));
        let store = open_history_store(&config);
        Self::with_parts(config, runner, store)
    }

    pub fn with_parts(
        config: InstallerConfig,
        runner: Arc<dyn CommandRunner>,
        store: Arc<dyn HistoryStore>,
    ) -> Self {
        let (sender, receiver) = event_channel();
        let registry = Arc::new(InstallerRegistry::new(
            config.layout.clone(),
            runner.clone(),
        ));
        let ledger = Arc::new(Mutex::new(HistoryLedger::load(store)));
        let queue = Arc::new(Mutex::new(InstallQueue::new()));
        let worker = TaskWorker::new(registry, ledger.clone(), sender);

        Self {
            batch: BatchScheduler::new(worker.clone(), queue.clone()),
            interactive: SingleTaskScheduler::new(worker),
            config,
            runner,
            queue,
            ledger,
            events: Mutex::new(Some(receiver)),
        }
    }

    pub fn config(&self) -> &InstallerConfig {
        &self.config
    }

    /// Hands out the event stream. There is a single subscriber; later calls get `None`.
    pub fn subscribe(&self) -> Option<EventReceiver> {
        self.events.lock().ok()?.take()
    }

    /// Fingerprints the file on a blocking thread, then adds it to the queue.
    pub async fn enqueue(&self, path: impl Into<PathBuf>) -> OrchestrationResult<Task> {
        let path = path.into();
        let task = tokio::task::spawn_blocking(move || Task::create(path))
            .await
            .map_err(|error| {
                CoreError::new(
                    CoreErrorKind::Internal,
                    format!("fingerprinting worker failed: {error}"),
                )
            })?;
        lock(&self.queue, "install queue")?.enqueue(task)
    }

    pub fn remove_from_queue(&self, task_id: &TaskId) -> OrchestrationResult<Option<Task>> {
        Ok(lock(&self.queue, "install queue")?.remove(task_id))
    }

    pub fn clear_queue(&self) -> OrchestrationResult<usize> {
        Ok(lock(&self.queue, "install queue")?.clear())
    }

    pub fn queue(&self) -> OrchestrationResult<Vec<Task>> {
        Ok(lock(&self.queue, "install queue")?.snapshot())
    }

    pub async fn start_batch(&self) -> OrchestrationResult<usize> {
        self.batch.start().await
    }

    pub async fn stop_batch(&self) -> bool {
        self.batch.stop().await
    }

    pub async fn is_batch_running(&self) -> bool {
        self.batch.is_running().await
    }

    pub async fn wait_for_batch(&self) -> Option<BatchSummary> {
        self.batch.wait().await
    }

    pub async fn install_interactive(&self, path: impl Into<PathBuf>) -> OrchestrationResult<TaskId> {
        self.interactive.install(path).await
    }

    pub async fn is_installing(&self) -> bool {
        self.interactive.is_installing().await
    }

    pub async fn wait_for_install(&self) -> Option<Task> {
        self.interactive.wait().await
    }

    /// The display window, newest first.
    ///
    /// Served from the ledger read at startup plus this session's appends, so entries
    /// that failed to persist stay visible.
    pub fn load_history(&self) -> OrchestrationResult<Vec<Task>> {
        self.history(DISPLAY_LIMIT)
    }

    pub fn history(&self, limit: usize) -> OrchestrationResult<Vec<Task>> {
        let ledger = lock(&self.ledger, "history ledger")?;
        Ok(ledger.recent(limit).into_iter().cloned().collect())
    }

    pub fn clear_history(&self) -> OrchestrationResult<()> {
        lock(&self.ledger, "history ledger")?.clear()
    }

    /// Baseline tools that are missing on this host.
    pub fn missing_dependencies(&self) -> Vec<String> {
        check_dependencies(self.runner.as_ref(), self.config.elevation_wrapper())
    }
}
