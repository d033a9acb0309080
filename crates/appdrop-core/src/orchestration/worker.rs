use std::sync::{Arc, Mutex};

use crate::history::HistoryLedger;
use crate::installers::InstallerRegistry;
use crate::models::{Task, TaskStatus};
use crate::orchestration::{EventSender, InstallEvent, lock};

/// Runs single tasks to a terminal state for either scheduler.
#[derive(Clone)]
pub struct TaskWorker {
    registry: Arc<InstallerRegistry>,
    ledger: Arc<Mutex<HistoryLedger>>,
    events: EventSender,
}

impl TaskWorker {
    pub fn new(
        registry: Arc<InstallerRegistry>,
        ledger: Arc<Mutex<HistoryLedger>>,
        events: EventSender,
    ) -> Self {
        Self {
            registry,
            ledger,
            events,
        }
    }

    pub fn registry(&self) -> &InstallerRegistry {
        &self.registry
    }

    /// Installs a queued task and records it in the ledger. Blocks on external processes.
    ///
    /// Does not emit the completion event; callers do that through [`TaskWorker::report`]
    /// once their own state is consistent.
    pub fn execute(&self, mut task: Task) -> Task {
        if let Err(error) = task.begin() {
            tracing::error!(task_id = %task.id(), message = %error.message, "task not startable");
            return task;
        }
        tracing::info!(task_id = %task.id(), path = %task.source_path().display(), "installing");

        let start_message = format!("Starting installation of {}", task.file_name());
        self.progress(&mut task, 10, start_message);

        let path = task.source_path().to_path_buf();
        let outcome = match self.registry.resolve(&path) {
            Ok(format) => {
                self.progress(&mut task, 50, "Installing...");
                self.registry.install_task(task.id(), format, &path)
            }
            Err(error) => Err(error.for_task(task.id())),
        };

        match outcome {
            Ok(outcome) => {
                let message = outcome.message();
                self.progress(&mut task, 100, message.clone());
                if let Err(error) = task.complete(message) {
                    tracing::error!(task_id = %task.id(), message = %error.message, "task not completable");
                }
            }
            Err(error) => {
                tracing::error!(
                    task_id = %task.id(),
                    path = %path.display(),
                    kind = ?error.kind,
                    message = %error.message,
                    "installation failed"
                );
                self.progress(&mut task, 100, format!("Failed: {}", error.message));
                if let Err(error) = task.fail(error.message) {
                    tracing::error!(task_id = %task.id(), message = %error.message, "task not failable");
                }
            }
        }

        self.record(&task);
        task
    }

    pub fn report(&self, task: &Task) {
        self.emit(InstallEvent::Completed {
            task_id: task.id().clone(),
            success: task.status() == TaskStatus::Completed,
            message: task.message().to_string(),
        });
    }

    pub fn emit(&self, event: InstallEvent) {
        // No subscriber is not an error.
        let _ = self.events.send(event);
    }

    fn progress(&self, task: &mut Task, percent: u8, message: impl Into<String>) {
        let message = message.into();
        task.report_progress(percent, message.clone());
        self.emit(InstallEvent::Progress {
            task_id: task.id().clone(),
            percent,
            message,
        });
    }

    fn record(&self, task: &Task) {
        match lock(&self.ledger, "history ledger") {
            Ok(mut ledger) => ledger.append(task.clone()),
            Err(error) => {
                tracing::error!(task_id = %task.id(), message = %error.message, "history not recorded");
            }
        }
    }
}
