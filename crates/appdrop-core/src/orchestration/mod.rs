pub mod batch;
pub mod interactive;
pub mod queue;
pub mod service;
pub mod worker;

pub use batch::{BatchScheduler, BatchState, BatchSummary};
pub use interactive::{InteractiveState, SingleTaskScheduler};
pub use queue::InstallQueue;
pub use service::InstallerService;
pub use worker::TaskWorker;

use std::sync::{Mutex, MutexGuard};

use tokio::sync::mpsc;

use crate::models::{CoreError, CoreErrorKind, TaskId};

pub type OrchestrationResult<T> = Result<T, CoreError>;

pub type EventSender = mpsc::UnboundedSender<InstallEvent>;
pub type EventReceiver = mpsc::UnboundedReceiver<InstallEvent>;

/// Notifications for the presentation layer. Events of one task arrive in order.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum InstallEvent {
    Progress {
        task_id: TaskId,
        percent: u8,
        message: String,
    },
    Completed {
        task_id: TaskId,
        success: bool,
        message: String,
    },
    BatchFinished {
        completed: usize,
        failed: usize,
    },
}

pub fn event_channel() -> (EventSender, EventReceiver) {
    mpsc::unbounded_channel()
}

pub(crate) fn lock<'a, T>(mutex: &'a Mutex<T>, what: &str) -> OrchestrationResult<MutexGuard<'a, T>> {
    mutex
        .lock()
        .map_err(|_| CoreError::new(CoreErrorKind::Internal, format!("{what} mutex poisoned")))
}
