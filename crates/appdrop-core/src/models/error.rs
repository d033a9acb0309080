use std::path::Path;

use thiserror::Error;

use crate::models::{PackageFormat, TaskId};

#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum CoreErrorKind {
    UnsupportedFormat,
    MissingTool,
    CommandFailed,
    CommandTimeout,
    Filesystem,
    InvalidInput,
    InvalidTransition,
    Busy,
    StorageFailure,
    Internal,
}

#[derive(Clone, Debug, Eq, PartialEq, Error)]
#[error("{kind:?}: {message}")]
pub struct CoreError {
    pub task: Option<TaskId>,
    pub format: Option<PackageFormat>,
    pub kind: CoreErrorKind,
    pub message: String,
}

impl CoreError {
    pub fn new(kind: CoreErrorKind, message: impl Into<String>) -> Self {
        Self {
            task: None,
            format: None,
            kind,
            message: message.into(),
        }
    }

    pub fn filesystem(operation: &str, path: &Path, error: std::io::Error) -> Self {
        Self::new(
            CoreErrorKind::Filesystem,
            format!("failed to {operation} '{}': {error}", path.display()),
        )
    }

    /// Attributes the error to a task unless an inner layer already did.
    pub fn for_task(mut self, task: &TaskId) -> Self {
        if self.task.is_none() {
            self.task = Some(task.clone());
        }
        self
    }

    pub fn for_format(mut self, format: PackageFormat) -> Self {
        if self.format.is_none() {
            self.format = Some(format);
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::{CoreError, CoreErrorKind};
    use crate::models::{PackageFormat, TaskId};

    #[test]
    fn display_includes_kind_and_message() {
        let error = CoreError::new(CoreErrorKind::MissingTool, "dpkg not found");
        assert_eq!(error.to_string(), "MissingTool: dpkg not found");
    }

    #[test]
    fn attribution_keeps_innermost_values() {
        let error = CoreError::new(CoreErrorKind::CommandFailed, "boom")
            .for_task(&TaskId("aaaa0001".to_string()))
            .for_format(PackageFormat::Deb)
            .for_task(&TaskId("bbbb0002".to_string()))
            .for_format(PackageFormat::Snap);

        assert_eq!(error.task, Some(TaskId("aaaa0001".to_string())));
        assert_eq!(error.format, Some(PackageFormat::Deb));
    }
}
