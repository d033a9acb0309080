pub mod command_runner;
pub mod tokio_process;

pub use command_runner::{
    CommandOutput, CommandRunner, ProcessCommandRunner, check_dependencies, failure_diagnostic,
};
pub use tokio_process::TokioProcessExecutor;

use std::collections::BTreeMap;
use std::future::Future;
use std::path::PathBuf;
use std::pin::Pin;
use std::time::{Duration, SystemTime};

use crate::models::{CoreError, CoreErrorKind, PackageFormat, TaskId};

pub type ExecutionResult<T> = Result<T, CoreError>;

pub type ProcessWaitFuture = Pin<Box<dyn Future<Output = ExecutionResult<ProcessOutput>> + Send>>;

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct CommandSpec {
    pub program: PathBuf,
    pub args: Vec<String>,
    pub env: BTreeMap<String, String>,
    pub working_dir: Option<PathBuf>,
}

impl CommandSpec {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            env: BTreeMap::new(),
            working_dir: None,
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args(mut self, args: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    pub fn working_dir(mut self, working_dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(working_dir.into());
        self
    }

    pub fn argv(&self) -> Vec<String> {
        std::iter::once(self.program.to_string_lossy().into_owned())
            .chain(self.args.iter().cloned())
            .collect()
    }

    pub fn command_line(&self) -> String {
        self.argv().join(" ")
    }

    pub fn validate(&self) -> ExecutionResult<()> {
        if self.program.as_os_str().is_empty() {
            return Err(invalid_input("command program path must not be empty"));
        }

        if self
            .args
            .iter()
            .any(|arg| arg.is_empty() || arg.contains('\0'))
        {
            return Err(invalid_input(
                "command args must be non-empty and must not contain NUL bytes",
            ));
        }

        if self
            .env
            .iter()
            .any(|(key, value)| key.is_empty() || key.contains('\0') || value.contains('\0'))
        {
            return Err(invalid_input(
                "environment keys and values must be non-empty and must not contain NUL bytes",
            ));
        }

        Ok(())
    }
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ProcessSpawnRequest {
    pub task_id: Option<TaskId>,
    pub format: Option<PackageFormat>,
    pub command: CommandSpec,
    pub requires_elevation: bool,
    pub timeout: Option<Duration>,
    pub requested_at: SystemTime,
}

impl ProcessSpawnRequest {
    pub fn new(command: CommandSpec) -> Self {
        Self {
            task_id: None,
            format: None,
            command,
            requires_elevation: false,
            timeout: None,
            requested_at: SystemTime::now(),
        }
    }

    pub fn task_id(mut self, task_id: TaskId) -> Self {
        self.task_id = Some(task_id);
        self
    }

    pub fn format(mut self, format: PackageFormat) -> Self {
        self.format = Some(format);
        self
    }

    pub fn requires_elevation(mut self, requires_elevation: bool) -> Self {
        self.requires_elevation = requires_elevation;
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn validate(&self) -> ExecutionResult<()> {
        self.command
            .validate()
            .map_err(|error| self.attribute(error))?;

        if let Some(timeout) = self.timeout
            && timeout.is_zero()
        {
            return Err(self.attribute(invalid_input(
                "timeout must be greater than zero when provided",
            )));
        }

        Ok(())
    }

    pub(crate) fn attribute(&self, mut error: CoreError) -> CoreError {
        if let Some(task_id) = &self.task_id {
            error = error.for_task(task_id);
        }
        if let Some(format) = self.format {
            error = error.for_format(format);
        }
        error
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ProcessTerminationMode {
    Graceful { grace_period: Duration },
    Immediate,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ProcessExitStatus {
    ExitCode(i32),
    Terminated,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ProcessOutput {
    pub status: ProcessExitStatus,
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
    pub started_at: SystemTime,
    pub finished_at: SystemTime,
}

pub trait RunningProcess: Send + Sync {
    fn pid(&self) -> Option<u32>;

    fn terminate(&self, mode: ProcessTerminationMode) -> ExecutionResult<()>;

    fn wait(self: Box<Self>) -> ProcessWaitFuture;
}

pub trait ProcessExecutor: Send + Sync {
    fn spawn(&self, request: ProcessSpawnRequest) -> ExecutionResult<Box<dyn RunningProcess>>;
}

pub fn spawn_validated(
    executor: &dyn ProcessExecutor,
    request: ProcessSpawnRequest,
) -> ExecutionResult<Box<dyn RunningProcess>> {
    request.validate()?;
    executor.spawn(request)
}

fn invalid_input(message: &str) -> CoreError {
    CoreError::new(CoreErrorKind::InvalidInput, message)
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::{CommandSpec, ProcessSpawnRequest};
    use crate::models::{CoreErrorKind, PackageFormat, TaskId};

    #[test]
    fn command_line_joins_program_and_args() {
        let spec = CommandSpec::new("tar").args(["-xf", "a.tar", "-C", "/tmp/a"]);
        assert_eq!(spec.command_line(), "tar -xf a.tar -C /tmp/a");
    }

    #[test]
    fn validation_rejects_nul_and_empty_args() {
        let error = CommandSpec::new("dpkg").arg("").validate().unwrap_err();
        assert_eq!(error.kind, CoreErrorKind::InvalidInput);
        assert!(CommandSpec::new("").validate().is_err());
        assert!(CommandSpec::new("dpkg").arg("a\0b").validate().is_err());
    }

    #[test]
    fn zero_timeout_is_rejected_and_attributed() {
        let error = ProcessSpawnRequest::new(CommandSpec::new("snap"))
            .task_id(TaskId("00ff00ff".to_string()))
            .format(PackageFormat::Snap)
            .timeout(Duration::ZERO)
            .validate()
            .unwrap_err();
        assert_eq!(error.kind, CoreErrorKind::InvalidInput);
        assert_eq!(error.format, Some(PackageFormat::Snap));
        assert_eq!(error.task.as_ref().map(TaskId::as_str), Some("00ff00ff"));
    }
}
