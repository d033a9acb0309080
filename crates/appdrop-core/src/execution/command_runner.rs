use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use crate::config::{DEFAULT_COMMAND_TIMEOUT, InstallerConfig};
use crate::execution::{
    CommandSpec, ExecutionResult, ProcessExecutor, ProcessExitStatus, ProcessSpawnRequest,
    TokioProcessExecutor, spawn_validated,
};
use crate::models::{CoreError, CoreErrorKind};

/// Decoded output of a command that exited with status zero.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct CommandOutput {
    pub stdout: String,
    pub stderr: String,
}

/// Blocking seam between install procedures and process execution.
///
/// Implementations are called from blocking worker threads; a failing command
/// surfaces as `Err` carrying the diagnostic an operator should see.
pub trait CommandRunner: Send + Sync {
    fn run(&self, request: ProcessSpawnRequest) -> ExecutionResult<CommandOutput>;

    fn locate(&self, program: &str) -> Option<PathBuf>;
}

pub struct ProcessCommandRunner {
    executor: Arc<dyn ProcessExecutor>,
    elevation: Option<String>,
    default_timeout: Duration,
}

impl ProcessCommandRunner {
    pub fn new(executor: Arc<dyn ProcessExecutor>) -> Self {
        Self {
            executor,
            elevation: None,
            default_timeout: DEFAULT_COMMAND_TIMEOUT,
        }
    }

    pub fn from_config(config: &InstallerConfig) -> Self {
        Self::new(Arc::new(TokioProcessExecutor))
            .with_elevation(config.elevation_wrapper().map(str::to_string))
            .with_default_timeout(config.command_timeout())
    }

    pub fn with_elevation(mut self, elevation: Option<String>) -> Self {
        self.elevation = elevation;
        self
    }

    pub fn with_default_timeout(mut self, timeout: Duration) -> Self {
        self.default_timeout = timeout;
        self
    }

    pub fn elevation(&self) -> Option<&str> {
        self.elevation.as_deref()
    }

    fn prepare(&self, mut request: ProcessSpawnRequest) -> ProcessSpawnRequest {
        if request.timeout.is_none() {
            request.timeout = Some(self.default_timeout);
        }

        if request.requires_elevation
            && let Some(wrapper) = &self.elevation
        {
            let original = std::mem::replace(&mut request.command, CommandSpec::new(wrapper));
            request.command.env = original.env;
            request.command.working_dir = original.working_dir;
            request.command.args = std::iter::once(original.program.to_string_lossy().into_owned())
                .chain(original.args)
                .collect();
        }

        request
    }
}

impl CommandRunner for ProcessCommandRunner {
    fn run(&self, request: ProcessSpawnRequest) -> ExecutionResult<CommandOutput> {
        let request = self.prepare(request);
        let command_line = request.command.command_line();
        let attribution = request.clone();

        tracing::debug!(command = %command_line, "running command");

        let process = spawn_validated(self.executor.as_ref(), request)?;

        let handle = tokio::runtime::Handle::try_current().map_err(|error| {
            attribution.attribute(CoreError::new(
                CoreErrorKind::Internal,
                format!("no async runtime available to run '{command_line}': {error}"),
            ))
        })?;
        let output = handle.block_on(process.wait())?;

        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        let stderr = String::from_utf8_lossy(&output.stderr).into_owned();

        match output.status {
            ProcessExitStatus::ExitCode(0) => Ok(CommandOutput { stdout, stderr }),
            ProcessExitStatus::ExitCode(code) => {
                let message = failure_diagnostic(&stderr, &stdout).unwrap_or_else(|| {
                    format!("Command failed with exit code {code}: {command_line}")
                });
                tracing::warn!(command = %command_line, code, "command failed");
                Err(attribution.attribute(CoreError::new(CoreErrorKind::CommandFailed, message)))
            }
            ProcessExitStatus::Terminated => Err(attribution.attribute(CoreError::new(
                CoreErrorKind::CommandFailed,
                failure_diagnostic(&stderr, &stdout)
                    .unwrap_or_else(|| format!("Command terminated by signal: {command_line}")),
            ))),
        }
    }

    fn locate(&self, program: &str) -> Option<PathBuf> {
        which::which(program).ok()
    }
}

/// Picks the operator-facing text of a failed command: stderr, then stdout.
pub fn failure_diagnostic(stderr: &str, stdout: &str) -> Option<String> {
    [stderr, stdout]
        .into_iter()
        .map(str::trim)
        .find(|text| !text.is_empty())
        .map(str::to_string)
}

/// Lists the external tools the installer cannot work without that are absent.
pub fn check_dependencies(runner: &dyn CommandRunner, elevation: Option<&str>) -> Vec<String> {
    elevation
        .into_iter()
        .chain(["tar"])
        .filter(|tool| runner.locate(tool).is_none())
        .map(str::to_string)
        .collect()
}
