use std::process::ExitStatus;
use std::sync::Mutex;
use std::time::{Duration, SystemTime};

use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Child;
use tokio::task::JoinHandle;

use crate::execution::{
    ExecutionResult, ProcessExecutor, ProcessExitStatus, ProcessOutput, ProcessSpawnRequest,
    ProcessTerminationMode, ProcessWaitFuture, RunningProcess,
};
use crate::models::{CoreError, CoreErrorKind};

/// How long captured output may keep arriving after the child exited.
///
/// Installers fork helpers (dpkg triggers, desktop database tools) that can inherit
/// the pipes and hold them open long after the installer itself is gone.
const OUTPUT_DRAIN_WINDOW: Duration = Duration::from_millis(250);
/// Time the killed process group gets to be reaped after a timeout.
const REAP_GRACE: Duration = Duration::from_secs(1);

pub struct TokioProcessExecutor;

impl ProcessExecutor for TokioProcessExecutor {
    fn spawn(&self, request: ProcessSpawnRequest) -> ExecutionResult<Box<dyn RunningProcess>> {
        let command = &request.command;
        let mut cmd = tokio::process::Command::new(&command.program);
        cmd.args(&command.args)
            .envs(&command.env)
            .stdin(std::process::Stdio::null())
            .stdout(std::process::Stdio::piped())
            .stderr(std::process::Stdio::piped())
            .process_group(0);
        if let Some(dir) = &command.working_dir {
            cmd.current_dir(dir);
        }

        let child = cmd.spawn().map_err(|error| {
            let failure = if error.kind() == std::io::ErrorKind::NotFound {
                CoreError::new(
                    CoreErrorKind::MissingTool,
                    format!("{} not found: {error}", command.program.display()),
                )
            } else {
                CoreError::new(
                    CoreErrorKind::CommandFailed,
                    format!("failed to spawn '{}': {error}", command.command_line()),
                )
            };
            request.attribute(failure)
        })?;

        Ok(Box::new(TokioRunningProcess {
            pid: child.id(),
            child: Mutex::new(Some(child)),
            started_at: SystemTime::now(),
            request,
        }))
    }
}

struct TokioRunningProcess {
    child: Mutex<Option<Child>>,
    pid: Option<u32>,
    started_at: SystemTime,
    request: ProcessSpawnRequest,
}

impl RunningProcess for TokioRunningProcess {
    fn pid(&self) -> Option<u32> {
        self.pid
    }

    fn terminate(&self, mode: ProcessTerminationMode) -> ExecutionResult<()> {
        let Some(pid) = self.pid else {
            return Ok(());
        };
        let signal = match mode {
            ProcessTerminationMode::Immediate => libc::SIGKILL,
            ProcessTerminationMode::Graceful { .. } => libc::SIGTERM,
        };

        signal_group(pid, signal).map_err(|error| {
            self.request.attribute(CoreError::new(
                CoreErrorKind::Internal,
                format!("failed to send signal {signal} to process group {pid}: {error}"),
            ))
        })
    }

    fn wait(self: Box<Self>) -> ProcessWaitFuture {
        let Self {
            child,
            pid,
            started_at,
            request,
        } = *self;
        let child = child.into_inner().ok().flatten();

        Box::pin(async move {
            let mut child = child.ok_or_else(|| {
                request.attribute(CoreError::new(
                    CoreErrorKind::Internal,
                    "child process already consumed",
                ))
            })?;
            let command_line = request.command.command_line();

            let stdout = drain(child.stdout.take());
            let stderr = drain(child.stderr.take());

            let exit = wait_bounded(&mut child, request.timeout)
                .await
                .map_err(|error| {
                    request.attribute(CoreError::new(
                        CoreErrorKind::CommandFailed,
                        format!("failed to wait for '{command_line}': {error}"),
                    ))
                })?;

            let status = match exit {
                Exit::Finished(status) => status,
                Exit::TimedOut(limit) => {
                    if let Some(pid) = pid
                        && let Err(error) = signal_group(pid, libc::SIGKILL)
                    {
                        tracing::warn!(pid, %error, "could not kill timed out process group");
                    }
                    let _ = tokio::time::timeout(REAP_GRACE, child.wait()).await;
                    stdout.abort();
                    stderr.abort();

                    tracing::error!(
                        command = %command_line,
                        timeout_ms = limit.as_millis() as u64,
                        "command timed out"
                    );
                    return Err(request.attribute(CoreError::new(
                        CoreErrorKind::CommandTimeout,
                        format!("Command timed out after {limit:?}: {command_line}"),
                    )));
                }
            };

            Ok(ProcessOutput {
                status: status
                    .code()
                    .map_or(ProcessExitStatus::Terminated, ProcessExitStatus::ExitCode),
                stdout: collect(stdout).await,
                stderr: collect(stderr).await,
                started_at,
                finished_at: SystemTime::now(),
            })
        })
    }
}

enum Exit {
    Finished(ExitStatus),
    TimedOut(Duration),
}

async fn wait_bounded(child: &mut Child, timeout: Option<Duration>) -> std::io::Result<Exit> {
    match timeout {
        Some(limit) => match tokio::time::timeout(limit, child.wait()).await {
            Ok(status) => status.map(Exit::Finished),
            Err(_) => Ok(Exit::TimedOut(limit)),
        },
        None => child.wait().await.map(Exit::Finished),
    }
}

fn drain<R>(pipe: Option<R>) -> JoinHandle<Vec<u8>>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut buffer = Vec::new();
        if let Some(mut pipe) = pipe {
            // partial output is still useful as a diagnostic
            let _ = pipe.read_to_end(&mut buffer).await;
        }
        buffer
    })
}

async fn collect(reader: JoinHandle<Vec<u8>>) -> Vec<u8> {
    match tokio::time::timeout(OUTPUT_DRAIN_WINDOW, reader).await {
        Ok(Ok(buffer)) => buffer,
        _ => Vec::new(),
    }
}

/// Signals the whole group started with `process_group(0)`; a vanished group is not an error.
fn signal_group(pid: u32, signal: libc::c_int) -> std::io::Result<()> {
    let pgid = -(pid as libc::pid_t);
    if unsafe { libc::kill(pgid, signal) } == 0 {
        return Ok(());
    }
    let error = std::io::Error::last_os_error();
    if error.raw_os_error() == Some(libc::ESRCH) {
        Ok(())
    } else {
        Err(error)
    }
}
