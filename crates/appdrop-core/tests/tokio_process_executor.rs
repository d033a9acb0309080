#![cfg(unix)]

use std::time::Duration;

use appdrop_core::execution::{
    CommandSpec, ProcessExitStatus, ProcessSpawnRequest, ProcessTerminationMode,
    TokioProcessExecutor, spawn_validated,
};
use appdrop_core::models::{CoreErrorKind, PackageFormat, TaskId};

fn echo_request() -> ProcessSpawnRequest {
    ProcessSpawnRequest::new(CommandSpec::new("/bin/echo").arg("hello"))
}

fn sleep_request() -> ProcessSpawnRequest {
    ProcessSpawnRequest::new(CommandSpec::new("/bin/sleep").arg("30"))
        .task_id(TaskId("1a2b3c4d".to_string()))
        .format(PackageFormat::Run)
}

#[tokio::test]
async fn spawns_echo_and_captures_stdout() {
    let executor = TokioProcessExecutor;
    let handle = spawn_validated(&executor, echo_request()).expect("spawn should succeed");

    assert!(handle.pid().is_some());

    let output = handle.wait().await.expect("wait should succeed");
    assert_eq!(output.status, ProcessExitStatus::ExitCode(0));
    assert_eq!(String::from_utf8_lossy(&output.stdout).trim(), "hello");
    assert!(output.started_at <= output.finished_at);
}

#[tokio::test]
async fn captures_nonzero_exit_code_and_stderr() {
    let executor = TokioProcessExecutor;
    let request = ProcessSpawnRequest::new(
        CommandSpec::new("/bin/sh").args(["-c", "echo dpkg: dependency problems >&2; exit 1"]),
    );

    let handle = spawn_validated(&executor, request).expect("spawn should succeed");
    let output = handle.wait().await.expect("wait should succeed");

    assert_eq!(output.status, ProcessExitStatus::ExitCode(1));
    assert_eq!(
        String::from_utf8_lossy(&output.stderr).trim(),
        "dpkg: dependency problems"
    );
}

#[tokio::test]
async fn timeout_kills_long_running_process() {
    let executor = TokioProcessExecutor;
    let request = sleep_request().timeout(Duration::from_millis(100));

    let handle = spawn_validated(&executor, request).expect("spawn should succeed");
    let error = handle.wait().await.expect_err("should timeout");

    assert_eq!(error.kind, CoreErrorKind::CommandTimeout);
    assert!(error.message.contains("/bin/sleep 30"));
    assert_eq!(error.format, Some(PackageFormat::Run));
    assert_eq!(error.task, Some(TaskId("1a2b3c4d".to_string())));
}

#[tokio::test]
async fn immediate_terminate_kills_process() {
    let executor = TokioProcessExecutor;
    let handle = spawn_validated(&executor, sleep_request()).expect("spawn should succeed");

    handle
        .terminate(ProcessTerminationMode::Immediate)
        .expect("terminate should succeed");

    let output = handle.wait().await.expect("wait should succeed");
    assert_eq!(output.status, ProcessExitStatus::Terminated);
}

#[tokio::test]
async fn graceful_terminate_sends_sigterm() {
    let executor = TokioProcessExecutor;
    let handle = spawn_validated(&executor, sleep_request()).expect("spawn should succeed");

    handle
        .terminate(ProcessTerminationMode::Graceful {
            grace_period: Duration::from_secs(5),
        })
        .expect("terminate should succeed");

    let output = handle.wait().await.expect("wait should succeed");
    assert_eq!(output.status, ProcessExitStatus::Terminated);
}

#[tokio::test]
async fn spawn_nonexistent_program_is_missing_tool() {
    let executor = TokioProcessExecutor;
    let request = ProcessSpawnRequest::new(CommandSpec::new("/nonexistent/dpkg"))
        .format(PackageFormat::Deb);

    let error = match spawn_validated(&executor, request) {
        Err(e) => e,
        Ok(_) => panic!("expected spawn to fail for nonexistent binary"),
    };

    assert_eq!(error.kind, CoreErrorKind::MissingTool);
    assert_eq!(error.format, Some(PackageFormat::Deb));
}

#[tokio::test]
async fn env_and_working_dir_are_passed_to_child() {
    let dir = tempfile::tempdir().unwrap();
    let executor = TokioProcessExecutor;
    let request = ProcessSpawnRequest::new(
        CommandSpec::new("/bin/sh")
            .args(["-c", "echo $APPDROP_TEST_VAR; pwd"])
            .env("APPDROP_TEST_VAR", "test_value_42")
            .working_dir(dir.path()),
    );

    let handle = spawn_validated(&executor, request).expect("spawn should succeed");
    let output = handle.wait().await.expect("wait should succeed");

    assert_eq!(output.status, ProcessExitStatus::ExitCode(0));
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(
        stdout.contains("test_value_42"),
        "expected env var in output, got: {stdout}"
    );
    let canonical = dir.path().canonicalize().unwrap();
    assert!(stdout.contains(&*canonical.to_string_lossy()));
}
