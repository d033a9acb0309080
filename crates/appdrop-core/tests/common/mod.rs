#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::{Arc, Condvar, Mutex};

use appdrop_core::config::{InstallerConfig, InstallerLayout};
use appdrop_core::execution::{CommandOutput, CommandRunner, ExecutionResult, ProcessSpawnRequest};
use appdrop_core::models::{CoreError, CoreErrorKind};
use appdrop_core::orchestration::{EventReceiver, InstallEvent};

/// Records argv of every command; fails commands mentioning one of `failing` and can hold
/// commands until released.
#[derive(Default)]
pub struct ScriptedRunner {
    calls: Mutex<Vec<Vec<String>>>,
    failing: Vec<String>,
    gate: Option<Arc<Gate>>,
}

#[derive(Default)]
pub struct Gate {
    open: Mutex<bool>,
    changed: Condvar,
}

impl Gate {
    pub fn release(&self) {
        *self.open.lock().unwrap() = true;
        self.changed.notify_all();
    }

    fn pass(&self) {
        let mut open = self.open.lock().unwrap();
        while !*open {
            open = self.changed.wait(open).unwrap();
        }
    }
}

impl ScriptedRunner {
    pub fn failing_on(needle: &str) -> Self {
        Self {
            failing: vec![needle.to_string()],
            ..Self::default()
        }
    }

    pub fn gated(gate: Arc<Gate>) -> Self {
        Self {
            gate: Some(gate),
            ..Self::default()
        }
    }

    pub fn calls(&self) -> Vec<Vec<String>> {
        self.calls.lock().unwrap().clone()
    }
}

impl CommandRunner for ScriptedRunner {
    fn run(&self, request: ProcessSpawnRequest) -> ExecutionResult<CommandOutput> {
        let argv = request.command.argv();
        self.calls.lock().unwrap().push(argv.clone());

        if let Some(gate) = &self.gate {
            gate.pass();
        }

        if self
            .failing
            .iter()
            .any(|needle| argv.iter().any(|arg| arg.contains(needle.as_str())))
        {
            return Err(CoreError::new(
                CoreErrorKind::CommandFailed,
                format!("dpkg: error processing archive {}", argv.join(" ")),
            ));
        }
        Ok(CommandOutput::default())
    }

    fn locate(&self, program: &str) -> Option<PathBuf> {
        Some(PathBuf::from("/usr/bin").join(program))
    }
}

pub fn config_for(home: &Path) -> InstallerConfig {
    InstallerConfig {
        layout: InstallerLayout::rooted(home),
        elevation_command: None,
        history_path: Some(home.join("state/history.json")),
        ..InstallerConfig::default()
    }
}

pub fn package(dir: &Path, name: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, b"package payload").unwrap();
    path
}

/// Receives events until (and including) the first `BatchFinished`.
pub async fn events_until_batch_finished(receiver: &mut EventReceiver) -> Vec<InstallEvent> {
    let mut events = Vec::new();
    while let Some(event) = receiver.recv().await {
        let finished = matches!(event, InstallEvent::BatchFinished { .. });
        events.push(event);
        if finished {
            break;
        }
    }
    events
}
