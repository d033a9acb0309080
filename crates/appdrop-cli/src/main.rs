mod cli;

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use appdrop_core::models::{CoreError, PackageFormat, Task, TaskId, TaskStatus};
use appdrop_core::orchestration::EventReceiver;
use appdrop_core::{InstallEvent, InstallerConfig, InstallerService};
use clap::Parser;
use time::macros::format_description;

use crate::cli::{Args, Cmd};

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    let config = match load_config(args.config.as_deref()) {
        Ok(config) => config,
        Err(error) => {
            eprintln!("appdrop: {}", error.message);
            return ExitCode::FAILURE;
        }
    };
    appdrop_core::logging::init(args.verbose || config.verbose_logging);

    if let Cmd::Detect { files } = &args.sub {
        return detect(files);
    }

    let service = InstallerService::new(config);
    if !matches!(args.sub, Cmd::Check) {
        for tool in service.missing_dependencies() {
            tracing::warn!(tool = %tool, "required tool not found on PATH");
        }
    }

    let succeeded = match args.sub {
        Cmd::Install { file } => install(&service, file).await,
        Cmd::Batch { files } => batch(&service, files, true).await,
        Cmd::Queue { files } => {
            let start = service.config().auto_start_queue;
            batch(&service, files, start).await
        }
        Cmd::Detect { .. } => true,
        Cmd::History { limit, json } => history(&service, limit, json),
        Cmd::HistoryClear => report(service.clear_history().map(|()| {
            println!("History cleared.");
        })),
        Cmd::Check => check(&service),
    };

    if succeeded {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}

fn load_config(explicit: Option<&Path>) -> Result<InstallerConfig, CoreError> {
    match explicit.map(Path::to_path_buf).or_else(InstallerConfig::default_path) {
        Some(path) => InstallerConfig::load(&path),
        None => Ok(InstallerConfig::default()),
    }
}

fn report(result: Result<(), CoreError>) -> bool {
    match result {
        Ok(()) => true,
        Err(error) => {
            eprintln!("appdrop: {}", error.message);
            false
        }
    }
}

fn detect(files: &[PathBuf]) -> ExitCode {
    let mut all_known = true;
    for file in files {
        match PackageFormat::detect(file) {
            Some(format) => println!("{}\t{}", format, file.display()),
            None => {
                all_known = false;
                println!("unsupported\t{}", file.display());
            }
        }
    }
    if all_known {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}

async fn install(service: &InstallerService, file: PathBuf) -> bool {
    let Some(mut events) = service.subscribe() else {
        eprintln!("appdrop: event stream already taken");
        return false;
    };
    let name = display_name(&file);
    let task_id = match service.install_interactive(file).await {
        Ok(task_id) => task_id,
        Err(error) => {
            eprintln!("appdrop: {}", error.message);
            return false;
        }
    };

    while let Some(event) = events.recv().await {
        match event {
            InstallEvent::Progress {
                task_id: id,
                percent,
                message,
            } if id == task_id => println!("[{percent:>3}%] {name}: {message}"),
            InstallEvent::Completed { task_id: id, .. } if id == task_id => break,
            _ => {}
        }
    }

    match service.wait_for_install().await {
        Some(task) => {
            print_outcome(&task.file_name(), task.status() == TaskStatus::Completed, task.message());
            task.status() == TaskStatus::Completed
        }
        None => false,
    }
}

async fn batch(service: &InstallerService, files: Vec<PathBuf>, start: bool) -> bool {
    let Some(events) = service.subscribe() else {
        eprintln!("appdrop: event stream already taken");
        return false;
    };

    let mut rejected = 0;
    let mut names = HashMap::new();
    for file in files {
        match service.enqueue(file).await {
            Ok(task) => {
                let format = task.format().map_or("unknown", PackageFormat::tag);
                println!("queued\t{}\t{}\t{}", task.id().as_str(), format, task.file_name());
                names.insert(task.id().clone(), task.file_name());
            }
            Err(error) => {
                rejected += 1;
                eprintln!("appdrop: {}", error.message);
            }
        }
    }

    if !start {
        println!(
            "{} file(s) checked; nothing installed and the queue is discarded on exit. Set auto_start_queue = true or use `appdrop batch`.",
            names.len()
        );
        return rejected == 0;
    }

    if let Err(error) = service.start_batch().await {
        eprintln!("appdrop: {}", error.message);
        return false;
    }

    let failed = follow_batch(events, &names).await;
    service.wait_for_batch().await;
    failed == 0 && rejected == 0
}

async fn follow_batch(mut events: EventReceiver, names: &HashMap<TaskId, String>) -> usize {
    let name_of = |task_id: &TaskId| {
        names
            .get(task_id)
            .cloned()
            .unwrap_or_else(|| task_id.as_str().to_string())
    };

    while let Some(event) = events.recv().await {
        match event {
            InstallEvent::Progress {
                task_id,
                percent,
                message,
            } => println!("[{percent:>3}%] {}: {message}", name_of(&task_id)),
            InstallEvent::Completed {
                task_id,
                success,
                message,
            } => print_outcome(&name_of(&task_id), success, &message),
            InstallEvent::BatchFinished { completed, failed } => {
                println!("Batch finished: {completed} completed, {failed} failed.");
                return failed;
            }
        }
    }
    0
}

fn print_outcome(name: &str, success: bool, message: &str) {
    if success {
        println!("ok\t{name}\t{message}");
    } else {
        println!("failed\t{name}\t{message}");
    }
}

fn history(service: &InstallerService, limit: usize, json: bool) -> bool {
    let entries = match service.history(limit) {
        Ok(entries) => entries,
        Err(error) => {
            eprintln!("appdrop: {}", error.message);
            return false;
        }
    };

    if json {
        return match serde_json::to_string_pretty(&entries) {
            Ok(rendered) => {
                println!("{rendered}");
                true
            }
            Err(error) => {
                eprintln!("appdrop: failed to render history: {error}");
                false
            }
        };
    }

    if entries.is_empty() {
        println!("No installation history.");
    }
    for task in &entries {
        println!(
            "{}\t{}\t{}\t{}",
            started(task),
            task.status().as_str(),
            task.file_name(),
            task.message()
        );
    }
    true
}

fn started(task: &Task) -> String {
    let format = format_description!("[year]-[month]-[day] [hour]:[minute]:[second]");
    task.started_at()
        .and_then(|at| at.format(format).ok())
        .unwrap_or_else(|| "-".to_string())
}

fn check(service: &InstallerService) -> bool {
    let missing = service.missing_dependencies();
    if missing.is_empty() {
        println!("All required tools are available.");
        return true;
    }
    for tool in &missing {
        println!("missing\t{tool}");
    }
    false
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
