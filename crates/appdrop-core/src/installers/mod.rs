//! One install procedure per package format, dispatched by [`InstallerRegistry`].

pub mod appimage;
pub mod archive;
pub mod deb;
pub mod executable;
pub mod flatpak;
pub mod registry;
pub mod snap;

pub use registry::InstallerRegistry;

use std::path::{Path, PathBuf};

use crate::config::InstallerLayout;
use crate::execution::{CommandOutput, CommandRunner, CommandSpec, ProcessSpawnRequest};
use crate::integration::{DesktopIntegration, IntegrationReport};
use crate::models::{self, CoreError, CoreErrorKind, PackageFormat, TaskId};

pub type InstallResult<T> = Result<T, CoreError>;

/// Result of a procedure whose primary action succeeded.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct InstallOutcome {
    pub summary: String,
    pub install_path: Option<PathBuf>,
    pub integration: Option<IntegrationReport>,
}

impl InstallOutcome {
    pub fn new(summary: impl Into<String>) -> Self {
        Self {
            summary: summary.into(),
            ..Self::default()
        }
    }

    pub fn with_install_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.install_path = Some(path.into());
        self
    }

    pub fn with_integration(mut self, report: IntegrationReport) -> Self {
        self.integration = Some(report);
        self
    }

    pub fn is_degraded(&self) -> bool {
        self.integration
            .as_ref()
            .is_some_and(IntegrationReport::is_degraded)
    }

    /// The completion message shown to the user, with a notice when integration was incomplete.
    pub fn message(&self) -> String {
        match &self.integration {
            Some(report) if report.is_degraded() => format!(
                "{} (some desktop integration features may not be available: {})",
                self.summary,
                report.failed_steps().join(", ")
            ),
            _ => self.summary.clone(),
        }
    }
}

/// Everything one procedure invocation needs, borrowed from the registry.
pub(crate) struct Procedure<'a> {
    pub runner: &'a dyn CommandRunner,
    pub layout: &'a InstallerLayout,
    pub integration: &'a DesktopIntegration,
    pub task_id: Option<&'a TaskId>,
    pub format: PackageFormat,
}

impl Procedure<'_> {
    pub fn request(&self, command: CommandSpec) -> ProcessSpawnRequest {
        let request = ProcessSpawnRequest::new(command).format(self.format);
        match self.task_id {
            Some(task_id) => request.task_id(task_id.clone()),
            None => request,
        }
    }

    pub fn run(&self, command: CommandSpec) -> InstallResult<CommandOutput> {
        self.runner.run(self.request(command))
    }

    pub fn run_elevated(&self, command: CommandSpec) -> InstallResult<CommandOutput> {
        self.runner
            .run(self.request(command).requires_elevation(true))
    }

    pub fn require_tool(&self, tool: &str, hint: &str) -> InstallResult<()> {
        if self.runner.locate(tool).is_some() {
            return Ok(());
        }
        Err(self.attribute(CoreError::new(
            CoreErrorKind::MissingTool,
            format!("{tool} not found. Please install {hint}."),
        )))
    }

    /// Application name derived from the package file name, refused when it would not
    /// name a directory of its own (`..tar.gz` has the stem `.`).
    pub fn app_name(&self, package: &Path) -> InstallResult<String> {
        let name = file_name(package);
        models::app_name(&name).map(str::to_string).ok_or_else(|| {
            self.attribute(CoreError::new(
                CoreErrorKind::InvalidInput,
                format!("Cannot derive an application name from '{name}'"),
            ))
        })
    }

    pub fn attribute(&self, error: CoreError) -> CoreError {
        let error = error.for_format(self.format);
        match self.task_id {
            Some(task_id) => error.for_task(task_id),
            None => error,
        }
    }

    pub fn filesystem(&self, operation: &str, path: &Path, error: std::io::Error) -> CoreError {
        self.attribute(CoreError::filesystem(operation, path, error))
    }
}

pub(crate) fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// Prefixes the procedure-level context onto a primary-action failure.
pub(crate) fn context(prefix: &str) -> impl FnOnce(CoreError) -> CoreError + '_ {
    move |error| CoreError {
        message: format!("{prefix}: {}", error.message),
        ..error
    }
}
