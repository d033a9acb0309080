//! Best-effort desktop integration that runs after a successful install.
//!
//! Every step returns `IntegrationResult`, whose error side is an
//! [`IntegrationWarning`] rather than a [`crate::models::CoreError`]: a failing
//! step degrades the completion message and never the task status.

pub mod desktop_entry;
pub mod discovery;
pub mod icon;
pub mod mime;

pub use desktop_entry::{DesktopEntry, GENERIC_ICON};
pub use discovery::{MAX_LAUNCHERS, discover_executables};

use std::fmt::{Display, Formatter};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::config::InstallerLayout;
use crate::execution::{CommandRunner, CommandSpec, ProcessSpawnRequest};
use crate::fs_utils;
use crate::models::PackageFormat;

pub type IntegrationResult<T> = Result<T, IntegrationWarning>;

#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum IntegrationStep {
    MenuEntry,
    DesktopShortcut,
    DesktopDatabase,
    IconExtraction,
    ExecutableDiscovery,
    AppDirectories,
    UninstallEntry,
    MimeAssociation,
}

impl IntegrationStep {
    pub fn label(self) -> &'static str {
        match self {
            Self::MenuEntry => "menu entry",
            Self::DesktopShortcut => "desktop shortcut",
            Self::DesktopDatabase => "desktop database",
            Self::IconExtraction => "icon extraction",
            Self::ExecutableDiscovery => "executable discovery",
            Self::AppDirectories => "application directories",
            Self::UninstallEntry => "uninstall entry",
            Self::MimeAssociation => "mime association",
        }
    }
}

/// A non-fatal failure of one integration step.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct IntegrationWarning {
    pub step: IntegrationStep,
    pub message: String,
}

impl IntegrationWarning {
    pub fn new(step: IntegrationStep, message: impl Into<String>) -> Self {
        Self {
            step,
            message: message.into(),
        }
    }

    fn io(step: IntegrationStep, operation: &str, path: &Path, error: std::io::Error) -> Self {
        Self::new(
            step,
            format!("failed to {operation} '{}': {error}", path.display()),
        )
    }
}

impl Display for IntegrationWarning {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.step.label(), self.message)
    }
}

/// Artifacts written and warnings collected across the integration steps of one install.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct IntegrationReport {
    pub artifacts: Vec<PathBuf>,
    pub warnings: Vec<IntegrationWarning>,
}

impl IntegrationReport {
    pub fn is_degraded(&self) -> bool {
        !self.warnings.is_empty()
    }

    pub fn record(&mut self, result: IntegrationResult<Vec<PathBuf>>) {
        match result {
            Ok(artifacts) => self.artifacts.extend(artifacts),
            Err(warning) => self.warn(warning),
        }
    }

    pub fn warn(&mut self, warning: IntegrationWarning) {
        tracing::warn!(
            step = warning.step.label(),
            message = %warning.message,
            "desktop integration step failed"
        );
        self.warnings.push(warning);
    }

    pub fn extend(&mut self, other: IntegrationReport) {
        self.artifacts.extend(other.artifacts);
        self.warnings.extend(other.warnings);
    }

    /// Distinct labels of the failed steps, in first-failure order.
    pub fn failed_steps(&self) -> Vec<&'static str> {
        let mut labels: Vec<&'static str> = Vec::new();
        for warning in &self.warnings {
            let label = warning.step.label();
            if !labels.contains(&label) {
                labels.push(label);
            }
        }
        labels
    }
}

pub struct DesktopIntegration {
    layout: InstallerLayout,
    runner: Arc<dyn CommandRunner>,
}

impl DesktopIntegration {
    pub fn new(layout: InstallerLayout, runner: Arc<dyn CommandRunner>) -> Self {
        Self { layout, runner }
    }

    pub fn layout(&self) -> &InstallerLayout {
        &self.layout
    }

    /// Writes `<file_stem>.desktop` into the menu directory and the desktop directory.
    pub fn install_launcher(&self, file_stem: &str, entry: &DesktopEntry) -> IntegrationReport {
        let mut report = IntegrationReport::default();
        let file_name = format!("{file_stem}.desktop");
        let rendered = entry.render();

        report.record(
            write_entry(
                &self.layout.menu_entries_dir,
                &file_name,
                &rendered,
                IntegrationStep::MenuEntry,
            )
            .map(|path| vec![path]),
        );

        if self.layout.desktop_dir.is_dir() {
            report.record(
                write_entry(
                    &self.layout.desktop_dir,
                    &file_name,
                    &rendered,
                    IntegrationStep::DesktopShortcut,
                )
                .map(|path| vec![path]),
            );
        } else {
            report.warn(IntegrationWarning::new(
                IntegrationStep::DesktopShortcut,
                format!(
                    "desktop directory '{}' does not exist",
                    self.layout.desktop_dir.display()
                ),
            ));
        }

        report
    }

    pub fn refresh_desktop_database(&self) -> IntegrationResult<()> {
        self.run_tool(
            IntegrationStep::DesktopDatabase,
            CommandSpec::new("update-desktop-database")
                .arg(self.layout.menu_entries_dir.to_string_lossy()),
        )
    }

    /// Launcher for a relocated AppImage, with its bundled icon when one can be extracted.
    pub fn appimage_launcher(&self, app_name: &str, appimage: &Path) -> IntegrationReport {
        let mut report = IntegrationReport::default();

        let icon = match self.extract_appimage_icon(appimage, app_name) {
            Ok(icon) => {
                report.artifacts.push(icon.clone());
                icon.to_string_lossy().into_owned()
            }
            Err(warning) => {
                tracing::debug!(
                    path = %appimage.display(),
                    message = %warning.message,
                    "using generic icon"
                );
                GENERIC_ICON.to_string()
            }
        };

        let entry = DesktopEntry::launcher(app_name, appimage)
            .with_icon(icon)
            .with_startup_wm_class(app_name);
        report.extend(self.install_launcher(app_name, &entry));

        if let Err(warning) = self.refresh_desktop_database() {
            report.warn(warning);
        }
        report
    }

    /// Launchers for up to [`MAX_LAUNCHERS`] executables found below an extracted archive.
    pub fn archive_launchers(&self, extract_dir: &Path) -> IntegrationReport {
        let mut report = IntegrationReport::default();
        let executables = discover_executables(extract_dir);

        for executable in &executables {
            let Some(name) = executable.file_name().map(|name| name.to_string_lossy().into_owned())
            else {
                continue;
            };
            let entry = DesktopEntry::launcher(&name, executable);
            report.extend(self.install_launcher(&name, &entry));
        }

        if !executables.is_empty()
            && let Err(warning) = self.refresh_desktop_database()
        {
            report.warn(warning);
        }
        report
    }

    pub fn executable_launcher(&self, app_name: &str, executable: &Path) -> IntegrationReport {
        let entry = DesktopEntry::launcher(app_name, executable);
        let mut report = self.install_launcher(app_name, &entry);
        if let Err(warning) = self.refresh_desktop_database() {
            report.warn(warning);
        }
        report
    }

    /// Creates the per-application data, config and cache directories.
    pub fn app_directories(&self, app_name: &str) -> IntegrationResult<Vec<PathBuf>> {
        [
            &self.layout.data_root,
            &self.layout.config_root,
            &self.layout.cache_root,
        ]
        .into_iter()
        .map(|root| {
            let dir = root.join(app_name);
            fs::create_dir_all(&dir)
                .map(|()| dir.clone())
                .map_err(|error| {
                    IntegrationWarning::io(IntegrationStep::AppDirectories, "create", &dir, error)
                })
        })
        .collect()
    }

    pub fn uninstall_entry(
        &self,
        app_name: &str,
        install_path: &Path,
        command: Option<&str>,
    ) -> IntegrationResult<PathBuf> {
        let entry = DesktopEntry::uninstaller(app_name, install_path, command);
        write_entry(
            &self.layout.menu_entries_dir,
            &format!("{app_name}-uninstall.desktop"),
            &entry.render(),
            IntegrationStep::UninstallEntry,
        )
    }

    /// Directories, uninstall entry and mime associations. Each step runs regardless of the others.
    pub fn post_install(
        &self,
        app_name: &str,
        install_path: &Path,
        format: PackageFormat,
    ) -> IntegrationReport {
        let mut report = IntegrationReport::default();

        report.record(self.app_directories(app_name));
        report.record(
            self.uninstall_entry(app_name, install_path, None)
                .map(|path| vec![path]),
        );

        let extensions = format.association_extensions();
        if !extensions.is_empty() {
            report.extend(self.associate_mime(app_name, extensions));
        }

        tracing::info!(
            app = app_name,
            format = %format,
            artifacts = report.artifacts.len(),
            warnings = report.warnings.len(),
            "post-install setup finished"
        );
        report
    }

    fn run_tool(&self, step: IntegrationStep, command: CommandSpec) -> IntegrationResult<()> {
        self.runner
            .run(ProcessSpawnRequest::new(command))
            .map(|_| ())
            .map_err(|error| IntegrationWarning::new(step, error.message))
    }
}

fn write_entry(
    dir: &Path,
    file_name: &str,
    contents: &str,
    step: IntegrationStep,
) -> IntegrationResult<PathBuf> {
    fs::create_dir_all(dir).map_err(|error| IntegrationWarning::io(step, "create", dir, error))?;

    let path = dir.join(file_name);
    fs::write(&path, contents).map_err(|error| IntegrationWarning::io(step, "write", &path, error))?;
    fs_utils::set_executable(&path)
        .map_err(|error| IntegrationWarning::io(step, "mark executable", &path, error))?;
    Ok(path)
}
