use std::path::Path;
use std::sync::Arc;

use crate::config::InstallerLayout;
use crate::execution::CommandRunner;
use crate::installers::{
    InstallOutcome, InstallResult, Procedure, appimage, archive, deb, executable, flatpak, snap,
};
use crate::integration::DesktopIntegration;
use crate::models::{CoreError, CoreErrorKind, PackageFormat, TaskId, unrecognized_suffix};

/// Maps each [`PackageFormat`] to its install procedure.
pub struct InstallerRegistry {
    runner: Arc<dyn CommandRunner>,
    layout: InstallerLayout,
    integration: DesktopIntegration,
}

impl InstallerRegistry {
    pub fn new(layout: InstallerLayout, runner: Arc<dyn CommandRunner>) -> Self {
        let integration = DesktopIntegration::new(layout.clone(), runner.clone());
        Self {
            runner,
            layout,
            integration,
        }
    }

    pub fn layout(&self) -> &InstallerLayout {
        &self.layout
    }

    pub fn runner(&self) -> &Arc<dyn CommandRunner> {
        &self.runner
    }

    /// Detects the format of `path`; nothing is touched when detection fails.
    pub fn resolve(&self, path: &Path) -> InstallResult<PackageFormat> {
        PackageFormat::detect(path).ok_or_else(|| {
            CoreError::new(
                CoreErrorKind::UnsupportedFormat,
                format!("Unsupported file type: {}", unrecognized_suffix(path)),
            )
        })
    }

    pub fn install(&self, format: PackageFormat, path: &Path) -> InstallResult<InstallOutcome> {
        self.dispatch(None, format, path)
    }

    pub fn install_task(
        &self,
        task_id: &TaskId,
        format: PackageFormat,
        path: &Path,
    ) -> InstallResult<InstallOutcome> {
        self.dispatch(Some(task_id), format, path)
    }

    fn dispatch(
        &self,
        task_id: Option<&TaskId>,
        format: PackageFormat,
        path: &Path,
    ) -> InstallResult<InstallOutcome> {
        let procedure = Procedure {
            runner: self.runner.as_ref(),
            layout: &self.layout,
            integration: &self.integration,
            task_id,
            format,
        };

        tracing::info!(
            task_id = task_id.map(TaskId::as_str),
            format = %format,
            path = %path.display(),
            "running install procedure"
        );

        let result = match format {
            PackageFormat::Deb => deb::install(&procedure, path),
            PackageFormat::AppImage => appimage::install(&procedure, path),
            PackageFormat::TarGzip | PackageFormat::TarXz | PackageFormat::TarPlain => {
                archive::install(&procedure, path)
            }
            PackageFormat::Snap => snap::install(&procedure, path),
            PackageFormat::Flatpak => flatpak::install(&procedure, path),
            PackageFormat::Run | PackageFormat::Bin => executable::install(&procedure, path),
        };

        result.map_err(|error| {
            let error = procedure.attribute(error);
            tracing::error!(
                task_id = task_id.map(TaskId::as_str),
                format = %format,
                kind = ?error.kind,
                message = %error.message,
                "install procedure failed"
            );
            error
        })
    }
}
