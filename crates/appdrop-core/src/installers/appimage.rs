use std::fs;
use std::path::Path;

use crate::fs_utils;
use crate::installers::{InstallOutcome, InstallResult, Procedure, context, file_name};
use crate::models::package_stem;

const FAILURE: &str = "Failed to install AppImage";

/// Moves the AppImage into the applications directory under a free name and marks it executable.
pub(crate) fn install(procedure: &Procedure<'_>, package: &Path) -> InstallResult<InstallOutcome> {
    procedure.app_name(package).map_err(context(FAILURE))?;
    let apps_dir = &procedure.layout.applications_dir;
    fs::create_dir_all(apps_dir)
        .map_err(|error| procedure.filesystem("create", apps_dir, error))
        .map_err(context(FAILURE))?;

    // Probing for a free name is not atomic against other installers writing the same directory.
    let destination = fs_utils::non_colliding_path(apps_dir, &file_name(package));
    fs_utils::move_file(package, &destination)
        .map_err(|error| procedure.filesystem("move", package, error))
        .map_err(context(FAILURE))?;
    fs_utils::set_executable(&destination)
        .map_err(|error| procedure.filesystem("mark executable", &destination, error))
        .map_err(context(FAILURE))?;

    tracing::info!(
        source = %package.display(),
        destination = %destination.display(),
        "appimage relocated"
    );

    let app_name = package_stem(&file_name(&destination)).to_string();
    let mut report = procedure.integration.appimage_launcher(&app_name, &destination);
    report.extend(
        procedure
            .integration
            .post_install(&app_name, &destination, procedure.format),
    );

    Ok(InstallOutcome::new(format!(
        "AppImage installed to {} with desktop integration",
        destination.display()
    ))
    .with_install_path(destination)
    .with_integration(report))
}
