use std::fs;
use std::path::Path;

use crate::execution::CommandSpec;
use crate::fs_utils;
use crate::installers::{InstallOutcome, InstallResult, Procedure, context};

const FAILURE: &str = "Failed to extract archive";
const INSTALL_SCRIPT: &str = "install.sh";

pub(crate) fn extract_command(archive: &Path, destination: &Path) -> CommandSpec {
    CommandSpec::new("tar")
        .arg("-xf")
        .arg(archive.to_string_lossy())
        .arg("-C")
        .arg(destination.to_string_lossy())
}

/// Extracts into `<applications>/<stem>`, then runs a bundled `install.sh` with elevation.
pub(crate) fn install(procedure: &Procedure<'_>, archive: &Path) -> InstallResult<InstallOutcome> {
    let app_name = procedure.app_name(archive).map_err(context(FAILURE))?;
    let extract_dir = procedure.layout.applications_dir.join(&app_name);

    fs::create_dir_all(&extract_dir)
        .map_err(|error| procedure.filesystem("create", &extract_dir, error))
        .map_err(context(FAILURE))?;
    procedure
        .run(extract_command(archive, &extract_dir))
        .map_err(context(FAILURE))?;

    let mut report = procedure.integration.archive_launchers(&extract_dir);

    let script = extract_dir.join(INSTALL_SCRIPT);
    if script.is_file() {
        fs_utils::set_executable(&script)
            .map_err(|error| procedure.filesystem("mark executable", &script, error))
            .map_err(context(FAILURE))?;
        procedure
            .run_elevated(
                CommandSpec::new("bash")
                    .arg(script.to_string_lossy())
                    .working_dir(&extract_dir),
            )
            .map_err(context(FAILURE))?;
    }

    report.extend(
        procedure
            .integration
            .post_install(&app_name, &extract_dir, procedure.format),
    );

    Ok(InstallOutcome::new(format!(
        "Extracted to {} with desktop integration",
        extract_dir.display()
    ))
    .with_install_path(extract_dir)
    .with_integration(report))
}
