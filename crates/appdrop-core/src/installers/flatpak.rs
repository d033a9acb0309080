use std::path::Path;

use crate::execution::CommandSpec;
use crate::installers::{InstallOutcome, InstallResult, Procedure, file_name};

pub(crate) fn install_command(package: &Path) -> CommandSpec {
    CommandSpec::new("flatpak")
        .args(["install", "--user", "--noninteractive"])
        .arg(package.to_string_lossy())
}

/// User-scoped install; flatpak needs no elevation for `--user`.
pub(crate) fn install(procedure: &Procedure<'_>, package: &Path) -> InstallResult<InstallOutcome> {
    procedure.require_tool("flatpak", "flatpak")?;
    procedure.run(install_command(package))?;

    Ok(InstallOutcome::new(format!(
        "Successfully installed {}",
        file_name(package)
    )))
}
