use std::path::Path;

use crate::execution::CommandSpec;
use crate::installers::{InstallOutcome, InstallResult, Procedure, file_name};

pub(crate) fn install_command(package: &Path) -> CommandSpec {
    CommandSpec::new("snap")
        .arg("install")
        .arg(package.to_string_lossy())
        .arg("--dangerous")
}

pub(crate) fn install(procedure: &Procedure<'_>, package: &Path) -> InstallResult<InstallOutcome> {
    procedure.require_tool("snap", "snapd")?;
    procedure.run_elevated(install_command(package))?;

    Ok(InstallOutcome::new(format!(
        "Successfully installed {}",
        file_name(package)
    )))
}
