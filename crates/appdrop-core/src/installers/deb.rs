use std::path::Path;

use crate::execution::CommandSpec;
use crate::installers::{InstallOutcome, InstallResult, Procedure, file_name};

pub(crate) fn install_command(package: &Path) -> CommandSpec {
    CommandSpec::new("dpkg").arg("-i").arg(package.to_string_lossy())
}

pub(crate) fn fix_dependencies_command() -> CommandSpec {
    CommandSpec::new("apt-get").args(["install", "-f", "-y"])
}

pub(crate) fn install(procedure: &Procedure<'_>, package: &Path) -> InstallResult<InstallOutcome> {
    procedure.require_tool("dpkg", "dpkg")?;
    procedure.run_elevated(install_command(package))?;
    procedure.run_elevated(fix_dependencies_command())?;

    Ok(InstallOutcome::new(format!(
        "Successfully installed {}",
        file_name(package)
    )))
}
