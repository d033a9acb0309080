use std::path::Path;

use crate::execution::CommandSpec;
use crate::fs_utils;
use crate::installers::{InstallOutcome, InstallResult, Procedure, context, file_name};

const FAILURE: &str = "Failed to execute installer";

// Self-extracting installers with these prefixes do not get a launcher of their own.
const INSTALLER_PREFIXES: [&str; 3] = ["install", "setup", "configure"];

pub(crate) fn wants_launcher(file_name: &str) -> bool {
    let lowered = file_name.to_ascii_lowercase();
    !INSTALLER_PREFIXES
        .iter()
        .any(|prefix| lowered.starts_with(prefix))
}

pub(crate) fn install(procedure: &Procedure<'_>, program: &Path) -> InstallResult<InstallOutcome> {
    let app_name = procedure.app_name(program).map_err(context(FAILURE))?;
    fs_utils::set_executable(program)
        .map_err(|error| procedure.filesystem("mark executable", program, error))
        .map_err(context(FAILURE))?;
    procedure
        .run_elevated(CommandSpec::new("bash").arg(program.to_string_lossy()))
        .map_err(context(FAILURE))?;

    let name = file_name(program);

    let mut report = if wants_launcher(&name) {
        procedure.integration.executable_launcher(&app_name, program)
    } else {
        Default::default()
    };
    report.extend(
        procedure
            .integration
            .post_install(&app_name, program, procedure.format),
    );

    Ok(InstallOutcome::new(format!("Executed {name} with desktop integration"))
        .with_install_path(program)
        .with_integration(report))
}

#[cfg(test)]
mod tests {
    use super::wants_launcher;

    #[test]
    fn generic_installers_get_no_launcher() {
        assert!(!wants_launcher("install-foo.run"));
        assert!(!wants_launcher("Setup.bin"));
        assert!(!wants_launcher("configure_tool.run"));
        assert!(wants_launcher("studio-2.1.run"));
    }
}
