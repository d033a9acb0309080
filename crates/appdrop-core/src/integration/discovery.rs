use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::fs_utils;

/// Upper bound on launchers created for one extracted archive.
pub const MAX_LAUNCHERS: usize = 3;

const LIBRARY_SUFFIXES: [&str; 3] = [".so", ".dll", ".dylib"];
const INSTALLER_NAMES: [&str; 3] = ["install.sh", "uninstall.sh", "configure"];

const ELF_MAGIC: &[u8] = b"\x7fELF";
const SHEBANG: &[u8] = b"#!/";

/// Executables worth a launcher below `root`, in file-name traversal order.
pub fn discover_executables(root: &Path) -> Vec<PathBuf> {
    WalkDir::new(root)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(error) => {
                tracing::debug!(root = %root.display(), %error, "skipping unreadable entry");
                None
            }
        })
        .filter(|entry| entry.file_type().is_file())
        .filter(|entry| {
            let name = entry.file_name().to_string_lossy();
            !INSTALLER_NAMES.contains(&name.as_ref())
                && !LIBRARY_SUFFIXES.iter().any(|suffix| name.ends_with(suffix))
        })
        .filter(|entry| {
            entry
                .metadata()
                .is_ok_and(|metadata| fs_utils::is_executable(&metadata))
        })
        .filter(|entry| has_program_header(entry.path()))
        .map(|entry| entry.into_path())
        .take(MAX_LAUNCHERS)
        .collect()
}

fn has_program_header(path: &Path) -> bool {
    let mut header = [0_u8; 4];
    let Ok(mut file) = File::open(path) else {
        return false;
    };
    let Ok(read) = file.read(&mut header) else {
        return false;
    };
    let header = &header[..read];
    header.starts_with(ELF_MAGIC) || header.starts_with(SHEBANG)
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::path::Path;

    use super::discover_executables;
    use crate::fs_utils::set_executable;

    fn executable(path: &Path, contents: &[u8]) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, contents).unwrap();
        set_executable(path).unwrap();
    }

    #[test]
    fn selects_elf_and_scripts_with_exec_bit() {
        let root = tempfile::tempdir().unwrap();
        executable(&root.path().join("bin/app"), b"\x7fELF\x02\x01");
        executable(&root.path().join("run.sh"), b"#!/bin/sh\necho hi\n");
        executable(&root.path().join("notes.txt"), b"plain text");
        fs::write(root.path().join("data.sh"), b"#!/bin/sh\n").unwrap();

        assert_eq!(
            discover_executables(root.path()),
            [root.path().join("bin/app"), root.path().join("run.sh")]
        );
    }

    #[test]
    fn skips_installer_scripts_and_libraries() {
        let root = tempfile::tempdir().unwrap();
        executable(&root.path().join("install.sh"), b"#!/bin/sh\n");
        executable(&root.path().join("configure"), b"#!/bin/sh\n");
        executable(&root.path().join("libfoo.so"), b"\x7fELF");
        executable(&root.path().join("tool"), b"\x7fELF");

        assert_eq!(discover_executables(root.path()), [root.path().join("tool")]);
    }

    #[test]
    fn stops_after_three_launchers() {
        let root = tempfile::tempdir().unwrap();
        for name in ["a", "b", "c", "d", "e"] {
            executable(&root.path().join(name), b"\x7fELF");
        }

        assert_eq!(
            discover_executables(root.path()),
            [
                root.path().join("a"),
                root.path().join("b"),
                root.path().join("c")
            ]
        );
    }
}
