use std::fs;
use std::io;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

pub(crate) const EXECUTABLE_MODE: u32 = 0o755;

pub(crate) fn set_executable(path: &Path) -> io::Result<()> {
    fs::set_permissions(path, fs::Permissions::from_mode(EXECUTABLE_MODE))
}

pub(crate) fn is_executable(metadata: &fs::Metadata) -> bool {
    metadata.permissions().mode() & 0o111 != 0
}

/// Writes `contents` through a sibling temp file so readers never observe a partial file.
pub(crate) fn write_atomic(path: &Path, contents: &[u8]) -> io::Result<()> {
    let parent = path
        .parent()
        .filter(|parent| !parent.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    fs::create_dir_all(parent)?;

    let mut staged = tempfile::NamedTempFile::new_in(parent)?;
    io::Write::write_all(&mut staged, contents)?;
    staged.persist(path).map_err(|error| error.error)?;
    Ok(())
}

/// Renames `from` to `to`, copying and removing the source when they sit on different filesystems.
pub(crate) fn move_file(from: &Path, to: &Path) -> io::Result<()> {
    match fs::rename(from, to) {
        Ok(()) => Ok(()),
        Err(error) if error.raw_os_error() == Some(libc::EXDEV) => {
            fs::copy(from, to)?;
            fs::remove_file(from)
        }
        Err(error) => Err(error),
    }
}

/// First free `dir/name`, else `dir/stem_N.ext` for the lowest free N starting at 1.
pub(crate) fn non_colliding_path(dir: &Path, file_name: &str) -> PathBuf {
    let candidate = dir.join(file_name);
    if !candidate.exists() {
        return candidate;
    }

    let (stem, extension) = match file_name.rfind('.') {
        Some(index) if index > 0 => file_name.split_at(index),
        _ => (file_name, ""),
    };

    (1..)
        .map(|counter| dir.join(format!("{stem}_{counter}{extension}")))
        .find(|candidate| !candidate.exists())
        .unwrap_or(candidate)
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::{is_executable, move_file, non_colliding_path, set_executable, write_atomic};

    #[test]
    fn collisions_are_suffixed_in_order() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(
            non_colliding_path(dir.path(), "app.AppImage"),
            dir.path().join("app.AppImage")
        );

        fs::write(dir.path().join("app.AppImage"), b"a").unwrap();
        assert_eq!(
            non_colliding_path(dir.path(), "app.AppImage"),
            dir.path().join("app_1.AppImage")
        );

        fs::write(dir.path().join("app_1.AppImage"), b"b").unwrap();
        assert_eq!(
            non_colliding_path(dir.path(), "app.AppImage"),
            dir.path().join("app_2.AppImage")
        );
    }

    #[test]
    fn collision_without_extension_appends_counter() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("tool"), b"a").unwrap();
        assert_eq!(non_colliding_path(dir.path(), "tool"), dir.path().join("tool_1"));
    }

    #[test]
    fn move_and_chmod_produce_executable_target() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("src.bin");
        let target = dir.path().join("dst.bin");
        fs::write(&source, b"payload").unwrap();

        move_file(&source, &target).unwrap();
        set_executable(&target).unwrap();

        assert!(!source.exists());
        assert!(is_executable(&fs::metadata(&target).unwrap()));
    }

    #[test]
    fn atomic_write_creates_parent_and_replaces_content() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/history.json");
        write_atomic(&path, b"[]").unwrap();
        write_atomic(&path, b"[1]").unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "[1]");
    }
}
