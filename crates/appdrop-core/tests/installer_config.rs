use std::path::Path;

use appdrop_core::config::{HistoryBackend, InstallerConfig};
use appdrop_core::models::CoreErrorKind;

#[test]
fn config_file_overrides_layout_and_backend() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("appdrop.toml");
    std::fs::write(
        &path,
        r#"
elevation_command = "sudo"
command_timeout_secs = 45
history_backend = "sqlite"
history_path = "/var/tmp/appdrop-history.sqlite3"

[layout]
applications_dir = "/opt/appdrop/apps"
desktop_dir = "/home/ada/Schreibtisch"
"#,
    )
    .unwrap();

    let config = InstallerConfig::load(&path).unwrap();
    assert_eq!(config.elevation_wrapper(), Some("sudo"));
    assert_eq!(config.command_timeout().as_secs(), 45);
    assert_eq!(config.history_backend, HistoryBackend::Sqlite);
    assert_eq!(
        config.history_path(),
        Path::new("/var/tmp/appdrop-history.sqlite3")
    );
    assert_eq!(
        config.layout.applications_dir,
        Path::new("/opt/appdrop/apps")
    );
    assert_eq!(
        config.layout.desktop_dir,
        Path::new("/home/ada/Schreibtisch")
    );
}

#[test]
fn unknown_backend_is_reported_with_file_name() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("appdrop.toml");
    std::fs::write(&path, "history_backend = \"postgres\"\n").unwrap();

    let error = InstallerConfig::load(&path).unwrap_err();
    assert_eq!(error.kind, CoreErrorKind::InvalidInput);
    assert!(error.message.contains("appdrop.toml"));
}
