use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::models::{CoreError, CoreErrorKind};

pub const DEFAULT_COMMAND_TIMEOUT: Duration = Duration::from_secs(300);
pub const DEFAULT_ELEVATION_COMMAND: &str = "pkexec";

const APP_DIR_NAME: &str = "appdrop";

/// Every filesystem location the installer writes to.
#[derive(Clone, Debug, Eq, PartialEq, Deserialize)]
#[serde(default)]
pub struct InstallerLayout {
    pub applications_dir: PathBuf,
    pub menu_entries_dir: PathBuf,
    pub desktop_dir: PathBuf,
    pub icons_dir: PathBuf,
    pub mime_dir: PathBuf,
    pub data_root: PathBuf,
    pub config_root: PathBuf,
    pub cache_root: PathBuf,
}

impl InstallerLayout {
    /// Derives the conventional per-user layout below a single home directory.
    pub fn rooted(home: impl AsRef<Path>) -> Self {
        let home = home.as_ref();
        let data_root = home.join(".local/share");
        Self {
            applications_dir: home.join("Applications"),
            menu_entries_dir: data_root.join("applications"),
            desktop_dir: home.join("Desktop"),
            icons_dir: data_root.join("icons"),
            mime_dir: data_root.join("mime"),
            config_root: home.join(".config"),
            cache_root: home.join(".cache"),
            data_root,
        }
    }

    pub fn mime_packages_dir(&self) -> PathBuf {
        self.mime_dir.join("packages")
    }

    pub fn defaults_list(&self) -> PathBuf {
        self.menu_entries_dir.join("defaults.list")
    }
}

impl Default for InstallerLayout {
    fn default() -> Self {
        let home = dirs::home_dir().unwrap_or_else(|| PathBuf::from("/tmp"));
        let mut layout = Self::rooted(&home);

        if let Some(data) = dirs::data_dir() {
            layout.menu_entries_dir = data.join("applications");
            layout.icons_dir = data.join("icons");
            layout.mime_dir = data.join("mime");
            layout.data_root = data;
        }
        if let Some(config) = dirs::config_dir() {
            layout.config_root = config;
        }
        if let Some(cache) = dirs::cache_dir() {
            layout.cache_root = cache;
        }
        if let Some(desktop) = dirs::desktop_dir() {
            layout.desktop_dir = desktop;
        }

        layout
    }
}

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HistoryBackend {
    #[default]
    Json,
    Sqlite,
}

#[derive(Clone, Debug, Eq, PartialEq, Deserialize)]
#[serde(default)]
pub struct InstallerConfig {
    pub layout: InstallerLayout,
    /// Wrapper prepended to privileged commands; empty runs them as the current user.
    pub elevation_command: Option<String>,
    pub command_timeout_secs: u64,
    pub history_backend: HistoryBackend,
    pub history_path: Option<PathBuf>,
    pub auto_start_queue: bool,
    pub verbose_logging: bool,
}

impl Default for InstallerConfig {
    fn default() -> Self {
        Self {
            layout: InstallerLayout::default(),
            elevation_command: Some(DEFAULT_ELEVATION_COMMAND.to_string()),
            command_timeout_secs: DEFAULT_COMMAND_TIMEOUT.as_secs(),
            history_backend: HistoryBackend::Json,
            history_path: None,
            auto_start_queue: false,
            verbose_logging: false,
        }
    }
}

impl InstallerConfig {
    /// `<config dir>/appdrop/config.toml`, when the platform has a config directory.
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join(APP_DIR_NAME).join("config.toml"))
    }

    /// Missing file means defaults; a malformed file is an error.
    pub fn load(path: &Path) -> Result<Self, CoreError> {
        let raw = match std::fs::read_to_string(path) {
            Ok(raw) => raw,
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => {
                return Ok(Self::default());
            }
            Err(error) => return Err(CoreError::filesystem("read config", path, error)),
        };
        Self::from_toml(&raw).map_err(|error| CoreError {
            message: format!("invalid config file '{}': {}", path.display(), error.message),
            ..error
        })
    }

    pub fn from_toml(raw: &str) -> Result<Self, CoreError> {
        toml::from_str(raw).map_err(|error| {
            CoreError::new(CoreErrorKind::InvalidInput, error.message().to_string())
        })
    }

    pub fn elevation_wrapper(&self) -> Option<&str> {
        self.elevation_command
            .as_deref()
            .map(str::trim)
            .filter(|command| !command.is_empty())
    }

    pub fn command_timeout(&self) -> Duration {
        if self.command_timeout_secs == 0 {
            DEFAULT_COMMAND_TIMEOUT
        } else {
            Duration::from_secs(self.command_timeout_secs)
        }
    }

    pub fn history_path(&self) -> PathBuf {
        if let Some(path) = &self.history_path {
            return path.clone();
        }
        let file_name = match self.history_backend {
            HistoryBackend::Json => "history.json",
            HistoryBackend::Sqlite => "history.sqlite3",
        };
        self.layout.data_root.join(APP_DIR_NAME).join(file_name)
    }
}
