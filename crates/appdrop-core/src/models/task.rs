use std::fmt::{Display, Formatter};
use std::fs::File;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use time::OffsetDateTime;

use crate::models::{CoreError, CoreErrorKind, PackageFormat};

pub const UNKNOWN_CONTENT_HASH: &str = "unknown";

#[derive(Clone, Debug, Eq, PartialEq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(pub String);

impl TaskId {
    /// Derived from the path alone, so re-adding the same file yields the same id.
    pub fn for_path(path: &Path) -> Self {
        let digest = Sha256::digest(path.to_string_lossy().as_bytes());
        Self(digest[..4].iter().map(|byte| format!("{byte:02x}")).collect())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for TaskId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    #[default]
    Queued,
    Installing,
    Completed,
    Failed,
}

impl TaskStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Queued => "queued",
            Self::Installing => "installing",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }
}

impl std::str::FromStr for TaskStatus {
    type Err = CoreError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw {
            "queued" => Ok(Self::Queued),
            "installing" => Ok(Self::Installing),
            "completed" => Ok(Self::Completed),
            "failed" => Ok(Self::Failed),
            _ => Err(CoreError::new(
                CoreErrorKind::InvalidInput,
                format!("unknown task status '{raw}'"),
            )),
        }
    }
}

/// One installation attempt.
///
/// The serialized form doubles as the history entry. Field names match existing
/// `history.json` files, and their offset-less timestamps are accepted on read.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct Task {
    #[serde(rename = "task_id")]
    id: TaskId,
    #[serde(rename = "file_path")]
    source_path: PathBuf,
    #[serde(default)]
    status: TaskStatus,
    #[serde(rename = "progress", default)]
    progress_percent: u8,
    #[serde(default)]
    message: String,
    #[serde(
        rename = "start_time",
        default,
        with = "crate::models::timestamp::option",
        skip_serializing_if = "Option::is_none"
    )]
    started_at: Option<OffsetDateTime>,
    #[serde(
        rename = "end_time",
        default,
        with = "crate::models::timestamp::option",
        skip_serializing_if = "Option::is_none"
    )]
    finished_at: Option<OffsetDateTime>,
    #[serde(rename = "file_hash", default = "unknown_content_hash")]
    content_hash: String,
    #[serde(rename = "file_size", default)]
    size_bytes: u64,
}

impl Task {
    /// Never fails: an unreadable file still produces a task with sentinel hash and size.
    pub fn create(path: impl Into<PathBuf>) -> Self {
        let source_path = path.into();
        let size_bytes = std::fs::metadata(&source_path)
            .ok()
            .filter(|metadata| metadata.is_file())
            .map(|metadata| metadata.len())
            .unwrap_or(0);
        let content_hash = match hash_file(&source_path) {
            Ok(hash) => hash,
            Err(error) => {
                tracing::debug!(
                    path = %source_path.display(),
                    error = %error,
                    "could not fingerprint package file"
                );
                UNKNOWN_CONTENT_HASH.to_string()
            }
        };

        Self {
            id: TaskId::for_path(&source_path),
            source_path,
            status: TaskStatus::Queued,
            progress_percent: 0,
            message: String::new(),
            started_at: None,
            finished_at: None,
            content_hash,
            size_bytes,
        }
    }

    pub fn id(&self) -> &TaskId {
        &self.id
    }

    pub fn source_path(&self) -> &Path {
        &self.source_path
    }

    pub fn status(&self) -> TaskStatus {
        self.status
    }

    pub fn progress_percent(&self) -> u8 {
        self.progress_percent
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn started_at(&self) -> Option<OffsetDateTime> {
        self.started_at
    }

    pub fn finished_at(&self) -> Option<OffsetDateTime> {
        self.finished_at
    }

    pub fn content_hash(&self) -> &str {
        &self.content_hash
    }

    pub fn size_bytes(&self) -> u64 {
        self.size_bytes
    }

    pub fn format(&self) -> Option<PackageFormat> {
        PackageFormat::detect(&self.source_path)
    }

    pub fn file_name(&self) -> String {
        self.source_path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.source_path.display().to_string())
    }

    pub fn begin(&mut self) -> Result<(), CoreError> {
        self.transition(TaskStatus::Installing)?;
        self.started_at = Some(OffsetDateTime::now_utc());
        Ok(())
    }

    pub fn report_progress(&mut self, percent: u8, message: impl Into<String>) {
        self.progress_percent = percent.min(100);
        self.message = message.into();
    }

    pub fn complete(&mut self, message: impl Into<String>) -> Result<(), CoreError> {
        self.finish(TaskStatus::Completed, message.into())
    }

    pub fn fail(&mut self, message: impl Into<String>) -> Result<(), CoreError> {
        self.finish(TaskStatus::Failed, message.into())
    }

    fn finish(&mut self, terminal: TaskStatus, message: String) -> Result<(), CoreError> {
        self.transition(terminal)?;
        self.finished_at = Some(OffsetDateTime::now_utc());
        self.progress_percent = 100;
        self.message = message;
        Ok(())
    }

    fn transition(&mut self, desired: TaskStatus) -> Result<(), CoreError> {
        let allowed = matches!(
            (self.status, desired),
            (TaskStatus::Queued, TaskStatus::Installing)
                | (TaskStatus::Installing, TaskStatus::Completed)
                | (TaskStatus::Installing, TaskStatus::Failed)
        );
        if !allowed {
            return Err(CoreError {
                task: Some(self.id.clone()),
                format: None,
                kind: CoreErrorKind::InvalidTransition,
                message: format!(
                    "task '{}' cannot transition from '{}' to '{}'",
                    self.id,
                    self.status.as_str(),
                    desired.as_str()
                ),
            });
        }
        self.status = desired;
        Ok(())
    }
}

/// Plain field view of a [`Task`] for storage backends that map columns by hand.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct TaskRecord {
    pub id: TaskId,
    pub source_path: PathBuf,
    pub status: TaskStatus,
    pub progress_percent: u8,
    pub message: String,
    pub started_at: Option<OffsetDateTime>,
    pub finished_at: Option<OffsetDateTime>,
    pub content_hash: String,
    pub size_bytes: u64,
}

impl From<&Task> for TaskRecord {
    fn from(task: &Task) -> Self {
        Self {
            id: task.id.clone(),
            source_path: task.source_path.clone(),
            status: task.status,
            progress_percent: task.progress_percent,
            message: task.message.clone(),
            started_at: task.started_at,
            finished_at: task.finished_at,
            content_hash: task.content_hash.clone(),
            size_bytes: task.size_bytes,
        }
    }
}

impl From<TaskRecord> for Task {
    fn from(record: TaskRecord) -> Self {
        Self {
            id: record.id,
            source_path: record.source_path,
            status: record.status,
            progress_percent: record.progress_percent.min(100),
            message: record.message,
            started_at: record.started_at,
            finished_at: record.finished_at,
            content_hash: record.content_hash,
            size_bytes: record.size_bytes,
        }
    }
}

fn hash_file(path: &Path) -> std::io::Result<String> {
    let mut file = File::open(path)?;
    let mut hasher = Sha256::new();
    std::io::copy(&mut file, &mut hasher)?;
    Ok(format!("{:x}", hasher.finalize()))
}

fn unknown_content_hash() -> String {
    UNKNOWN_CONTENT_HASH.to_string()
}
