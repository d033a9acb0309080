use std::fs;
use std::path::{Path, PathBuf};

use rusqlite::{Connection, Row};
use time::OffsetDateTime;

use crate::models::{CoreError, CoreErrorKind, Task, TaskId, TaskRecord, TaskStatus, timestamp};
use crate::persistence::{HistoryStore, PersistenceResult, remove_store_file};
use crate::sqlite::migrations::{SqliteMigration, current_schema_version, migration};

const MIGRATIONS_TABLE: &str = "appdrop_schema_migrations";

/// History kept in a single-file SQLite database.
pub struct SqliteHistoryStore {
    database_path: PathBuf,
}

impl SqliteHistoryStore {
    pub fn new(database_path: impl Into<PathBuf>) -> Self {
        Self {
            database_path: database_path.into(),
        }
    }

    pub fn database_path(&self) -> &Path {
        &self.database_path
    }

    pub fn current_version(&self) -> PersistenceResult<i64> {
        self.with_connection("current_version", |connection| {
            ensure_migrations_table(connection)?;
            read_current_version(connection)
        })
    }

    pub fn migrate_to_latest(&self) -> PersistenceResult<()> {
        self.with_connection("migrate_to_latest", migrate)
    }

    fn with_connection<T>(
        &self,
        operation_name: &str,
        operation: impl FnOnce(&mut Connection) -> rusqlite::Result<T>,
    ) -> PersistenceResult<T> {
        let mut connection = open_connection(&self.database_path)
            .map_err(|error| storage_error(operation_name, error))?;
        operation(&mut connection).map_err(|error| storage_error(operation_name, error))
    }
}

impl HistoryStore for SqliteHistoryStore {
    fn location(&self) -> &Path {
        &self.database_path
    }

    fn load(&self) -> PersistenceResult<Vec<Task>> {
        if !self.database_path.exists() {
            return Ok(Vec::new());
        }

        self.with_connection("load", |connection| {
            migrate(connection)?;
            let mut statement = connection.prepare(
                "
SELECT task_id, file_path, status, progress, message, start_time, end_time, file_hash, file_size
FROM history_entries
ORDER BY position ASC
",
            )?;
            let tasks = statement
                .query_map([], read_task)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(tasks)
        })
    }

    fn save(&self, entries: &[Task]) -> PersistenceResult<()> {
        self.with_connection("save", |connection| {
            migrate(connection)?;
            let transaction = connection.transaction()?;
            transaction.execute("DELETE FROM history_entries", [])?;
            {
                let mut statement = transaction.prepare(
                    "
INSERT INTO history_entries (
    position, task_id, file_path, status, progress, message, start_time, end_time, file_hash, file_size
) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
",
                )?;

                for (position, task) in entries.iter().enumerate() {
                    statement.execute((
                        position as i64,
                        task.id().as_str(),
                        task.source_path().to_string_lossy().into_owned(),
                        task.status().as_str(),
                        i64::from(task.progress_percent()),
                        task.message(),
                        format_timestamp(task.started_at())?,
                        format_timestamp(task.finished_at())?,
                        task.content_hash(),
                        i64::try_from(task.size_bytes()).unwrap_or(i64::MAX),
                    ))?;
                }
            }
            transaction.commit()?;
            Ok(())
        })
    }

    fn clear(&self) -> PersistenceResult<()> {
        remove_store_file(&self.database_path)
    }
}

fn open_connection(database_path: &Path) -> rusqlite::Result<Connection> {
    if let Some(parent) = database_path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .map_err(|error| rusqlite::Error::ToSqlConversionFailure(Box::new(error)))?;
    }
    Connection::open(database_path)
}

fn ensure_migrations_table(connection: &Connection) -> rusqlite::Result<()> {
    connection.execute_batch(&format!(
        "
CREATE TABLE IF NOT EXISTS {MIGRATIONS_TABLE} (
    version INTEGER PRIMARY KEY,
    name TEXT NOT NULL,
    applied_at_unix INTEGER NOT NULL
);
"
    ))
}

fn read_current_version(connection: &Connection) -> rusqlite::Result<i64> {
    connection.query_row(
        &format!("SELECT COALESCE(MAX(version), 0) FROM {MIGRATIONS_TABLE}"),
        [],
        |row| row.get(0),
    )
}

fn migrate(connection: &mut Connection) -> rusqlite::Result<()> {
    ensure_migrations_table(connection)?;
    let current_version = read_current_version(connection)?;
    let target_version = current_schema_version();

    if current_version > target_version {
        return Err(storage_error_sqlite(&format!(
            "database schema version {current_version} is newer than supported version {target_version}"
        )));
    }

    for version in (current_version + 1)..=target_version {
        let Some(entry) = migration(version) else {
            return Err(storage_error_sqlite(&format!(
                "migration version '{version}' is not defined"
            )));
        };
        apply_up_migration(connection, entry)?;
    }
    Ok(())
}

fn apply_up_migration(
    connection: &mut Connection,
    migration: &SqliteMigration,
) -> rusqlite::Result<()> {
    let transaction = connection.transaction()?;
    transaction.execute_batch(migration.up_sql)?;
    transaction.execute(
        &format!(
            "INSERT INTO {MIGRATIONS_TABLE} (version, name, applied_at_unix)
             VALUES (?1, ?2, strftime('%s', 'now'))"
        ),
        (migration.version, migration.name),
    )?;
    transaction.commit()
}

fn read_task(row: &Row<'_>) -> rusqlite::Result<Task> {
    let status_raw: String = row.get(2)?;
    let status = status_raw
        .parse::<TaskStatus>()
        .map_err(|error| storage_error_sqlite(&error.message))?;
    let progress: i64 = row.get(3)?;
    let size: i64 = row.get(8)?;

    Ok(TaskRecord {
        id: TaskId(row.get(0)?),
        source_path: PathBuf::from(row.get::<_, String>(1)?),
        status,
        progress_percent: progress.clamp(0, 100) as u8,
        message: row.get(4)?,
        started_at: parse_timestamp(row.get(5)?)?,
        finished_at: parse_timestamp(row.get(6)?)?,
        content_hash: row.get(7)?,
        size_bytes: u64::try_from(size).unwrap_or(0),
    }
    .into())
}

fn format_timestamp(value: Option<OffsetDateTime>) -> rusqlite::Result<Option<String>> {
    value
        .map(|at| {
            timestamp::format(at)
                .map_err(|error| rusqlite::Error::ToSqlConversionFailure(Box::new(error)))
        })
        .transpose()
}

fn parse_timestamp(raw: Option<String>) -> rusqlite::Result<Option<OffsetDateTime>> {
    raw.map(|raw| {
        timestamp::parse(&raw).map_err(|error| {
            storage_error_sqlite(&format!("invalid timestamp '{raw}' in history row: {error}"))
        })
    })
    .transpose()
}

fn storage_error(operation: &str, error: rusqlite::Error) -> CoreError {
    CoreError::new(
        CoreErrorKind::StorageFailure,
        format!("sqlite store '{operation}' failed: {error}"),
    )
}

fn storage_error_sqlite(message: &str) -> rusqlite::Error {
    rusqlite::Error::ToSqlConversionFailure(Box::new(std::io::Error::other(message.to_string())))
}
