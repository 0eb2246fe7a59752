mod handle;

pub use handle::StoreHandle;

use crate::documents::generate_id;
use crate::errors::{AppError, AppResult};
use crate::models::FileRecord;
use chrono::Utc;
use rusqlite::{params, Connection, ErrorCode, OptionalExtension};
use std::fs;
use std::path::PathBuf;
use std::sync::{Mutex, MutexGuard};

const SCHEMA_SQL: &str = include_str!("schema.sql");
const SCHEMA_VERSION: i64 = 1;

/// Keyed persistence for file records. One record per absolute path.
pub trait RecordStore: Send + Sync {
    fn get_all(&self) -> AppResult<Vec<FileRecord>>;
    fn get(&self, path: &str) -> AppResult<Option<FileRecord>>;
    fn put(&self, record: &FileRecord) -> AppResult<()>;
    fn delete(&self, path: &str) -> AppResult<()>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreLocation {
    File(PathBuf),
    InMemory,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeedOutcome {
    Inserted,
    AlreadyPresent,
}

#[derive(Debug)]
pub struct Database {
    conn: Mutex<Connection>,
}

impl Database {
    /// Opens the database, creating the schema and seed records on first use.
    /// Every failure is reported as `StoreUnavailable`.
    pub fn open(location: &StoreLocation) -> AppResult<Self> {
        Self::try_open(location).map_err(|error| {
            tracing::error!(location = ?location, error = %error, "failed to open record store");
            match error {
                AppError::StoreUnavailable(_) => error,
                other => AppError::StoreUnavailable(other.to_string()),
            }
        })
    }

    fn try_open(location: &StoreLocation) -> AppResult<Self> {
        let mut conn = match location {
            StoreLocation::File(path) => {
                if let Some(parent) = path.parent() {
                    fs::create_dir_all(parent).map_err(|err| AppError::Io(err.to_string()))?;
                }
                Connection::open(path)?
            }
            StoreLocation::InMemory => Connection::open_in_memory()?,
        };
        initialize_schema(&mut conn)?;
        tracing::info!(location = ?location, "record store opened");

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> AppResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| AppError::Internal("database mutex poisoned".to_string()))
    }
}

impl RecordStore for Database {
    fn get_all(&self) -> AppResult<Vec<FileRecord>> {
        let conn = self.conn()?;
        let mut statement =
            conn.prepare("SELECT path, directory, name, content, timestamp FROM files ORDER BY path ASC")?;
        let records = statement
            .query_map([], parse_file_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(records)
    }

    fn get(&self, path: &str) -> AppResult<Option<FileRecord>> {
        let conn = self.conn()?;
        conn.query_row(
            "SELECT path, directory, name, content, timestamp FROM files WHERE path = ?1",
            [path],
            parse_file_row,
        )
        .optional()
        .map_err(AppError::from)
    }

    fn put(&self, record: &FileRecord) -> AppResult<()> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO files (path, directory, name, content, timestamp)
             VALUES (?1, ?2, ?3, ?4, ?5)
             ON CONFLICT(path) DO UPDATE SET
               directory = excluded.directory,
               name = excluded.name,
               content = excluded.content,
               timestamp = excluded.timestamp",
            params![
                record.path,
                record.directory,
                record.name,
                record.content,
                record.timestamp
            ],
        )?;
        Ok(())
    }

    fn delete(&self, path: &str) -> AppResult<()> {
        let conn = self.conn()?;
        conn.execute("DELETE FROM files WHERE path = ?1", [path])?;
        Ok(())
    }
}

fn initialize_schema(conn: &mut Connection) -> AppResult<()> {
    let version: i64 = conn.query_row("PRAGMA user_version", [], |row| row.get(0))?;
    if version >= SCHEMA_VERSION {
        tracing::debug!(version, "record store schema is current");
        return Ok(());
    }

    tracing::info!(from = version, to = SCHEMA_VERSION, "upgrading record store schema");
    let tx = conn.transaction()?;
    let table_existed = table_exists(&tx, "files")?;
    tx.execute_batch(SCHEMA_SQL)?;

    // Seed data only goes in alongside a freshly created table.
    if !table_existed {
        for record in seed_records(Utc::now().timestamp_millis())? {
            ensure_seed_record(&tx, &record)?;
        }
    }

    tx.pragma_update(None, "user_version", SCHEMA_VERSION)?;
    tx.commit()?;
    Ok(())
}

/// Inserts a seed record unless its path is already taken. Any failure other
/// than a key collision is returned to abort schema creation.
pub fn ensure_seed_record(conn: &Connection, record: &FileRecord) -> AppResult<SeedOutcome> {
    let inserted = conn.execute(
        "INSERT INTO files (path, directory, name, content, timestamp) VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            record.path,
            record.directory,
            record.name,
            record.content,
            record.timestamp
        ],
    );

    match inserted {
        Ok(_) => {
            tracing::info!(path = %record.path, "seeded file");
            Ok(SeedOutcome::Inserted)
        }
        Err(rusqlite::Error::SqliteFailure(failure, _)) if is_key_collision(&failure) => {
            tracing::warn!(path = %record.path, "seed file already exists, skipping");
            Ok(SeedOutcome::AlreadyPresent)
        }
        Err(error) => {
            tracing::error!(path = %record.path, error = %error, "failed to seed file");
            Err(AppError::from(error))
        }
    }
}

fn is_key_collision(failure: &rusqlite::ffi::Error) -> bool {
    failure.code == ErrorCode::ConstraintViolation
        && matches!(
            failure.extended_code,
            rusqlite::ffi::SQLITE_CONSTRAINT_PRIMARYKEY | rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
        )
}

fn seed_records(now: i64) -> AppResult<Vec<FileRecord>> {
    let seed = |path: &str, content: serde_json::Value| -> AppResult<FileRecord> {
        Ok(FileRecord {
            path: path.to_string(),
            directory: crate::paths::get_directory(path).to_string(),
            name: crate::paths::get_file_name(path).to_string(),
            content: serde_json::to_string_pretty(&content)?,
            timestamp: now,
        })
    };

    Ok(vec![
        seed(
            "/chats/welcome.json",
            serde_json::json!({
                "id": generate_id(),
                "messages": [
                    { "sender": "agent", "text": "Welcome! This is an example chat.", "timestamp": now }
                ]
            }),
        )?,
        seed(
            "/agents/example-agent.json",
            serde_json::json!({
                "id": "agent_example_1",
                "name": "Example Agent",
                "configurations": {
                    "model": "anthropic/claude-3-haiku",
                    "temperature": 0.7,
                    "greeting": "Hello!"
                }
            }),
        )?,
        seed(
            "/agents/openai-gpt4o.json",
            serde_json::json!({
                "id": "agent_openai_01",
                "name": "OpenAI GPT-4o",
                "configurations": { "model": "openai/gpt-4o", "temperature": 0.8 }
            }),
        )?,
        seed(
            "/secrets/sample-credentials.json",
            serde_json::json!({
                "id": "secret_1",
                "service": "MyService",
                "username": "user",
                "notes": "API keys etc."
            }),
        )?,
    ])
}

fn table_exists(conn: &Connection, table: &str) -> AppResult<bool> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(1) FROM sqlite_master WHERE type = 'table' AND name = ?1",
        [table],
        |row| row.get(0),
    )?;
    Ok(count > 0)
}

fn parse_file_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<FileRecord> {
    Ok(FileRecord {
        path: row.get(0)?,
        directory: row.get(1)?,
        name: row.get(2)?,
        content: row.get(3)?,
        timestamp: row.get(4)?,
    })
}
