//! Experiment log backends.
//!
//! [`InMemoryLog`] keeps records for the life of the process. [`SqliteLog`]
//! persists them so the experiment history survives a controller restart.
//! Scheduled-but-unfired dispatches are never persisted by either backend.

use std::path::Path;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection};
use tracing::debug;

use chaos_config::RegistryConfig;
use chaos_core::{ExperimentDefinition, ExperimentLog, ExperimentRecord, RegistryError};

/// Open the backend named by the configuration.
pub fn open_log(config: &RegistryConfig) -> Result<Arc<dyn ExperimentLog>, RegistryError> {
    match config {
        RegistryConfig::Memory => Ok(Arc::new(InMemoryLog::new())),
        RegistryConfig::Sqlite { path } => Ok(Arc::new(SqliteLog::open(Path::new(path))?)),
    }
}

/// Process-local experiment log guarded by one mutex.
#[derive(Debug, Default)]
pub struct InMemoryLog {
    records: Mutex<Vec<ExperimentRecord>>,
}

impl InMemoryLog {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ExperimentLog for InMemoryLog {
    fn record(&self, definition: ExperimentDefinition) -> Result<ExperimentRecord, RegistryError> {
        let mut records = self.records.lock().map_err(|_| RegistryError::Poisoned)?;
        let record = ExperimentRecord {
            id: records.len() as u64 + 1,
            accepted_at: Utc::now(),
            definition,
        };
        records.push(record.clone());
        Ok(record)
    }

    fn list(&self) -> Result<Vec<ExperimentRecord>, RegistryError> {
        let records = self.records.lock().map_err(|_| RegistryError::Poisoned)?;
        Ok(records.clone())
    }
}

/// Experiment log stored in a SQLite database.
///
/// Definitions are kept as JSON text so the stored form is exactly what the
/// client submitted.
pub struct SqliteLog {
    conn: Mutex<Connection>,
}

fn storage(e: rusqlite::Error) -> RegistryError {
    RegistryError::Storage(e.to_string())
}

impl SqliteLog {
    /// Open (or create) the log at the given path.
    pub fn open(path: &Path) -> Result<Self, RegistryError> {
        let conn = Connection::open(path).map_err(storage)?;

        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL;")
            .map_err(storage)?;

        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS experiments (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                accepted_at TEXT NOT NULL,
                definition TEXT NOT NULL
            );",
        )
        .map_err(storage)?;

        debug!("Opened experiment log at {}", path.display());
        Ok(SqliteLog {
            conn: Mutex::new(conn),
        })
    }
}

impl ExperimentLog for SqliteLog {
    fn record(&self, definition: ExperimentDefinition) -> Result<ExperimentRecord, RegistryError> {
        let json = serde_json::to_string(&definition)?;
        let accepted_at = Utc::now();

        let conn = self.conn.lock().map_err(|_| RegistryError::Poisoned)?;
        conn.execute(
            "INSERT INTO experiments (accepted_at, definition) VALUES (?1, ?2)",
            params![accepted_at.to_rfc3339(), json],
        )
        .map_err(storage)?;
        let id = conn.last_insert_rowid() as u64;

        Ok(ExperimentRecord {
            id,
            accepted_at,
            definition,
        })
    }

    fn list(&self) -> Result<Vec<ExperimentRecord>, RegistryError> {
        let conn = self.conn.lock().map_err(|_| RegistryError::Poisoned)?;
        let mut stmt = conn
            .prepare("SELECT id, accepted_at, definition FROM experiments ORDER BY id")
            .map_err(storage)?;
        let rows = stmt
            .query_map([], |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                ))
            })
            .map_err(storage)?;

        let mut records = Vec::new();
        for row in rows {
            let (id, accepted_at, json) = row.map_err(storage)?;
            let accepted_at = DateTime::parse_from_rfc3339(&accepted_at)
                .map_err(|e| RegistryError::Storage(format!("Bad timestamp for record {}: {}", id, e)))?
                .with_timezone(&Utc);
            records.push(ExperimentRecord {
                id: id as u64,
                accepted_at,
                definition: serde_json::from_str(&json)?,
            });
        }
        Ok(records)
    }
}
