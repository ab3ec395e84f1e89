use std::{
    fs,
    path::Path,
    sync::{Mutex, MutexGuard},
    time::Duration,
};

use chrono::{DateTime, NaiveDateTime, Utc};
use keepsafe_core::{
    credentials::{CredentialRecord, NewCredential},
    storage::{CredentialRepository, StoreError},
};
use rusqlite::{params, Connection, OptionalExtension};
use tracing::{debug, info, instrument};

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Format SQLite's `CURRENT_TIMESTAMP` default produces.
const SQLITE_TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// SQLite-backed credential table.
///
/// `AUTOINCREMENT` keeps ids strictly ascending and never reused after a
/// delete. The connection sits behind a mutex, so writers are serialized
/// within the process and every mutation runs in its own transaction.
pub struct SqliteCredentialStore {
    conn: Mutex<Connection>,
}

impl SqliteCredentialStore {
    /// Open (or create) the database at `path` and ensure the schema exists.
    /// Safe to call against an already-initialized database.
    pub fn initialize(path: &Path) -> Result<Self, StoreError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(storage_err)?;
        }
        let conn = Connection::open(path).map_err(storage_err)?;
        conn.busy_timeout(BUSY_TIMEOUT).map_err(storage_err)?;

        let store = Self {
            conn: Mutex::new(conn),
        };
        store.run_migrations()?;
        info!(path = %path.display(), "credential store ready");
        Ok(store)
    }

    /// Unpersisted database for tests and ephemeral sessions.
    pub fn in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory().map_err(storage_err)?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.run_migrations()?;
        Ok(store)
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, StoreError> {
        self.conn.lock().map_err(|err| StoreError::Storage {
            reason: format!("lock poisoned: {err}"),
        })
    }

    fn run_migrations(&self) -> Result<(), StoreError> {
        self.lock()?
            .execute_batch(
                "
                CREATE TABLE IF NOT EXISTS credentials (
                    id          INTEGER PRIMARY KEY AUTOINCREMENT,
                    website     TEXT NOT NULL,
                    username    TEXT NOT NULL,
                    ciphertext  TEXT NOT NULL,
                    created_at  TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
                );
                ",
            )
            .map_err(storage_err)?;

        debug!("credential schema ensured");
        Ok(())
    }

    fn row_to_record(row: &rusqlite::Row<'_>) -> rusqlite::Result<CredentialRecord> {
        let created_at: String = row.get(4)?;
        let created_at = parse_timestamp(&created_at).map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(4, rusqlite::types::Type::Text, Box::new(e))
        })?;

        Ok(CredentialRecord {
            id: row.get(0)?,
            website: row.get(1)?,
            username: row.get(2)?,
            ciphertext: row.get(3)?,
            created_at,
        })
    }
}

impl CredentialRepository for SqliteCredentialStore {
    #[instrument(skip_all)]
    fn insert(&self, credential: &NewCredential) -> Result<i64, StoreError> {
        let mut conn = self.lock()?;
        let tx = conn.transaction().map_err(storage_err)?;
        tx.execute(
            "INSERT INTO credentials (website, username, ciphertext, created_at)
             VALUES (?1, ?2, ?3, ?4)",
            params![
                credential.website,
                credential.username,
                credential.ciphertext,
                Utc::now().to_rfc3339(),
            ],
        )
        .map_err(storage_err)?;
        let id = tx.last_insert_rowid();
        tx.commit().map_err(storage_err)?;

        debug!(id, "credential inserted");
        Ok(id)
    }

    #[instrument(skip_all)]
    fn fetch_all(&self) -> Result<Vec<CredentialRecord>, StoreError> {
        let conn = self.lock()?;
        let mut stmt = conn
            .prepare(
                "SELECT id, website, username, ciphertext, created_at
                 FROM credentials ORDER BY id DESC",
            )
            .map_err(storage_err)?;
        let records = stmt
            .query_map([], Self::row_to_record)
            .map_err(storage_err)?
            .collect::<Result<Vec<_>, _>>()
            .map_err(storage_err)?;

        debug!(count = records.len(), "fetched credentials");
        Ok(records)
    }

    fn find_by_id(&self, id: i64) -> Result<Option<CredentialRecord>, StoreError> {
        let conn = self.lock()?;
        conn.query_row(
            "SELECT id, website, username, ciphertext, created_at
             FROM credentials WHERE id = ?1",
            params![id],
            Self::row_to_record,
        )
        .optional()
        .map_err(storage_err)
    }

    #[instrument(skip(self))]
    fn delete_by_id(&self, id: i64) -> Result<bool, StoreError> {
        let mut conn = self.lock()?;
        let tx = conn.transaction().map_err(storage_err)?;
        let affected = tx
            .execute("DELETE FROM credentials WHERE id = ?1", params![id])
            .map_err(storage_err)?;
        tx.commit().map_err(storage_err)?;

        if affected > 0 {
            debug!("credential deleted");
        } else {
            debug!("no credential to delete");
        }
        Ok(affected > 0)
    }
}

/// Accepts RFC 3339 (what we write) and SQLite's default timestamp format.
fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, chrono::ParseError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .or_else(|_| {
            NaiveDateTime::parse_from_str(raw, SQLITE_TIMESTAMP_FORMAT).map(|dt| dt.and_utc())
        })
}

fn storage_err<E: ToString>(err: E) -> StoreError {
    StoreError::Storage {
        reason: err.to_string(),
    }
}
