//! `SQLite`-based identity store.
//!
//! Provides durable storage of identity records using `SQLite` as the
//! authoritative source of truth.

use crate::models::{IdentityRecord, LinkageKey, SourceType};
use crate::storage::metrics::timed;
use crate::storage::sqlite::{
    DEFAULT_BUSY_TIMEOUT_MS, IDENTITY_COLUMNS, IDENTITY_SCHEMA, acquire_lock,
    configure_connection, read_identity_row, with_transaction,
};
use crate::storage::traits::IdentityStore;
use crate::{Error, Result};
use chrono::Utc;
use rusqlite::{Connection, OptionalExtension, params};
use std::path::PathBuf;
use std::sync::Mutex;
use tracing::instrument;

const BACKEND: &str = "sqlite";

/// `SQLite`-based identity store.
///
/// # Concurrency Model
///
/// Uses a `Mutex<Connection>` for thread-safe access, plus WAL mode and
/// `busy_timeout` for contention with other processes. Every write runs in
/// an immediate transaction.
///
/// # Schema
///
/// One `person_identity` row per record. The `seq` column orders records by
/// creation, so the (forename, dob) lookup returns the most recent fork.
pub struct SqliteIdentityStore {
    /// Protected by Mutex because `rusqlite::Connection` is not `Sync`.
    conn: Mutex<Connection>,
    /// Path to the `SQLite` database (None for in-memory).
    db_path: Option<PathBuf>,
}

impl SqliteIdentityStore {
    /// Opens (and initializes) a store at `db_path`, creating parent directories.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or initialized.
    pub fn new(db_path: impl Into<PathBuf>) -> Result<Self> {
        Self::with_busy_timeout(db_path, DEFAULT_BUSY_TIMEOUT_MS)
    }

    /// Opens a store with an explicit `busy_timeout` in milliseconds.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or initialized.
    pub fn with_busy_timeout(db_path: impl Into<PathBuf>, busy_timeout_ms: u32) -> Result<Self> {
        let db_path = db_path.into();
        if let Some(parent) = db_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| Error::OperationFailed {
                operation: "create_data_dir".to_string(),
                cause: format!("{}: {e}", parent.display()),
            })?;
        }

        let conn = Connection::open(&db_path).map_err(|e| Error::OperationFailed {
            operation: "open_sqlite".to_string(),
            cause: e.to_string(),
        })?;

        let store = Self {
            conn: Mutex::new(conn),
            db_path: Some(db_path),
        };
        store.initialize(busy_timeout_ms)?;
        Ok(store)
    }

    /// Creates an in-memory store.
    #[cfg(test)]
    fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(|e| Error::OperationFailed {
            operation: "open_sqlite_in_memory".to_string(),
            cause: e.to_string(),
        })?;

        let store = Self {
            conn: Mutex::new(conn),
            db_path: None,
        };
        store.initialize(DEFAULT_BUSY_TIMEOUT_MS)?;
        Ok(store)
    }

    /// Returns the database path (None for in-memory).
    #[must_use]
    pub const fn db_path(&self) -> Option<&PathBuf> {
        self.db_path.as_ref()
    }

    fn initialize(&self, busy_timeout_ms: u32) -> Result<()> {
        let conn = acquire_lock(&self.conn);
        configure_connection(&conn, busy_timeout_ms)?;
        conn.execute_batch(IDENTITY_SCHEMA)
            .map_err(|e| Error::OperationFailed {
                operation: "create_identity_table".to_string(),
                cause: e.to_string(),
            })
    }
}

fn query_failed(operation: &str) -> impl FnOnce(rusqlite::Error) -> Error + '_ {
    move |e| Error::OperationFailed {
        operation: operation.to_string(),
        cause: e.to_string(),
    }
}

/// Inserts or replaces one record. `created_at` is kept on conflict.
fn upsert_identity(conn: &Connection, record: &IdentityRecord, now: i64) -> Result<()> {
    let created_at = record.created_at.map_or(now, |t| t.timestamp_millis());
    let counter = |source: SourceType| i64::from(record.counter(source));

    conn.execute(
        "INSERT INTO person_identity (linkage_key, hashed_forename, hashed_secondname,
             hashed_lastname, hashed_dob, hashed_address, gender,
             hashed_aadhaar_number, hashed_pan_number, hashed_voter_id, hashed_dl_number,
             aadhaar_counter, pan_counter, voter_id_counter, dl_counter,
             forked_from, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18)
         ON CONFLICT(linkage_key) DO UPDATE SET
             hashed_forename = excluded.hashed_forename,
             hashed_secondname = excluded.hashed_secondname,
             hashed_lastname = excluded.hashed_lastname,
             hashed_dob = excluded.hashed_dob,
             hashed_address = excluded.hashed_address,
             gender = excluded.gender,
             hashed_aadhaar_number = excluded.hashed_aadhaar_number,
             hashed_pan_number = excluded.hashed_pan_number,
             hashed_voter_id = excluded.hashed_voter_id,
             hashed_dl_number = excluded.hashed_dl_number,
             aadhaar_counter = excluded.aadhaar_counter,
             pan_counter = excluded.pan_counter,
             voter_id_counter = excluded.voter_id_counter,
             dl_counter = excluded.dl_counter,
             forked_from = excluded.forked_from,
             updated_at = excluded.updated_at",
        params![
            record.key.as_str(),
            record.attributes.forename,
            record.attributes.secondname,
            record.attributes.lastname,
            record.attributes.dob,
            record.attributes.address,
            record.gender,
            record.document(SourceType::Aadhaar),
            record.document(SourceType::Pan),
            record.document(SourceType::Voter),
            record.document(SourceType::Driving),
            counter(SourceType::Aadhaar),
            counter(SourceType::Pan),
            counter(SourceType::Voter),
            counter(SourceType::Driving),
            record.forked_from.as_ref().map(LinkageKey::as_str),
            created_at,
            now,
        ],
    )
    .map_err(query_failed("put_identity"))?;
    Ok(())
}

fn delete_identity(conn: &Connection, key: &LinkageKey) -> Result<bool> {
    let deleted = conn
        .execute(
            "DELETE FROM person_identity WHERE linkage_key = ?1",
            params![key.as_str()],
        )
        .map_err(query_failed("delete_identity"))?;
    Ok(deleted > 0)
}

impl IdentityStore for SqliteIdentityStore {
    fn name(&self) -> &'static str {
        BACKEND
    }

    #[instrument(skip(self), fields(operation = "get", backend = BACKEND, key = %key))]
    fn get(&self, key: &LinkageKey) -> Result<Option<IdentityRecord>> {
        timed(BACKEND, "get", || {
            let conn = acquire_lock(&self.conn);
            conn.query_row(
                &format!("SELECT {IDENTITY_COLUMNS} FROM person_identity WHERE linkage_key = ?1"),
                params![key.as_str()],
                read_identity_row,
            )
            .optional()
            .map_err(query_failed("get_identity"))
        })
    }

    #[instrument(skip_all, fields(operation = "get_by_forename_dob", backend = BACKEND))]
    fn get_by_forename_dob(&self, forename: &str, dob: &str) -> Result<Option<IdentityRecord>> {
        timed(BACKEND, "get_by_forename_dob", || {
            let conn = acquire_lock(&self.conn);
            conn.query_row(
                &format!(
                    "SELECT {IDENTITY_COLUMNS} FROM person_identity
                     WHERE hashed_forename = ?1 AND hashed_dob = ?2
                     ORDER BY seq DESC LIMIT 1"
                ),
                params![forename, dob],
                read_identity_row,
            )
            .optional()
            .map_err(query_failed("get_identity_by_forename_dob"))
        })
    }

    #[instrument(skip(self, record), fields(operation = "put", backend = BACKEND, key = %record.key))]
    fn put(&self, record: &IdentityRecord) -> Result<()> {
        timed(BACKEND, "put", || {
            let conn = acquire_lock(&self.conn);
            let now = Utc::now().timestamp_millis();
            with_transaction(&conn, |tx| upsert_identity(tx, record, now))
        })
    }

    #[instrument(skip(self), fields(operation = "delete", backend = BACKEND, key = %key))]
    fn delete(&self, key: &LinkageKey) -> Result<bool> {
        timed(BACKEND, "delete", || {
            let conn = acquire_lock(&self.conn);
            with_transaction(&conn, |tx| delete_identity(tx, key))
        })
    }

    #[instrument(
        skip_all,
        fields(operation = "fork", backend = BACKEND, key = %forked.key, previous = %previous.key)
    )]
    fn fork(&self, forked: &IdentityRecord, previous: &IdentityRecord) -> Result<bool> {
        timed(BACKEND, "fork", || {
            let conn = acquire_lock(&self.conn);
            let now = Utc::now().timestamp_millis();
            with_transaction(&conn, |tx| {
                upsert_identity(tx, forked, now)?;
                if previous.is_unreferenced() {
                    delete_identity(tx, &previous.key)?;
                    Ok(true)
                } else {
                    upsert_identity(tx, previous, now)?;
                    Ok(false)
                }
            })
        })
    }

    #[instrument(skip(self), fields(operation = "list_keys", backend = BACKEND))]
    fn list_keys(&self) -> Result<Vec<LinkageKey>> {
        timed(BACKEND, "list_keys", || {
            let conn = acquire_lock(&self.conn);
            let mut stmt = conn
                .prepare("SELECT linkage_key FROM person_identity ORDER BY seq")
                .map_err(query_failed("prepare_list_keys"))?;

            let keys = stmt
                .query_map([], |row| row.get::<_, String>(0))
                .map_err(query_failed("list_keys"))?
                .map(|key| key.map(LinkageKey::new))
                .collect::<rusqlite::Result<Vec<_>>>()
                .map_err(query_failed("list_keys_row"))?;

            Ok(keys)
        })
    }

    #[instrument(skip(self), fields(operation = "count", backend = BACKEND))]
    fn count(&self) -> Result<usize> {
        timed(BACKEND, "count", || {
            let conn = acquire_lock(&self.conn);
            let count: i64 = conn
                .query_row("SELECT COUNT(*) FROM person_identity", [], |row| row.get(0))
                .map_err(query_failed("count_identities"))?;

            Ok(usize::try_from(count).unwrap_or_default())
        })
    }
}
