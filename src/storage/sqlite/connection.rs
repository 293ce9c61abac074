//! Shared connection handling for `SQLite` backends.
//!
//! Mutex acquisition with poison recovery, pragma configuration, and
//! transaction helpers.

use crate::{Error, Result};
use rusqlite::Connection;
use std::sync::{Mutex, MutexGuard};

/// Default `busy_timeout` in milliseconds.
pub const DEFAULT_BUSY_TIMEOUT_MS: u32 = 5000;

/// Helper to acquire mutex lock with poison recovery.
///
/// If the mutex is poisoned (due to a panic in a previous critical section),
/// the inner value is recovered and a warning is logged. Every write runs in
/// its own transaction, so a poisoned connection holds no half-applied state
/// once the transaction has been rolled back.
pub fn acquire_lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => {
            tracing::warn!("SQLite mutex was poisoned, recovering");
            metrics::counter!("sqlite_mutex_poison_recovery_total").increment(1);
            poisoned.into_inner()
        },
    }
}

/// Configures a `SQLite` connection for concurrent access.
///
/// - **WAL mode**: concurrent readers with a single writer
/// - **NORMAL synchronous**: balances durability with performance
/// - **`busy_timeout`**: waits for locks instead of failing immediately
///
/// # Errors
///
/// Returns [`Error::OperationFailed`] if the busy timeout cannot be set.
pub fn configure_connection(conn: &Connection, busy_timeout_ms: u32) -> Result<()> {
    // journal_mode returns a row ("wal" or "memory"), so failures here are not fatal
    let _ = conn.pragma_update(None, "journal_mode", "WAL");
    let _ = conn.pragma_update(None, "synchronous", "NORMAL");
    conn.pragma_update(None, "busy_timeout", busy_timeout_ms)
        .map_err(|e| Error::OperationFailed {
            operation: "configure_connection".to_string(),
            cause: e.to_string(),
        })?;

    Ok(())
}

/// Runs `body` inside an immediate transaction, committing on success and
/// rolling back on error.
///
/// # Errors
///
/// Returns the body's error, or [`Error::OperationFailed`] if the
/// transaction cannot be started or committed.
pub fn with_transaction<T>(
    conn: &Connection,
    body: impl FnOnce(&Connection) -> Result<T>,
) -> Result<T> {
    conn.execute("BEGIN IMMEDIATE", [])
        .map_err(|e| Error::OperationFailed {
            operation: "begin_transaction".to_string(),
            cause: e.to_string(),
        })?;

    let result = body(conn);

    if result.is_ok() {
        conn.execute("COMMIT", []).map_err(|e| {
            let _ = conn.execute("ROLLBACK", []);
            Error::OperationFailed {
                operation: "commit_transaction".to_string(),
                cause: e.to_string(),
            }
        })?;
    } else {
        let _ = conn.execute("ROLLBACK", []);
    }

    result
}
