//! Shared `SQLite` infrastructure for the identity store.
//!
//! - [`connection`]: lock acquisition, pragma configuration, transactions
//! - [`identity_row`]: schema and row conversion for identity records

mod connection;
mod identity_row;

pub use connection::{
    DEFAULT_BUSY_TIMEOUT_MS, acquire_lock, configure_connection, with_transaction,
};
pub use identity_row::{IDENTITY_COLUMNS, IDENTITY_SCHEMA, read_identity_row};
