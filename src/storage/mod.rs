//! Storage layer abstraction.
//!
//! The identity store is the durable keyed store behind the linkage engine.
//! Backends implement [`IdentityStore`]:
//! - [`SqliteIdentityStore`]: authoritative on-disk storage
//! - [`InMemoryIdentityStore`]: tests and dry runs

// Dropping database guards slightly earlier provides no meaningful benefit.
#![allow(clippy::significant_drop_tightening)]

pub mod metrics;
pub mod persistence;
pub mod sqlite;
pub mod traits;

pub use persistence::{InMemoryIdentityStore, SqliteIdentityStore};
pub use traits::IdentityStore;
