//! Identity store implementations.

mod memory;
mod sqlite;

pub use memory::InMemoryIdentityStore;
pub use sqlite::SqliteIdentityStore;
